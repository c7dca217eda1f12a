use std::convert::Infallible;

use axum::{
    Router,
    extract::{Query, State},
    response::sse::{Event, Sse},
    routing::get,
};
use futures::Stream;
use tracing::info;

use crate::{
    services::sse_service::{self, EventFilter},
    state::SharedState,
};

#[utoipa::path(
    get,
    path = "/sse/events",
    tag = "sse",
    params(EventFilter),
    responses((status = 200, description = "Phase events and directed player messages", content_type = "text/event-stream", body = String))
)]
/// Stream phase events to a connected client.
pub async fn event_stream(
    State(state): State<SharedState>,
    Query(filter): Query<EventFilter>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let receiver = state.notifier().subscribe();
    info!(
        game_state_id = ?filter.game_state_id,
        player_id = ?filter.player_id,
        "new event stream connection"
    );
    sse_service::to_sse_stream(receiver, filter)
}

/// Configure the SSE endpoints.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new().route("/sse/events", get(event_stream))
}
