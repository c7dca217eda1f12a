use std::{convert::Infallible, time::Duration};

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use serde::Deserialize;
use tokio::sync::{
    broadcast::{self, error::RecvError},
    mpsc,
};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info};
use utoipa::IntoParams;

use crate::{
    dto::events::ClientEvent,
    state::game::{GameStateId, PlayerId},
};

/// Query parameters narrowing the event stream of one client.
#[derive(Debug, Default, Clone, Copy, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct EventFilter {
    /// Only forward phase events of this game.
    pub game_state_id: Option<GameStateId>,
    /// Receive messages addressed to this player.
    pub player_id: Option<PlayerId>,
}

impl EventFilter {
    /// Directed messages only reach their player; phase events reach everyone watching the game.
    pub fn matches(&self, event: &ClientEvent) -> bool {
        match event.player_id {
            Some(recipient) => self.player_id == Some(recipient),
            None => self
                .game_state_id
                .is_none_or(|wanted| event.game_state_id == Some(wanted)),
        }
    }
}

/// Convert a notifier subscription into an SSE response, forwarding matching events until the
/// client disconnects.
pub fn to_sse_stream(
    mut receiver: broadcast::Receiver<ClientEvent>,
    filter: EventFilter,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (tx, rx) = mpsc::channel::<Result<Event, Infallible>>(8);

    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = tx.closed() => break,
                recv_result = receiver.recv() => {
                    match recv_result {
                        Ok(payload) => {
                            if !filter.matches(&payload) {
                                continue;
                            }
                            let event = Event::default().event(payload.event).data(payload.data);
                            if tx.send(Ok(event)).await.is_err() {
                                break;
                            }
                        }
                        Err(RecvError::Closed) => break,
                        Err(RecvError::Lagged(skipped)) => {
                            debug!(skipped, "event stream lagged");
                            continue;
                        }
                    }
                }
            }
        }
        info!("event stream disconnected");
    });

    Sse::new(ReceiverStream::new(rx)).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}
