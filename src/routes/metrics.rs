use axum::{Json, Router, extract::State, routing::get};

use crate::{dto::metrics::MetricsSnapshot, state::SharedState};

#[utoipa::path(
    get,
    path = "/metrics",
    tag = "metrics",
    responses((status = 200, description = "Counters, gauges and phase durations", body = MetricsSnapshot))
)]
/// Return a snapshot of the in-process metrics registry.
pub async fn metrics(State(state): State<SharedState>) -> Json<MetricsSnapshot> {
    Json(state.metrics().snapshot())
}

/// Configure the metrics routes subtree.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new().route("/metrics", get(metrics))
}
