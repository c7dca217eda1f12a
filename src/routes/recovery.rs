use axum::{Json, Router, extract::State, routing::get};

use crate::{
    dto::recovery::{RecoveryStatsResponse, RecoverySummaryResponse},
    error::AppError,
    services::recovery_service,
    state::SharedState,
};

#[utoipa::path(
    get,
    path = "/recovery",
    tag = "recovery",
    responses((status = 200, description = "Cumulative recovery counters", body = RecoveryStatsResponse))
)]
/// Report how many games were recovered or failed since startup.
pub async fn recovery_stats(State(state): State<SharedState>) -> Json<RecoveryStatsResponse> {
    Json(recovery_service::recovery_status(&state))
}

#[utoipa::path(
    post,
    path = "/recovery",
    tag = "recovery",
    responses(
        (status = 200, description = "Recovery pass completed", body = RecoverySummaryResponse),
        (status = 409, description = "A recovery pass is already running"),
        (status = 503, description = "Live games could not be listed")
    )
)]
/// Trigger a recovery pass over every live game.
pub async fn trigger_recovery(
    State(state): State<SharedState>,
) -> Result<Json<RecoverySummaryResponse>, AppError> {
    let summary = recovery_service::trigger_recovery(&state).await?;
    Ok(Json(summary.into()))
}

/// Configure the recovery routes subtree.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new().route("/recovery", get(recovery_stats).post(trigger_recovery))
}
