use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, post},
};

use crate::{
    dto::games::{AdvanceRequest, DriverStartedResponse},
    error::AppError,
    services::driver_service,
    state::{SharedState, game::GameStateId},
};

/// Routes steering the phase driver of a single game.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/games/{id}/advance", post(advance_game))
        .route("/games/{id}/driver", delete(stop_driver))
}

/// Start a phase immediately, superseding the game's running driver.
#[utoipa::path(
    post,
    path = "/games/{id}/advance",
    tag = "games",
    request_body = AdvanceRequest,
    params(("id" = GameStateId, Path, description = "Identifier of the live game")),
    responses(
        (status = 200, description = "Driver started", body = DriverStartedResponse),
        (status = 400, description = "Unknown phase name"),
        (status = 404, description = "Game not found or finished")
    )
)]
pub async fn advance_game(
    State(state): State<SharedState>,
    Path(id): Path<GameStateId>,
    Json(payload): Json<AdvanceRequest>,
) -> Result<Json<DriverStartedResponse>, AppError> {
    let response = driver_service::advance_game(&state, id, payload).await?;
    Ok(Json(response))
}

/// Cancel the running driver of a game.
#[utoipa::path(
    delete,
    path = "/games/{id}/driver",
    tag = "games",
    params(("id" = GameStateId, Path, description = "Identifier of the live game")),
    responses(
        (status = 204, description = "Driver cancelled"),
        (status = 404, description = "No driver running for this game")
    )
)]
pub async fn stop_driver(
    State(state): State<SharedState>,
    Path(id): Path<GameStateId>,
) -> Result<StatusCode, AppError> {
    driver_service::stop_driver(&state, id)?;
    Ok(StatusCode::NO_CONTENT)
}
