use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::state::game::{GamePhase, GameStateId};

#[derive(Debug, Deserialize, ToSchema)]
/// Request body for `POST /games/{id}/advance`.
pub struct AdvanceRequest {
    /// Persisted phase name to start, e.g. `voting`.
    pub phase: String,
    /// Start a new round when advancing to `question`.
    #[serde(default)]
    pub next_round: bool,
}

#[derive(Debug, Serialize, ToSchema)]
/// Driver started for a game.
pub struct DriverStartedResponse {
    /// Game the driver runs for.
    pub game_state_id: GameStateId,
    /// Phase the driver starts in.
    pub phase: GamePhase,
    /// Generation of the driver that now owns the game, if it is still running.
    pub generation: Option<u64>,
}
