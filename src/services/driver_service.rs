use time::OffsetDateTime;
use tracing::info;

use crate::{
    dao::round_store::RoundStore,
    dto::games::{AdvanceRequest, DriverStartedResponse},
    error::ServiceError,
    state::{
        SharedState,
        game::{GamePhase, GameStateId},
        phases::Phase,
    },
};

/// Nicknames used for seeded demo games.
const DEMO_PLAYERS: [&str; 4] = ["ada", "grace", "linus", "barbara"];

/// Start `request.phase` for a game right away, superseding the running driver.
///
/// Used when players finish early, e.g. everybody voted before the deadline.
pub async fn advance_game(
    state: &SharedState,
    game_state_id: GameStateId,
    request: AdvanceRequest,
) -> Result<DriverStartedResponse, ServiceError> {
    let phase: GamePhase = request.phase.parse()?;
    let current = state.store().current_phase(game_state_id).await?;
    let deps = state.new_state_dependencies()?;

    let driver = match phase {
        GamePhase::Question => Phase::question(game_state_id, request.next_round, deps),
        other => Phase::resume(other, game_state_id, deps),
    };
    info!(
        game_state_id = %game_state_id,
        current_phase = %current,
        phase = %phase,
        "advancing game on request"
    );
    state.drivers().start(game_state_id, driver);

    Ok(DriverStartedResponse {
        game_state_id,
        phase,
        generation: state.drivers().active_generation(game_state_id),
    })
}

/// Cancel the driver of a game without touching its persisted phase.
pub fn stop_driver(state: &SharedState, game_state_id: GameStateId) -> Result<(), ServiceError> {
    if state.drivers().stop(game_state_id) {
        info!(game_state_id = %game_state_id, "driver stopped on request");
        Ok(())
    } else {
        Err(ServiceError::NotFound(format!(
            "no driver running for game {game_state_id}"
        )))
    }
}

/// Create `count` games waiting in their first question so startup recovery has work to resume.
pub async fn seed_demo_games(
    state: &SharedState,
    count: usize,
) -> Result<Vec<GameStateId>, ServiceError> {
    let deadline =
        OffsetDateTime::now_utc() + state.config().timings.for_phase(GamePhase::Question);
    let mut ids = Vec::with_capacity(count);
    for index in 0..count {
        let room_code = format!("DEMO{}", index + 1);
        let game = state
            .store()
            .create_game(&room_code, &DEMO_PLAYERS, deadline)
            .await?;
        info!(
            game_state_id = %game.game_state_id,
            room_code = %room_code,
            "seeded demo game"
        );
        ids.push(game.game_state_id);
    }
    Ok(ids)
}
