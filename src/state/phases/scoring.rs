use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::state::{
    game::{GamePhase, GameStateId},
    phases::{
        Phase, PhaseError, StateDependencies,
        execution::{PhaseExecution, wait_for_deadline},
    },
};

/// Scoreboard driver.
pub struct ScoringPhase {
    game_state_id: GameStateId,
    deps: Arc<StateDependencies>,
}

impl ScoringPhase {
    /// Build a scoring driver.
    pub fn new(game_state_id: GameStateId, deps: Arc<StateDependencies>) -> Self {
        Self {
            game_state_id,
            deps,
        }
    }

    /// Game this driver belongs to.
    pub fn game_state_id(&self) -> GameStateId {
        self.game_state_id
    }

    pub(super) async fn run(self, cancel: CancellationToken) -> Result<(), PhaseError> {
        let id = self.game_state_id;
        let deps = &self.deps;
        let execution = PhaseExecution::start(GamePhase::Scoring, id, deps);

        let deadline = deps.deadline_for(GamePhase::Scoring);
        let snapshot = match deps
            .store
            .transition_to_scoring(id, deadline, deps.scoring)
            .await
        {
            Ok(snapshot) => snapshot,
            Err(err) => return execution.transition_failed(err, "transition_to_scoring"),
        };

        if let Err(err) = deps.notifier.notify_scoring(&snapshot).await {
            execution.record_client_update_error(&err);
        }

        info!(
            round_number = snapshot.round_number,
            total_rounds = snapshot.total_rounds,
            round_type = %snapshot.round_type,
            fibber_caught = snapshot.fibber_caught,
            "scores awarded"
        );

        if !wait_for_deadline(snapshot.deadline, &cancel).await {
            execution.cancelled();
            return Ok(());
        }

        // The question phase ends the game itself once every round type has been played.
        execution.add_transition(GamePhase::Question, "deadline");
        deps.launcher.start(id, Phase::question(id, true, deps.clone()));
        Ok(())
    }
}
