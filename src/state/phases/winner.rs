use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::state::{
    game::{GamePhase, GameStateId},
    phases::{
        PhaseError, StateDependencies,
        execution::{PhaseExecution, wait_for_deadline},
    },
};

/// Final winner screen driver; the last link of every chain.
pub struct WinnerPhase {
    game_state_id: GameStateId,
    deps: Arc<StateDependencies>,
}

impl WinnerPhase {
    /// Build a winner driver.
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
        let execution = PhaseExecution::start(GamePhase::Winner, id, deps);

        let deadline = deps.deadline_for(GamePhase::Winner);
        let snapshot = match deps.store.transition_to_winner(id, deadline).await {
            Ok(snapshot) => snapshot,
            Err(err) => return execution.transition_failed(err, "transition_to_winner"),
        };

        if let Err(err) = deps.notifier.notify_winner(&snapshot).await {
            execution.record_client_update_error(&err);
        }

        if !wait_for_deadline(snapshot.deadline, &cancel).await {
            execution.cancelled();
            return Ok(());
        }

        if let Err(err) = deps.store.finish_game(id).await {
            execution.record_state_update_error(&err, "finish_game");
            return Ok(());
        }
        info!(game_state_id = %id, "game finished");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        metrics,
        state::phases::{
            Phase,
            test_support::{Harness, StoreCall},
        },
    };

    #[tokio::test(start_paused = true)]
    async fn deadline_finishes_the_game() {
        let harness = Harness::new();

        Phase::winner(GameStateId::new(), harness.deps.clone())
            .run(CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(
            harness.store.calls(),
            vec![StoreCall::Winner, StoreCall::Finish]
        );
        assert!(harness.started().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn finish_failure_is_counted() {
        let harness = Harness::new();
        harness.store.fail_finish();

        Phase::winner(GameStateId::new(), harness.deps.clone())
            .run(CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(
            harness.metrics.counter(
                metrics::PHASE_STATE_UPDATE_ERRORS,
                &[("phase", "winner"), ("operation", "finish_game")]
            ),
            1
        );
    }
}
