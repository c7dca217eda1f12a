use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::state::{
    game::{GamePhase, GameStateId},
    phases::{
        Phase, PhaseError, StateDependencies,
        execution::{PhaseExecution, wait_for_deadline},
    },
};

/// Voting screen driver.
pub struct VotingPhase {
    game_state_id: GameStateId,
    deps: Arc<StateDependencies>,
}

impl VotingPhase {
    /// Build a voting driver.
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
        let execution = PhaseExecution::start(GamePhase::Voting, id, deps);

        let deadline = deps.deadline_for(GamePhase::Voting);
        let snapshot = match deps.store.transition_to_voting(id, deadline).await {
            Ok(snapshot) => snapshot,
            Err(err) => return execution.transition_failed(err, "transition_to_voting"),
        };

        if let Err(err) = deps.notifier.notify_voting(&snapshot).await {
            execution.record_client_update_error(&err);
        }

        if !wait_for_deadline(snapshot.deadline, &cancel).await {
            execution.cancelled();
            return Ok(());
        }

        execution.add_transition(GamePhase::RevealRole, "deadline");
        deps.launcher.start(id, Phase::reveal(id, deps.clone()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        dao::round_store::RoundError,
        metrics,
        state::phases::test_support::{Harness, StoreCall},
    };

    #[tokio::test(start_paused = true)]
    async fn deadline_always_starts_reveal() {
        let harness = Harness::new();
        let id = GameStateId::new();

        Phase::voting(id, harness.deps.clone())
            .run(CancellationToken::new())
            .await
            .unwrap();

        let started = harness.started();
        assert_eq!(started.len(), 1);
        assert_eq!(started[0].phase, GamePhase::RevealRole);
        assert_eq!(started[0].game_state_id, id);
        assert!(!harness.store.calls().contains(&StoreCall::CurrentPhase));
    }

    #[tokio::test(start_paused = true)]
    async fn notification_failure_does_not_stop_the_driver() {
        let harness = Harness::new();
        harness.notifier.fail_everything();

        Phase::voting(GameStateId::new(), harness.deps.clone())
            .run(CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(harness.started().len(), 1);
        assert_eq!(
            harness
                .metrics
                .counter(metrics::PHASE_CLIENT_UPDATE_ERRORS, &[("phase", "voting")]),
            1
        );
    }

    #[tokio::test(start_paused = true)]
    async fn storage_failure_is_reported_and_stops_the_chain() {
        let harness = Harness::new();
        harness.store.fail_transitions(1);

        let err = Phase::voting(GameStateId::new(), harness.deps.clone())
            .run(CancellationToken::new())
            .await
            .unwrap_err();

        let PhaseError::Transition {
            phase,
            operation,
            source,
        } = err;
        assert_eq!(phase, GamePhase::Voting);
        assert_eq!(operation, "transition_to_voting");
        assert!(matches!(source, RoundError::Storage(_)));
        assert!(harness.started().is_empty());
        assert_eq!(harness.notifier.count("voting"), 0);
    }
}
