use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::{
    dao::round_store::RoundError,
    state::{
        game::{GamePhase, GameStateId},
        phases::{
            Phase, PhaseError, StateDependencies,
            execution::{PhaseExecution, wait_for_deadline},
        },
    },
};

/// Question screen driver.
pub struct QuestionPhase {
    game_state_id: GameStateId,
    next_round: bool,
    deps: Arc<StateDependencies>,
}

impl QuestionPhase {
    /// Build a question driver; `next_round` moves the game to the next round type.
    pub fn new(game_state_id: GameStateId, next_round: bool, deps: Arc<StateDependencies>) -> Self {
        Self {
            game_state_id,
            next_round,
            deps,
        }
    }

    /// Game this driver belongs to.
    pub fn game_state_id(&self) -> GameStateId {
        self.game_state_id
    }

    /// Whether the driver starts a new round type.
    pub fn next_round(&self) -> bool {
        self.next_round
    }

    pub(super) async fn run(self, cancel: CancellationToken) -> Result<(), PhaseError> {
        let id = self.game_state_id;
        let deps = &self.deps;
        let execution = PhaseExecution::start(GamePhase::Question, id, deps);

        let deadline = deps.deadline_for(GamePhase::Question);
        let snapshot = match deps
            .store
            .transition_to_question(id, deadline, self.next_round)
            .await
        {
            Ok(snapshot) => snapshot,
            Err(RoundError::GameCompleted) => {
                execution.add_transition(GamePhase::Winner, "all_round_types_completed");
                deps.launcher.start(id, Phase::winner(id, deps.clone()));
                return Ok(());
            }
            Err(err @ RoundError::NoEligibleQuestions(_)) => {
                execution.record_state_update_error(&err, "transition_to_question");
                return Ok(());
            }
            Err(err) => return execution.transition_failed(err, "transition_to_question"),
        };

        if let Err(err) = deps
            .notifier
            .notify_question(&snapshot, self.next_round)
            .await
        {
            execution.record_client_update_error(&err);
        }

        if !wait_for_deadline(snapshot.deadline, &cancel).await {
            execution.cancelled();
            return Ok(());
        }

        execution.add_transition(GamePhase::Voting, "deadline");
        // Players may have advanced the game early; only move on from an unchanged question.
        match deps.store.current_phase(id).await {
            Ok(GamePhase::Question) => {
                deps.launcher.start(id, Phase::voting(id, deps.clone()));
                Ok(())
            }
            Ok(current) => {
                info!(current_phase = %current, "game already transitioned from question phase");
                Ok(())
            }
            Err(err) => execution.transition_failed(err, "current_phase"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{
        metrics,
        state::phases::test_support::{Harness, StoreCall},
    };

    #[tokio::test(start_paused = true)]
    async fn completed_game_moves_to_winner() {
        let harness = Harness::new();
        harness.store.fail_question_with(|| RoundError::GameCompleted);
        let id = GameStateId::new();

        Phase::question(id, true, harness.deps.clone())
            .run(CancellationToken::new())
            .await
            .unwrap();

        let started = harness.started();
        assert_eq!(started.len(), 1);
        assert_eq!(started[0].phase, GamePhase::Winner);
        assert_eq!(harness.notifier.count("question"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn missing_questions_stop_the_chain() {
        let harness = Harness::new();
        harness
            .store
            .fail_question_with(|| RoundError::NoEligibleQuestions(crate::state::game::RoundType::MostLikely));
        let id = GameStateId::new();

        Phase::question(id, true, harness.deps.clone())
            .run(CancellationToken::new())
            .await
            .unwrap();

        assert!(harness.started().is_empty());
        assert_eq!(
            harness.metrics.counter(
                metrics::PHASE_STATE_UPDATE_ERRORS,
                &[("phase", "question"), ("operation", "transition_to_question")]
            ),
            1
        );
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_starts_voting_only_while_still_in_question() {
        let harness = Harness::with_timings(Duration::from_secs(5));
        let id = GameStateId::new();

        Phase::question(id, false, harness.deps.clone())
            .run(CancellationToken::new())
            .await
            .unwrap();
        let started = harness.started();
        assert_eq!(started.len(), 1);
        assert_eq!(started[0].phase, GamePhase::Voting);
        assert_eq!(harness.notifier.count("question"), 1);

        harness.store.set_reported_phase(GamePhase::Voting);
        Phase::question(id, false, harness.deps.clone())
            .run(CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(harness.started().len(), 1);
        assert!(harness.store.calls().contains(&StoreCall::CurrentPhase));
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_before_the_deadline_starts_nothing() {
        let harness = Harness::with_timings(Duration::from_secs(30));
        let id = GameStateId::new();
        let cancel = CancellationToken::new();
        cancel.cancel();

        Phase::question(id, false, harness.deps.clone())
            .run(cancel)
            .await
            .unwrap();

        assert!(harness.started().is_empty());
        assert!(!harness.store.calls().contains(&StoreCall::CurrentPhase));
    }
}
