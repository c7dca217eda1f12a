use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::{
    dao::models::RevealSnapshot,
    state::{
        game::{GamePhase, GameStateId, MAX_ROUNDS, PlayerRole, RoundType},
        phases::{
            Phase, PhaseError, StateDependencies,
            execution::{PhaseExecution, wait_for_deadline},
        },
    },
};

/// Phase that follows a reveal screen.
///
/// The last round of a type, or a caught fibber, ends the round type: most-likely rounds end the
/// game outright, the others go through scoring. Otherwise the same round type continues with a
/// new question.
pub fn next_phase_after_reveal(snapshot: &RevealSnapshot) -> GamePhase {
    let final_round = snapshot.round == MAX_ROUNDS;
    let fibber_found =
        snapshot.should_reveal && snapshot.voted_for_role == Some(PlayerRole::Fibber);

    if final_round || fibber_found {
        if snapshot.round_type == RoundType::MostLikely {
            GamePhase::Winner
        } else {
            GamePhase::Scoring
        }
    } else {
        GamePhase::Question
    }
}

/// Role reveal driver.
pub struct RevealPhase {
    game_state_id: GameStateId,
    deps: Arc<StateDependencies>,
}

impl RevealPhase {
    /// Build a reveal driver.
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
        let execution = PhaseExecution::start(GamePhase::RevealRole, id, deps);

        let deadline = deps.deadline_for(GamePhase::RevealRole);
        let snapshot = match deps.store.transition_to_reveal(id, deadline).await {
            Ok(snapshot) => snapshot,
            Err(err) => return execution.transition_failed(err, "transition_to_reveal"),
        };

        if let Err(err) = deps.notifier.notify_reveal(&snapshot).await {
            execution.record_client_update_error(&err);
        }

        let next = next_phase_after_reveal(&snapshot);
        info!(
            next_phase = %next,
            round = snapshot.round,
            round_type = %snapshot.round_type,
            should_reveal = snapshot.should_reveal,
            "reveal phase transition decision"
        );

        if !wait_for_deadline(snapshot.deadline, &cancel).await {
            execution.cancelled();
            return Ok(());
        }

        match deps.store.current_phase(id).await {
            Ok(GamePhase::RevealRole) => {}
            Ok(current) => {
                info!(
                    current_phase = %current,
                    expected_next_phase = %next,
                    "game already transitioned from reveal phase"
                );
                return Ok(());
            }
            Err(err) => return execution.transition_failed(err, "current_phase"),
        }

        execution.add_transition(next, "deadline");
        let successor = match next {
            GamePhase::Winner => Phase::winner(id, deps.clone()),
            GamePhase::Scoring => Phase::scoring(id, deps.clone()),
            _ => Phase::question(id, false, deps.clone()),
        };
        deps.launcher.start(id, successor);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use time::OffsetDateTime;

    use super::*;
    use crate::state::phases::test_support::Harness;

    fn snapshot(
        round: u32,
        round_type: RoundType,
        should_reveal: bool,
        role: Option<PlayerRole>,
    ) -> RevealSnapshot {
        RevealSnapshot {
            game_state_id: GameStateId::new(),
            round,
            round_type,
            should_reveal,
            voted_for_player_id: None,
            voted_for_nickname: None,
            voted_for_role: role,
            deadline: OffsetDateTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn reveal_decision_table() {
        use GamePhase::{Question, Scoring, Winner};
        use PlayerRole::{Fibber, Normal};
        use RoundType::{FreeForm, MostLikely, MultipleChoice};

        let cases = [
            (1, FreeForm, false, None, Question),
            (1, FreeForm, true, Some(Normal), Question),
            // A fibber role that was not revealed does not count as found.
            (2, MultipleChoice, false, Some(Fibber), Question),
            (2, FreeForm, true, Some(Fibber), Scoring),
            (3, FreeForm, false, None, Scoring),
            (3, MultipleChoice, true, Some(Normal), Scoring),
            (1, MostLikely, false, None, Question),
            (1, MostLikely, true, Some(Fibber), Winner),
            (3, MostLikely, false, None, Winner),
        ];

        for (round, round_type, should_reveal, role, expected) in cases {
            assert_eq!(
                next_phase_after_reveal(&snapshot(round, round_type, should_reveal, role)),
                expected,
                "round {round} {round_type} reveal={should_reveal} role={role:?}"
            );
        }
    }

    #[tokio::test(start_paused = true)]
    async fn caught_fibber_moves_to_scoring() {
        let harness = Harness::new();
        harness
            .store
            .set_reveal(2, RoundType::FreeForm, true, Some(PlayerRole::Fibber));
        let id = GameStateId::new();

        Phase::reveal(id, harness.deps.clone())
            .run(CancellationToken::new())
            .await
            .unwrap();

        let started = harness.started();
        assert_eq!(started.len(), 1);
        assert_eq!(started[0].phase, GamePhase::Scoring);
    }

    #[tokio::test(start_paused = true)]
    async fn continuing_round_starts_question_without_next_round() {
        let harness = Harness::new();
        harness.store.set_reveal(1, RoundType::FreeForm, false, None);

        Phase::reveal(GameStateId::new(), harness.deps.clone())
            .run(CancellationToken::new())
            .await
            .unwrap();

        let started = harness.started();
        assert_eq!(started.len(), 1);
        assert_eq!(started[0].phase, GamePhase::Question);
        assert!(!started[0].next_round);
    }

    #[tokio::test(start_paused = true)]
    async fn moved_on_game_is_left_alone() {
        let harness = Harness::new();
        harness.store.set_reported_phase(GamePhase::Question);

        Phase::reveal(GameStateId::new(), harness.deps.clone())
            .run(CancellationToken::new())
            .await
            .unwrap();

        assert!(harness.started().is_empty());
    }
}
