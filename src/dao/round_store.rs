use futures::future::BoxFuture;
use thiserror::Error;
use time::OffsetDateTime;

use crate::{
    dao::{
        models::{
            ActiveGame, QuestionSnapshot, RevealSnapshot, RoomPlayer, ScoreSnapshot,
            VotingSnapshot, WinnerSnapshot,
        },
        storage::{StorageError, StorageResult},
    },
    state::game::{GamePhase, GameStateId, RoomId, RoundType, Scoring},
};

/// Result alias for phase transitions.
pub type RoundResult<T> = Result<T, RoundError>;

/// Outcomes a phase transition can be refused with.
#[derive(Debug, Error)]
pub enum RoundError {
    /// The persisted phase is not the predecessor the transition requires.
    #[error("game is not in the {expected} phase (currently {actual})")]
    NotInExpectedPhase {
        /// Phase the transition requires.
        expected: GamePhase,
        /// Phase the game is actually in.
        actual: GamePhase,
    },
    /// Another actor is moving the game into the question phase right now.
    #[error("game is already moving into the question phase")]
    AlreadyInQuestion,
    /// Every round type has been played.
    #[error("game completed: no more round types available")]
    GameCompleted,
    /// The question bank has nothing left for this round type.
    #[error("no eligible questions available for {0} rounds")]
    NoEligibleQuestions(RoundType),
    /// The game does not exist or is already finished.
    #[error("game `{0}` not found")]
    GameNotFound(GameStateId),
    /// The backend failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl RoundError {
    /// Whether the error means another actor already advanced the game.
    pub fn is_race(&self) -> bool {
        matches!(
            self,
            RoundError::NotInExpectedPhase { .. } | RoundError::AlreadyInQuestion
        )
    }
}

/// Transactional phase transitions for live games.
///
/// Every transition checks the persisted phase first: when the game is already in the target
/// phase the call changes nothing and returns the current snapshot (carrying the persisted
/// deadline); when it is in any phase other than the expected predecessor it fails with
/// [`RoundError::NotInExpectedPhase`].
pub trait RoundStore: Send + Sync {
    /// Move to the question phase from reveal or scoring, starting a new round when `next_round`
    /// is set (or when the current round type is exhausted).
    fn transition_to_question(
        &self,
        game_state_id: GameStateId,
        deadline: OffsetDateTime,
        next_round: bool,
    ) -> BoxFuture<'static, RoundResult<QuestionSnapshot>>;
    /// Move to the voting phase from the question phase.
    fn transition_to_voting(
        &self,
        game_state_id: GameStateId,
        deadline: OffsetDateTime,
    ) -> BoxFuture<'static, RoundResult<VotingSnapshot>>;
    /// Move to the reveal phase from the voting phase.
    fn transition_to_reveal(
        &self,
        game_state_id: GameStateId,
        deadline: OffsetDateTime,
    ) -> BoxFuture<'static, RoundResult<RevealSnapshot>>;
    /// Move to the scoring phase from the reveal phase, awarding points once.
    fn transition_to_scoring(
        &self,
        game_state_id: GameStateId,
        deadline: OffsetDateTime,
        scoring: Scoring,
    ) -> BoxFuture<'static, RoundResult<ScoreSnapshot>>;
    /// Move to the winner phase from the scoring phase.
    fn transition_to_winner(
        &self,
        game_state_id: GameStateId,
        deadline: OffsetDateTime,
    ) -> BoxFuture<'static, RoundResult<WinnerSnapshot>>;
    /// Mark the game as finished once the winner screen is over.
    fn finish_game(&self, game_state_id: GameStateId) -> BoxFuture<'static, RoundResult<()>>;
    /// Read the persisted phase.
    fn current_phase(&self, game_state_id: GameStateId)
    -> BoxFuture<'static, RoundResult<GamePhase>>;
}

/// Queries used to re-attach drivers to live games after a restart.
pub trait RecoveryStore: Send + Sync {
    /// Every game whose persisted phase is still live.
    fn list_active_games(&self) -> BoxFuture<'static, StorageResult<Vec<ActiveGame>>>;
    /// Take the cross-process recovery lock for a game; `false` when another process holds it.
    fn try_acquire_game_lock(
        &self,
        game_state_id: GameStateId,
    ) -> BoxFuture<'static, StorageResult<bool>>;
    /// Release the recovery lock.
    fn release_game_lock(&self, game_state_id: GameStateId)
    -> BoxFuture<'static, StorageResult<()>>;
    /// Players currently in the room.
    fn list_players_in_room(&self, room_id: RoomId)
    -> BoxFuture<'static, StorageResult<Vec<RoomPlayer>>>;
}
