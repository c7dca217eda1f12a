use time::OffsetDateTime;

use crate::state::game::{GameStateId, PlayerId, PlayerRole, RoomId, RoundType};

/// Player as seen during the question phase, with the question they must answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerWithRole {
    /// Player identifier.
    pub player_id: PlayerId,
    /// Display name.
    pub nickname: String,
    /// Role for the current round.
    pub role: PlayerRole,
    /// Question shown to this player (fibbers get the fibber question).
    pub question: String,
    /// Whether the player already marked their answer as ready.
    pub is_answer_ready: bool,
}

/// Data rendered when a game enters the question phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionSnapshot {
    /// Game this snapshot belongs to.
    pub game_state_id: GameStateId,
    /// Short code of the hosting room.
    pub room_code: String,
    /// Round number within the current round type.
    pub round: u32,
    /// Current round type.
    pub round_type: RoundType,
    /// Players with their role and question.
    pub players: Vec<PlayerWithRole>,
    /// Persisted end of the phase.
    pub deadline: OffsetDateTime,
}

/// Player as seen during the voting phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerWithVoting {
    /// Player identifier.
    pub player_id: PlayerId,
    /// Display name.
    pub nickname: String,
    /// Votes received so far.
    pub votes: u32,
    /// Answer the player submitted during the question phase.
    pub answer: String,
}

/// Data rendered when a game enters the voting phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VotingSnapshot {
    /// Game this snapshot belongs to.
    pub game_state_id: GameStateId,
    /// Round number within the current round type.
    pub round: u32,
    /// The normal question everybody (but the fibber) answered.
    pub question: String,
    /// Players with their answers and vote counts.
    pub players: Vec<PlayerWithVoting>,
    /// Persisted end of the phase.
    pub deadline: OffsetDateTime,
}

/// Data rendered when a game enters the reveal phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevealSnapshot {
    /// Game this snapshot belongs to.
    pub game_state_id: GameStateId,
    /// Round number within the current round type.
    pub round: u32,
    /// Current round type.
    pub round_type: RoundType,
    /// Whether the most voted player's identity is revealed (a clear majority exists).
    pub should_reveal: bool,
    /// Most voted player, if any vote was cast.
    pub voted_for_player_id: Option<PlayerId>,
    /// Nickname of the most voted player.
    pub voted_for_nickname: Option<String>,
    /// Role of the most voted player.
    pub voted_for_role: Option<PlayerRole>,
    /// Persisted end of the phase.
    pub deadline: OffsetDateTime,
}

/// Cumulative score of one player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerScore {
    /// Player identifier.
    pub player_id: PlayerId,
    /// Display name.
    pub nickname: String,
    /// Total points so far.
    pub score: i64,
}

/// Data rendered when a game enters the scoring phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreSnapshot {
    /// Game this snapshot belongs to.
    pub game_state_id: GameStateId,
    /// Round number within the current round type.
    pub round_number: u32,
    /// Rounds played for the current round type.
    pub total_rounds: u32,
    /// Current round type.
    pub round_type: RoundType,
    /// Whether the fibber was caught this round.
    pub fibber_caught: bool,
    /// Leaderboard, highest score first.
    pub players: Vec<PlayerScore>,
    /// Persisted end of the phase.
    pub deadline: OffsetDateTime,
}

/// Data rendered on the final winner screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WinnerSnapshot {
    /// Game this snapshot belongs to.
    pub game_state_id: GameStateId,
    /// Final leaderboard, highest score first.
    pub players: Vec<PlayerScore>,
    /// Persisted end of the phase.
    pub deadline: OffsetDateTime,
}

/// Live game row returned to the recovery manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveGame {
    /// Game identifier.
    pub game_state_id: GameStateId,
    /// Room hosting the game.
    pub room_id: RoomId,
    /// Short code of the hosting room.
    pub room_code: String,
    /// Persisted phase name, parsed by the caller.
    pub phase: String,
    /// Persisted end of the current phase.
    pub submit_deadline: OffsetDateTime,
}

/// Player listed in a room, used to address recovery notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomPlayer {
    /// Player identifier.
    pub player_id: PlayerId,
    /// Display name.
    pub nickname: String,
}
