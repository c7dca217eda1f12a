use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    dao::models::{
        PlayerScore, PlayerWithRole, PlayerWithVoting, QuestionSnapshot, RevealSnapshot,
        ScoreSnapshot, VotingSnapshot, WinnerSnapshot,
    },
    dto::format_deadline,
    state::game::{GameStateId, PlayerId, PlayerRole, RoundType},
};

#[derive(Clone, Debug)]
/// Serialized message queued for delivery to connected players.
pub struct ClientEvent {
    /// Event name (`question`, `voting`, ...).
    pub event: String,
    /// Player the message is addressed to; `None` for every player of the game.
    pub player_id: Option<PlayerId>,
    /// Game the message belongs to, when known.
    pub game_state_id: Option<GameStateId>,
    /// JSON payload.
    pub data: String,
}

impl ClientEvent {
    /// Serialise `payload` into a game-wide event.
    pub fn for_game<T: Serialize>(
        event: &str,
        game_state_id: GameStateId,
        payload: &T,
    ) -> serde_json::Result<Self> {
        Ok(Self {
            event: event.to_string(),
            player_id: None,
            game_state_id: Some(game_state_id),
            data: serde_json::to_string(payload)?,
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
/// A player on the question screen.
pub struct QuestionPlayer {
    pub player_id: PlayerId,
    pub nickname: String,
    pub role: PlayerRole,
    pub question: String,
    pub is_answer_ready: bool,
}

impl From<&PlayerWithRole> for QuestionPlayer {
    fn from(player: &PlayerWithRole) -> Self {
        Self {
            player_id: player.player_id,
            nickname: player.nickname.clone(),
            role: player.role,
            question: player.question.clone(),
            is_answer_ready: player.is_answer_ready,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when a game enters the question phase.
pub struct QuestionEvent {
    pub game_state_id: GameStateId,
    pub room_code: String,
    pub round: u32,
    pub round_type: RoundType,
    /// Whether clients should show the "new round" modal.
    pub show_modal: bool,
    pub players: Vec<QuestionPlayer>,
    /// RFC 3339 end of the phase.
    pub deadline: String,
}

impl QuestionEvent {
    /// Build the payload from a persisted snapshot.
    pub fn new(snapshot: &QuestionSnapshot, show_modal: bool) -> Self {
        Self {
            game_state_id: snapshot.game_state_id,
            room_code: snapshot.room_code.clone(),
            round: snapshot.round,
            round_type: snapshot.round_type,
            show_modal,
            players: snapshot.players.iter().map(Into::into).collect(),
            deadline: format_deadline(snapshot.deadline),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
/// A player on the voting screen.
pub struct VotingPlayer {
    pub player_id: PlayerId,
    pub nickname: String,
    pub votes: u32,
    pub answer: String,
}

impl From<&PlayerWithVoting> for VotingPlayer {
    fn from(player: &PlayerWithVoting) -> Self {
        Self {
            player_id: player.player_id,
            nickname: player.nickname.clone(),
            votes: player.votes,
            answer: player.answer.clone(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when a game enters the voting phase.
pub struct VotingEvent {
    pub game_state_id: GameStateId,
    pub round: u32,
    pub question: String,
    pub players: Vec<VotingPlayer>,
    pub deadline: String,
}

impl From<&VotingSnapshot> for VotingEvent {
    fn from(snapshot: &VotingSnapshot) -> Self {
        Self {
            game_state_id: snapshot.game_state_id,
            round: snapshot.round,
            question: snapshot.question.clone(),
            players: snapshot.players.iter().map(Into::into).collect(),
            deadline: format_deadline(snapshot.deadline),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when the most voted player's role is revealed.
pub struct RevealEvent {
    pub game_state_id: GameStateId,
    pub round: u32,
    pub round_type: RoundType,
    pub should_reveal: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voted_for_player_id: Option<PlayerId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voted_for_nickname: Option<String>,
    /// Only sent when the role is actually revealed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voted_for_role: Option<PlayerRole>,
    pub deadline: String,
}

impl From<&RevealSnapshot> for RevealEvent {
    fn from(snapshot: &RevealSnapshot) -> Self {
        Self {
            game_state_id: snapshot.game_state_id,
            round: snapshot.round,
            round_type: snapshot.round_type,
            should_reveal: snapshot.should_reveal,
            voted_for_player_id: snapshot.voted_for_player_id,
            voted_for_nickname: snapshot.voted_for_nickname.clone(),
            voted_for_role: snapshot.voted_for_role.filter(|_| snapshot.should_reveal),
            deadline: format_deadline(snapshot.deadline),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
/// One leaderboard line.
pub struct ScoreLine {
    pub player_id: PlayerId,
    pub nickname: String,
    pub score: i64,
}

impl From<&PlayerScore> for ScoreLine {
    fn from(player: &PlayerScore) -> Self {
        Self {
            player_id: player.player_id,
            nickname: player.nickname.clone(),
            score: player.score,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when points for a round are awarded.
pub struct ScoreEvent {
    pub game_state_id: GameStateId,
    pub round_number: u32,
    pub round_type: RoundType,
    pub fibber_caught: bool,
    pub players: Vec<ScoreLine>,
    pub deadline: String,
}

impl From<&ScoreSnapshot> for ScoreEvent {
    fn from(snapshot: &ScoreSnapshot) -> Self {
        Self {
            game_state_id: snapshot.game_state_id,
            round_number: snapshot.round_number,
            round_type: snapshot.round_type,
            fibber_caught: snapshot.fibber_caught,
            players: snapshot.players.iter().map(Into::into).collect(),
            deadline: format_deadline(snapshot.deadline),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast on the final winner screen.
pub struct WinnerEvent {
    pub game_state_id: GameStateId,
    pub players: Vec<ScoreLine>,
    pub deadline: String,
}

impl From<&WinnerSnapshot> for WinnerEvent {
    fn from(snapshot: &WinnerSnapshot) -> Self {
        Self {
            game_state_id: snapshot.game_state_id,
            players: snapshot.players.iter().map(Into::into).collect(),
            deadline: format_deadline(snapshot.deadline),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
/// Sent to each player of a game re-attached after a restart.
pub struct RecoveryNotice {
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
}

impl RecoveryNotice {
    /// The notice sent once a game's driver has been re-attached.
    pub fn game_recovered() -> Self {
        Self {
            kind: "game_recovered".into(),
            message: "Game recovered after server restart. Continuing...".into(),
        }
    }
}
