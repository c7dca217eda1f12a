use std::{fmt, str::FromStr, time::Duration};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

/// Number of rounds played per round type before the game moves on.
pub const MAX_ROUNDS: u32 = 3;

macro_rules! uuid_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema,
        )]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Allocate a fresh random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl From<Uuid> for $name {
            fn from(value: Uuid) -> Self {
                Self(value)
            }
        }
    };
}

uuid_newtype!(
    /// Identifier of one game's live session.
    GameStateId
);
uuid_newtype!(
    /// Identifier of the room hosting a game.
    RoomId
);
uuid_newtype!(
    /// Identifier of a player inside a room.
    PlayerId
);

/// Persisted phase of a running game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum GamePhase {
    /// Players answer their (normal or fibber) question.
    Question,
    /// Players vote for who they think the fibber is.
    Voting,
    /// The most voted player's role is revealed.
    RevealRole,
    /// Points are awarded for the round.
    Scoring,
    /// Final scoreboard before the game is finished.
    Winner,
}

impl GamePhase {
    /// Name used when the phase is persisted or logged.
    pub fn as_str(self) -> &'static str {
        match self {
            GamePhase::Question => "question",
            GamePhase::Voting => "voting",
            GamePhase::RevealRole => "reveal_role",
            GamePhase::Scoring => "scoring",
            GamePhase::Winner => "winner",
        }
    }
}

impl fmt::Display for GamePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raised when a persisted phase name does not match any known phase.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown game phase `{0}`")]
pub struct UnknownPhase(pub String);

impl FromStr for GamePhase {
    type Err = UnknownPhase;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "question" => Ok(GamePhase::Question),
            "voting" => Ok(GamePhase::Voting),
            "reveal_role" => Ok(GamePhase::RevealRole),
            "scoring" => Ok(GamePhase::Scoring),
            "winner" => Ok(GamePhase::Winner),
            other => Err(UnknownPhase(other.to_string())),
        }
    }
}

/// Flavour of a round, each with its own question bank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RoundType {
    /// Players type a free answer.
    FreeForm,
    /// Players pick on an agree/disagree scale.
    MultipleChoice,
    /// Players pick the player most likely to do something.
    MostLikely,
}

impl RoundType {
    /// Round type played after this one, `None` once every type has been played.
    pub fn next(self) -> Option<RoundType> {
        match self {
            RoundType::FreeForm => Some(RoundType::MultipleChoice),
            RoundType::MultipleChoice => Some(RoundType::MostLikely),
            RoundType::MostLikely => None,
        }
    }

    /// Name used when the round type is persisted or logged.
    pub fn as_str(self) -> &'static str {
        match self {
            RoundType::FreeForm => "free_form",
            RoundType::MultipleChoice => "multiple_choice",
            RoundType::MostLikely => "most_likely",
        }
    }
}

impl fmt::Display for RoundType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Role a player holds for the current round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PlayerRole {
    /// Received a different question and must blend in.
    Fibber,
    /// Received the shared question.
    Normal,
}

/// How long each phase stays on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timings {
    /// Duration of the question phase.
    pub show_question_screen_for: Duration,
    /// Duration of the voting phase.
    pub show_voting_screen_for: Duration,
    /// Duration of the reveal phase.
    pub show_reveal_screen_for: Duration,
    /// Duration of the scoring phase.
    pub show_score_screen_for: Duration,
    /// Duration of the winner screen.
    pub show_winner_screen_for: Duration,
}

impl Timings {
    /// Configured duration for the given phase.
    pub fn for_phase(&self, phase: GamePhase) -> Duration {
        match phase {
            GamePhase::Question => self.show_question_screen_for,
            GamePhase::Voting => self.show_voting_screen_for,
            GamePhase::RevealRole => self.show_reveal_screen_for,
            GamePhase::Scoring => self.show_score_screen_for,
            GamePhase::Winner => self.show_winner_screen_for,
        }
    }
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            show_question_screen_for: Duration::from_secs(35),
            show_voting_screen_for: Duration::from_secs(30),
            show_reveal_screen_for: Duration::from_secs(15),
            show_score_screen_for: Duration::from_secs(15),
            show_winner_screen_for: Duration::from_secs(15),
        }
    }
}

/// Points awarded during the scoring phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scoring {
    /// Points for every player who voted for the fibber.
    pub guessed_fibber: i64,
    /// Points for the fibber when they were not caught.
    pub fibber_evade_capture: i64,
}

impl Default for Scoring {
    fn default() -> Self {
        Self {
            guessed_fibber: 100,
            fibber_evade_capture: 150,
        }
    }
}
