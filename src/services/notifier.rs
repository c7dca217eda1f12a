//! Delivery of phase snapshots and direct messages to connected players.

use std::string::FromUtf8Error;

use futures::future::BoxFuture;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::broadcast;

use crate::{
    dao::models::{QuestionSnapshot, RevealSnapshot, ScoreSnapshot, VotingSnapshot, WinnerSnapshot},
    dto::events::{ClientEvent, QuestionEvent, RevealEvent, ScoreEvent, VotingEvent, WinnerEvent},
    state::game::{GameStateId, PlayerId},
};

const EVENT_QUESTION: &str = "question";
const EVENT_VOTING: &str = "voting";
const EVENT_REVEAL: &str = "reveal_role";
const EVENT_SCORING: &str = "scoring";
const EVENT_WINNER: &str = "winner";
const EVENT_MESSAGE: &str = "message";

/// Result alias for notification delivery.
pub type NotifyResult<T> = Result<T, NotifyError>;

/// Reasons a notification could not be delivered.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// The payload could not be serialised.
    #[error("failed to encode {event} payload")]
    Encode {
        /// Event being encoded.
        event: &'static str,
        /// Serialisation failure.
        #[source]
        source: serde_json::Error,
    },
    /// A direct message was not valid UTF-8 JSON.
    #[error("message payload is not valid UTF-8")]
    InvalidPayload(#[from] FromUtf8Error),
    /// The transport refused the message.
    #[error("failed to deliver message: {0}")]
    Delivery(String),
}

/// Pushes phase snapshots to every player of a game.
pub trait ClientNotifier: Send + Sync {
    /// Question screen, with the new-round modal when `show_modal` is set.
    fn notify_question(
        &self,
        snapshot: &QuestionSnapshot,
        show_modal: bool,
    ) -> BoxFuture<'static, NotifyResult<()>>;
    /// Voting screen.
    fn notify_voting(&self, snapshot: &VotingSnapshot) -> BoxFuture<'static, NotifyResult<()>>;
    /// Reveal screen.
    fn notify_reveal(&self, snapshot: &RevealSnapshot) -> BoxFuture<'static, NotifyResult<()>>;
    /// Scoreboard.
    fn notify_scoring(&self, snapshot: &ScoreSnapshot) -> BoxFuture<'static, NotifyResult<()>>;
    /// Final winner screen.
    fn notify_winner(&self, snapshot: &WinnerSnapshot) -> BoxFuture<'static, NotifyResult<()>>;
}

/// Sends raw messages to a single player.
pub trait MessagePublisher: Send + Sync {
    /// Deliver `message` (JSON bytes) to `player_id`.
    fn publish(&self, player_id: PlayerId, message: Vec<u8>)
    -> BoxFuture<'static, NotifyResult<()>>;
}

/// Notifier fanning events out on a Tokio broadcast channel.
///
/// Sending without subscribers is not an error: players that are not connected simply miss the
/// update and catch up on the next phase.
pub struct BroadcastNotifier {
    sender: broadcast::Sender<ClientEvent>,
}

impl BroadcastNotifier {
    /// Construct a notifier whose channel buffers `capacity` events per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Register a new subscriber that will receive subsequent events.
    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.sender.subscribe()
    }

    fn send_game_event<T: Serialize>(
        &self,
        event: &'static str,
        game_state_id: GameStateId,
        payload: &T,
    ) -> BoxFuture<'static, NotifyResult<()>> {
        let result = ClientEvent::for_game(event, game_state_id, payload)
            .map(|message| {
                let _ = self.sender.send(message);
            })
            .map_err(|source| NotifyError::Encode { event, source });
        Box::pin(async move { result })
    }
}

impl ClientNotifier for BroadcastNotifier {
    fn notify_question(
        &self,
        snapshot: &QuestionSnapshot,
        show_modal: bool,
    ) -> BoxFuture<'static, NotifyResult<()>> {
        let payload = QuestionEvent::new(snapshot, show_modal);
        self.send_game_event(EVENT_QUESTION, snapshot.game_state_id, &payload)
    }

    fn notify_voting(&self, snapshot: &VotingSnapshot) -> BoxFuture<'static, NotifyResult<()>> {
        let payload = VotingEvent::from(snapshot);
        self.send_game_event(EVENT_VOTING, snapshot.game_state_id, &payload)
    }

    fn notify_reveal(&self, snapshot: &RevealSnapshot) -> BoxFuture<'static, NotifyResult<()>> {
        let payload = RevealEvent::from(snapshot);
        self.send_game_event(EVENT_REVEAL, snapshot.game_state_id, &payload)
    }

    fn notify_scoring(&self, snapshot: &ScoreSnapshot) -> BoxFuture<'static, NotifyResult<()>> {
        let payload = ScoreEvent::from(snapshot);
        self.send_game_event(EVENT_SCORING, snapshot.game_state_id, &payload)
    }

    fn notify_winner(&self, snapshot: &WinnerSnapshot) -> BoxFuture<'static, NotifyResult<()>> {
        let payload = WinnerEvent::from(snapshot);
        self.send_game_event(EVENT_WINNER, snapshot.game_state_id, &payload)
    }
}

impl MessagePublisher for BroadcastNotifier {
    fn publish(
        &self,
        player_id: PlayerId,
        message: Vec<u8>,
    ) -> BoxFuture<'static, NotifyResult<()>> {
        let result = String::from_utf8(message)
            .map(|data| {
                let _ = self.sender.send(ClientEvent {
                    event: EVENT_MESSAGE.to_string(),
                    player_id: Some(player_id),
                    game_state_id: None,
                    data,
                });
            })
            .map_err(NotifyError::from);
        Box::pin(async move { result })
    }
}
