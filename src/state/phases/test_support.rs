//! Hand-written fakes for the capability traits, shared by driver, manager and recovery tests.

use std::{
    collections::{HashMap, HashSet},
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use futures::future::BoxFuture;
use time::OffsetDateTime;
use tokio::sync::Notify;

use crate::{
    dao::{
        models::{
            ActiveGame, QuestionSnapshot, RevealSnapshot, RoomPlayer, ScoreSnapshot,
            VotingSnapshot, WinnerSnapshot,
        },
        round_store::{RecoveryStore, RoundError, RoundResult, RoundStore},
        storage::{StorageError, StorageResult},
    },
    metrics::Metrics,
    services::notifier::{ClientNotifier, MessagePublisher, NotifyError, NotifyResult},
    state::{
        game::{GamePhase, GameStateId, PlayerId, PlayerRole, RoomId, RoundType, Scoring, Timings},
        phases::{DependencyError, DependencyFactory, Phase, PhaseLauncher, StateDependencies},
    },
};

/// Store operation observed by [`FakeStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum StoreCall {
    Question { next_round: bool },
    Voting,
    Reveal,
    Scoring,
    Winner,
    Finish,
    CurrentPhase,
    ListActiveGames,
    AcquireLock(GameStateId),
    ReleaseLock(GameStateId),
    ListPlayers(RoomId),
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum LockBehaviour {
    Denied,
    Error,
}

/// Holds `list_active_games` open until the test releases it.
#[derive(Default)]
pub(crate) struct ListingGate {
    /// Signalled once the listing has started.
    pub(crate) entered: Notify,
    /// Lets the listing return.
    pub(crate) release: Notify,
}

struct FakeStoreState {
    phase: GamePhase,
    reported_phase: Option<GamePhase>,
    question_error: Option<fn() -> RoundError>,
    failing_transitions: usize,
    finish_fails: bool,
    reveal: (u32, RoundType, bool, Option<PlayerRole>),
    score: (u32, u32, RoundType),
    active_games: Vec<ActiveGame>,
    list_fails: bool,
    listing_gate: Option<Arc<ListingGate>>,
    locks: HashMap<GameStateId, LockBehaviour>,
    held: HashSet<GameStateId>,
    players: Vec<RoomPlayer>,
    players_fail: bool,
    calls: Vec<StoreCall>,
}

impl Default for FakeStoreState {
    fn default() -> Self {
        Self {
            phase: GamePhase::Question,
            reported_phase: None,
            question_error: None,
            failing_transitions: 0,
            finish_fails: false,
            reveal: (1, RoundType::FreeForm, false, None),
            score: (1, 1, RoundType::FreeForm),
            active_games: Vec::new(),
            list_fails: false,
            listing_gate: None,
            locks: HashMap::new(),
            held: HashSet::new(),
            players: Vec::new(),
            players_fail: false,
            calls: Vec::new(),
        }
    }
}

/// Scriptable store: every transition succeeds unless told otherwise.
#[derive(Default)]
pub(crate) struct FakeStore {
    state: Mutex<FakeStoreState>,
}

impl FakeStore {
    fn with_state<T>(&self, f: impl FnOnce(&mut FakeStoreState) -> T) -> T {
        let mut state = self.state.lock().unwrap();
        f(&mut state)
    }

    pub(crate) fn fail_question_with(&self, error: fn() -> RoundError) {
        self.with_state(|state| state.question_error = Some(error));
    }

    /// Fail the next `times` transitions with a storage error.
    pub(crate) fn fail_transitions(&self, times: usize) {
        self.with_state(|state| state.failing_transitions = times);
    }

    pub(crate) fn fail_finish(&self) {
        self.with_state(|state| state.finish_fails = true);
    }

    /// Phase reported by `current_phase`, regardless of transitions.
    pub(crate) fn set_reported_phase(&self, phase: GamePhase) {
        self.with_state(|state| state.reported_phase = Some(phase));
    }

    pub(crate) fn set_reveal(
        &self,
        round: u32,
        round_type: RoundType,
        should_reveal: bool,
        voted_for_role: Option<PlayerRole>,
    ) {
        self.with_state(|state| state.reveal = (round, round_type, should_reveal, voted_for_role));
    }

    pub(crate) fn set_score(&self, round_number: u32, total_rounds: u32, round_type: RoundType) {
        self.with_state(|state| state.score = (round_number, total_rounds, round_type));
    }

    pub(crate) fn add_active_game(&self, phase: &str, submit_deadline: OffsetDateTime) -> ActiveGame {
        let game = ActiveGame {
            game_state_id: GameStateId::new(),
            room_id: RoomId::new(),
            room_code: "ROOM".into(),
            phase: phase.to_string(),
            submit_deadline,
        };
        self.with_state(|state| state.active_games.push(game.clone()));
        game
    }

    pub(crate) fn fail_listing(&self) {
        self.with_state(|state| state.list_fails = true);
    }

    /// Block every following `list_active_games` call on the returned gate.
    pub(crate) fn gate_listing(&self) -> Arc<ListingGate> {
        let gate = Arc::new(ListingGate::default());
        self.with_state(|state| state.listing_gate = Some(gate.clone()));
        gate
    }

    pub(crate) fn fail_player_listing(&self) {
        self.with_state(|state| state.players_fail = true);
    }

    pub(crate) fn set_lock(&self, game_state_id: GameStateId, behaviour: LockBehaviour) {
        self.with_state(|state| {
            state.locks.insert(game_state_id, behaviour);
        });
    }

    pub(crate) fn add_room_player(&self, nickname: &str) -> PlayerId {
        let player_id = PlayerId::new();
        self.with_state(|state| {
            state.players.push(RoomPlayer {
                player_id,
                nickname: nickname.to_string(),
            })
        });
        player_id
    }

    pub(crate) fn calls(&self) -> Vec<StoreCall> {
        self.with_state(|state| state.calls.clone())
    }

    pub(crate) fn is_held(&self, game_state_id: GameStateId) -> bool {
        self.with_state(|state| state.held.contains(&game_state_id))
    }

    /// Record `call` and decide whether it fails.
    fn transition(&self, call: StoreCall, target: GamePhase) -> RoundResult<()> {
        self.with_state(|state| {
            state.calls.push(call);
            if state.failing_transitions > 0 {
                state.failing_transitions -= 1;
                return Err(StorageError::query("database unavailable").into());
            }
            state.phase = target;
            Ok(())
        })
    }
}

impl RoundStore for FakeStore {
    fn transition_to_question(
        &self,
        game_state_id: GameStateId,
        deadline: OffsetDateTime,
        next_round: bool,
    ) -> BoxFuture<'static, RoundResult<QuestionSnapshot>> {
        let question_error = self.with_state(|state| state.question_error);
        let result = match question_error {
            Some(error) => {
                self.with_state(|state| state.calls.push(StoreCall::Question { next_round }));
                Err(error())
            }
            None => self
                .transition(StoreCall::Question { next_round }, GamePhase::Question)
                .map(|()| QuestionSnapshot {
                    game_state_id,
                    room_code: "ROOM".into(),
                    round: 1,
                    round_type: RoundType::FreeForm,
                    players: Vec::new(),
                    deadline,
                }),
        };
        Box::pin(async move { result })
    }

    fn transition_to_voting(
        &self,
        game_state_id: GameStateId,
        deadline: OffsetDateTime,
    ) -> BoxFuture<'static, RoundResult<VotingSnapshot>> {
        let result = self
            .transition(StoreCall::Voting, GamePhase::Voting)
            .map(|()| VotingSnapshot {
                game_state_id,
                round: 1,
                question: "question".into(),
                players: Vec::new(),
                deadline,
            });
        Box::pin(async move { result })
    }

    fn transition_to_reveal(
        &self,
        game_state_id: GameStateId,
        deadline: OffsetDateTime,
    ) -> BoxFuture<'static, RoundResult<RevealSnapshot>> {
        let (round, round_type, should_reveal, voted_for_role) =
            self.with_state(|state| state.reveal);
        let result = self
            .transition(StoreCall::Reveal, GamePhase::RevealRole)
            .map(|()| RevealSnapshot {
                game_state_id,
                round,
                round_type,
                should_reveal,
                voted_for_player_id: voted_for_role.map(|_| PlayerId::new()),
                voted_for_nickname: voted_for_role.map(|_| "suspect".to_string()),
                voted_for_role,
                deadline,
            });
        Box::pin(async move { result })
    }

    fn transition_to_scoring(
        &self,
        game_state_id: GameStateId,
        deadline: OffsetDateTime,
        _scoring: Scoring,
    ) -> BoxFuture<'static, RoundResult<ScoreSnapshot>> {
        let (round_number, total_rounds, round_type) = self.with_state(|state| state.score);
        let result = self
            .transition(StoreCall::Scoring, GamePhase::Scoring)
            .map(|()| ScoreSnapshot {
                game_state_id,
                round_number,
                total_rounds,
                round_type,
                fibber_caught: false,
                players: Vec::new(),
                deadline,
            });
        Box::pin(async move { result })
    }

    fn transition_to_winner(
        &self,
        game_state_id: GameStateId,
        deadline: OffsetDateTime,
    ) -> BoxFuture<'static, RoundResult<WinnerSnapshot>> {
        let result = self
            .transition(StoreCall::Winner, GamePhase::Winner)
            .map(|()| WinnerSnapshot {
                game_state_id,
                players: Vec::new(),
                deadline,
            });
        Box::pin(async move { result })
    }

    fn finish_game(&self, _game_state_id: GameStateId) -> BoxFuture<'static, RoundResult<()>> {
        let result = self.with_state(|state| {
            state.calls.push(StoreCall::Finish);
            if state.finish_fails {
                Err(StorageError::query("finish failed").into())
            } else {
                Ok(())
            }
        });
        Box::pin(async move { result })
    }

    fn current_phase(
        &self,
        _game_state_id: GameStateId,
    ) -> BoxFuture<'static, RoundResult<GamePhase>> {
        let phase = self.with_state(|state| {
            state.calls.push(StoreCall::CurrentPhase);
            state.reported_phase.unwrap_or(state.phase)
        });
        Box::pin(async move { Ok(phase) })
    }
}

impl RecoveryStore for FakeStore {
    fn list_active_games(&self) -> BoxFuture<'static, StorageResult<Vec<ActiveGame>>> {
        let (result, gate) = self.with_state(|state| {
            state.calls.push(StoreCall::ListActiveGames);
            let result = if state.list_fails {
                Err(StorageError::query("listing failed"))
            } else {
                Ok(state.active_games.clone())
            };
            (result, state.listing_gate.clone())
        });
        Box::pin(async move {
            if let Some(gate) = gate {
                gate.entered.notify_one();
                gate.release.notified().await;
            }
            result
        })
    }

    fn try_acquire_game_lock(
        &self,
        game_state_id: GameStateId,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let result = self.with_state(|state| {
            state.calls.push(StoreCall::AcquireLock(game_state_id));
            match state.locks.get(&game_state_id) {
                Some(LockBehaviour::Denied) => Ok(false),
                Some(LockBehaviour::Error) => Err(StorageError::query("lock query failed")),
                None => Ok(state.held.insert(game_state_id)),
            }
        });
        Box::pin(async move { result })
    }

    fn release_game_lock(
        &self,
        game_state_id: GameStateId,
    ) -> BoxFuture<'static, StorageResult<()>> {
        self.with_state(|state| {
            state.calls.push(StoreCall::ReleaseLock(game_state_id));
            state.held.remove(&game_state_id);
        });
        Box::pin(async move { Ok(()) })
    }

    fn list_players_in_room(
        &self,
        room_id: RoomId,
    ) -> BoxFuture<'static, StorageResult<Vec<RoomPlayer>>> {
        let result = self.with_state(|state| {
            state.calls.push(StoreCall::ListPlayers(room_id));
            if state.players_fail {
                Err(StorageError::query("player listing failed"))
            } else {
                Ok(state.players.clone())
            }
        });
        Box::pin(async move { result })
    }
}

/// Notifier counting deliveries per event, optionally failing every call.
#[derive(Default)]
pub(crate) struct FakeNotifier {
    counts: Mutex<HashMap<&'static str, usize>>,
    published: Mutex<Vec<(PlayerId, Vec<u8>)>>,
    failing: AtomicBool,
}

impl FakeNotifier {
    pub(crate) fn fail_everything(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    pub(crate) fn count(&self, event: &str) -> usize {
        self.counts.lock().unwrap().get(event).copied().unwrap_or(0)
    }

    pub(crate) fn published(&self) -> Vec<(PlayerId, Vec<u8>)> {
        self.published.lock().unwrap().clone()
    }

    fn deliver(&self, event: &'static str) -> BoxFuture<'static, NotifyResult<()>> {
        *self.counts.lock().unwrap().entry(event).or_insert(0) += 1;
        let result = if self.failing.load(Ordering::SeqCst) {
            Err(NotifyError::Delivery("socket closed".into()))
        } else {
            Ok(())
        };
        Box::pin(async move { result })
    }
}

impl ClientNotifier for FakeNotifier {
    fn notify_question(
        &self,
        _snapshot: &QuestionSnapshot,
        _show_modal: bool,
    ) -> BoxFuture<'static, NotifyResult<()>> {
        self.deliver("question")
    }

    fn notify_voting(&self, _snapshot: &VotingSnapshot) -> BoxFuture<'static, NotifyResult<()>> {
        self.deliver("voting")
    }

    fn notify_reveal(&self, _snapshot: &RevealSnapshot) -> BoxFuture<'static, NotifyResult<()>> {
        self.deliver("reveal_role")
    }

    fn notify_scoring(&self, _snapshot: &ScoreSnapshot) -> BoxFuture<'static, NotifyResult<()>> {
        self.deliver("scoring")
    }

    fn notify_winner(&self, _snapshot: &WinnerSnapshot) -> BoxFuture<'static, NotifyResult<()>> {
        self.deliver("winner")
    }
}

impl MessagePublisher for FakeNotifier {
    fn publish(
        &self,
        player_id: PlayerId,
        message: Vec<u8>,
    ) -> BoxFuture<'static, NotifyResult<()>> {
        self.published.lock().unwrap().push((player_id, message));
        self.deliver("message")
    }
}

/// Phase handed to [`RecordingLauncher`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct StartedPhase {
    pub game_state_id: GameStateId,
    pub phase: GamePhase,
    pub next_round: bool,
}

/// Launcher that records requested phases instead of running them.
#[derive(Default)]
pub(crate) struct RecordingLauncher {
    started: Mutex<Vec<StartedPhase>>,
}

impl RecordingLauncher {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn started(&self) -> Vec<StartedPhase> {
        self.started.lock().unwrap().clone()
    }
}

impl PhaseLauncher for RecordingLauncher {
    fn start(&self, game_state_id: GameStateId, phase: Phase) {
        self.started.lock().unwrap().push(StartedPhase {
            game_state_id,
            phase: phase.kind(),
            next_round: phase.next_round(),
        });
    }
}

/// Fakes wired into a dependency bundle; also acts as the dependency factory.
pub(crate) struct Harness {
    pub store: Arc<FakeStore>,
    pub notifier: Arc<FakeNotifier>,
    pub launcher: Arc<RecordingLauncher>,
    pub metrics: Arc<Metrics>,
    pub deps: Arc<StateDependencies>,
    dependencies_fail: AtomicBool,
}

impl Harness {
    /// Harness whose phases all last zero seconds.
    pub(crate) fn new() -> Self {
        Self::with_timings(Duration::ZERO)
    }

    /// Harness whose phases all last `duration`.
    pub(crate) fn with_timings(duration: Duration) -> Self {
        let store = Arc::new(FakeStore::default());
        let notifier = Arc::new(FakeNotifier::default());
        let launcher = RecordingLauncher::new();
        let metrics = Arc::new(Metrics::new());
        let deps = StateDependencies::builder()
            .store(store.clone())
            .notifier(notifier.clone())
            .launcher(launcher.clone())
            .metrics(metrics.clone())
            .timings(uniform_timings(duration))
            .build()
            .unwrap();
        Self {
            store,
            notifier,
            launcher,
            metrics,
            deps,
            dependencies_fail: AtomicBool::new(false),
        }
    }

    pub(crate) fn started(&self) -> Vec<StartedPhase> {
        self.launcher.started()
    }

    pub(crate) fn fail_dependencies(&self) {
        self.dependencies_fail.store(true, Ordering::SeqCst);
    }
}

impl DependencyFactory for Harness {
    fn new_state_dependencies(&self) -> Result<Arc<StateDependencies>, DependencyError> {
        if self.dependencies_fail.load(Ordering::SeqCst) {
            return Err(DependencyError::Missing("client notifier"));
        }
        Ok(self.deps.clone())
    }
}

pub(crate) fn uniform_timings(duration: Duration) -> Timings {
    Timings {
        show_question_screen_for: duration,
        show_voting_screen_for: duration,
        show_reveal_screen_for: duration,
        show_score_screen_for: duration,
        show_winner_screen_for: duration,
    }
}
