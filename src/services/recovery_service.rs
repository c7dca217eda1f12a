//! Re-attaches phase drivers to live games after a restart.

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
    time::Duration,
};

use thiserror::Error;
use time::OffsetDateTime;
use tokio_util::task::TaskTracker;
use tracing::{Instrument, debug, error, info, warn};

use crate::{
    dao::{
        models::ActiveGame,
        round_store::{RecoveryStore, RoundError},
        storage::StorageError,
    },
    dto::{events::RecoveryNotice, recovery::RecoveryStatsResponse},
    error::ServiceError,
    metrics::{self, Metrics},
    services::notifier::MessagePublisher,
    state::{
        SharedState,
        game::{GamePhase, MAX_ROUNDS, RoomId, RoundType, UnknownPhase},
        phases::{DependencyError, DependencyFactory, Phase, StateDependencies},
    },
};

/// Attempts per game before it is counted as failed.
const MAX_ATTEMPTS: u32 = 3;
/// Delay after the first failed attempt; grows linearly with every further failure.
const RETRY_DELAY: Duration = Duration::from_millis(500);

/// Failures surfaced by a recovery pass or a single game's recovery attempt.
#[derive(Debug, Error)]
pub enum RecoveryError {
    /// Another pass is already running in this process.
    #[error("recovery already in progress")]
    AlreadyInProgress,
    /// Live games could not be listed.
    #[error("failed to list active games")]
    ListActiveGames(#[source] StorageError),
    /// The persisted phase name is not a phase this server knows.
    #[error(transparent)]
    UnknownPhase(#[from] UnknownPhase),
    /// A dependency bundle could not be built.
    #[error("failed to create state dependencies")]
    Dependencies(#[from] DependencyError),
    /// An overdue transition was refused.
    #[error("failed to {operation} during recovery")]
    Transition {
        /// Store operation that failed.
        operation: &'static str,
        /// Underlying store error.
        #[source]
        source: RoundError,
    },
    /// The recovery lock could not be queried.
    #[error("failed to acquire recovery lock")]
    Lock(#[source] StorageError),
}

/// Outcome of one recovery pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RecoverySummary {
    /// Live games listed.
    pub total: usize,
    /// Games locked and handed to a recovery task.
    pub dispatched: usize,
    /// Games skipped because the lock was held elsewhere or could not be queried.
    pub skipped: usize,
    /// Cumulative recovered counter when the pass returned.
    pub recovered: u64,
    /// Cumulative failed counter when the pass returned.
    pub failed: u64,
}

struct Counters {
    in_progress: AtomicBool,
    recovered: AtomicU64,
    failed: AtomicU64,
}

/// Lists live games, locks each one, and restarts its driver at the right phase.
pub struct RecoveryManager {
    store: Arc<dyn RecoveryStore>,
    publisher: Arc<dyn MessagePublisher>,
    factory: Arc<dyn DependencyFactory>,
    metrics: Arc<Metrics>,
    counters: Arc<Counters>,
    tasks: TaskTracker,
}

impl RecoveryManager {
    /// Create a manager over the given collaborators.
    pub fn new(
        store: Arc<dyn RecoveryStore>,
        publisher: Arc<dyn MessagePublisher>,
        factory: Arc<dyn DependencyFactory>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            store,
            publisher,
            factory,
            metrics,
            counters: Arc::new(Counters {
                in_progress: AtomicBool::new(false),
                recovered: AtomicU64::new(0),
                failed: AtomicU64::new(0),
            }),
            tasks: TaskTracker::new(),
        }
    }

    /// Run one recovery pass.
    ///
    /// Each locked game is recovered on its own task with retries, so the summary carries the
    /// cumulative counters as they stood when every game had been dispatched.
    pub async fn recover_active_games(&self) -> Result<RecoverySummary, RecoveryError> {
        if self
            .counters
            .in_progress
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            warn!("recovery already in progress, skipping");
            return Err(RecoveryError::AlreadyInProgress);
        }
        let _guard = InProgressGuard(&self.counters.in_progress);

        info!("starting game recovery");
        let games = self
            .store
            .list_active_games()
            .await
            .map_err(RecoveryError::ListActiveGames)?;

        let mut summary = RecoverySummary {
            total: games.len(),
            ..RecoverySummary::default()
        };
        if games.is_empty() {
            info!("no active games found to recover");
            return Ok(self.finish_summary(summary));
        }
        info!(count = games.len(), "found active games to recover");

        for game in games {
            let id = game.game_state_id;
            match self.store.try_acquire_game_lock(id).await {
                Ok(true) => {}
                Ok(false) => {
                    debug!(game_state_id = %id, "skipping game, another server owns it");
                    summary.skipped += 1;
                    continue;
                }
                Err(err) => {
                    let err = RecoveryError::Lock(err);
                    warn!(game_state_id = %id, error = %err, "skipping game");
                    summary.skipped += 1;
                    continue;
                }
            }

            info!(
                game_state_id = %id,
                phase = %game.phase,
                room_code = %game.room_code,
                "acquired lock for game, starting recovery"
            );
            summary.dispatched += 1;
            let attempt = GameRecovery {
                store: self.store.clone(),
                publisher: self.publisher.clone(),
                factory: self.factory.clone(),
                counters: self.counters.clone(),
            };
            let span = tracing::info_span!("recover_game", game_state_id = %id);
            self.tasks.spawn(attempt.run_with_retry(game).instrument(span));
        }

        Ok(self.finish_summary(summary))
    }

    fn finish_summary(&self, mut summary: RecoverySummary) -> RecoverySummary {
        let (recovered, failed) = self.recovery_stats();
        summary.recovered = recovered;
        summary.failed = failed;
        self.metrics
            .set_gauge(metrics::RECOVERY_GAMES_RECOVERED, recovered as i64);
        self.metrics
            .set_gauge(metrics::RECOVERY_GAMES_FAILED, failed as i64);
        info!(
            recovered,
            failed,
            skipped = summary.skipped,
            dispatched = summary.dispatched,
            total = summary.total,
            "game recovery pass completed"
        );
        summary
    }

    /// Whether a pass is running.
    pub fn is_recovery_in_progress(&self) -> bool {
        self.counters.in_progress.load(Ordering::SeqCst)
    }

    /// Cumulative `(recovered, failed)` game counts.
    pub fn recovery_stats(&self) -> (u64, u64) {
        (
            self.counters.recovered.load(Ordering::SeqCst),
            self.counters.failed.load(Ordering::SeqCst),
        )
    }

    /// Wait for dispatched recovery tasks; `false` when `timeout` elapsed first.
    ///
    /// Single caller only: the tracker is reopened when this returns, which strands any other
    /// waiter until its own timeout.
    pub async fn wait_for_pending(&self, timeout: Duration) -> bool {
        self.tasks.close();
        let drained = tokio::time::timeout(timeout, self.tasks.wait())
            .await
            .is_ok();
        self.tasks.reopen();
        drained
    }
}

struct InProgressGuard<'a>(&'a AtomicBool);

impl Drop for InProgressGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Everything a spawned per-game recovery task needs.
struct GameRecovery {
    store: Arc<dyn RecoveryStore>,
    publisher: Arc<dyn MessagePublisher>,
    factory: Arc<dyn DependencyFactory>,
    counters: Arc<Counters>,
}

impl GameRecovery {
    async fn run_with_retry(self, game: ActiveGame) {
        let id = game.game_state_id;
        let mut last_error = None;
        for attempt in 1..=MAX_ATTEMPTS {
            if attempt > 1 {
                info!(attempt, max_attempts = MAX_ATTEMPTS, "retrying game recovery");
                tokio::time::sleep(RETRY_DELAY * (attempt - 1)).await;
            }

            match self.recover_game(&game).await {
                Ok(()) => {
                    self.counters.recovered.fetch_add(1, Ordering::SeqCst);
                    last_error = None;
                    break;
                }
                Err(err) => {
                    warn!(attempt, error = %err, "game recovery attempt failed");
                    last_error = Some(err);
                }
            }
        }

        if let Some(err) = last_error {
            self.counters.failed.fetch_add(1, Ordering::SeqCst);
            error!(
                room_code = %game.room_code,
                phase = %game.phase,
                error = %err,
                "game recovery failed after all retries"
            );
        }

        if let Err(err) = self.store.release_game_lock(id).await {
            warn!(error = %err, "failed to release game lock");
        }
    }

    async fn recover_game(&self, game: &ActiveGame) -> Result<(), RecoveryError> {
        let id = game.game_state_id;
        let deps = self.factory.new_state_dependencies()?;
        let phase: GamePhase = game.phase.parse()?;
        let overdue = game.submit_deadline <= OffsetDateTime::now_utc();
        info!(phase = %phase, deadline = %game.submit_deadline, overdue, "recovering game");

        if overdue {
            let successor = match phase {
                GamePhase::Question => {
                    transition(
                        "transition_to_voting",
                        deps.store
                            .transition_to_voting(id, deps.deadline_for(GamePhase::Voting))
                            .await,
                    )?;
                    Some(Phase::voting(id, deps.clone()))
                }
                GamePhase::Voting => {
                    transition(
                        "transition_to_reveal",
                        deps.store
                            .transition_to_reveal(id, deps.deadline_for(GamePhase::RevealRole))
                            .await,
                    )?;
                    Some(Phase::reveal(id, deps.clone()))
                }
                GamePhase::RevealRole => {
                    transition(
                        "transition_to_scoring",
                        deps.store
                            .transition_to_scoring(
                                id,
                                deps.deadline_for(GamePhase::Scoring),
                                deps.scoring,
                            )
                            .await,
                    )?;
                    Some(Phase::scoring(id, deps.clone()))
                }
                GamePhase::Scoring => Some(after_overdue_scoring(&deps, game).await?),
                GamePhase::Winner => None,
            };
            if let Some(successor) = successor {
                info!(next_phase = %successor.kind(), "deadline passed, advanced game");
                deps.launcher.start(id, successor);
                return Ok(());
            }
        }

        if let Err(err) = notify_players(self.store.as_ref(), self.publisher.as_ref(), game.room_id).await {
            warn!(error = %err, "failed to notify players of recovery (non-fatal)");
        }
        info!(phase = %phase, "starting recovered phase driver");
        deps.launcher.start(id, Phase::resume(phase, id, deps.clone()));
        Ok(())
    }
}

/// An overdue scoring screen ends the game after the last round or a most-likely round, and
/// starts the next round type otherwise.
pub fn should_end_game(total_rounds: u32, round_type: RoundType) -> bool {
    total_rounds >= MAX_ROUNDS || round_type == RoundType::MostLikely
}

async fn after_overdue_scoring(
    deps: &Arc<StateDependencies>,
    game: &ActiveGame,
) -> Result<Phase, RecoveryError> {
    let id = game.game_state_id;
    let score = transition(
        "transition_to_scoring",
        deps.store
            .transition_to_scoring(id, deps.deadline_for(GamePhase::Scoring), deps.scoring)
            .await,
    )?;

    let end_game = should_end_game(score.total_rounds, score.round_type);
    info!(
        round_number = score.round_number,
        total_rounds = score.total_rounds,
        round_type = %score.round_type,
        end_game,
        "scoring recovery decision"
    );

    if end_game {
        transition(
            "transition_to_winner",
            deps.store
                .transition_to_winner(id, deps.deadline_for(GamePhase::Winner))
                .await,
        )?;
        Ok(Phase::winner(id, deps.clone()))
    } else {
        transition(
            "transition_to_question",
            deps.store
                .transition_to_question(id, deps.deadline_for(GamePhase::Question), true)
                .await,
        )?;
        Ok(Phase::question(id, true, deps.clone()))
    }
}

fn transition<T>(operation: &'static str, result: Result<T, RoundError>) -> Result<T, RecoveryError> {
    result.map_err(|source| RecoveryError::Transition { operation, source })
}

#[derive(Debug, Error)]
enum NotifyRecoveryError {
    #[error("failed to list players in room")]
    ListPlayers(#[source] StorageError),
    #[error("failed to encode recovery notice")]
    Encode(#[source] serde_json::Error),
}

async fn notify_players(
    store: &dyn RecoveryStore,
    publisher: &dyn MessagePublisher,
    room_id: RoomId,
) -> Result<(), NotifyRecoveryError> {
    let players = store
        .list_players_in_room(room_id)
        .await
        .map_err(NotifyRecoveryError::ListPlayers)?;
    let message =
        serde_json::to_vec(&RecoveryNotice::game_recovered()).map_err(NotifyRecoveryError::Encode)?;

    for player in players {
        if let Err(err) = publisher.publish(player.player_id, message.clone()).await {
            warn!(player_id = %player.player_id, error = %err, "failed to publish recovery message");
        }
    }
    Ok(())
}

/// Run a recovery pass on behalf of an operator.
pub async fn trigger_recovery(state: &SharedState) -> Result<RecoverySummary, ServiceError> {
    Ok(state.recovery().recover_active_games().await?)
}

/// Cumulative recovery counters of this process.
pub fn recovery_status(state: &SharedState) -> RecoveryStatsResponse {
    let (recovered, failed) = state.recovery().recovery_stats();
    RecoveryStatsResponse {
        recovered,
        failed,
        in_progress: state.recovery().is_recovery_in_progress(),
    }
}
