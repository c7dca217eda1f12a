//! Registry of running phase drivers, one authoritative driver per game.

use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use dashmap::{DashMap, mapref::entry::Entry};
use tokio_util::{sync::CancellationToken, task::TaskTracker};
use tracing::{Instrument, Span, debug, error, info};

use crate::{
    metrics::{self, Metrics},
    state::{
        game::GameStateId,
        phases::{Phase, PhaseLauncher},
    },
};

struct DriverEntry {
    token: CancellationToken,
    generation: u64,
}

/// Runs phase drivers on their own tasks.
///
/// Every `start` takes a new global generation and cancels the driver it supersedes before the new
/// one is registered, all under the map entry lock for that game. A finishing task only removes
/// the registry entry when it still carries its own generation.
pub struct DriverManager {
    drivers: Arc<DashMap<GameStateId, DriverEntry>>,
    generation: AtomicU64,
    live: Arc<AtomicU64>,
    tracker: TaskTracker,
    shutdown: CancellationToken,
    metrics: Arc<Metrics>,
}

impl DriverManager {
    /// Create a manager whose driver tokens all descend from `shutdown`.
    pub fn new(shutdown: CancellationToken, metrics: Arc<Metrics>) -> Self {
        Self {
            drivers: Arc::new(DashMap::new()),
            generation: AtomicU64::new(0),
            live: Arc::new(AtomicU64::new(0)),
            tracker: TaskTracker::new(),
            shutdown,
            metrics,
        }
    }

    /// Run `phase` for `game_state_id`, cancelling any driver already running for the game.
    pub fn start(&self, game_state_id: GameStateId, phase: Phase) {
        let token = self.shutdown.child_token();
        let generation = match self.drivers.entry(game_state_id) {
            Entry::Occupied(mut occupied) => {
                let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
                let previous = occupied.get();
                debug!(
                    game_state_id = %game_state_id,
                    old_generation = previous.generation,
                    new_generation = generation,
                    "cancelling existing driver before starting new one"
                );
                previous.token.cancel();
                occupied.insert(DriverEntry {
                    token: token.clone(),
                    generation,
                });
                generation
            }
            Entry::Vacant(vacant) => {
                let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
                vacant.insert(DriverEntry {
                    token: token.clone(),
                    generation,
                });
                generation
            }
        };

        let kind = phase.kind();
        let span = tracing::info_span!(
            "phase_driver",
            game_state_id = %game_state_id,
            phase = %kind,
            generation,
        );
        span.follows_from(Span::current());

        self.live.fetch_add(1, Ordering::SeqCst);
        self.metrics.add_gauge(metrics::DRIVERS_LIVE, 1);
        self.metrics
            .incr(metrics::DRIVERS_STARTED, &[("phase", kind.as_str())]);

        let drivers = self.drivers.clone();
        let live = self.live.clone();
        let metrics = self.metrics.clone();
        self.tracker.spawn(
            async move {
                if let Err(err) = phase.run(token).await {
                    error!(error = %err, "phase driver failed");
                }
                drivers.remove_if(&game_state_id, |_, entry| entry.generation == generation);
                live.fetch_sub(1, Ordering::SeqCst);
                metrics.add_gauge(metrics::DRIVERS_LIVE, -1);
            }
            .instrument(span),
        );
    }

    /// Cancel and forget the driver of one game. Idempotent.
    pub fn stop(&self, game_state_id: GameStateId) -> bool {
        match self.drivers.remove(&game_state_id) {
            Some((_, entry)) => {
                debug!(game_state_id = %game_state_id, generation = entry.generation, "stopping driver");
                entry.token.cancel();
                true
            }
            None => false,
        }
    }

    /// Cancel every registered driver and clear the registry.
    pub fn cancel_all(&self) {
        info!("cancelling all active phase drivers");
        let mut count = 0usize;
        self.drivers.retain(|game_state_id, entry| {
            debug!(game_state_id = %game_state_id, "cancelling phase driver");
            entry.token.cancel();
            count += 1;
            false
        });
        info!(count, "cancelled all active phase drivers");
    }

    /// Wait for every spawned driver task to exit; `false` when `timeout` elapsed first.
    ///
    /// Single caller only: the tracker is reopened when this returns, which strands any other
    /// waiter until its own timeout.
    pub async fn wait(&self, timeout: Duration) -> bool {
        info!(timeout_ms = timeout.as_millis() as u64, "waiting for phase drivers to finish");
        self.tracker.close();
        let drained = tokio::time::timeout(timeout, self.tracker.wait())
            .await
            .is_ok();
        self.tracker.reopen();
        drained
    }

    /// Number of driver tasks still running, superseded ones included until they exit.
    pub fn live_count(&self) -> u64 {
        self.live.load(Ordering::SeqCst)
    }

    /// Generation of the authoritative driver of a game.
    pub fn active_generation(&self, game_state_id: GameStateId) -> Option<u64> {
        self.drivers
            .get(&game_state_id)
            .map(|entry| entry.generation)
    }

    /// Number of games with a registered driver.
    pub fn active_len(&self) -> usize {
        self.drivers.len()
    }
}

impl PhaseLauncher for DriverManager {
    fn start(&self, game_state_id: GameStateId, phase: Phase) {
        DriverManager::start(self, game_state_id, phase);
    }
}
