pub mod drivers;
pub mod game;
pub mod phases;

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::{
    config::AppConfig,
    dao::memory::InMemoryRoundStore,
    metrics::Metrics,
    services::{notifier::BroadcastNotifier, recovery_service::RecoveryManager},
    state::{
        drivers::DriverManager,
        phases::{DependencyError, DependencyFactory, StateDependencies},
    },
};

/// Cheaply clonable handle to the application state.
pub type SharedState = Arc<AppState>;

/// Events buffered per event-stream subscriber.
const NOTIFIER_CAPACITY: usize = 256;

/// Assembles a fresh [`StateDependencies`] bundle for every new driver chain.
struct ChainFactory {
    store: Arc<InMemoryRoundStore>,
    notifier: Arc<BroadcastNotifier>,
    drivers: Arc<DriverManager>,
    metrics: Arc<Metrics>,
    config: AppConfig,
}

impl DependencyFactory for ChainFactory {
    fn new_state_dependencies(&self) -> Result<Arc<StateDependencies>, DependencyError> {
        StateDependencies::builder()
            .store(self.store.clone())
            .notifier(self.notifier.clone())
            .launcher(self.drivers.clone())
            .metrics(self.metrics.clone())
            .timings(self.config.timings)
            .scoring(self.config.scoring)
            .build()
    }
}

/// Central application state owning the store, notifier, driver registry and recovery manager.
pub struct AppState {
    config: AppConfig,
    metrics: Arc<Metrics>,
    store: Arc<InMemoryRoundStore>,
    notifier: Arc<BroadcastNotifier>,
    drivers: Arc<DriverManager>,
    factory: Arc<ChainFactory>,
    recovery: RecoveryManager,
    shutdown: CancellationToken,
}

impl AppState {
    /// Construct a new [`AppState`] backed by an empty in-memory store.
    pub fn new(config: AppConfig) -> SharedState {
        Self::with_store(config, Arc::new(InMemoryRoundStore::new()))
    }

    /// Construct a new [`AppState`] around an existing store.
    pub fn with_store(config: AppConfig, store: Arc<InMemoryRoundStore>) -> SharedState {
        let shutdown = CancellationToken::new();
        let metrics = Arc::new(Metrics::new());
        let notifier = Arc::new(BroadcastNotifier::new(NOTIFIER_CAPACITY));
        let drivers = Arc::new(DriverManager::new(shutdown.clone(), metrics.clone()));
        let factory = Arc::new(ChainFactory {
            store: store.clone(),
            notifier: notifier.clone(),
            drivers: drivers.clone(),
            metrics: metrics.clone(),
            config: config.clone(),
        });
        let recovery = RecoveryManager::new(
            store.clone(),
            notifier.clone(),
            factory.clone(),
            metrics.clone(),
        );

        Arc::new(Self {
            config,
            metrics,
            store,
            notifier,
            drivers,
            factory,
            recovery,
            shutdown,
        })
    }

    /// Runtime configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Process-wide metrics registry.
    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    /// Round store shared by every driver.
    pub fn store(&self) -> &Arc<InMemoryRoundStore> {
        &self.store
    }

    /// Notifier fanning phase events out to connected players.
    pub fn notifier(&self) -> &BroadcastNotifier {
        &self.notifier
    }

    /// Registry of running phase drivers.
    pub fn drivers(&self) -> &DriverManager {
        &self.drivers
    }

    /// Recovery manager used at startup and through the ops routes.
    pub fn recovery(&self) -> &RecoveryManager {
        &self.recovery
    }

    /// Token cancelled once shutdown starts; every driver token descends from it.
    pub fn shutdown_token(&self) -> &CancellationToken {
        &self.shutdown
    }

    /// Fresh dependencies for a new driver chain.
    pub fn new_state_dependencies(&self) -> Result<Arc<StateDependencies>, DependencyError> {
        self.factory.new_state_dependencies()
    }
}
