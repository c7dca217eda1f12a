//! Timed phase drivers for a running game.
//!
//! Each phase runs the same protocol on its own task: persist the transition with a fresh
//! deadline, notify the players, wait for the deadline (or cancellation), then hand the successor
//! phase to the [`PhaseLauncher`]. The persisted phase is the source of truth; drivers never retry a
//! refused transition.

use std::sync::Arc;

use thiserror::Error;
use time::OffsetDateTime;
use tokio_util::sync::CancellationToken;

use crate::{
    dao::round_store::{RoundError, RoundStore},
    metrics::Metrics,
    services::notifier::ClientNotifier,
    state::game::{GamePhase, GameStateId, Scoring, Timings},
};

mod execution;
mod question;
mod reveal;
mod scoring;
#[cfg(test)]
pub(crate) mod test_support;
mod voting;
mod winner;

pub use self::question::QuestionPhase;
pub use self::reveal::{RevealPhase, next_phase_after_reveal};
pub use self::scoring::ScoringPhase;
pub use self::voting::VotingPhase;
pub use self::winner::WinnerPhase;

/// Failure a driver reports back to the driver manager.
#[derive(Debug, Error)]
pub enum PhaseError {
    /// A persistence call failed for a reason other than a benign race.
    #[error("{phase} driver failed to {operation}: {source}")]
    Transition {
        /// Phase whose driver failed.
        phase: GamePhase,
        /// Store operation that failed.
        operation: &'static str,
        /// Underlying store error.
        #[source]
        source: RoundError,
    },
}

/// A collaborator was not supplied when assembling [`StateDependencies`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DependencyError {
    /// Named collaborator is missing.
    #[error("state dependencies are missing the {0}")]
    Missing(&'static str),
}

/// Starts phase drivers, superseding whatever already runs for the game.
pub trait PhaseLauncher: Send + Sync {
    /// Fire-and-forget: run `phase` for `game_state_id` on its own task.
    fn start(&self, game_state_id: GameStateId, phase: Phase);
}

/// Builds a fresh dependency bundle for a new driver chain.
pub trait DependencyFactory: Send + Sync {
    /// Assemble dependencies from the current collaborators.
    fn new_state_dependencies(&self) -> Result<Arc<StateDependencies>, DependencyError>;
}

/// Collaborators shared by every phase of one driver chain.
pub struct StateDependencies {
    /// Transactional phase transitions.
    pub store: Arc<dyn RoundStore>,
    /// Player notifications.
    pub notifier: Arc<dyn ClientNotifier>,
    /// Driver manager used to start successor phases.
    pub launcher: Arc<dyn PhaseLauncher>,
    /// Metrics registry.
    pub metrics: Arc<Metrics>,
    /// Phase durations.
    pub timings: Timings,
    /// Points awarded in the scoring phase.
    pub scoring: Scoring,
}

impl StateDependencies {
    /// Start assembling a dependency bundle.
    pub fn builder() -> StateDependenciesBuilder {
        StateDependenciesBuilder::default()
    }

    /// Deadline for entering `phase` now.
    pub fn deadline_for(&self, phase: GamePhase) -> OffsetDateTime {
        OffsetDateTime::now_utc() + self.timings.for_phase(phase)
    }
}

/// Builder for [`StateDependencies`]; every collaborator is mandatory.
#[derive(Default)]
pub struct StateDependenciesBuilder {
    store: Option<Arc<dyn RoundStore>>,
    notifier: Option<Arc<dyn ClientNotifier>>,
    launcher: Option<Arc<dyn PhaseLauncher>>,
    metrics: Option<Arc<Metrics>>,
    timings: Timings,
    scoring: Scoring,
}

impl StateDependenciesBuilder {
    /// Set the round store.
    pub fn store(mut self, store: Arc<dyn RoundStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Set the client notifier.
    pub fn notifier(mut self, notifier: Arc<dyn ClientNotifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Set the launcher used to start successor phases.
    pub fn launcher(mut self, launcher: Arc<dyn PhaseLauncher>) -> Self {
        self.launcher = Some(launcher);
        self
    }

    /// Set the metrics registry.
    pub fn metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Override the default phase durations.
    pub fn timings(mut self, timings: Timings) -> Self {
        self.timings = timings;
        self
    }

    /// Override the default scoring.
    pub fn scoring(mut self, scoring: Scoring) -> Self {
        self.scoring = scoring;
        self
    }

    /// Finish the bundle, failing fast when a collaborator is absent.
    pub fn build(self) -> Result<Arc<StateDependencies>, DependencyError> {
        Ok(Arc::new(StateDependencies {
            store: self.store.ok_or(DependencyError::Missing("round store"))?,
            notifier: self.notifier.ok_or(DependencyError::Missing("client notifier"))?,
            launcher: self.launcher.ok_or(DependencyError::Missing("phase launcher"))?,
            metrics: self.metrics.ok_or(DependencyError::Missing("metrics registry"))?,
            timings: self.timings,
            scoring: self.scoring,
        }))
    }
}

/// One phase driver, ready to run.
pub enum Phase {
    /// Question screen.
    Question(QuestionPhase),
    /// Voting screen.
    Voting(VotingPhase),
    /// Role reveal screen.
    Reveal(RevealPhase),
    /// Scoreboard.
    Scoring(ScoringPhase),
    /// Final winner screen.
    Winner(WinnerPhase),
}

impl Phase {
    /// Question driver; `next_round` starts a new round type.
    pub fn question(game_state_id: GameStateId, next_round: bool, deps: Arc<StateDependencies>) -> Self {
        Phase::Question(QuestionPhase::new(game_state_id, next_round, deps))
    }

    /// Voting driver.
    pub fn voting(game_state_id: GameStateId, deps: Arc<StateDependencies>) -> Self {
        Phase::Voting(VotingPhase::new(game_state_id, deps))
    }

    /// Reveal driver.
    pub fn reveal(game_state_id: GameStateId, deps: Arc<StateDependencies>) -> Self {
        Phase::Reveal(RevealPhase::new(game_state_id, deps))
    }

    /// Scoring driver.
    pub fn scoring(game_state_id: GameStateId, deps: Arc<StateDependencies>) -> Self {
        Phase::Scoring(ScoringPhase::new(game_state_id, deps))
    }

    /// Winner driver.
    pub fn winner(game_state_id: GameStateId, deps: Arc<StateDependencies>) -> Self {
        Phase::Winner(WinnerPhase::new(game_state_id, deps))
    }

    /// Driver matching a persisted phase, resuming a question without starting a new round.
    pub fn resume(kind: GamePhase, game_state_id: GameStateId, deps: Arc<StateDependencies>) -> Self {
        match kind {
            GamePhase::Question => Phase::question(game_state_id, false, deps),
            GamePhase::Voting => Phase::voting(game_state_id, deps),
            GamePhase::RevealRole => Phase::reveal(game_state_id, deps),
            GamePhase::Scoring => Phase::scoring(game_state_id, deps),
            GamePhase::Winner => Phase::winner(game_state_id, deps),
        }
    }

    /// Persisted phase this driver moves the game into.
    pub fn kind(&self) -> GamePhase {
        match self {
            Phase::Question(_) => GamePhase::Question,
            Phase::Voting(_) => GamePhase::Voting,
            Phase::Reveal(_) => GamePhase::RevealRole,
            Phase::Scoring(_) => GamePhase::Scoring,
            Phase::Winner(_) => GamePhase::Winner,
        }
    }

    /// Game this driver belongs to.
    pub fn game_state_id(&self) -> GameStateId {
        match self {
            Phase::Question(phase) => phase.game_state_id(),
            Phase::Voting(phase) => phase.game_state_id(),
            Phase::Reveal(phase) => phase.game_state_id(),
            Phase::Scoring(phase) => phase.game_state_id(),
            Phase::Winner(phase) => phase.game_state_id(),
        }
    }

    /// Whether this is a question driver starting a new round type.
    pub fn next_round(&self) -> bool {
        matches!(self, Phase::Question(phase) if phase.next_round())
    }

    /// Run the driver until its deadline passes or `cancel` fires.
    pub async fn run(self, cancel: CancellationToken) -> Result<(), PhaseError> {
        match self {
            Phase::Question(phase) => phase.run(cancel).await,
            Phase::Voting(phase) => phase.run(cancel).await,
            Phase::Reveal(phase) => phase.run(cancel).await,
            Phase::Scoring(phase) => phase.run(cancel).await,
            Phase::Winner(phase) => phase.run(cancel).await,
        }
    }
}
