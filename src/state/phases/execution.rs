use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use time::OffsetDateTime;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::{
    dao::round_store::RoundError,
    metrics::{self, Metrics},
    services::notifier::NotifyError,
    state::{
        game::{GamePhase, GameStateId},
        phases::{PhaseError, StateDependencies},
    },
};

/// Bookkeeping shared by every phase driver: logging, error classification and duration metrics.
///
/// The phase duration is recorded when the value is dropped, whichever way the driver exits.
pub(super) struct PhaseExecution {
    phase: GamePhase,
    game_state_id: GameStateId,
    metrics: Arc<Metrics>,
    started: Instant,
}

impl PhaseExecution {
    pub(super) fn start(
        phase: GamePhase,
        game_state_id: GameStateId,
        deps: &StateDependencies,
    ) -> Self {
        debug!(
            configured_duration_ms = deps.timings.for_phase(phase).as_millis() as u64,
            "{phase} phase starting"
        );
        Self {
            phase,
            game_state_id,
            metrics: deps.metrics.clone(),
            started: Instant::now(),
        }
    }

    /// Notification failures never stop the driver.
    pub(super) fn record_client_update_error(&self, err: &NotifyError) {
        error!(
            error = %err,
            game_state_id = %self.game_state_id,
            "failed to update clients to {} screen",
            self.phase
        );
        self.metrics.incr(
            metrics::PHASE_CLIENT_UPDATE_ERRORS,
            &[("phase", self.phase.as_str())],
        );
    }

    /// Count a failed store operation without failing the driver.
    pub(super) fn record_state_update_error(&self, err: &RoundError, operation: &'static str) {
        error!(
            error = %err,
            operation,
            game_state_id = %self.game_state_id,
            "failed to update game state"
        );
        self.metrics.incr(
            metrics::PHASE_STATE_UPDATE_ERRORS,
            &[("phase", self.phase.as_str()), ("operation", operation)],
        );
    }

    /// Classify a refused store call: a race stops the driver quietly, anything else is counted
    /// and reported to the driver manager.
    pub(super) fn transition_failed(
        &self,
        err: RoundError,
        operation: &'static str,
    ) -> Result<(), PhaseError> {
        if err.is_race() {
            warn!(
                error = %err,
                operation,
                game_state_id = %self.game_state_id,
                "state transition race detected, game already transitioned"
            );
            return Ok(());
        }

        self.metrics.incr(
            metrics::PHASE_STATE_UPDATE_ERRORS,
            &[("phase", self.phase.as_str()), ("operation", operation)],
        );
        Err(PhaseError::Transition {
            phase: self.phase,
            operation,
            source: err,
        })
    }

    pub(super) fn add_transition(&self, next: GamePhase, reason: &str) {
        info!(
            next_phase = %next,
            reason,
            game_state_id = %self.game_state_id,
            "{} phase transitioning",
            self.phase
        );
    }

    pub(super) fn cancelled(&self) {
        info!(game_state_id = %self.game_state_id, "{} phase cancelled", self.phase);
    }
}

impl Drop for PhaseExecution {
    fn drop(&mut self) {
        self.metrics.record_duration(
            metrics::PHASE_DURATION,
            &[("phase", self.phase.as_str())],
            self.started.elapsed(),
        );
    }
}

/// Sleep until `deadline`; `false` when `cancel` fired first.
pub(super) async fn wait_for_deadline(deadline: OffsetDateTime, cancel: &CancellationToken) -> bool {
    let remaining = Duration::try_from(deadline - OffsetDateTime::now_utc()).unwrap_or_default();
    tokio::select! {
        biased;
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(remaining) => true,
    }
}
