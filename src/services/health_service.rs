use crate::{dto::health::HealthResponse, state::SharedState};

/// Report liveness along with the driver and recovery activity of this process.
pub fn health_status(state: &SharedState) -> HealthResponse {
    HealthResponse::ok(
        state.drivers().live_count(),
        state.recovery().is_recovery_in_progress(),
    )
}
