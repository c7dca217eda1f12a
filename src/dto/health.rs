use serde::Serialize;
use utoipa::ToSchema;

/// Health response returned by the `/healthcheck` route.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Health status, always "ok" while the process serves requests.
    pub status: String,
    /// Phase drivers currently running.
    pub live_drivers: u64,
    /// Whether a recovery pass is running.
    pub recovery_in_progress: bool,
}

impl HealthResponse {
    /// Create a health response indicating the system is operational.
    pub fn ok(live_drivers: u64, recovery_in_progress: bool) -> Self {
        Self {
            status: "ok".to_string(),
            live_drivers,
            recovery_in_progress,
        }
    }
}
