use serde::Serialize;
use utoipa::ToSchema;

use crate::services::recovery_service::RecoverySummary;

#[derive(Debug, Serialize, ToSchema)]
/// Cumulative recovery counters returned by `GET /recovery`.
pub struct RecoveryStatsResponse {
    /// Games re-attached since startup.
    pub recovered: u64,
    /// Games that exhausted their retries since startup.
    pub failed: u64,
    /// Whether a pass is running right now.
    pub in_progress: bool,
}

#[derive(Debug, Serialize, ToSchema)]
/// Outcome of a recovery pass triggered through `POST /recovery`.
pub struct RecoverySummaryResponse {
    /// Live games found.
    pub total: usize,
    /// Games locked and handed to a recovery task.
    pub dispatched: usize,
    /// Games skipped because another process holds their lock.
    pub skipped: usize,
    /// Cumulative recovered counter when the pass returned.
    pub recovered: u64,
    /// Cumulative failed counter when the pass returned.
    pub failed: u64,
}

impl From<RecoverySummary> for RecoverySummaryResponse {
    fn from(summary: RecoverySummary) -> Self {
        Self {
            total: summary.total,
            dispatched: summary.dispatched,
            skipped: summary.skipped,
            recovered: summary.recovered,
            failed: summary.failed,
        }
    }
}
