use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for the fibbing rounds phase server.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::recovery::recovery_stats,
        crate::routes::recovery::trigger_recovery,
        crate::routes::games::advance_game,
        crate::routes::games::stop_driver,
        crate::routes::metrics::metrics,
        crate::routes::sse::event_stream,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::recovery::RecoveryStatsResponse,
            crate::dto::recovery::RecoverySummaryResponse,
            crate::dto::games::AdvanceRequest,
            crate::dto::games::DriverStartedResponse,
            crate::dto::metrics::MetricsSnapshot,
            crate::dto::metrics::DurationSummary,
            crate::dto::events::QuestionEvent,
            crate::dto::events::VotingEvent,
            crate::dto::events::RevealEvent,
            crate::dto::events::ScoreEvent,
            crate::dto::events::WinnerEvent,
            crate::dto::events::RecoveryNotice,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "recovery", description = "Game recovery after restarts"),
        (name = "games", description = "Phase driver control for live games"),
        (name = "metrics", description = "In-process metrics"),
        (name = "sse", description = "Server-sent events streams"),
    )
)]
pub struct ApiDoc;
