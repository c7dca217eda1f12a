/// OpenAPI documentation generation.
pub mod documentation;
/// Operator control over running phase drivers.
pub mod driver_service;
/// Health check service.
pub mod health_service;
/// Player notification capabilities.
pub mod notifier;
/// Startup and on-demand game recovery.
pub mod recovery_service;
/// Server-Sent Events forwarding of phase events.
pub mod sse_service;
