//! Fibbing rounds phase server entrypoint: recovers live games, serves the ops API and drains
//! phase drivers on shutdown.

use std::{env, net::SocketAddr};

use anyhow::Context;
use axum::Router;
use fibbing_rounds::{
    config::AppConfig,
    routes,
    services::driver_service,
    state::{AppState, SharedState},
};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let app_state = AppState::new(AppConfig::load());

    let demo_games = app_state.config().demo_games;
    if demo_games > 0 {
        driver_service::seed_demo_games(&app_state, demo_games)
            .await
            .context("seeding demo games")?;
    }

    // Re-attach drivers before accepting requests so no live game sits without one.
    match app_state.recovery().recover_active_games().await {
        Ok(summary) => info!(
            total = summary.total,
            dispatched = summary.dispatched,
            skipped = summary.skipped,
            "startup recovery dispatched"
        ),
        Err(err) => warn!(error = %err, "startup recovery failed"),
    }

    let app = build_router(app_state.clone());

    let port = env::var("PORT")
        .or_else(|_| env::var("SERVER_PORT"))
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    let service = app.into_make_service();
    axum::serve(listener, service)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    drain_drivers(&app_state).await;
    Ok(())
}

/// Cancel every phase driver and wait for them to exit, bounded by the configured timeout.
async fn drain_drivers(state: &SharedState) {
    let timeout = state.config().shutdown_timeout;
    info!(timeout_ms = timeout.as_millis() as u64, "shutting down phase drivers");

    state.shutdown_token().cancel();
    state.drivers().cancel_all();

    if !state.recovery().wait_for_pending(timeout).await {
        warn!("recovery tasks still running at shutdown");
    }
    if state.drivers().wait(timeout).await {
        info!("all phase drivers stopped");
    } else {
        warn!(
            live = state.drivers().live_count(),
            "forced shutdown: phase drivers did not stop in time"
        );
    }
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: SharedState) -> Router<()> {
    routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM and shut the server down gracefully.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = term.recv() => {},
                }
            }
            Err(err) => {
                warn!(error = %err, "failed to install SIGTERM handler; waiting for Ctrl+C only");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
