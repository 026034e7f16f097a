//! HTTP server: router assembly, background tasks and graceful shutdown.

pub mod api;
pub mod middleware;
pub mod state;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::SystemTime;

use anyhow::{Context, Result};
use axum::extract::DefaultBodyLimit;
use axum::http::{header, Method};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tracing::{debug, info};

pub use state::AppState;

/// Run the HTTP server until Ctrl+C or SIGTERM.
pub async fn run_server(state: AppState) -> Result<()> {
    let addr = state.config.listen_addr()?;
    let state = Arc::new(state);

    let sweeper = spawn_admission_sweeper(Arc::clone(&state));
    let app = build_router(Arc::clone(&state));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;

    info!(
        %addr,
        rate_limit = state.config.rate_limit,
        window_secs = state.config.rate_limit_window_secs,
        max_request_size_mb = state.config.max_request_size_mb,
        request_timeout_secs = state.config.request_timeout_secs,
        catalog_configured = state.catalog_configured(),
        "lineagekit listening"
    );

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("Server error")?;

    sweeper.abort();
    info!("lineagekit stopped");

    Ok(())
}

/// Build the main router with all routes and middleware.
///
/// Layers run outermost first: CORS, timing and access log, admission,
/// then the declared and streamed body limits.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    let body_limit = state.config.max_request_bytes();

    Router::new()
        .merge(api::root_routes())
        .nest("/api/v1", api::api_routes())
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(axum::middleware::from_fn_with_state(
            Arc::clone(&state),
            middleware::body_size_middleware,
        ))
        .layer(axum::middleware::from_fn_with_state(
            Arc::clone(&state),
            middleware::admission_middleware,
        ))
        .layer(axum::middleware::from_fn(middleware::process_time_middleware))
        .layer(cors)
        .with_state(state)
}

/// Prunes idle admission records once per window.
fn spawn_admission_sweeper(state: Arc<AppState>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(state.admission.window());
        interval.tick().await;
        loop {
            interval.tick().await;
            let removed = state.admission.sweep(SystemTime::now());
            debug!(
                removed,
                tracked = state.admission.tracked_identities(),
                "swept admission records"
            );
        }
    })
}

/// Wait for Ctrl+C or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    info!("shutdown signal received");
}
