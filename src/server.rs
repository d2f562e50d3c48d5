//! HTTP Server and Per-Request Exposition
//!
//! # Endpoints
//!
//! - `GET /` - HTML landing page with an example scrape link
//! - `GET <metrics_path>?target=<host>` - scrape one BMC and return its metrics
//! - `GET /health` - liveness check, always `OK`
//!
//! # Isolation
//!
//! Every scrape request gets its own Prometheus [`Registry`]. The finished
//! [`TargetScrape`] is registered into it, gathered once, and dropped with
//! the request, so concurrent scrapes of different targets never share a
//! sample.
//!
//! # Shutdown
//!
//! SIGINT or SIGTERM stops the listener; afterwards every cached Redfish
//! session is logged out.

use crate::config::Config;
use crate::error::ExporterError;
use crate::metrics::render;
use crate::orchestrator::{Credentials, SessionPool, TargetOrchestrator, TargetScrape};
use crate::redfish::HttpConnector;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use prometheus::Registry;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, error, info};

pub const MISSING_TARGET_MESSAGE: &str =
    "Error: 'target' parameter is required (e.g. ?target=bmc.example.com)";

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<TargetOrchestrator>,
    pub metrics_path: String,
}

#[derive(Debug, Deserialize)]
pub struct ScrapeParams {
    target: Option<String>,
}

pub async fn start(config: Config) -> anyhow::Result<()> {
    let pool = SessionPool::new(
        Arc::new(HttpConnector::new()),
        Credentials::from(&config.redfish),
    );
    let orchestrator = Arc::new(TargetOrchestrator::new(pool));

    let state = AppState {
        orchestrator: Arc::clone(&orchestrator),
        metrics_path: config.server.metrics_path.clone(),
    };
    let app = router(state);

    let addr = &config.server.listen_address;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ExporterError::Server(format!("failed to bind {}: {}", addr, e)))?;

    info!("Metrics server listening on {}", addr);
    info!(
        "Metrics available at http://{}{}?target=<bmc>",
        addr, config.server.metrics_path
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(ExporterError::Io)?;

    info!("Closing Redfish sessions");
    orchestrator.close().await;

    Ok(())
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route(&state.metrics_path, get(metrics_handler))
        .route("/health", get(health_handler))
        .with_state(state)
}

/// Drop a scheme the caller may have included with the hostname
pub fn normalize_target(target: &str) -> &str {
    let target = target.trim();
    target
        .strip_prefix("https://")
        .or_else(|| target.strip_prefix("http://"))
        .unwrap_or(target)
}

/// Register one finished scrape into a fresh registry and encode it
pub fn expose(scrape: TargetScrape) -> anyhow::Result<String> {
    let registry = Registry::new();
    registry.register(Box::new(scrape))?;
    render(&registry.gather())
}

/// Validate the target, scrape it, and return the text exposition
///
/// A missing or empty target is rejected before any session is touched.
pub async fn handle_scrape(
    orchestrator: &TargetOrchestrator,
    target: Option<&str>,
) -> Result<String, (StatusCode, String)> {
    let target = match target.map(normalize_target) {
        Some(target) if !target.is_empty() => target,
        _ => return Err((StatusCode::BAD_REQUEST, MISSING_TARGET_MESSAGE.to_string())),
    };

    debug!(bmc = %target, "Scrape requested");

    let scrape = orchestrator.scrape(target).await.map_err(|e| {
        error!(bmc = %target, error = %e, "Failed to build collectors");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Error collecting metrics: {}", e),
        )
    })?;

    expose(scrape).map_err(|e| {
        error!(bmc = %target, error = %e, "Failed to render metrics");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Error rendering metrics: {}", e),
        )
    })
}

async fn root_handler(State(state): State<AppState>) -> impl IntoResponse {
    Html(format!(
        r#"<html>
<head><title>Redfish Exporter</title></head>
<body>
<h1>Redfish Prometheus Exporter</h1>
<p><a href="{path}?target=bmc.example.com">{path}?target=bmc.example.com</a></p>
<p><a href="/health">Health</a></p>
</body>
</html>"#,
        path = state.metrics_path
    ))
}

async fn metrics_handler(
    State(state): State<AppState>,
    Query(params): Query<ScrapeParams>,
) -> Response {
    match handle_scrape(&state.orchestrator, params.target.as_deref()).await {
        Ok(body) => body.into_response(),
        Err(rejection) => rejection.into_response(),
    }
}

async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
