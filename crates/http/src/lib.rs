//! HTTP server facade with Axum, error handling, validation and OpenAPI support.

use std::future::Future;

use anyhow::Context;
use axum::{routing::get, Router};

use bookstore_kernel::{settings::Settings, ModuleRegistry};

pub mod error;
pub mod extract;
pub mod router;

pub use error::AppError;
pub use extract::{Validate, ValidatedJson};

use router::RouterBuilder;

/// Start the HTTP server and serve until `shutdown` resolves
pub async fn start_server<F>(
    registry: &ModuleRegistry,
    settings: &Settings,
    shutdown: F,
) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let address = settings.server.bind_address();
    tracing::info!("starting HTTP server on {}", address);

    let app = build_router(registry, settings);

    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind to {}", address))?;

    tracing::info!("HTTP server listening on http://{}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("HTTP server failed")?;

    tracing::info!("HTTP server stopped");
    Ok(())
}

/// Build the main HTTP router with all module routes mounted
pub fn build_router(registry: &ModuleRegistry, settings: &Settings) -> Router {
    let mut router_builder = RouterBuilder::new()
        .with_tracing()
        .with_cors()
        .with_request_id()
        .with_timeout(settings.server.request_timeout_ms)
        .route("/healthz", get(health_check));

    for module in registry.modules() {
        let mount_path = module.mount_path();
        tracing::info!(
            module = module.name(),
            "mounting module routes under {}",
            mount_path
        );
        router_builder = router_builder.mount_module(&mount_path, module.routes());
    }

    router_builder.with_openapi(registry).build()
}

/// Resolves on Ctrl-C, or SIGTERM on Unix
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl-C");
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
                tracing::error!(error = %e, "failed to listen for SIGTERM");
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

    tracing::info!("shutdown signal received");
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "ok"
}
