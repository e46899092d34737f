//! Contact form intake server.
//!
//! `POST /api/submit-form` validates a submission, deduplicates the submitter
//! by phone/email, counts repeat submissions per client and per IP, flags
//! spam past a threshold and forwards first-time submitters to Kafka.

use anyhow::{Context, Result};
use intake_config::Config;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub mod admission;
pub mod context;
pub mod db;
pub mod kafka;
pub mod models;
pub mod notifier;
pub mod rate_limit;
pub mod routes;
pub mod utils;
pub mod validation;

use context::AppContext;

/// Install the global subscriber: `RUST_LOG` filter + fmt output
pub fn init_tracing(config: &Config) {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.rust_log.clone()))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Serve the router on `listener` until `shutdown` resolves.
/// The peer address is recorded for callers without proxy headers.
pub async fn serve<F>(app_context: Arc<AppContext>, listener: TcpListener, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = routes::create_router(app_context);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await
    .context("Failed to start server")?;

    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
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

    tracing::info!("Shutdown signal received. Shutting down...");
}
