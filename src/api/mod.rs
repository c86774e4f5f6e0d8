// HTTP JSON API over `LedgerService`.
// Every response carries `returnStatus` ("S" or "E"); failures also carry
// `returnMessage` and a machine-readable `error` code.

pub mod dto;
pub mod errors;
mod middleware;
mod routes;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;

use crate::application::LedgerService;

pub use errors::ApiError;

/// Build the wallet API router.
pub fn router(service: Arc<LedgerService>) -> Router {
    Router::new()
        .route("/api/wallet/user/create", post(routes::create_user))
        .route("/api/wallet/user/:user_uuid", get(routes::get_user))
        .route(
            "/api/wallet/user/:user_uuid/status",
            post(routes::update_user_status),
        )
        .route("/api/wallet/user/:user_uuid/balance", get(routes::get_balance))
        .route(
            "/api/wallet/user/:user_uuid/transactions",
            get(routes::list_transactions),
        )
        .route("/api/wallet/transaction", post(routes::record_transaction))
        .route(
            "/api/wallet/transaction/reverse",
            post(routes::reverse_transaction),
        )
        .layer(axum::middleware::from_fn(middleware::log_request))
        .with_state(service)
}

/// Serve the API until the process receives Ctrl-C.
pub async fn serve(service: Arc<LedgerService>, bind: &str) -> anyhow::Result<()> {
    use anyhow::Context;

    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("Failed to bind {}", bind))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, router(service))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
