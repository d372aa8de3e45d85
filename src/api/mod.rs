//! HTTP surface.
//!
//! Two routes: a plain-text liveness check and the search endpoint that runs
//! one pipeline per request inside the request's own task.

use std::net::SocketAddr;

use axum::{Router, routing::get};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

pub mod routes;
mod state;

pub use routes::{LIVENESS_MESSAGE, SearchParams};
pub use state::AppState;

/// Create the API router.
///
/// # Routes
///
/// - `GET /` - Liveness string
/// - `GET /api/csv/search?query=<part>` - Download, import and archive the
///   catalog export for `<part>`; responds `{"status": "OK"|"NG", "message": ...}`
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(routes::index))
        .route("/api/csv/search", get(routes::search))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// Binds `addr` and serves the router until Ctrl-C.
///
/// # Errors
///
/// Returns the IO error if binding or serving fails.
pub async fn serve(addr: SocketAddr, state: AppState) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(address = %listener.local_addr()?, "API server listening");

    axum::serve(listener, create_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("API server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
