//! HTTP front end: playback and status endpoints.

pub mod api;
pub mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{routing::get, Router};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use state::WebState;

/// Build the router.
///
/// Request tracing covers the playback route only; `/api/status` is polled
/// by dashboards and stays out of the log.
pub fn router(state: Arc<WebState>) -> Router {
    Router::new()
        .route("/play/:tuner/:channel", get(api::play))
        .layer(TraceLayer::new_for_http())
        .route("/api/status", get(api::get_status))
        .layer(CatchPanicLayer::new())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind `listen_addr` and serve until the process exits.
pub async fn start_web_server(
    listen_addr: SocketAddr,
    state: Arc<WebState>,
) -> Result<(), Box<dyn std::error::Error>> {
    let listener = tokio::net::TcpListener::bind(listen_addr).await?;
    log::info!("Listening on http://{}", listen_addr);

    axum::serve(listener, router(state)).await?;

    Ok(())
}
