//! HTTP gateway for the commitd coordinator.
//!
//! Thin by design: request validation and response shaping live here, the
//! protocol engine lives in `commitd-coordinator`.

pub mod error;
pub mod routes;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use state::AppState;

use std::net::SocketAddr;
use tracing::info;

/// Bind and serve the gateway until the process is stopped.
pub async fn start_server(addr: SocketAddr, state: AppState) -> std::io::Result<()> {
    let app = routes::router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("gateway listening on {}", addr);
    axum::serve(listener, app).await
}
