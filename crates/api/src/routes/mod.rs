//! Route table for the gateway

pub mod tx;

use crate::state::AppState;
use axum::routing::{get, post};
use axum::Router;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/tx/start", post(tx::start_transaction))
        .route("/status", get(tx::status))
        .route("/health", get(tx::health))
        .with_state(state)
}
