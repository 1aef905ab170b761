//! Shared application state for the gateway

use commitd_coordinator::CommitCoordinator;
use commitd_storage::TransactionStore;
use std::sync::Arc;

/// Shared state passed to all handlers
#[derive(Clone)]
pub struct AppState {
    /// Protocol engine driving transactions
    pub coordinator: Arc<CommitCoordinator>,
    /// In-memory transaction table, read by the status surface
    pub store: Arc<TransactionStore>,
    /// This coordinator's identity, reported on `/status`
    pub node_id: String,
    /// Configured participant base URLs
    pub participants: Vec<String>,
}

impl AppState {
    pub fn new(
        coordinator: Arc<CommitCoordinator>,
        store: Arc<TransactionStore>,
        node_id: String,
        participants: Vec<String>,
    ) -> Self {
        Self {
            coordinator,
            store,
            node_id,
            participants,
        }
    }
}
