//! Error types for the commitment protocol engine

use commitd_types::TxId;
use thiserror::Error;

/// Result type for coordinator operations
pub type Result<T> = std::result::Result<T, CoordinatorError>;

/// Errors that can abort a protocol run.
///
/// Participant-level failures are deliberately absent: a timeout or a NO
/// vote is protocol input, folded into the vote map and the decision rule,
/// and an exhausted verdict delivery is logged and tolerated.
#[derive(Error, Debug)]
pub enum CoordinatorError {
    #[error("transaction {0} is already in flight")]
    DuplicateTransaction(TxId),

    #[error("storage error: {0}")]
    Storage(#[from] commitd_storage::StorageError),

    #[error("internal error: {0}")]
    Internal(String),
}
