pub mod store;
pub mod wal;

pub use store::TransactionStore;
pub use wal::{WalRecord, WriteAheadLog};

use commitd_types::TxId;
use thiserror::Error;

/// Result type for storage operations
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors from the write-ahead log or the transaction table
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("write-ahead log i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("transaction {0} already exists")]
    AlreadyExists(TxId),

    #[error("transaction {0} not found")]
    NotFound(TxId),

    #[error("decision for transaction {0} is final and cannot change")]
    DecisionFinal(TxId),
}
