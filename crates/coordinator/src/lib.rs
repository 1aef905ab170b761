//! Atomic commitment protocol engine.
//!
//! This crate holds the coordinator side of 2PC and 3PC: vote collection,
//! the decision rule, write-ahead logging of every milestone before the
//! action it represents, and bounded-retry delivery of final verdicts.
//! Transport and process wiring live in the `commitd-api` crate.

pub mod config;
pub mod error;
pub mod participant;
pub mod service;

pub use config::{CoordinatorConfig, CoordinatorConfigBuilder};
pub use error::{CoordinatorError, Result};
pub use participant::{ParticipantClient, RpcOutcome, VerdictEndpoint, VotePhase};
pub use service::{CommitCoordinator, CommitOutcome};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::CoordinatorConfig;
    pub use crate::error::{CoordinatorError, Result};
    pub use crate::participant::{ParticipantClient, RpcOutcome};
    pub use crate::service::{CommitCoordinator, CommitOutcome};
}
