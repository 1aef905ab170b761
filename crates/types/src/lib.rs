use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Unique identifier for a coordinated transaction
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxId(pub String);

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for TxId {
    fn from(s: String) -> Self {
        TxId(s)
    }
}

impl From<&str> for TxId {
    fn from(s: &str) -> Self {
        TxId(s.to_string())
    }
}

/// Commitment protocol driving a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Protocol {
    #[serde(rename = "2PC")]
    TwoPc,
    #[serde(rename = "3PC")]
    ThreePc,
}

impl Protocol {
    /// Parse from a request string, case-insensitively. Returns `None` for
    /// anything other than `2PC`/`3PC` so callers can reject it explicitly.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "2PC" => Some(Protocol::TwoPc),
            "3PC" => Some(Protocol::ThreePc),
            _ => None,
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::TwoPc => write!(f, "2PC"),
            Protocol::ThreePc => write!(f, "3PC"),
        }
    }
}

/// Protocol state of a transaction. Advances monotonically, never regresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TxState {
    Init,
    PrepareSent,
    CanCommitSent,
    PrecommitSent,
    DocommitSent,
    CommitSent,
    AbortSent,
    Done,
}

impl TxState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TxState::Init => "INIT",
            TxState::PrepareSent => "PREPARE_SENT",
            TxState::CanCommitSent => "CAN_COMMIT_SENT",
            TxState::PrecommitSent => "PRECOMMIT_SENT",
            TxState::DocommitSent => "DOCOMMIT_SENT",
            TxState::CommitSent => "COMMIT_SENT",
            TxState::AbortSent => "ABORT_SENT",
            TxState::Done => "DONE",
        }
    }
}

impl fmt::Display for TxState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a milestone token does not name a known state
#[derive(Debug, Error)]
#[error("unknown transaction state: {0}")]
pub struct ParseTxStateError(String);

impl FromStr for TxState {
    type Err = ParseTxStateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "INIT" => Ok(TxState::Init),
            "PREPARE_SENT" => Ok(TxState::PrepareSent),
            "CAN_COMMIT_SENT" => Ok(TxState::CanCommitSent),
            "PRECOMMIT_SENT" => Ok(TxState::PrecommitSent),
            "DOCOMMIT_SENT" => Ok(TxState::DocommitSent),
            "COMMIT_SENT" => Ok(TxState::CommitSent),
            "ABORT_SENT" => Ok(TxState::AbortSent),
            "DONE" => Ok(TxState::Done),
            other => Err(ParseTxStateError(other.to_string())),
        }
    }
}

/// A participant's phase-1 response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Vote {
    Yes,
    No,
    /// The participant could not be reached within the timeout
    NoTimeout,
}

impl fmt::Display for Vote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Vote::Yes => write!(f, "YES"),
            Vote::No => write!(f, "NO"),
            Vote::NoTimeout => write!(f, "NO_TIMEOUT"),
        }
    }
}

/// The coordinator's determination for a transaction.
///
/// `Commit` and `Abort` are terminal and write-once; `Precommit` is the
/// intermediate 3PC decision that a terminal decision later supersedes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    Precommit,
    Commit,
    Abort,
}

impl Decision {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Decision::Commit | Decision::Abort)
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decision::Precommit => write!(f, "PRECOMMIT"),
            Decision::Commit => write!(f, "COMMIT"),
            Decision::Abort => write!(f, "ABORT"),
        }
    }
}

/// Transaction record held by the coordinator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub txid: TxId,
    /// `None` only for entries reconstructed from the write-ahead log, where
    /// the protocol is not recoverable
    pub protocol: Option<Protocol>,
    pub state: TxState,
    /// Opaque payload forwarded verbatim to participants
    pub op: serde_json::Value,
    /// Participant base URL -> vote, populated once per voting phase
    pub votes: HashMap<String, Vote>,
    pub decision: Option<Decision>,
    /// Snapshot of the participant list at creation time
    pub participants: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    /// Create a fresh record as a protocol run begins.
    pub fn new(
        txid: TxId,
        protocol: Protocol,
        op: serde_json::Value,
        participants: Vec<String>,
        state: TxState,
    ) -> Self {
        Self {
            txid,
            protocol: Some(protocol),
            state,
            op,
            votes: HashMap::new(),
            decision: None,
            participants,
            created_at: Utc::now(),
        }
    }

    /// Reconstruct a degraded record from a replayed log milestone. Votes,
    /// decision, operation and protocol are not recoverable from the log;
    /// the participant list is the currently configured one.
    pub fn restored(txid: TxId, state: TxState, participants: Vec<String>) -> Self {
        Self {
            txid,
            protocol: None,
            state,
            op: serde_json::Value::Null,
            votes: HashMap::new(),
            decision: None,
            participants,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protocol_parses_case_insensitively() {
        assert_eq!(Protocol::parse("2PC"), Some(Protocol::TwoPc));
        assert_eq!(Protocol::parse("3pc"), Some(Protocol::ThreePc));
        assert_eq!(Protocol::parse("paxos"), None);
    }

    #[test]
    fn protocol_serializes_to_wire_names() {
        assert_eq!(serde_json::to_string(&Protocol::TwoPc).unwrap(), "\"2PC\"");
        assert_eq!(
            serde_json::from_str::<Protocol>("\"3PC\"").unwrap(),
            Protocol::ThreePc
        );
    }

    #[test]
    fn state_display_round_trips_through_parse() {
        let states = [
            TxState::Init,
            TxState::PrepareSent,
            TxState::CanCommitSent,
            TxState::PrecommitSent,
            TxState::DocommitSent,
            TxState::CommitSent,
            TxState::AbortSent,
            TxState::Done,
        ];
        for state in states {
            assert_eq!(state.to_string().parse::<TxState>().unwrap(), state);
        }
        assert!("GARBAGE".parse::<TxState>().is_err());
    }

    #[test]
    fn vote_serializes_screaming_snake() {
        assert_eq!(serde_json::to_string(&Vote::Yes).unwrap(), "\"YES\"");
        assert_eq!(
            serde_json::to_string(&Vote::NoTimeout).unwrap(),
            "\"NO_TIMEOUT\""
        );
        assert_eq!(serde_json::from_str::<Vote>("\"NO\"").unwrap(), Vote::No);
    }

    #[test]
    fn terminal_decisions() {
        assert!(Decision::Commit.is_terminal());
        assert!(Decision::Abort.is_terminal());
        assert!(!Decision::Precommit.is_terminal());
    }

    #[test]
    fn restored_transaction_is_degraded() {
        let tx = Transaction::restored(
            TxId::from("tx-1"),
            TxState::CommitSent,
            vec!["http://p1:9000".to_string()],
        );
        assert_eq!(tx.protocol, None);
        assert_eq!(tx.state, TxState::CommitSent);
        assert!(tx.votes.is_empty());
        assert_eq!(tx.decision, None);
    }
}
