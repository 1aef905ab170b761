//! HTTP client for a single participant RPC.
//!
//! One call, one bounded timeout, no retries; retry policy belongs to the
//! coordinator. Transport failure is an explicit outcome value, never an
//! error the caller has to catch, so the decision logic can match on it
//! exhaustively.

use crate::error::{CoordinatorError, Result};
use commitd_types::{TxId, Vote};
use serde::Deserialize;
use serde_json::{json, Value};
use std::fmt;
use std::time::Duration;

/// Phase-1 vote request endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VotePhase {
    Prepare,
    CanCommit,
}

impl VotePhase {
    pub fn path(&self) -> &'static str {
        match self {
            VotePhase::Prepare => "/prepare",
            VotePhase::CanCommit => "/can_commit",
        }
    }
}

impl fmt::Display for VotePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Endpoints carrying the coordinator's verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerdictEndpoint {
    Precommit,
    Commit,
    Abort,
}

impl VerdictEndpoint {
    pub fn path(&self) -> &'static str {
        match self {
            VerdictEndpoint::Precommit => "/precommit",
            VerdictEndpoint::Commit => "/commit",
            VerdictEndpoint::Abort => "/abort",
        }
    }
}

impl fmt::Display for VerdictEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Outcome of one participant RPC
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RpcOutcome {
    /// The participant acknowledged a verdict delivery
    Ack,
    /// The participant answered a vote request
    Vote(Vote),
    /// Connection error, timeout, or malformed response
    Failure(String),
}

#[derive(Debug, Deserialize)]
struct VoteResponse {
    vote: Option<String>,
}

/// Client issuing single RPCs to participant nodes
pub struct ParticipantClient {
    http: reqwest::Client,
}

impl ParticipantClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CoordinatorError::Internal(format!("failed to build http client: {e}")))?;
        Ok(Self { http })
    }

    /// Ask one participant for its vote (`/prepare` or `/can_commit`).
    ///
    /// A non-2xx status counts as a NO vote; anything but a declared `YES`
    /// in the body counts as NO; transport failure and an unparseable body
    /// surface as `Failure`.
    pub async fn request_vote(
        &self,
        base_url: &str,
        phase: VotePhase,
        txid: &TxId,
        op: &Value,
    ) -> RpcOutcome {
        let url = endpoint_url(base_url, phase.path());
        let body = json!({ "txid": txid, "op": op });

        let response = match self.http.post(&url).json(&body).send().await {
            Ok(response) => response,
            Err(err) => return RpcOutcome::Failure(err.to_string()),
        };
        if !response.status().is_success() {
            return RpcOutcome::Vote(Vote::No);
        }
        match response.json::<VoteResponse>().await {
            Ok(reply) => match reply.vote.as_deref() {
                Some(vote) if vote.eq_ignore_ascii_case("YES") => RpcOutcome::Vote(Vote::Yes),
                _ => RpcOutcome::Vote(Vote::No),
            },
            Err(err) => RpcOutcome::Failure(err.to_string()),
        }
    }

    /// Deliver a verdict (`/precommit`, `/commit` or `/abort`) to one
    /// participant. Any 2xx response is an ack; the body is not inspected.
    pub async fn deliver(
        &self,
        base_url: &str,
        endpoint: VerdictEndpoint,
        txid: &TxId,
    ) -> RpcOutcome {
        let url = endpoint_url(base_url, endpoint.path());
        let body = json!({ "txid": txid });

        match self.http.post(&url).json(&body).send().await {
            Ok(response) if response.status().is_success() => RpcOutcome::Ack,
            Ok(response) => RpcOutcome::Failure(format!("http status {}", response.status())),
            Err(err) => RpcOutcome::Failure(err.to_string()),
        }
    }
}

fn endpoint_url(base_url: &str, path: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_url_trims_trailing_slash() {
        assert_eq!(
            endpoint_url("http://p1:9000/", "/prepare"),
            "http://p1:9000/prepare"
        );
        assert_eq!(
            endpoint_url("http://p1:9000", "/commit"),
            "http://p1:9000/commit"
        );
    }

    #[test]
    fn endpoint_paths() {
        assert_eq!(VotePhase::Prepare.path(), "/prepare");
        assert_eq!(VotePhase::CanCommit.path(), "/can_commit");
        assert_eq!(VerdictEndpoint::Precommit.path(), "/precommit");
        assert_eq!(VerdictEndpoint::Commit.path(), "/commit");
        assert_eq!(VerdictEndpoint::Abort.path(), "/abort");
    }
}
