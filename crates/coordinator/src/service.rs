//! Commitment protocol engine.
//!
//! Drives a transaction through 2PC or 3PC against a fixed participant set:
//! collects votes, applies the decision rule, persists every milestone to
//! the write-ahead log before acting on it, and delivers the final verdict
//! with bounded retries.

use crate::config::CoordinatorConfig;
use crate::error::{CoordinatorError, Result};
use crate::participant::{ParticipantClient, RpcOutcome, VerdictEndpoint, VotePhase};
use commitd_storage::{StorageError, TransactionStore, WriteAheadLog};
use commitd_types::{Decision, Protocol, Transaction, TxId, TxState, Vote};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Aggregate result of a completed protocol run
#[derive(Debug, Clone)]
pub struct CommitOutcome {
    pub txid: TxId,
    pub protocol: Protocol,
    pub decision: Decision,
    pub votes: HashMap<String, Vote>,
}

/// Coordinator for atomic commitment across a fixed participant group.
///
/// One instance serves the whole process; each protocol run is driven by
/// the task handling its inbound request. The store lock is never held
/// across a participant call, so concurrent transactions do not block one
/// another.
pub struct CommitCoordinator {
    node_id: String,
    config: CoordinatorConfig,
    client: ParticipantClient,
    store: Arc<TransactionStore>,
    wal: Arc<WriteAheadLog>,
    participants: Vec<String>,
}

impl CommitCoordinator {
    pub fn new(
        node_id: String,
        config: CoordinatorConfig,
        store: Arc<TransactionStore>,
        wal: Arc<WriteAheadLog>,
        participants: Vec<String>,
    ) -> Result<Self> {
        let client = ParticipantClient::new(config.rpc_timeout)?;
        Ok(Self {
            node_id,
            config,
            client,
            store,
            wal,
            participants,
        })
    }

    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    pub fn participants(&self) -> &[String] {
        &self.participants
    }

    /// Run one transaction to completion under the requested protocol.
    ///
    /// Returns the final decision and the full vote map. Never cancelled:
    /// once a run begins it proceeds to DONE.
    pub async fn run(&self, protocol: Protocol, txid: TxId, op: Value) -> Result<CommitOutcome> {
        match protocol {
            Protocol::TwoPc => self.two_pc(txid, op).await,
            Protocol::ThreePc => self.three_pc(txid, op).await,
        }
    }

    /// Two-phase commit: PREPARE_SENT -> {COMMIT_SENT | ABORT_SENT} -> DONE.
    async fn two_pc(&self, txid: TxId, op: Value) -> Result<CommitOutcome> {
        self.begin(&txid, Protocol::TwoPc, &op, TxState::PrepareSent)
            .await?;

        let votes = self.collect_votes(&txid, VotePhase::Prepare, &op).await;
        let decision = decide(&votes, &self.participants);
        let state = match decision {
            Decision::Commit => TxState::CommitSent,
            _ => TxState::AbortSent,
        };
        info!(
            "[{}] tx {} prepare round complete, decision {}",
            self.node_id, txid, decision
        );

        self.store.set_votes(&txid, votes.clone()).await?;
        self.store.set_decision(&txid, decision).await?;
        self.store.set_state(&txid, state).await?;
        // the decision must be durable before any participant learns it
        self.wal.append(&txid, state, Some(&render_votes(&votes)))?;

        let endpoint = match decision {
            Decision::Commit => VerdictEndpoint::Commit,
            _ => VerdictEndpoint::Abort,
        };
        self.broadcast(&txid, endpoint).await;

        self.finish(&txid).await?;
        Ok(CommitOutcome {
            txid,
            protocol: Protocol::TwoPc,
            decision,
            votes,
        })
    }

    /// Three-phase commit: CAN_COMMIT_SENT -> ABORT_SENT -> DONE, or
    /// CAN_COMMIT_SENT -> PRECOMMIT_SENT -> DOCOMMIT_SENT -> DONE.
    async fn three_pc(&self, txid: TxId, op: Value) -> Result<CommitOutcome> {
        self.begin(&txid, Protocol::ThreePc, &op, TxState::CanCommitSent)
            .await?;

        let votes = self.collect_votes(&txid, VotePhase::CanCommit, &op).await;
        self.store.set_votes(&txid, votes.clone()).await?;

        if decide(&votes, &self.participants) != Decision::Commit {
            info!("[{}] tx {} can_commit round rejected, aborting", self.node_id, txid);
            self.store.set_decision(&txid, Decision::Abort).await?;
            self.store.set_state(&txid, TxState::AbortSent).await?;
            self.wal
                .append(&txid, TxState::AbortSent, Some(&render_votes(&votes)))?;
            self.broadcast(&txid, VerdictEndpoint::Abort).await;

            self.finish(&txid).await?;
            return Ok(CommitOutcome {
                txid,
                protocol: Protocol::ThreePc,
                decision: Decision::Abort,
                votes,
            });
        }

        info!("[{}] tx {} can_commit round unanimous, precommitting", self.node_id, txid);
        self.store.set_decision(&txid, Decision::Precommit).await?;
        self.store.set_state(&txid, TxState::PrecommitSent).await?;
        self.wal.append(&txid, TxState::PrecommitSent, None)?;
        self.broadcast(&txid, VerdictEndpoint::Precommit).await;

        // hold the precommit state open so participants can observe it
        // before the final decision lands
        tokio::time::sleep(self.config.precommit_observation).await;

        self.store.set_decision(&txid, Decision::Commit).await?;
        self.store.set_state(&txid, TxState::DocommitSent).await?;
        self.wal.append(&txid, TxState::DocommitSent, None)?;
        self.broadcast(&txid, VerdictEndpoint::Commit).await;

        self.finish(&txid).await?;
        Ok(CommitOutcome {
            txid,
            protocol: Protocol::ThreePc,
            decision: Decision::Commit,
            votes,
        })
    }

    /// Create the transaction record and log the opening milestone.
    async fn begin(
        &self,
        txid: &TxId,
        protocol: Protocol,
        op: &Value,
        state: TxState,
    ) -> Result<()> {
        let tx = Transaction::new(
            txid.clone(),
            protocol,
            op.clone(),
            self.participants.clone(),
            state,
        );
        match self.store.create(tx).await {
            Ok(()) => {}
            Err(StorageError::AlreadyExists(id)) => {
                return Err(CoordinatorError::DuplicateTransaction(id));
            }
            Err(err) => return Err(err.into()),
        }
        self.wal.append(txid, state, Some(&op.to_string()))?;
        info!("[{}] tx {} started ({})", self.node_id, txid, protocol);
        Ok(())
    }

    /// Query every participant in list order and record one vote each.
    /// Transport failure and timeout fold into `NO_TIMEOUT`.
    async fn collect_votes(
        &self,
        txid: &TxId,
        phase: VotePhase,
        op: &Value,
    ) -> HashMap<String, Vote> {
        let mut votes = HashMap::new();
        for participant in &self.participants {
            let vote = match self.client.request_vote(participant, phase, txid, op).await {
                RpcOutcome::Vote(vote) => vote,
                RpcOutcome::Failure(reason) => {
                    warn!(
                        "[{}] tx {} {} to {} failed: {}",
                        self.node_id, txid, phase, participant, reason
                    );
                    Vote::NoTimeout
                }
                // vote endpoints never plain-ack; treat it as a refusal
                RpcOutcome::Ack => Vote::No,
            };
            debug!("[{}] tx {} vote from {}: {}", self.node_id, txid, participant, vote);
            votes.insert(participant.clone(), vote);
        }
        votes
    }

    /// Deliver a verdict to every participant with bounded retries.
    ///
    /// Exhausting the attempts for a participant is a non-fatal delivery
    /// failure: it is logged and the protocol proceeds. The coordinator
    /// guarantees a durable record of its decision, not delivery.
    async fn broadcast(&self, txid: &TxId, endpoint: VerdictEndpoint) {
        for participant in &self.participants {
            let mut delivered = false;
            for attempt in 1..=self.config.delivery_attempts {
                match self.client.deliver(participant, endpoint, txid).await {
                    RpcOutcome::Ack | RpcOutcome::Vote(_) => {
                        delivered = true;
                        break;
                    }
                    RpcOutcome::Failure(reason) => {
                        debug!(
                            "[{}] tx {} {} to {} attempt {}/{} failed: {}",
                            self.node_id,
                            txid,
                            endpoint,
                            participant,
                            attempt,
                            self.config.delivery_attempts,
                            reason
                        );
                        if attempt < self.config.delivery_attempts {
                            tokio::time::sleep(self.config.delivery_retry_delay).await;
                        }
                    }
                }
            }
            if !delivered {
                warn!(
                    "[{}] failed to send {} to {} for tx {} after {} attempts",
                    self.node_id, endpoint, participant, txid, self.config.delivery_attempts
                );
            }
        }
    }

    /// Advance to DONE and log the closing milestone.
    async fn finish(&self, txid: &TxId) -> Result<()> {
        self.store.set_state(txid, TxState::Done).await?;
        self.wal.append(txid, TxState::Done, None)?;
        info!("[{}] tx {} done", self.node_id, txid);
        Ok(())
    }
}

/// Commit iff every participant voted YES; any NO or timeout aborts.
fn decide(votes: &HashMap<String, Vote>, participants: &[String]) -> Decision {
    let unanimous = participants
        .iter()
        .all(|p| votes.get(p) == Some(&Vote::Yes));
    if unanimous {
        Decision::Commit
    } else {
        Decision::Abort
    }
}

fn render_votes(votes: &HashMap<String, Vote>) -> String {
    serde_json::to_string(votes).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn votes_from(pairs: &[(&str, Vote)]) -> HashMap<String, Vote> {
        pairs
            .iter()
            .map(|(url, vote)| (url.to_string(), *vote))
            .collect()
    }

    #[test]
    fn unanimous_yes_commits() {
        let participants = vec!["p1".to_string(), "p2".to_string(), "p3".to_string()];
        let votes = votes_from(&[("p1", Vote::Yes), ("p2", Vote::Yes), ("p3", Vote::Yes)]);
        assert_eq!(decide(&votes, &participants), Decision::Commit);
    }

    #[test]
    fn any_no_aborts() {
        let participants = vec!["p1".to_string(), "p2".to_string()];
        let votes = votes_from(&[("p1", Vote::Yes), ("p2", Vote::No)]);
        assert_eq!(decide(&votes, &participants), Decision::Abort);
    }

    #[test]
    fn timeout_aborts() {
        let participants = vec!["p1".to_string(), "p2".to_string()];
        let votes = votes_from(&[("p1", Vote::NoTimeout), ("p2", Vote::Yes)]);
        assert_eq!(decide(&votes, &participants), Decision::Abort);
    }

    #[test]
    fn missing_vote_aborts() {
        let participants = vec!["p1".to_string(), "p2".to_string()];
        let votes = votes_from(&[("p1", Vote::Yes)]);
        assert_eq!(decide(&votes, &participants), Decision::Abort);
    }
}
