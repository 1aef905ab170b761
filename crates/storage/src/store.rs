//! Concurrency-safe in-memory transaction table.
//!
//! The table lock is held only for the duration of a read or write, never
//! across network calls, so independent transactions make progress in
//! parallel. Records are never deleted; they persist until process exit.

use crate::wal::WalRecord;
use crate::{Result, StorageError};
use commitd_types::{Decision, Transaction, TxId, TxState, Vote};
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;

/// Shared table of transactions keyed by txid
#[derive(Default)]
pub struct TransactionStore {
    inner: RwLock<HashMap<TxId, Transaction>>,
}

impl TransactionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a fresh transaction record.
    ///
    /// Duplicate txids are rejected: a transaction keeps its identity for its
    /// whole lifetime, so a second start with the same id must not silently
    /// overwrite the first.
    pub async fn create(&self, tx: Transaction) -> Result<()> {
        let mut table = self.inner.write().await;
        if table.contains_key(&tx.txid) {
            return Err(StorageError::AlreadyExists(tx.txid.clone()));
        }
        table.insert(tx.txid.clone(), tx);
        Ok(())
    }

    /// Fetch a cloned snapshot of one record.
    pub async fn get(&self, txid: &TxId) -> Option<Transaction> {
        self.inner.read().await.get(txid).cloned()
    }

    pub async fn set_state(&self, txid: &TxId, state: TxState) -> Result<()> {
        let mut table = self.inner.write().await;
        let tx = table
            .get_mut(txid)
            .ok_or_else(|| StorageError::NotFound(txid.clone()))?;
        tx.state = state;
        Ok(())
    }

    pub async fn set_votes(&self, txid: &TxId, votes: HashMap<String, Vote>) -> Result<()> {
        let mut table = self.inner.write().await;
        let tx = table
            .get_mut(txid)
            .ok_or_else(|| StorageError::NotFound(txid.clone()))?;
        tx.votes = votes;
        Ok(())
    }

    /// Record the coordinator's decision.
    ///
    /// `COMMIT` and `ABORT` are write-once: once recorded they can never be
    /// replaced. The intermediate `PRECOMMIT` decision may be superseded.
    pub async fn set_decision(&self, txid: &TxId, decision: Decision) -> Result<()> {
        let mut table = self.inner.write().await;
        let tx = table
            .get_mut(txid)
            .ok_or_else(|| StorageError::NotFound(txid.clone()))?;
        if let Some(current) = tx.decision {
            if current.is_terminal() && current != decision {
                return Err(StorageError::DecisionFinal(txid.clone()));
            }
        }
        tx.decision = Some(decision);
        Ok(())
    }

    /// Merge replayed log records into the table.
    ///
    /// Entries that existed before the merge are left untouched; entries the
    /// merge itself creates track the latest state seen for their txid, so
    /// the reconstructed state is the last milestone the log recorded.
    /// Replaying the same log twice yields an identical table. Returns the
    /// number of records newly restored.
    pub async fn restore(&self, records: Vec<WalRecord>, participants: &[String]) -> usize {
        let mut table = self.inner.write().await;
        let mut created: HashSet<TxId> = HashSet::new();
        for record in records {
            if let Some(tx) = table.get_mut(&record.txid) {
                if created.contains(&record.txid) {
                    tx.state = record.state;
                }
                continue;
            }
            table.insert(
                record.txid.clone(),
                Transaction::restored(record.txid.clone(), record.state, participants.to_vec()),
            );
            created.insert(record.txid);
        }
        created.len()
    }

    /// Clone the whole table, for the status surface.
    pub async fn snapshot(&self) -> HashMap<TxId, Transaction> {
        self.inner.read().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use commitd_types::Protocol;
    use serde_json::json;

    fn sample_tx(txid: &str) -> Transaction {
        Transaction::new(
            TxId::from(txid),
            Protocol::TwoPc,
            json!({"table": "accounts"}),
            vec!["http://p1:9000".to_string(), "http://p2:9000".to_string()],
            TxState::PrepareSent,
        )
    }

    #[tokio::test]
    async fn create_rejects_duplicate_txid() {
        let store = TransactionStore::new();
        store.create(sample_tx("tx-1")).await.unwrap();

        let err = store.create(sample_tx("tx-1")).await.unwrap_err();
        assert!(matches!(err, StorageError::AlreadyExists(_)));

        // the original record survives
        let tx = store.get(&TxId::from("tx-1")).await.unwrap();
        assert_eq!(tx.state, TxState::PrepareSent);
    }

    #[tokio::test]
    async fn state_and_votes_update_in_place() {
        let store = TransactionStore::new();
        store.create(sample_tx("tx-1")).await.unwrap();
        let txid = TxId::from("tx-1");

        let mut votes = HashMap::new();
        votes.insert("http://p1:9000".to_string(), Vote::Yes);
        votes.insert("http://p2:9000".to_string(), Vote::NoTimeout);
        store.set_votes(&txid, votes).await.unwrap();
        store.set_state(&txid, TxState::AbortSent).await.unwrap();

        let tx = store.get(&txid).await.unwrap();
        assert_eq!(tx.state, TxState::AbortSent);
        assert_eq!(tx.votes.get("http://p2:9000"), Some(&Vote::NoTimeout));
    }

    #[tokio::test]
    async fn terminal_decision_is_write_once() {
        let store = TransactionStore::new();
        store.create(sample_tx("tx-1")).await.unwrap();
        let txid = TxId::from("tx-1");

        store.set_decision(&txid, Decision::Precommit).await.unwrap();
        store.set_decision(&txid, Decision::Commit).await.unwrap();

        let err = store.set_decision(&txid, Decision::Abort).await.unwrap_err();
        assert!(matches!(err, StorageError::DecisionFinal(_)));
        assert_eq!(
            store.get(&txid).await.unwrap().decision,
            Some(Decision::Commit)
        );

        // re-recording the same terminal decision is a no-op, not an error
        store.set_decision(&txid, Decision::Commit).await.unwrap();
    }

    #[tokio::test]
    async fn missing_txid_is_an_error() {
        let store = TransactionStore::new();
        let err = store
            .set_state(&TxId::from("ghost"), TxState::Done)
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
    }

    fn replay_records() -> Vec<WalRecord> {
        vec![
            WalRecord {
                txid: TxId::from("tx-1"),
                state: TxState::PrepareSent,
                trailing: None,
            },
            WalRecord {
                txid: TxId::from("tx-1"),
                state: TxState::CommitSent,
                trailing: None,
            },
            WalRecord {
                txid: TxId::from("tx-2"),
                state: TxState::CanCommitSent,
                trailing: None,
            },
            WalRecord {
                txid: TxId::from("tx-1"),
                state: TxState::Done,
                trailing: None,
            },
        ]
    }

    #[tokio::test]
    async fn restore_keeps_last_state_per_txid() {
        let store = TransactionStore::new();
        let participants = vec!["http://p1:9000".to_string()];

        let restored = store.restore(replay_records(), &participants).await;
        assert_eq!(restored, 2);

        let tx1 = store.get(&TxId::from("tx-1")).await.unwrap();
        assert_eq!(tx1.state, TxState::Done);
        assert_eq!(tx1.protocol, None);
        assert!(tx1.votes.is_empty());
        assert_eq!(tx1.participants, participants);

        let tx2 = store.get(&TxId::from("tx-2")).await.unwrap();
        assert_eq!(tx2.state, TxState::CanCommitSent);
    }

    #[tokio::test]
    async fn restore_is_idempotent() {
        let store = TransactionStore::new();
        let participants = vec!["http://p1:9000".to_string()];

        store.restore(replay_records(), &participants).await;
        let first = store.snapshot().await;

        let restored_again = store.restore(replay_records(), &participants).await;
        assert_eq!(restored_again, 0);

        let second = store.snapshot().await;
        assert_eq!(first.len(), second.len());
        for (txid, tx) in &first {
            assert_eq!(second[txid].state, tx.state);
        }
    }

    #[tokio::test]
    async fn restore_never_overwrites_live_entries() {
        let store = TransactionStore::new();
        store.create(sample_tx("tx-1")).await.unwrap();
        store
            .set_decision(&TxId::from("tx-1"), Decision::Commit)
            .await
            .unwrap();

        store
            .restore(replay_records(), &["http://p9:9000".to_string()])
            .await;

        let tx = store.get(&TxId::from("tx-1")).await.unwrap();
        assert_eq!(tx.state, TxState::PrepareSent);
        assert_eq!(tx.decision, Some(Decision::Commit));
        assert_eq!(tx.protocol, Some(Protocol::TwoPc));
    }
}
