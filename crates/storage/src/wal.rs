//! Append-only write-ahead log of protocol milestones.
//!
//! Format: one line per milestone, `"<txid> <STATE> [<trailing data>]"`.
//! The log is never truncated, rotated or compacted; replay on startup
//! reconstructs a best-effort transaction table from it.

use crate::Result;
use commitd_types::{TxId, TxState};
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::warn;

/// One parsed milestone line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalRecord {
    pub txid: TxId,
    pub state: TxState,
    pub trailing: Option<String>,
}

/// Durable milestone log for the coordinator.
///
/// Appends are serialized by a mutex so concurrent transactions cannot
/// interleave their line writes. Every append is flushed to stable storage
/// before it returns; a milestone only counts as logged once `append` has
/// succeeded.
pub struct WriteAheadLog {
    file: Mutex<File>,
    path: PathBuf,
}

impl WriteAheadLog {
    /// Open the log file at `path` in append mode, creating it (and any
    /// missing parent directories) if needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            file: Mutex::new(file),
            path,
        })
    }

    /// Append one milestone line and sync it to stable storage.
    pub fn append(&self, txid: &TxId, state: TxState, trailing: Option<&str>) -> Result<()> {
        let mut line = format!("{txid} {state}");
        if let Some(extra) = trailing {
            line.push(' ');
            line.push_str(extra);
        }
        line.push('\n');

        let mut file = self.file.lock().unwrap();
        file.write_all(line.as_bytes())?;
        file.sync_data()?;
        Ok(())
    }

    /// Read every milestone recorded so far, in file order.
    ///
    /// Lines missing a state token or naming an unknown state are skipped
    /// with a warning; a missing log file replays to an empty record set.
    pub fn replay(&self) -> Result<Vec<WalRecord>> {
        let _guard = self.file.lock().unwrap();
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut records = Vec::new();
        for line in contents.lines() {
            let mut parts = line.splitn(3, ' ');
            let (Some(txid), Some(state)) = (parts.next(), parts.next()) else {
                continue;
            };
            if txid.is_empty() {
                continue;
            }
            let state = match state.parse::<TxState>() {
                Ok(state) => state,
                Err(err) => {
                    warn!(%err, line, "skipping unparseable milestone line");
                    continue;
                }
            };
            records.push(WalRecord {
                txid: TxId::from(txid),
                state,
                trailing: parts.next().map(str::to_string),
            });
        }
        Ok(records)
    }

    /// Path of the underlying log file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}
