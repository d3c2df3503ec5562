// Ledger storage module
// In-memory user and history tables with optional TOML snapshot persistence

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::{Mutex, MutexGuard};

use super::model::{now_millis, PointHistory, TransactionType, UserPoint};
use crate::logger;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read snapshot {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse snapshot {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("failed to serialize snapshot: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("failed to write snapshot {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// On-disk form of the ledger
#[derive(Debug, Default, Serialize, Deserialize)]
struct Snapshot {
    #[serde(default)]
    next_history_id: u64,
    #[serde(default)]
    users: Vec<UserPoint>,
    #[serde(default)]
    histories: Vec<PointHistory>,
}

#[derive(Debug, Default, Clone)]
struct Ledger {
    users: HashMap<u64, UserPoint>,
    histories: Vec<PointHistory>,
    next_history_id: u64,
}

impl Ledger {
    fn from_snapshot(snapshot: Snapshot) -> Self {
        let max_id = snapshot.histories.iter().map(|h| h.id).max().unwrap_or(0);
        Self {
            users: snapshot.users.into_iter().map(|u| (u.id, u)).collect(),
            histories: snapshot.histories,
            next_history_id: snapshot.next_history_id.max(max_id + 1),
        }
    }

    fn to_snapshot(&self) -> Snapshot {
        let mut users: Vec<UserPoint> = self.users.values().copied().collect();
        users.sort_by_key(|u| u.id);
        Snapshot {
            next_history_id: self.next_history_id,
            users,
            histories: self.histories.clone(),
        }
    }
}

/// User point and history tables
#[derive(Debug)]
pub struct PointStore {
    ledger: Mutex<Ledger>,
    snapshot_path: Option<PathBuf>,
}

impl PointStore {
    /// Store that lives only as long as the process
    pub fn in_memory() -> Self {
        Self {
            ledger: Mutex::new(Ledger {
                next_history_id: 1,
                ..Ledger::default()
            }),
            snapshot_path: None,
        }
    }

    /// Store backed by a snapshot file; an existing file is loaded
    pub fn with_snapshot(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let ledger = if path.exists() {
            let content = fs::read_to_string(&path).map_err(|source| StoreError::Read {
                path: path.clone(),
                source,
            })?;
            let snapshot: Snapshot =
                toml::from_str(&content).map_err(|source| StoreError::Parse {
                    path: path.clone(),
                    source,
                })?;
            let ledger = Ledger::from_snapshot(snapshot);
            logger::log_snapshot_loaded(&path, ledger.users.len(), ledger.histories.len());
            ledger
        } else {
            Ledger {
                next_history_id: 1,
                ..Ledger::default()
            }
        };

        Ok(Self {
            ledger: Mutex::new(ledger),
            snapshot_path: Some(path),
        })
    }

    /// Take exclusive access to the ledger
    ///
    /// Every read-modify-write of a balance happens inside one transaction,
    /// so concurrent requests for the same user are serialized.
    pub async fn begin(&self) -> LedgerTxn<'_> {
        LedgerTxn {
            ledger: self.ledger.lock().await,
            snapshot_path: self.snapshot_path.as_deref(),
            backup: None,
            dirty: false,
        }
    }
}

/// Exclusive view of the ledger
///
/// With a snapshot file configured, mutations only stick once
/// [`LedgerTxn::commit`] has written the file; a failed or skipped commit
/// restores the ledger as it was when the transaction began.
pub struct LedgerTxn<'a> {
    ledger: MutexGuard<'a, Ledger>,
    snapshot_path: Option<&'a Path>,
    backup: Option<Ledger>,
    dirty: bool,
}

impl LedgerTxn<'_> {
    pub fn select_by_id(&self, user_id: u64) -> Option<UserPoint> {
        self.ledger.users.get(&user_id).copied()
    }

    pub fn select_histories(&self, user_id: u64) -> Vec<PointHistory> {
        self.ledger
            .histories
            .iter()
            .filter(|h| h.user_id == user_id)
            .cloned()
            .collect()
    }

    pub fn insert_or_update(&mut self, user_id: u64, point: u64) -> UserPoint {
        self.stage();
        let user = UserPoint {
            id: user_id,
            point,
            update_millis: now_millis(),
        };
        self.ledger.users.insert(user_id, user);
        user
    }

    pub fn insert_history(
        &mut self,
        user_id: u64,
        amount: u64,
        transaction_type: TransactionType,
    ) -> PointHistory {
        self.stage();
        let history = PointHistory {
            id: self.ledger.next_history_id,
            user_id,
            amount,
            transaction_type,
            update_millis: now_millis(),
        };
        self.ledger.next_history_id += 1;
        self.ledger.histories.push(history.clone());
        history
    }

    /// Remember the pre-transaction ledger before the first change
    fn stage(&mut self) {
        if !self.dirty && self.snapshot_path.is_some() {
            self.backup = Some(Ledger::clone(&self.ledger));
        }
        self.dirty = true;
    }

    /// Write the snapshot if anything changed and a snapshot file is configured
    pub fn commit(mut self) -> Result<(), StoreError> {
        let Some(path) = self.snapshot_path else {
            return Ok(());
        };
        if !self.dirty {
            return Ok(());
        }

        write_snapshot(path, &self.ledger.to_snapshot())?;
        self.backup = None;
        Ok(())
    }
}

impl Drop for LedgerTxn<'_> {
    fn drop(&mut self) {
        if let Some(backup) = self.backup.take() {
            *self.ledger = backup;
        }
    }
}

/// Write then rename so a crash never leaves a truncated snapshot
fn write_snapshot(path: &Path, snapshot: &Snapshot) -> Result<(), StoreError> {
    let content = toml::to_string_pretty(snapshot)?;

    let tmp_path = path.with_extension("toml.tmp");
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|source| StoreError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
    }
    fs::write(&tmp_path, content).map_err(|source| StoreError::Write {
        path: tmp_path.clone(),
        source,
    })?;
    fs::rename(&tmp_path, path).map_err(|source| StoreError::Write {
        path: path.to_path_buf(),
        source,
    })
}
