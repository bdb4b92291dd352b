//! Resumable batch transactions.
//!
//! A journal file records every non-skip operation of a batch; originals
//! are backed up before any destructive write. If the process dies
//! between `begin` and `commit`, the journal is left `InProgress` and the
//! next invocation either refuses new work or performs `resume`, which
//! restores every backed-up file bit-exactly. The `InProgress` scan is
//! the lock: a second process sees the journal and refuses.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::error::Transience;
use crate::fsio;

const JOURNAL_PREFIX: &str = "journal-";
const JOURNAL_SUFFIX: &str = ".json";

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TxnError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(
        "transaction `{transaction_id}` is still in progress; run `resume` to roll it back"
    )]
    IncompleteTransaction { transaction_id: String },

    #[error("no in-progress transaction found under `{}`", .dir.display())]
    NothingToResume { dir: PathBuf },
}

impl TxnError {
    pub fn transience(&self) -> Transience {
        match self {
            TxnError::Io(_) => Transience::Unknown,
            TxnError::Json(_) => Transience::Permanent,
            // Clears once the stale transaction is resumed.
            TxnError::IncompleteTransaction { .. } => Transience::Retryable,
            TxnError::NothingToResume { .. } => Transience::Permanent,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxnStatus {
    InProgress,
    Committed,
    RolledBack,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationStatus {
    Pending,
    BackedUp,
    Processing,
    Completed,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalOperation {
    pub file_path: PathBuf,
    pub status: OperationStatus,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionJournal {
    pub transaction_id: String,
    pub status: TxnStatus,
    pub operations: Vec<JournalOperation>,
}

/// What a resume restored.
#[derive(Debug)]
pub struct RollbackReport {
    pub transaction_id: String,
    pub restored: Vec<PathBuf>,
}

/// Manages journals and backups under one storage directory.
pub struct TransactionManager {
    storage_dir: PathBuf,
}

impl TransactionManager {
    pub fn new(storage_dir: impl Into<PathBuf>) -> Result<Self, TxnError> {
        let storage_dir = storage_dir.into();
        fs::create_dir_all(&storage_dir)?;
        Ok(TransactionManager { storage_dir })
    }

    fn journal_path(&self, transaction_id: &str) -> PathBuf {
        self.storage_dir
            .join(format!("{JOURNAL_PREFIX}{transaction_id}{JOURNAL_SUFFIX}"))
    }

    fn backup_dir(&self, transaction_id: &str) -> PathBuf {
        self.storage_dir.join(format!("backup-{transaction_id}"))
    }

    fn backup_path(&self, transaction_id: &str, original: &Path) -> PathBuf {
        let basename = original
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "unnamed".to_string());
        self.backup_dir(transaction_id)
            .join(format!("{basename}.{transaction_id}.backup"))
    }

    /// Scan for a journal left `InProgress` by an interrupted run.
    pub fn find_in_progress(&self) -> Result<Option<(PathBuf, TransactionJournal)>, TxnError> {
        let mut journals = Vec::new();
        for entry in fs::read_dir(&self.storage_dir)? {
            let entry = entry?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if !name.starts_with(JOURNAL_PREFIX) || !name.ends_with(JOURNAL_SUFFIX) {
                continue;
            }
            journals.push(entry.path());
        }
        journals.sort();

        for path in journals {
            let bytes = fs::read(&path)?;
            let journal: TransactionJournal = serde_json::from_slice(&bytes)?;
            if journal.status == TxnStatus::InProgress {
                return Ok(Some((path, journal)));
            }
        }
        Ok(None)
    }

    /// Start a transaction over the given files.
    ///
    /// Refuses if any prior transaction is still `InProgress`.
    pub fn begin(&self, file_paths: Vec<PathBuf>) -> Result<ActiveTransaction<'_>, TxnError> {
        if let Some((_, journal)) = self.find_in_progress()? {
            return Err(TxnError::IncompleteTransaction {
                transaction_id: journal.transaction_id,
            });
        }

        let transaction_id = Uuid::new_v4().to_string();
        let journal = TransactionJournal {
            transaction_id: transaction_id.clone(),
            status: TxnStatus::InProgress,
            operations: file_paths
                .into_iter()
                .map(|file_path| JournalOperation {
                    file_path,
                    status: OperationStatus::Pending,
                })
                .collect(),
        };
        let journal_path = self.journal_path(&transaction_id);
        write_journal(&journal_path, &journal)?;
        tracing::info!(
            "transaction {transaction_id}: begun with {} operations",
            journal.operations.len()
        );

        Ok(ActiveTransaction {
            manager: self,
            journal,
            journal_path,
        })
    }

    /// Roll an interrupted transaction back: restore every backed-up
    /// original, then remove the journal and backup directory.
    pub fn resume(&self) -> Result<RollbackReport, TxnError> {
        let Some((journal_path, mut journal)) = self.find_in_progress()? else {
            return Err(TxnError::NothingToResume {
                dir: self.storage_dir.clone(),
            });
        };

        let transaction_id = journal.transaction_id.clone();
        let mut restored = Vec::new();
        for op in &journal.operations {
            if op.status == OperationStatus::Pending {
                continue;
            }
            let backup = self.backup_path(&transaction_id, &op.file_path);
            if backup.exists() {
                fs::copy(&backup, &op.file_path)?;
                restored.push(op.file_path.clone());
            }
        }

        journal.status = TxnStatus::RolledBack;
        write_journal(&journal_path, &journal)?;

        let backup_dir = self.backup_dir(&transaction_id);
        if backup_dir.exists() {
            fs::remove_dir_all(&backup_dir)?;
        }
        fs::remove_file(&journal_path)?;
        tracing::info!(
            "transaction {transaction_id}: rolled back, {} files restored",
            restored.len()
        );

        Ok(RollbackReport {
            transaction_id,
            restored,
        })
    }
}

/// A transaction between `begin` and `commit`.
///
/// Dropping it without committing leaves the journal `InProgress` on
/// disk, which is exactly the crash contract: the next run must resume.
pub struct ActiveTransaction<'m> {
    manager: &'m TransactionManager,
    journal: TransactionJournal,
    journal_path: PathBuf,
}

impl ActiveTransaction<'_> {
    pub fn transaction_id(&self) -> &str {
        &self.journal.transaction_id
    }

    /// Copy every existing original into the backup directory.
    pub fn backup(&mut self) -> Result<(), TxnError> {
        let backup_dir = self.manager.backup_dir(&self.journal.transaction_id);
        fs::create_dir_all(&backup_dir)?;

        for idx in 0..self.journal.operations.len() {
            let original = self.journal.operations[idx].file_path.clone();
            if !original.exists() {
                continue;
            }
            let backup = self
                .manager
                .backup_path(&self.journal.transaction_id, &original);
            fs::copy(&original, &backup)?;
            self.journal.operations[idx].status = OperationStatus::BackedUp;
            write_journal(&self.journal_path, &self.journal)?;
        }
        Ok(())
    }

    /// Record that an operation is being executed.
    pub fn mark_processing(&mut self, file_path: &Path) -> Result<(), TxnError> {
        self.set_status(file_path, OperationStatus::Processing)
    }

    /// Record that an operation finished.
    pub fn mark_completed(&mut self, file_path: &Path) -> Result<(), TxnError> {
        self.set_status(file_path, OperationStatus::Completed)
    }

    fn set_status(&mut self, file_path: &Path, status: OperationStatus) -> Result<(), TxnError> {
        let mut changed = false;
        for op in &mut self.journal.operations {
            if op.file_path == file_path {
                op.status = status;
                changed = true;
            }
        }
        if changed {
            write_journal(&self.journal_path, &self.journal)?;
        }
        Ok(())
    }

    /// Finish the transaction: journal goes `Committed`, then backups and
    /// the journal itself are removed.
    pub fn commit(mut self) -> Result<(), TxnError> {
        self.journal.status = TxnStatus::Committed;
        write_journal(&self.journal_path, &self.journal)?;

        let backup_dir = self.manager.backup_dir(&self.journal.transaction_id);
        if backup_dir.exists() {
            fs::remove_dir_all(&backup_dir)?;
        }
        fs::remove_file(&self.journal_path)?;
        tracing::info!("transaction {}: committed", self.journal.transaction_id);
        Ok(())
    }
}

fn write_journal(path: &Path, journal: &TransactionJournal) -> Result<(), TxnError> {
    let mut bytes = serde_json::to_vec_pretty(journal)?;
    bytes.push(b'\n');
    fsio::atomic_write(path, &bytes)?;
    Ok(())
}
