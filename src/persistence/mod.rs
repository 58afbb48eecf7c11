//! Persistence module for analysis jobs
//!
//! Tracks every registered log file through its processing lifecycle and
//! keeps the per-category analysis documents produced for it.

pub mod sqlite_store;

pub use sqlite_store::SqliteStatusStore;

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during persistence operations
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Log file {0} not found")]
    NotFound(i64),

    #[error("Invalid data in database: {0}")]
    InvalidData(String),

    #[error("Database lock poisoned")]
    LockPoisoned,

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Processing state of a registered log file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl FileStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileStatus::Pending => "pending",
            FileStatus::Processing => "processing",
            FileStatus::Completed => "completed",
            FileStatus::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(FileStatus::Pending),
            "processing" => Some(FileStatus::Processing),
            "completed" => Some(FileStatus::Completed),
            "failed" => Some(FileStatus::Failed),
            _ => None,
        }
    }
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A registered log file and its progress
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogFileRecord {
    pub id: i64,
    pub path: PathBuf,
    pub status: FileStatus,
    pub progress: u8,
}

/// Trait for job status backends
///
/// Implementations must be shareable across the worker's tasks.
pub trait StatusStore: Send + Sync {
    // =====================
    // Log Files
    // =====================

    /// Register a file for analysis; it starts out pending at 0%
    fn register_file(&self, path: &std::path::Path) -> Result<i64, PersistenceError>;

    /// Look up one registered file
    fn get_file(&self, id: i64) -> Result<LogFileRecord, PersistenceError>;

    /// Set status and progress together
    fn set_status(&self, id: i64, status: FileStatus, progress: u8) -> Result<(), PersistenceError>;

    /// Update progress only; values above 100 are rejected
    fn set_progress(&self, id: i64, progress: u8) -> Result<(), PersistenceError>;

    /// Move a file into processing unless another worker already holds it.
    /// Returns whether this caller won the claim.
    fn claim(&self, id: i64) -> Result<bool, PersistenceError>;

    /// Oldest pending files first
    fn pending_files(&self, limit: usize) -> Result<Vec<LogFileRecord>, PersistenceError>;

    // =====================
    // Analysis Results
    // =====================

    /// Store one category document, replacing any earlier one
    fn save_result(&self, id: i64, category: &str, document: &Value) -> Result<(), PersistenceError>;

    /// All category documents of a file keyed by category
    fn get_results(&self, id: i64) -> Result<BTreeMap<String, Value>, PersistenceError>;

    /// One category document
    fn get_result(&self, id: i64, category: &str) -> Result<Option<Value>, PersistenceError> {
        Ok(self.get_results(id)?.remove(category))
    }

    /// Drop every stored document of a file
    fn clear_results(&self, id: i64) -> Result<usize, PersistenceError>;

    /// Swap all stored documents of a file for `documents` in one step.
    /// On error the previously stored documents are left untouched.
    fn replace_results(&self, id: i64, documents: &[(&str, Value)]) -> Result<(), PersistenceError>;
}
