//! SQLite implementation of the StatusStore trait

use super::{FileStatus, LogFileRecord, PersistenceError, StatusStore};
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

/// SQLite-based job status storage
///
/// A single connection guarded by a mutex; every statement runs under the
/// lock so claims are atomic with respect to other threads of the process.
pub struct SqliteStatusStore {
    conn: Mutex<Connection>,
}

impl SqliteStatusStore {
    /// Open (or create) the database at the specified path
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self, PersistenceError> {
        let conn = Connection::open(db_path)?;
        let store = SqliteStatusStore {
            conn: Mutex::new(conn),
        };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Create an in-memory SQLite database (useful for testing)
    pub fn in_memory() -> Result<Self, PersistenceError> {
        let conn = Connection::open_in_memory()?;
        let store = SqliteStatusStore {
            conn: Mutex::new(conn),
        };
        store.initialize_schema()?;
        Ok(store)
    }

    fn initialize_schema(&self) -> Result<(), PersistenceError> {
        let conn = self.lock()?;
        conn.execute_batch(include_str!("schema.sql"))?;
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, PersistenceError> {
        self.conn.lock().map_err(|_| PersistenceError::LockPoisoned)
    }

    fn file_exists(conn: &Connection, id: i64) -> Result<bool, PersistenceError> {
        let found = conn
            .query_row("SELECT 1 FROM log_files WHERE id = ?", params![id], |_| Ok(()))
            .optional()?;
        Ok(found.is_some())
    }

    fn to_record(id: i64, path: String, status: String, progress: i64) -> Result<LogFileRecord, PersistenceError> {
        let status = FileStatus::from_str(&status)
            .ok_or_else(|| PersistenceError::InvalidData(format!("Unknown status: {}", status)))?;
        let progress = u8::try_from(progress)
            .ok()
            .filter(|p| *p <= 100)
            .ok_or_else(|| PersistenceError::InvalidData(format!("Invalid progress: {}", progress)))?;
        Ok(LogFileRecord {
            id,
            path: PathBuf::from(path),
            status,
            progress,
        })
    }
}

fn check_progress(progress: u8) -> Result<(), PersistenceError> {
    if progress > 100 {
        return Err(PersistenceError::InvalidData(format!(
            "Progress out of range: {}",
            progress
        )));
    }
    Ok(())
}

impl StatusStore for SqliteStatusStore {
    fn register_file(&self, path: &Path) -> Result<i64, PersistenceError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO log_files (path, status, progress) VALUES (?, 'pending', 0)",
            params![path.to_string_lossy().into_owned()],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn get_file(&self, id: i64) -> Result<LogFileRecord, PersistenceError> {
        let conn = self.lock()?;
        let row = conn
            .query_row(
                "SELECT path, status, progress FROM log_files WHERE id = ?",
                params![id],
                |row| {
                    let path: String = row.get(0)?;
                    let status: String = row.get(1)?;
                    let progress: i64 = row.get(2)?;
                    Ok((path, status, progress))
                },
            )
            .optional()?;

        match row {
            Some((path, status, progress)) => Self::to_record(id, path, status, progress),
            None => Err(PersistenceError::NotFound(id)),
        }
    }

    fn set_status(&self, id: i64, status: FileStatus, progress: u8) -> Result<(), PersistenceError> {
        check_progress(progress)?;
        let conn = self.lock()?;
        let updated = conn.execute(
            "UPDATE log_files SET status = ?, progress = ?, updated_at = strftime('%s', 'now')
             WHERE id = ?",
            params![status.as_str(), progress, id],
        )?;
        if updated == 0 {
            return Err(PersistenceError::NotFound(id));
        }
        Ok(())
    }

    fn set_progress(&self, id: i64, progress: u8) -> Result<(), PersistenceError> {
        check_progress(progress)?;
        let conn = self.lock()?;
        let updated = conn.execute(
            "UPDATE log_files SET progress = ?, updated_at = strftime('%s', 'now') WHERE id = ?",
            params![progress, id],
        )?;
        if updated == 0 {
            return Err(PersistenceError::NotFound(id));
        }
        Ok(())
    }

    fn claim(&self, id: i64) -> Result<bool, PersistenceError> {
        let conn = self.lock()?;
        let updated = conn.execute(
            "UPDATE log_files SET status = 'processing', progress = 0,
             updated_at = strftime('%s', 'now')
             WHERE id = ? AND status != 'processing'",
            params![id],
        )?;
        if updated == 0 && !Self::file_exists(&conn, id)? {
            return Err(PersistenceError::NotFound(id));
        }
        Ok(updated == 1)
    }

    fn pending_files(&self, limit: usize) -> Result<Vec<LogFileRecord>, PersistenceError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, path, status, progress FROM log_files
             WHERE status = 'pending'
             ORDER BY id ASC
             LIMIT ?",
        )?;

        let rows = stmt
            .query_map(params![limit as i64], |row| {
                let id: i64 = row.get(0)?;
                let path: String = row.get(1)?;
                let status: String = row.get(2)?;
                let progress: i64 = row.get(3)?;
                Ok((id, path, status, progress))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(id, path, status, progress)| Self::to_record(id, path, status, progress))
            .collect()
    }

    fn save_result(&self, id: i64, category: &str, document: &Value) -> Result<(), PersistenceError> {
        let data = serde_json::to_string(document)?;
        let conn = self.lock()?;
        if !Self::file_exists(&conn, id)? {
            return Err(PersistenceError::NotFound(id));
        }
        conn.execute(
            "INSERT OR REPLACE INTO analysis_results (log_file_id, analysis_type, result_data)
             VALUES (?, ?, ?)",
            params![id, category, data],
        )?;
        Ok(())
    }

    fn get_results(&self, id: i64) -> Result<BTreeMap<String, Value>, PersistenceError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT analysis_type, result_data FROM analysis_results WHERE log_file_id = ?",
        )?;

        let rows = stmt
            .query_map(params![id], |row| {
                let category: String = row.get(0)?;
                let data: String = row.get(1)?;
                Ok((category, data))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut results = BTreeMap::new();
        for (category, data) in rows {
            results.insert(category, serde_json::from_str(&data)?);
        }
        Ok(results)
    }

    fn replace_results(&self, id: i64, documents: &[(&str, Value)]) -> Result<(), PersistenceError> {
        let mut conn = self.lock()?;
        if !Self::file_exists(&conn, id)? {
            return Err(PersistenceError::NotFound(id));
        }

        let tx = conn.transaction()?;
        tx.execute(
            "DELETE FROM analysis_results WHERE log_file_id = ?",
            params![id],
        )?;
        for (category, document) in documents {
            tx.execute(
                "INSERT INTO analysis_results (log_file_id, analysis_type, result_data)
                 VALUES (?, ?, ?)",
                params![id, category, serde_json::to_string(document)?],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    fn clear_results(&self, id: i64) -> Result<usize, PersistenceError> {
        let conn = self.lock()?;
        let deleted = conn.execute(
            "DELETE FROM analysis_results WHERE log_file_id = ?",
            params![id],
        )?;
        Ok(deleted)
    }
}
