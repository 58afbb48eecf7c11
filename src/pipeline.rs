//! Analysis jobs
//!
//! Wraps the engine with the bookkeeping of a stored log file: claim, progress
//! updates, result storage and the final status. Also hosts the async helpers
//! used by the binaries to run several analyses at once.

use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;

use crate::analysis::{analyze_file, run_guarded, to_document};
use crate::config::Config;
use crate::models::AnalysisResult;
use crate::persistence::{FileStatus, PersistenceError, StatusStore};

/// How a job ended
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    /// Results stored, file marked completed
    Completed { categories: usize },
    /// File marked failed with the reason
    Failed(String),
    /// Another worker already holds the file
    AlreadyProcessing,
}

/// Run one analysis job for a registered file
///
/// Progress goes 0, 10, 80 and finally 100 on success. Any fault after the
/// claim, analysis or store alike, leaves the file failed at 0. Store errors
/// are still returned to the caller.
pub fn process_log_file(
    store: &dyn StatusStore,
    file_id: i64,
    config: &Config,
) -> Result<JobOutcome, PersistenceError> {
    if !store.claim(file_id)? {
        log::debug!("Log file {} is already being processed", file_id);
        return Ok(JobOutcome::AlreadyProcessing);
    }

    match run_claimed(store, file_id, config) {
        Ok(outcome) => Ok(outcome),
        Err(e) => {
            log::error!("Store error while processing log file {}: {}", file_id, e);
            if let Err(mark) = store.set_status(file_id, FileStatus::Failed, 0) {
                log::error!("Could not mark log file {} as failed: {}", file_id, mark);
            }
            Err(e)
        }
    }
}

fn run_claimed(
    store: &dyn StatusStore,
    file_id: i64,
    config: &Config,
) -> Result<JobOutcome, PersistenceError> {
    store.set_progress(file_id, 0)?;

    let record = store.get_file(file_id)?;
    if !record.path.exists() {
        let message = format!("file not found: {}", record.path.display());
        log::warn!("Log file {} failed: {}", file_id, message);
        store.set_status(file_id, FileStatus::Failed, 0)?;
        return Ok(JobOutcome::Failed(message));
    }
    store.set_progress(file_id, 10)?;

    let document = to_document(run_guarded(|| {
        analyze_file(&record.path, config).map(|(_, result)| result)
    }));
    store.set_progress(file_id, 80)?;

    if let Some(message) = document.get("error").and_then(Value::as_str) {
        log::warn!("Log file {} failed: {}", file_id, message);
        store.set_status(file_id, FileStatus::Failed, 0)?;
        return Ok(JobOutcome::Failed(message.to_string()));
    }

    let categories: Vec<(&str, Value)> = ["summary", "anomalies", "trends"]
        .into_iter()
        .filter_map(|key| document.get(key).map(|value| (key, value.clone())))
        .filter(|(_, value)| !is_empty_category(value))
        .collect();
    store.replace_results(file_id, &categories)?;

    store.set_status(file_id, FileStatus::Completed, 100)?;
    log::info!(
        "Log file {} completed with {} stored categories",
        file_id,
        categories.len()
    );
    Ok(JobOutcome::Completed {
        categories: categories.len(),
    })
}

fn is_empty_category(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Array(items) => items.is_empty(),
        Value::Object(fields) => fields.is_empty(),
        _ => false,
    }
}

/// Analyze several files at once on the blocking pool
///
/// Results come back in the order of `paths`.
pub async fn analyze_many(
    paths: Vec<PathBuf>,
    config: Arc<Config>,
) -> Vec<(PathBuf, Result<AnalysisResult, String>)> {
    let handles: Vec<_> = paths
        .into_iter()
        .map(|path| {
            let config = Arc::clone(&config);
            let task_path = path.clone();
            let handle = tokio::task::spawn_blocking(move || {
                run_guarded(|| analyze_file(&task_path, &config).map(|(_, result)| result))
            });
            (path, handle)
        })
        .collect();

    let mut results = Vec::with_capacity(handles.len());
    for (path, handle) in handles {
        let outcome = match handle.await {
            Ok(outcome) => outcome,
            Err(e) => Err(format!("analysis task failed: {}", e)),
        };
        results.push((path, outcome));
    }
    results
}

/// Process up to `storage.worker_concurrency` pending files concurrently
///
/// Returns how many jobs ran to a final status.
pub async fn run_pending(
    store: Arc<dyn StatusStore>,
    config: Arc<Config>,
) -> Result<usize, PersistenceError> {
    let limit = config.storage.worker_concurrency.max(1);
    let pending = store.pending_files(limit)?;
    if pending.is_empty() {
        return Ok(0);
    }
    log::info!("Processing {} pending log file(s)", pending.len());

    let handles: Vec<_> = pending
        .into_iter()
        .map(|record| {
            let store = Arc::clone(&store);
            let config = Arc::clone(&config);
            let id = record.id;
            let handle =
                tokio::task::spawn_blocking(move || process_log_file(store.as_ref(), id, &config));
            (id, handle)
        })
        .collect();

    let mut finished = 0;
    for (id, handle) in handles {
        match handle.await {
            Ok(Ok(JobOutcome::AlreadyProcessing)) => {}
            Ok(Ok(_)) => finished += 1,
            Ok(Err(e)) => log::error!("Store error while processing log file {}: {}", id, e),
            Err(e) => log::error!("Job for log file {} did not finish: {}", id, e),
        }
    }
    Ok(finished)
}
