//! Summary aggregation
//!
//! Pure functions over the immutable entry/event sequences. Every map and
//! hourly array is built here and returned finalized.

use chrono::{DateTime, FixedOffset};
use std::collections::{BTreeMap, HashMap};

use crate::models::{
    AuthEvent, AuthHourlyBucket, AuthSummary, ErrorMessageCount, LogEntry, Outcome,
    OutcomeCounts, Severity, SystemHourlyBucket, SystemSummary,
};

/// Distinct error messages listed in a system summary
pub const COMMON_ERROR_LIMIT: usize = 10;

const UNKNOWN: &str = "unknown";

/// Earliest and latest timestamp, regardless of file order
pub fn time_span(entries: &[LogEntry]) -> Option<(DateTime<FixedOffset>, DateTime<FixedOffset>)> {
    let start = entries.iter().map(|entry| entry.timestamp).min()?;
    let end = entries.iter().map(|entry| entry.timestamp).max()?;
    Some((start, end))
}

/// Tally outcomes per key. Events whose key is `None` are left out.
pub fn outcome_counts<'a, F>(events: &'a [AuthEvent], key: F) -> BTreeMap<String, OutcomeCounts>
where
    F: Fn(&'a AuthEvent) -> Option<&'a str>,
{
    let mut counts: BTreeMap<String, OutcomeCounts> = BTreeMap::new();
    for event in events {
        let Some(key) = key(event) else {
            continue;
        };
        let tally = counts.entry(key.to_string()).or_default();
        match event.outcome {
            Outcome::Success => tally.success += 1,
            Outcome::Failure => tally.failure += 1,
        }
    }
    counts
}

/// Per-hour success/failure counts, all 24 hours present
pub fn auth_hourly(events: &[AuthEvent]) -> Vec<AuthHourlyBucket> {
    let mut buckets: Vec<AuthHourlyBucket> = (0..24)
        .map(|hour| AuthHourlyBucket {
            hour,
            ..Default::default()
        })
        .collect();

    for event in events {
        let bucket = &mut buckets[event.hour() as usize];
        match event.outcome {
            Outcome::Success => bucket.success += 1,
            Outcome::Failure => bucket.failure += 1,
        }
        bucket.total += 1;
    }
    buckets
}

/// Per-hour severity counts, all 24 hours present
pub fn system_hourly(entries: &[LogEntry]) -> Vec<SystemHourlyBucket> {
    let mut buckets: Vec<SystemHourlyBucket> = (0..24)
        .map(|hour| SystemHourlyBucket {
            hour,
            ..Default::default()
        })
        .collect();

    for entry in entries {
        let bucket = &mut buckets[entry.hour() as usize];
        match entry.severity.unwrap_or(Severity::Info) {
            Severity::Info => bucket.info += 1,
            Severity::Warning => bucket.warning += 1,
            Severity::Error => bucket.error += 1,
        }
        bucket.total += 1;
    }
    buckets
}

/// Most frequent error messages; ties keep first-seen order
pub fn common_errors(entries: &[LogEntry], limit: usize) -> Vec<ErrorMessageCount> {
    let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();
    for (index, entry) in entries.iter().filter(|entry| entry.is_error()).enumerate() {
        counts.entry(entry.message.as_str()).or_insert((0, index)).0 += 1;
    }

    let mut ranked: Vec<(&str, usize, usize)> = counts
        .into_iter()
        .map(|(message, (count, first_seen))| (message, count, first_seen))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));

    ranked
        .into_iter()
        .take(limit)
        .map(|(message, count, _)| ErrorMessageCount {
            message: message.to_string(),
            count,
        })
        .collect()
}

/// Authentication summary; `None` when there are no entries
pub fn summarize_auth(entries: &[LogEntry], events: &[AuthEvent]) -> Option<AuthSummary> {
    let (log_start_time, log_end_time) = time_span(entries)?;

    let success_count = events
        .iter()
        .filter(|event| event.outcome == Outcome::Success)
        .count();
    let failure_count = events.len() - success_count;
    let success_rate = if events.is_empty() {
        0.0
    } else {
        success_count as f64 / events.len() as f64 * 100.0
    };

    Some(AuthSummary {
        total_entries: entries.len(),
        auth_events: events.len(),
        success_count,
        failure_count,
        success_rate,
        user_attempts: outcome_counts(events, |event| Some(event.user.as_str())),
        ip_attempts: outcome_counts(events, |event| {
            Some(event.source_ip.as_str()).filter(|ip| *ip != UNKNOWN)
        }),
        hourly_attempts: auth_hourly(events),
        log_start_time,
        log_end_time,
    })
}

/// System summary; `None` when there are no entries
pub fn summarize_system(entries: &[LogEntry]) -> Option<SystemSummary> {
    let (log_start_time, log_end_time) = time_span(entries)?;

    let mut service_distribution: BTreeMap<String, usize> = BTreeMap::new();
    let mut severity_distribution: BTreeMap<Severity, usize> = BTreeMap::new();
    for entry in entries {
        *service_distribution.entry(entry.service.clone()).or_default() += 1;
        *severity_distribution
            .entry(entry.severity.unwrap_or(Severity::Info))
            .or_default() += 1;
    }

    Some(SystemSummary {
        total_entries: entries.len(),
        service_distribution,
        severity_distribution,
        hourly_distribution: system_hourly(entries),
        common_errors: common_errors(entries, COMMON_ERROR_LIMIT),
        log_start_time,
        log_end_time,
    })
}
