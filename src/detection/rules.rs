//! Rule based and statistical anomaly checks
//!
//! Each rule reads a finalized summary (and, where needed, the entry
//! sequence) and returns its findings. Rules are independent of each other.

use std::collections::BTreeMap;

use super::stats;
use crate::config::{AuthRuleConfig, SystemRuleConfig};
use crate::models::{
    Anomaly, AnomalyKind, AnomalySeverity, AuthSummary, LogEntry, Severity, SystemSummary,
};

/// Users whose failures exceed both a floor and a multiple of their successes
pub fn user_high_failure(summary: &AuthSummary, config: &AuthRuleConfig) -> Vec<Anomaly> {
    summary
        .user_attempts
        .iter()
        .filter(|(_, counts)| {
            counts.failure > config.user_min_failures
                && counts.failure > counts.success * config.user_failure_ratio
        })
        .map(|(user, counts)| Anomaly {
            kind: AnomalyKind::UserHighFailure {
                user: user.clone(),
                failure_count: counts.failure,
                success_count: counts.success,
            },
            severity: if counts.failure > config.user_high_failures {
                AnomalySeverity::High
            } else {
                AnomalySeverity::Medium
            },
            description: format!(
                "User '{}' has far more failed logins ({}) than successful ones ({})",
                user, counts.failure, counts.success
            ),
        })
        .collect()
}

/// Source addresses with many failed logins
pub fn ip_high_failure(summary: &AuthSummary, config: &AuthRuleConfig) -> Vec<Anomaly> {
    summary
        .ip_attempts
        .iter()
        .filter(|(_, counts)| counts.failure > config.ip_min_failures)
        .map(|(ip, counts)| Anomaly {
            kind: AnomalyKind::IpHighFailure {
                ip: ip.clone(),
                failure_count: counts.failure,
                success_count: counts.success,
            },
            severity: if counts.failure > config.ip_high_failures {
                AnomalySeverity::High
            } else {
                AnomalySeverity::Medium
            },
            description: format!(
                "Source address {} has {} failed login attempts",
                ip, counts.failure
            ),
        })
        .collect()
}

/// Busy hours inside the night window
pub fn unusual_login_time(summary: &AuthSummary, config: &AuthRuleConfig) -> Vec<Anomaly> {
    summary
        .hourly_attempts
        .iter()
        .filter(|bucket| {
            (config.night_start_hour..=config.night_end_hour).contains(&bucket.hour)
                && bucket.total > config.night_min_attempts
        })
        .map(|bucket| Anomaly {
            kind: AnomalyKind::UnusualLoginTime {
                hour: bucket.hour,
                attempt_count: bucket.total,
            },
            severity: AnomalySeverity::Medium,
            description: format!(
                "{} login attempts at unusual hour {:02}:00",
                bucket.total, bucket.hour
            ),
        })
        .collect()
}

/// Error entries make up too large a share of the file
pub fn high_error_ratio(summary: &SystemSummary, config: &SystemRuleConfig) -> Option<Anomaly> {
    if summary.total_entries == 0 {
        return None;
    }

    let error_count = summary.count_of(Severity::Error);
    let ratio = error_count as f64 / summary.total_entries as f64;
    if ratio <= config.error_ratio {
        return None;
    }

    Some(Anomaly {
        kind: AnomalyKind::HighErrorRatio {
            error_count,
            total_count: summary.total_entries,
            error_ratio: ratio,
        },
        severity: if ratio > config.high_error_ratio {
            AnomalySeverity::High
        } else {
            AnomalySeverity::Medium
        },
        description: format!(
            "Error entries make up {:.1}% of the log",
            ratio * 100.0
        ),
    })
}

/// Services whose own entries are mostly errors
pub fn service_high_errors(
    entries: &[LogEntry],
    summary: &SystemSummary,
    config: &SystemRuleConfig,
) -> Vec<Anomaly> {
    let mut errors_by_service: BTreeMap<&str, usize> = BTreeMap::new();
    for entry in entries.iter().filter(|entry| entry.is_error()) {
        *errors_by_service.entry(entry.service.as_str()).or_default() += 1;
    }

    errors_by_service
        .into_iter()
        .filter_map(|(service, error_count)| {
            let total = summary.service_distribution.get(service).copied().unwrap_or(0);
            if total == 0 || error_count <= config.service_min_errors {
                return None;
            }
            let ratio = error_count as f64 / total as f64;
            if ratio <= config.service_error_ratio {
                return None;
            }

            Some(Anomaly {
                kind: AnomalyKind::ServiceHighErrors {
                    service: service.to_string(),
                    error_count,
                    total_service_logs: total,
                    error_ratio: ratio,
                },
                severity: AnomalySeverity::High,
                description: format!(
                    "Service {} logged {} errors ({:.1}% of its entries)",
                    service,
                    error_count,
                    ratio * 100.0
                ),
            })
        })
        .collect()
}

/// Hours whose error count sits far above the hourly mean
pub fn time_based_anomalies(entries: &[LogEntry], config: &SystemRuleConfig) -> Vec<Anomaly> {
    if entries.len() <= config.time_min_entries {
        return Vec::new();
    }

    let mut hourly_errors = [0usize; 24];
    for entry in entries.iter().filter(|entry| entry.is_error()) {
        hourly_errors[entry.hour() as usize] += 1;
    }
    if hourly_errors.iter().all(|&count| count == 0) {
        return Vec::new();
    }

    let counts: Vec<f64> = hourly_errors.iter().map(|&count| count as f64).collect();
    let mean = stats::mean(&counts);
    let std_dev = stats::std_dev(&counts);
    if std_dev <= 0.0 {
        return Vec::new();
    }
    let limit = mean + config.stddev_factor * std_dev;

    (0u32..24)
        .filter(|&hour| hourly_errors[hour as usize] as f64 > limit)
        .map(|hour| {
            let error_count = hourly_errors[hour as usize];
            let sample_messages = entries
                .iter()
                .filter(|entry| entry.is_error() && entry.hour() == hour)
                .take(config.sample_messages)
                .map(|entry| entry.message.clone())
                .collect();

            Anomaly {
                kind: AnomalyKind::TimeBasedAnomaly {
                    hour,
                    error_count,
                    avg_errors: mean,
                    sample_messages,
                },
                severity: AnomalySeverity::Medium,
                description: format!(
                    "Unusually many errors at hour {:02}:00 ({} against an hourly mean of {:.1})",
                    hour, error_count, mean
                ),
            }
        })
        .collect()
}
