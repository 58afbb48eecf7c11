use chrono::{DateTime, FixedOffset};
use serde::Serialize;

use super::serialize_log_time;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AnomalySeverity {
    Medium,
    High,
}

/// Kind-specific payload of a finding, serialized under `"type"`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnomalyKind {
    UserHighFailure {
        user: String,
        failure_count: usize,
        success_count: usize,
    },
    IpHighFailure {
        ip: String,
        failure_count: usize,
        success_count: usize,
    },
    UnusualLoginTime {
        hour: u32,
        attempt_count: usize,
    },
    BruteForceAttempt {
        #[serde(serialize_with = "serialize_log_time")]
        start_time: DateTime<FixedOffset>,
        #[serde(serialize_with = "serialize_log_time")]
        end_time: DateTime<FixedOffset>,
        failure_count: usize,
        time_span_seconds: f64,
    },
    HighErrorRatio {
        error_count: usize,
        total_count: usize,
        error_ratio: f64,
    },
    ServiceHighErrors {
        service: String,
        error_count: usize,
        total_service_logs: usize,
        error_ratio: f64,
    },
    TimeBasedAnomaly {
        hour: u32,
        error_count: usize,
        avg_errors: f64,
        sample_messages: Vec<String>,
    },
}

impl AnomalyKind {
    pub fn name(&self) -> &'static str {
        match self {
            AnomalyKind::UserHighFailure { .. } => "user_high_failure",
            AnomalyKind::IpHighFailure { .. } => "ip_high_failure",
            AnomalyKind::UnusualLoginTime { .. } => "unusual_login_time",
            AnomalyKind::BruteForceAttempt { .. } => "brute_force_attempt",
            AnomalyKind::HighErrorRatio { .. } => "high_error_ratio",
            AnomalyKind::ServiceHighErrors { .. } => "service_high_errors",
            AnomalyKind::TimeBasedAnomaly { .. } => "time_based_anomaly",
        }
    }
}

/// A rule- or statistic-triggered finding
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Anomaly {
    #[serde(flatten)]
    pub kind: AnomalyKind,
    pub severity: AnomalySeverity,
    pub description: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_kind_flattened_next_to_severity() {
        let anomaly = Anomaly {
            kind: AnomalyKind::UnusualLoginTime {
                hour: 3,
                attempt_count: 7,
            },
            severity: AnomalySeverity::Medium,
            description: "7 login attempts at hour 3".to_string(),
        };

        assert_eq!(
            serde_json::to_value(&anomaly).unwrap(),
            json!({
                "type": "unusual_login_time",
                "hour": 3,
                "attempt_count": 7,
                "severity": "medium",
                "description": "7 login attempts at hour 3",
            })
        );
    }

    #[test]
    fn test_brute_force_times_formatted() {
        let start = DateTime::parse_from_rfc3339("2024-03-10T14:00:00+01:00").unwrap();
        let kind = AnomalyKind::BruteForceAttempt {
            start_time: start,
            end_time: start + chrono::Duration::seconds(12),
            failure_count: 5,
            time_span_seconds: 12.0,
        };

        let value = serde_json::to_value(&kind).unwrap();
        assert_eq!(value["type"], "brute_force_attempt");
        assert_eq!(value["start_time"], "2024-03-10 14:00:00");
        assert_eq!(value["end_time"], "2024-03-10 14:00:12");
        assert_eq!(kind.name(), "brute_force_attempt");
    }
}
