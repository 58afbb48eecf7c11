use chrono::{DateTime, FixedOffset};
use serde::Serialize;
use std::collections::BTreeMap;

use super::event::Severity;
use super::serialize_log_time;

/// Message reported in a degenerate summary
pub const NO_VALID_ENTRIES: &str = "no valid entries";

/// Success / failure tally for one user or source address
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OutcomeCounts {
    pub success: usize,
    pub failure: usize,
}

impl OutcomeCounts {
    pub fn total(&self) -> usize {
        self.success + self.failure
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AuthHourlyBucket {
    pub hour: u32,
    pub success: usize,
    pub failure: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SystemHourlyBucket {
    pub hour: u32,
    pub info: usize,
    pub warning: usize,
    pub error: usize,
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorMessageCount {
    pub message: String,
    pub count: usize,
}

/// Summary produced by the authentication analyzer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuthSummary {
    pub total_entries: usize,
    pub auth_events: usize,
    pub success_count: usize,
    pub failure_count: usize,
    /// Percentage in [0, 100]; 0 when there are no auth events
    pub success_rate: f64,
    pub user_attempts: BTreeMap<String, OutcomeCounts>,
    pub ip_attempts: BTreeMap<String, OutcomeCounts>,
    /// Always 24 buckets, hour 0 first
    pub hourly_attempts: Vec<AuthHourlyBucket>,
    #[serde(serialize_with = "serialize_log_time")]
    pub log_start_time: DateTime<FixedOffset>,
    #[serde(serialize_with = "serialize_log_time")]
    pub log_end_time: DateTime<FixedOffset>,
}

/// Summary produced by the system analyzer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SystemSummary {
    pub total_entries: usize,
    pub service_distribution: BTreeMap<String, usize>,
    pub severity_distribution: BTreeMap<Severity, usize>,
    /// Always 24 buckets, hour 0 first
    pub hourly_distribution: Vec<SystemHourlyBucket>,
    pub common_errors: Vec<ErrorMessageCount>,
    #[serde(serialize_with = "serialize_log_time")]
    pub log_start_time: DateTime<FixedOffset>,
    #[serde(serialize_with = "serialize_log_time")]
    pub log_end_time: DateTime<FixedOffset>,
}

impl SystemSummary {
    pub fn count_of(&self, severity: Severity) -> usize {
        self.severity_distribution.get(&severity).copied().unwrap_or(0)
    }
}

/// Summary of a pass that produced no entries
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmptySummary {
    pub total_entries: usize,
    pub error: String,
}

impl Default for EmptySummary {
    fn default() -> Self {
        EmptySummary {
            total_entries: 0,
            error: NO_VALID_ENTRIES.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Summary {
    Auth(AuthSummary),
    System(SystemSummary),
    Empty(EmptySummary),
}

impl Summary {
    pub fn total_entries(&self) -> usize {
        match self {
            Summary::Auth(s) => s.total_entries,
            Summary::System(s) => s.total_entries,
            Summary::Empty(s) => s.total_entries,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Summary::Empty(_))
    }
}

impl From<AuthSummary> for Summary {
    fn from(summary: AuthSummary) -> Self {
        Summary::Auth(summary)
    }
}

impl From<SystemSummary> for Summary {
    fn from(summary: SystemSummary) -> Self {
        Summary::System(summary)
    }
}
