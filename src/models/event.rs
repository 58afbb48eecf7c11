use chrono::{DateTime, FixedOffset, NaiveDate, Timelike};
use serde::{Deserialize, Serialize};

/// Normalized severity of a system log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

/// A single parsed log line.
///
/// Entries keep file order; they are not re-sorted by timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<FixedOffset>,
    pub hostname: String,
    pub service: String,
    pub pid: Option<String>,
    pub message: String,
    /// Only populated by the system analyzer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
}

impl LogEntry {
    /// Hour of day on the entry's own wall clock (0-23)
    pub fn hour(&self) -> u32 {
        self.timestamp.hour()
    }

    /// Calendar date on the entry's own wall clock
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date_naive()
    }

    pub fn is_error(&self) -> bool {
        self.severity == Some(Severity::Error)
    }
}

/// Outcome of an authentication attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Success,
    Failure,
}

/// Authentication event derived from an auth-relevant [`LogEntry`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthEvent {
    pub timestamp: DateTime<FixedOffset>,
    pub outcome: Outcome,
    /// `"unknown"` when no user could be extracted
    pub user: String,
    /// `"unknown"` when no source address could be extracted
    pub source_ip: String,
    pub message: String,
}

impl AuthEvent {
    pub fn is_failure(&self) -> bool {
        self.outcome == Outcome::Failure
    }

    pub fn hour(&self) -> u32 {
        self.timestamp.hour()
    }

    pub fn date(&self) -> NaiveDate {
        self.timestamp.date_naive()
    }
}
