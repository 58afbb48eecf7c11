//! Data model shared by the parser, the detectors and the result document.

pub mod anomaly;
pub mod event;
pub mod report;
pub mod summary;

pub use anomaly::{Anomaly, AnomalyKind, AnomalySeverity};
pub use event::{AuthEvent, LogEntry, Outcome, Severity};
pub use report::{AnalysisResult, CategoryCounts, TrendLabel, TrendPoint, Trends};
pub use summary::{
    AuthHourlyBucket, AuthSummary, EmptySummary, ErrorMessageCount, OutcomeCounts, Summary,
    SystemHourlyBucket, SystemSummary,
};

use chrono::{DateTime, FixedOffset};
use serde::Serializer;

/// Layout used for every human-facing instant in a result document
pub const LOG_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Serialize an instant with [`LOG_TIME_FORMAT`]
pub(crate) fn serialize_log_time<S>(
    time: &DateTime<FixedOffset>,
    serializer: S,
) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.collect_str(&time.format(LOG_TIME_FORMAT))
}
