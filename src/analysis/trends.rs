//! Day-over-day trend classification

use chrono::NaiveDate;
use std::collections::BTreeMap;

use crate::config::TrendConfig;
use crate::models::{
    AuthEvent, CategoryCounts, LogEntry, Outcome, Severity, TrendLabel, TrendPoint, Trends,
};

/// One success/failure point per calendar date, oldest first
pub fn daily_auth_series(events: &[AuthEvent]) -> Vec<TrendPoint> {
    let mut days: BTreeMap<NaiveDate, (usize, usize)> = BTreeMap::new();
    for event in events {
        let day = days.entry(event.date()).or_default();
        match event.outcome {
            Outcome::Success => day.0 += 1,
            Outcome::Failure => day.1 += 1,
        }
    }

    days.into_iter()
        .map(|(date, (success, failure))| {
            TrendPoint::new(date, CategoryCounts::Auth { success, failure })
        })
        .collect()
}

/// One info/warning/error point per calendar date, oldest first
pub fn daily_system_series(entries: &[LogEntry]) -> Vec<TrendPoint> {
    let mut days: BTreeMap<NaiveDate, [usize; 3]> = BTreeMap::new();
    for entry in entries {
        let day = days.entry(entry.date()).or_default();
        match entry.severity.unwrap_or(Severity::Info) {
            Severity::Info => day[0] += 1,
            Severity::Warning => day[1] += 1,
            Severity::Error => day[2] += 1,
        }
    }

    days.into_iter()
        .map(|(date, [info, warning, error])| {
            TrendPoint::new(
                date,
                CategoryCounts::System {
                    info,
                    warning,
                    error,
                },
            )
        })
        .collect()
}

/// Label a series by the change between its last two points
pub fn classify(series: &[TrendPoint], config: &TrendConfig) -> (TrendLabel, Option<f64>) {
    let [.., previous, latest] = series else {
        return (TrendLabel::InsufficientData, None);
    };

    let change = latest.adverse_rate() - previous.adverse_rate();
    let label = if change > config.rate_change_threshold {
        TrendLabel::Rising
    } else if change < -config.rate_change_threshold {
        TrendLabel::Falling
    } else {
        TrendLabel::Stable
    };
    (label, Some(change))
}

/// Wrap a series with its label
pub fn build_trends(series: Vec<TrendPoint>, config: &TrendConfig) -> Trends {
    let (trend_description, rate_change) = classify(&series, config);
    Trends {
        series,
        trend_description,
        rate_change,
    }
}
