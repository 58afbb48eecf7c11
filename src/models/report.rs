use chrono::NaiveDate;
use serde::Serialize;

use super::anomaly::Anomaly;
use super::summary::{EmptySummary, Summary};

/// Per-category counts of one trend point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum CategoryCounts {
    Auth {
        success: usize,
        failure: usize,
    },
    System {
        info: usize,
        warning: usize,
        error: usize,
    },
}

impl CategoryCounts {
    pub fn total(&self) -> usize {
        match *self {
            CategoryCounts::Auth { success, failure } => success + failure,
            CategoryCounts::System {
                info,
                warning,
                error,
            } => info + warning + error,
        }
    }

    /// Failures for auth points, errors for system points
    pub fn adverse(&self) -> usize {
        match *self {
            CategoryCounts::Auth { failure, .. } => failure,
            CategoryCounts::System { error, .. } => error,
        }
    }
}

/// Counts for one calendar date
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrendPoint {
    pub date: NaiveDate,
    #[serde(flatten)]
    pub counts: CategoryCounts,
    pub total: usize,
}

impl TrendPoint {
    pub fn new(date: NaiveDate, counts: CategoryCounts) -> Self {
        TrendPoint {
            date,
            total: counts.total(),
            counts,
        }
    }

    /// Failure or error rate of the day, 0 when the day is empty
    pub fn adverse_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.counts.adverse() as f64 / self.total as f64
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendLabel {
    Rising,
    Stable,
    Falling,
    InsufficientData,
}

impl TrendLabel {
    pub fn describe(&self) -> &'static str {
        match self {
            TrendLabel::Rising => "rate rose noticeably since the previous day",
            TrendLabel::Stable => "rate is stable",
            TrendLabel::Falling => "rate fell noticeably since the previous day",
            TrendLabel::InsufficientData => "not enough data to analyze the trend",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trends {
    pub series: Vec<TrendPoint>,
    pub trend_description: TrendLabel,
    /// Latest rate minus the previous day's rate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate_change: Option<f64>,
}

impl Default for Trends {
    fn default() -> Self {
        Trends {
            series: Vec::new(),
            trend_description: TrendLabel::InsufficientData,
            rate_change: None,
        }
    }
}

/// Everything one analysis pass hands to the persistence collaborator
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisResult {
    pub summary: Summary,
    pub anomalies: Vec<Anomaly>,
    pub trends: Trends,
}

impl AnalysisResult {
    /// Result of a pass over a source with no parseable lines
    pub fn empty() -> Self {
        AnalysisResult {
            summary: Summary::Empty(EmptySummary::default()),
            anomalies: Vec::new(),
            trends: Trends::default(),
        }
    }
}
