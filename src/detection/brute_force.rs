//! Brute force detection
//!
//! Sorts auth events chronologically and slides a window of consecutive
//! events across them. A window qualifies when it holds enough failures
//! within a short span; only the worst qualifying window is reported.

use chrono::{DateTime, FixedOffset};

use crate::config::BruteForceConfig;
use crate::models::{Anomaly, AnomalyKind, AnomalySeverity, AuthEvent};

/// A qualifying window of consecutive auth events
#[derive(Debug, Clone, PartialEq)]
pub struct FailureBurst {
    pub start_time: DateTime<FixedOffset>,
    pub end_time: DateTime<FixedOffset>,
    pub failure_count: usize,
    pub time_span_seconds: f64,
}

/// Sliding window brute force detector
pub struct BruteForceDetector {
    config: BruteForceConfig,
}

impl BruteForceDetector {
    /// Create a detector with default thresholds
    pub fn new() -> Self {
        BruteForceDetector {
            config: BruteForceConfig::default(),
        }
    }

    /// Create with custom thresholds
    pub fn with_config(config: BruteForceConfig) -> Self {
        BruteForceDetector { config }
    }

    /// Find the qualifying window with the most failures
    ///
    /// Returns `None` when there are too few events or no window qualifies.
    /// Among windows with equal failure counts the earliest one is kept.
    pub fn worst_burst(&self, events: &[AuthEvent]) -> Option<FailureBurst> {
        if events.len() <= self.config.min_events || self.config.window_size == 0 {
            return None;
        }

        let mut sorted: Vec<&AuthEvent> = events.iter().collect();
        sorted.sort_by_key(|event| event.timestamp);

        let mut worst: Option<FailureBurst> = None;
        for window in sorted.windows(self.config.window_size) {
            let failures = window.iter().filter(|event| event.is_failure()).count();
            if failures < self.config.min_failures {
                continue;
            }

            let first = window[0].timestamp;
            let last = window[window.len() - 1].timestamp;
            let span = last - first;
            if span.num_milliseconds() >= self.config.max_span_seconds * 1000 {
                continue;
            }

            let replaces = worst
                .as_ref()
                .map_or(true, |current| failures > current.failure_count);
            if replaces {
                worst = Some(FailureBurst {
                    start_time: first,
                    end_time: last,
                    failure_count: failures,
                    time_span_seconds: span.num_milliseconds() as f64 / 1000.0,
                });
            }
        }

        worst
    }

    /// Report the worst burst as a single high severity finding
    pub fn detect(&self, events: &[AuthEvent]) -> Option<Anomaly> {
        let burst = self.worst_burst(events)?;
        Some(Anomaly {
            description: format!(
                "Possible brute force attempt: {} failed logins within {:.1} seconds",
                burst.failure_count, burst.time_span_seconds
            ),
            severity: AnomalySeverity::High,
            kind: AnomalyKind::BruteForceAttempt {
                start_time: burst.start_time,
                end_time: burst.end_time,
                failure_count: burst.failure_count,
                time_span_seconds: burst.time_span_seconds,
            },
        })
    }
}

impl Default for BruteForceDetector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Outcome;
    use chrono::{Duration, TimeZone, Utc};

    fn create_event(offset_seconds: i64, outcome: Outcome) -> AuthEvent {
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap().fixed_offset();
        AuthEvent {
            timestamp: base + Duration::seconds(offset_seconds),
            outcome,
            user: "root".to_string(),
            source_ip: "10.0.0.5".to_string(),
            message: "Failed password".to_string(),
        }
    }

    fn spaced(count: usize, step: i64, outcome: Outcome) -> Vec<AuthEvent> {
        (0..count)
            .map(|i| create_event(i as i64 * step, outcome))
            .collect()
    }

    #[test]
    fn test_requires_more_than_min_events() {
        let detector = BruteForceDetector::new();
        assert!(detector.detect(&spaced(10, 1, Outcome::Failure)).is_none());
        assert!(detector.detect(&spaced(11, 1, Outcome::Failure)).is_some());
    }

    #[test]
    fn test_rapid_failures_fire_once() {
        let detector = BruteForceDetector::new();
        let anomaly = detector.detect(&spaced(20, 10, Outcome::Failure)).unwrap();

        assert_eq!(anomaly.severity, AnomalySeverity::High);
        match anomaly.kind {
            AnomalyKind::BruteForceAttempt {
                failure_count,
                time_span_seconds,
                ..
            } => {
                assert_eq!(failure_count, 5);
                assert!((time_span_seconds - 40.0).abs() < 1e-9);
            }
            other => panic!("unexpected kind {:?}", other),
        }
    }

    #[test]
    fn test_slow_failures_do_not_fire() {
        let detector = BruteForceDetector::new();
        // 5 events span 4 * 75 = 300 seconds, which is not under the limit
        assert!(detector.detect(&spaced(15, 75, Outcome::Failure)).is_none());
        // 4 * 74 = 296 seconds is
        assert!(detector.detect(&spaced(15, 74, Outcome::Failure)).is_some());
    }

    #[test]
    fn test_needs_four_failures_per_window() {
        let detector = BruteForceDetector::new();
        let events: Vec<AuthEvent> = (0..15)
            .map(|i| {
                let outcome = if i % 2 == 0 { Outcome::Failure } else { Outcome::Success };
                create_event(i, outcome)
            })
            .collect();
        // alternating outcomes give at most 3 failures per 5-event window
        assert!(detector.worst_burst(&events).is_none());
    }

    #[test]
    fn test_strictly_greater_count_wins() {
        let detector = BruteForceDetector::new();
        let mut events = spaced(11, 1000, Outcome::Success);
        // window of 4 failures + 1 success early on
        for offset in [0i64, 10, 20, 30] {
            events.push(create_event(20_000 + offset, Outcome::Failure));
        }
        events.push(create_event(20_040, Outcome::Success));
        // later window of 5 failures
        for offset in [0i64, 5, 10, 15, 20] {
            events.push(create_event(40_000 + offset, Outcome::Failure));
        }

        let burst = detector.worst_burst(&events).unwrap();
        assert_eq!(burst.failure_count, 5);
        assert_eq!(burst.start_time, create_event(40_000, Outcome::Failure).timestamp);
    }

    #[test]
    fn test_equal_counts_keep_earliest() {
        let detector = BruteForceDetector::new();
        let mut events = spaced(11, 1000, Outcome::Success);
        for base in [20_000i64, 40_000] {
            for offset in [0i64, 1, 2, 3] {
                events.push(create_event(base + offset, Outcome::Failure));
            }
            events.push(create_event(base + 4, Outcome::Success));
        }

        let burst = detector.worst_burst(&events).unwrap();
        assert_eq!(burst.failure_count, 4);
        assert!(burst.start_time < create_event(40_000, Outcome::Failure).timestamp);
    }

    #[test]
    fn test_events_are_sorted_first() {
        let detector = BruteForceDetector::new();
        let mut events = spaced(12, 30, Outcome::Failure);
        events.reverse();
        let burst = detector.worst_burst(&events).unwrap();
        assert!(burst.start_time <= burst.end_time);
        assert!((burst.time_span_seconds - 120.0).abs() < 1e-9);
    }
}
