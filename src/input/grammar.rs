//! Line grammars
//!
//! Turns one raw log line into a [`LogEntry`]. Grammars are tried in a
//! fixed order and the first one that matches and yields a valid timestamp
//! wins. Lines that match no grammar are tried as a single JSON object.
//!
//! Syslog timestamps carry no year. The parser assumes the current calendar
//! year, so a December log analyzed in January is dated a year too late.

use chrono::{
    DateTime, Datelike, FixedOffset, Local, NaiveDate, NaiveDateTime, NaiveTime, Utc,
};
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;

use crate::models::LogEntry;

/// How the timestamp captured by a grammar is spelled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampStyle {
    /// `Jan  1 00:01:02`, no year
    Syslog,
    /// `2024-01-01 00:01:02`
    Absolute,
    /// `2024-01-01T00:01:02[.ffffff][Z|+HH:MM]`
    Iso8601,
}

/// One pattern grammar with its timestamp decoding rule
#[derive(Debug)]
pub struct LineGrammar {
    pub name: &'static str,
    pub style: TimestampStyle,
    pattern: Regex,
}

/// Raw captures of a grammar match
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineFields<'a> {
    pub timestamp: &'a str,
    pub hostname: &'a str,
    pub service: &'a str,
    pub pid: Option<&'a str>,
    pub message: &'a str,
}

impl LineGrammar {
    fn new(name: &'static str, style: TimestampStyle, pattern: &str) -> Self {
        LineGrammar {
            name,
            style,
            pattern: Regex::new(pattern).expect("line grammar pattern"),
        }
    }

    /// Match a trimmed line against this grammar
    pub fn captures<'a>(&self, line: &'a str) -> Option<LineFields<'a>> {
        let caps = self.pattern.captures(line)?;
        Some(LineFields {
            timestamp: caps.get(1)?.as_str(),
            hostname: caps.get(2)?.as_str(),
            service: caps.get(3)?.as_str(),
            pid: caps.get(4).map(|m| m.as_str()),
            message: caps.get(5)?.as_str(),
        })
    }
}

static GRAMMARS: LazyLock<[LineGrammar; 3]> = LazyLock::new(|| {
    [
        LineGrammar::new(
            "syslog",
            TimestampStyle::Syslog,
            r"^(\w{3}\s+\d+\s+\d+:\d+:\d+)\s+(\S+)\s+(\S+?)(?:\[(\d+)\])?:\s+(.+)$",
        ),
        LineGrammar::new(
            "absolute",
            TimestampStyle::Absolute,
            r"^(\d{4}-\d{2}-\d{2}\s+\d{2}:\d{2}:\d{2})\s+(\S+)\s+(\S+)\s+(\d+)\s+(.+)$",
        ),
        LineGrammar::new(
            "iso8601",
            TimestampStyle::Iso8601,
            r"^(\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}(?:\.\d+)?(?:Z|[+-]\d{2}:\d{2})?)\s+(\S+)\s+(\S+?)(?:\[(\d+)\])?:\s+(.+)$",
        ),
    ]
});

/// The ordered grammar table
pub fn grammars() -> &'static [LineGrammar] {
    GRAMMARS.as_slice()
}

/// A parsed line plus the explicit level a JSON line may carry
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedLine {
    pub entry: LogEntry,
    pub level: Option<String>,
}

/// Parses raw lines into entries
#[derive(Debug, Clone)]
pub struct LineParser {
    /// Year assumed for syslog timestamps
    year: i32,
}

impl LineParser {
    /// Parser assuming the current calendar year for syslog lines
    pub fn new() -> Self {
        LineParser {
            year: Local::now().year(),
        }
    }

    /// Parser with an explicit year for syslog lines
    pub fn with_year(year: i32) -> Self {
        LineParser { year }
    }

    /// Parse one raw line. Returns `None` for lines no grammar accepts.
    pub fn parse_line(&self, line: &str) -> Option<ParsedLine> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        let mut matched = false;
        for grammar in grammars() {
            let Some(fields) = grammar.captures(line) else {
                continue;
            };
            matched = true;

            match self.decode_timestamp(grammar.style, fields.timestamp) {
                Some(timestamp) => {
                    return Some(ParsedLine {
                        entry: LogEntry {
                            timestamp,
                            hostname: fields.hostname.to_string(),
                            service: fields.service.to_string(),
                            pid: fields.pid.map(str::to_string),
                            message: fields.message.to_string(),
                            severity: None,
                        },
                        level: None,
                    });
                }
                None => {
                    log::debug!(
                        "Bad {} timestamp '{}' in line: {}",
                        grammar.name,
                        fields.timestamp,
                        line
                    );
                }
            }
        }

        if !matched && line.starts_with('{') && line.ends_with('}') {
            return parse_json_line(line);
        }

        None
    }

    /// Decode a captured timestamp according to the grammar's style
    pub fn decode_timestamp(
        &self,
        style: TimestampStyle,
        raw: &str,
    ) -> Option<DateTime<FixedOffset>> {
        match style {
            TimestampStyle::Syslog => parse_syslog_timestamp(raw, self.year),
            TimestampStyle::Absolute => parse_absolute_timestamp(raw),
            TimestampStyle::Iso8601 => parse_iso8601_timestamp(raw),
        }
    }
}

impl Default for LineParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Decode `MMM DD HH:MM:SS` in the given year
pub fn parse_syslog_timestamp(raw: &str, year: i32) -> Option<DateTime<FixedOffset>> {
    let mut parts = raw.split_whitespace();
    let month = parts.next()?;
    let day = parts.next()?;
    let time = parts.next()?;

    let date = NaiveDate::parse_from_str(&format!("{} {} {}", year, month, day), "%Y %b %d").ok()?;
    let time = NaiveTime::parse_from_str(time, "%H:%M:%S").ok()?;
    Some(date.and_time(time).and_utc().fixed_offset())
}

/// Decode `YYYY-MM-DD HH:MM:SS`
pub fn parse_absolute_timestamp(raw: &str) -> Option<DateTime<FixedOffset>> {
    let normalized = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    NaiveDateTime::parse_from_str(&normalized, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc().fixed_offset())
}

/// Decode an ISO-8601 timestamp. Values without an offset are taken as UTC.
pub fn parse_iso8601_timestamp(raw: &str) -> Option<DateTime<FixedOffset>> {
    if let Ok(time) = DateTime::parse_from_rfc3339(raw) {
        return Some(time);
    }
    if let Ok(time) = DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f%z") {
        return Some(time);
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|naive| naive.and_utc().fixed_offset())
}

/// Render an instant the way a grammar spells it
pub fn format_timestamp(style: TimestampStyle, time: &DateTime<FixedOffset>) -> String {
    match style {
        TimestampStyle::Syslog => time.format("%b %e %H:%M:%S").to_string(),
        TimestampStyle::Absolute => time.format("%Y-%m-%d %H:%M:%S").to_string(),
        TimestampStyle::Iso8601 => time.to_rfc3339(),
    }
}

/// Parse a single-line JSON object. `timestamp` and `message` are required.
fn parse_json_line(line: &str) -> Option<ParsedLine> {
    let value: Value = match serde_json::from_str(line) {
        Ok(value) => value,
        Err(e) => {
            log::debug!("Ignoring malformed JSON line: {}", e);
            return None;
        }
    };
    let object = value.as_object()?;
    if !object.contains_key("timestamp") || !object.contains_key("message") {
        return None;
    }

    let timestamp = object
        .get("timestamp")
        .and_then(Value::as_str)
        .and_then(|raw| parse_iso8601_timestamp(raw).or_else(|| parse_absolute_timestamp(raw)))
        .unwrap_or_else(|| Utc::now().fixed_offset());

    let entry = LogEntry {
        timestamp,
        hostname: json_text(object, &["hostname"]).unwrap_or_else(|| "unknown".to_string()),
        service: json_text(object, &["service", "logger"]).unwrap_or_else(|| "unknown".to_string()),
        pid: json_text(object, &["pid", "process_id"]),
        message: json_text(object, &["message"]).unwrap_or_default(),
        severity: None,
    };

    Some(ParsedLine {
        entry,
        level: json_text(object, &["level"]),
    })
}

/// First non-null value among `keys`, rendered as text
fn json_text(object: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match object.get(*key)? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    fn parser() -> LineParser {
        LineParser::with_year(2024)
    }

    #[test]
    fn test_syslog_line() {
        let parsed = parser()
            .parse_line("Jan  1 00:01:02 host sshd[10]: Failed password for root from 10.0.0.5")
            .unwrap();
        let entry = parsed.entry;

        assert_eq!(entry.hostname, "host");
        assert_eq!(entry.service, "sshd");
        assert_eq!(entry.pid.as_deref(), Some("10"));
        assert_eq!(entry.message, "Failed password for root from 10.0.0.5");
        assert_eq!(entry.timestamp.year(), 2024);
        assert_eq!(entry.timestamp.hour(), 0);
        assert_eq!(entry.timestamp.minute(), 1);
        assert!(parsed.level.is_none());
    }

    #[test]
    fn test_syslog_line_without_pid() {
        let entry = parser()
            .parse_line("Mar 15 13:45:00 web01 kernel: Out of memory: Kill process 42")
            .unwrap()
            .entry;
        assert_eq!(entry.service, "kernel");
        assert!(entry.pid.is_none());
        assert_eq!(entry.message, "Out of memory: Kill process 42");
    }

    #[test]
    fn test_absolute_line() {
        let entry = parser()
            .parse_line("2024-02-03 04:05:06 DC01 Security 4625 An account failed to log on")
            .unwrap()
            .entry;
        assert_eq!(entry.hostname, "DC01");
        assert_eq!(entry.service, "Security");
        assert_eq!(entry.pid.as_deref(), Some("4625"));
        assert_eq!(entry.message, "An account failed to log on");
        assert_eq!(entry.date(), NaiveDate::from_ymd_opt(2024, 2, 3).unwrap());
    }

    #[test]
    fn test_iso_line_keeps_offset() {
        let entry = parser()
            .parse_line("2024-05-06T02:00:00.123456+08:00 app nginx[7]: upstream timed out")
            .unwrap()
            .entry;
        assert_eq!(entry.service, "nginx");
        assert_eq!(entry.pid.as_deref(), Some("7"));
        assert_eq!(entry.hour(), 2);
        assert_eq!(entry.timestamp.offset().local_minus_utc(), 8 * 3600);
        assert_eq!(entry.timestamp.nanosecond(), 123_456_000);
    }

    #[test]
    fn test_iso_line_zulu_and_naive() {
        let zulu = parser()
            .parse_line("2024-05-06T10:00:00Z app cron: job done")
            .unwrap()
            .entry;
        let naive = parser()
            .parse_line("2024-05-06T10:00:00 app cron: job done")
            .unwrap()
            .entry;
        assert_eq!(zulu.timestamp, naive.timestamp);
    }

    #[test]
    fn test_timestamps_round_trip() {
        let p = parser();
        let samples = [
            (TimestampStyle::Syslog, "Dec 31 23:59:59"),
            (TimestampStyle::Syslog, "Feb  9 08:00:01"),
            (TimestampStyle::Absolute, "2023-07-14 12:30:45"),
            (TimestampStyle::Iso8601, "2023-07-14T12:30:45.250+02:00"),
            (TimestampStyle::Iso8601, "2023-07-14T12:30:45Z"),
        ];

        for (style, raw) in samples {
            let decoded = p.decode_timestamp(style, raw).unwrap();
            let rendered = format_timestamp(style, &decoded);
            let reparsed = p.decode_timestamp(style, &rendered).unwrap();
            assert_eq!(decoded, reparsed, "round trip failed for {}", raw);
        }
    }

    #[test]
    fn test_invalid_syslog_date_is_skipped() {
        // 2023 is not a leap year
        let p = LineParser::with_year(2023);
        assert!(p.parse_line("Feb 29 10:00:00 host sshd[1]: hello").is_none());
    }

    #[test]
    fn test_json_line_defaults() {
        let parsed = parser()
            .parse_line(r#"{"timestamp": "2024-01-02T03:04:05Z", "message": "disk full", "level": "ERROR"}"#)
            .unwrap();
        assert_eq!(parsed.entry.hostname, "unknown");
        assert_eq!(parsed.entry.service, "unknown");
        assert!(parsed.entry.pid.is_none());
        assert_eq!(parsed.entry.message, "disk full");
        assert_eq!(parsed.level.as_deref(), Some("ERROR"));
    }

    #[test]
    fn test_json_line_fields() {
        let parsed = parser()
            .parse_line(r#"{"timestamp": "2024-01-02 03:04:05", "message": "m", "hostname": "h1", "logger": "auth", "process_id": 99}"#)
            .unwrap();
        assert_eq!(parsed.entry.hostname, "h1");
        assert_eq!(parsed.entry.service, "auth");
        assert_eq!(parsed.entry.pid.as_deref(), Some("99"));
        assert_eq!(parsed.entry.timestamp.hour(), 3);
    }

    #[test]
    fn test_json_bad_timestamp_uses_now() {
        let before = Utc::now();
        let parsed = parser()
            .parse_line(r#"{"timestamp": "yesterday", "message": "m"}"#)
            .unwrap();
        assert!(parsed.entry.timestamp >= before);
    }

    #[test]
    fn test_json_missing_required_fields() {
        assert!(parser().parse_line(r#"{"message": "no time"}"#).is_none());
        assert!(parser().parse_line(r#"{"timestamp": "2024-01-01T00:00:00Z"}"#).is_none());
        assert!(parser().parse_line(r#"{"timestamp": oops}"#).is_none());
    }

    #[test]
    fn test_garbage_is_skipped() {
        assert!(parser().parse_line("").is_none());
        assert!(parser().parse_line("   ").is_none());
        assert!(parser().parse_line("just some words").is_none());
        assert!(parser().parse_line("[2024] not a grammar").is_none());
    }

    #[test]
    fn test_grammar_order() {
        let names: Vec<_> = grammars().iter().map(|g| g.name).collect();
        assert_eq!(names, vec!["syslog", "absolute", "iso8601"]);
    }
}
