//! Format selection
//!
//! Samples the head of a source to decide which analyzer handles it.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::io::BufRead;
use std::path::Path;

use super::reader::{lossy_lines, open_source};
use crate::config::InputConfig;
use crate::error::AnalysisError;

/// Keywords that mark a sampled line as authentication related
pub const SAMPLE_AUTH_KEYWORDS: &[&str] = &[
    "sshd",
    "login",
    "password",
    "authentication",
    "session",
    "user",
    "account",
];

/// Message keywords that make a leading JSON object auth related
pub const JSON_AUTH_KEYWORDS: &[&str] = &["login", "password", "auth"];

/// Which analyzer processes a source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    Auth,
    System,
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variant::Auth => write!(f, "auth"),
            Variant::System => write!(f, "system"),
        }
    }
}

/// Pick the analyzer variant for a source
///
/// `label` names the source in the error raised when it holds no content.
pub fn select_format<R: BufRead>(
    reader: R,
    config: &InputConfig,
    label: &str,
) -> Result<Variant, AnalysisError> {
    let mut samples = Vec::with_capacity(config.sample_lines);
    for line in lossy_lines(reader) {
        if samples.len() >= config.sample_lines {
            break;
        }
        let line = line?;
        let line = line.trim();
        if !line.is_empty() {
            samples.push(line.to_string());
        }
    }

    if samples.is_empty() {
        return Err(AnalysisError::NoContent(label.to_string()));
    }

    if let Some(variant) = variant_from_json(&samples[0]) {
        return Ok(variant);
    }

    let score = samples
        .iter()
        .filter(|line| {
            let lower = line.to_lowercase();
            SAMPLE_AUTH_KEYWORDS.iter().any(|kw| lower.contains(kw))
        })
        .count();

    log::debug!("Auth score for {}: {}/{}", label, score, samples.len());

    if score > config.auth_score_threshold {
        Ok(Variant::Auth)
    } else {
        Ok(Variant::System)
    }
}

/// Pick the analyzer variant for a file on disk
pub fn select_format_for_file(path: &Path, config: &InputConfig) -> Result<Variant, AnalysisError> {
    let reader = open_source(path)?;
    select_format(reader, config, &path.display().to_string())
}

/// Decide from a leading JSON object, if the line is one
fn variant_from_json(line: &str) -> Option<Variant> {
    if !(line.starts_with('{') && line.ends_with('}')) {
        return None;
    }
    let value: Value = serde_json::from_str(line).ok()?;
    let field = |key: &str| {
        value
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_lowercase()
    };

    let service = field("service");
    let message = field("message");
    if service.contains("auth") || JSON_AUTH_KEYWORDS.iter().any(|kw| message.contains(kw)) {
        Some(Variant::Auth)
    } else {
        Some(Variant::System)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn select(data: &str) -> Result<Variant, AnalysisError> {
        select_format(Cursor::new(data), &InputConfig::default(), "test")
    }

    #[test]
    fn test_auth_lines_select_auth() {
        let data = (0..4)
            .map(|i| format!("Jan  1 00:00:0{} host sshd[1]: Failed password for root from 10.0.0.1", i))
            .collect::<Vec<_>>()
            .join("\n");
        assert_eq!(select(&data).unwrap(), Variant::Auth);
    }

    #[test]
    fn test_score_must_exceed_threshold() {
        let data = "Jan  1 00:00:01 host sshd[1]: a\n\
                    Jan  1 00:00:02 host sshd[1]: b\n\
                    Jan  1 00:00:03 host sshd[1]: c\n\
                    Jan  1 00:00:04 host kernel: d\n";
        assert_eq!(select(data).unwrap(), Variant::System);
    }

    #[test]
    fn test_only_first_sample_lines_count() {
        let mut lines: Vec<String> = (0..20).map(|_| "kernel: tick".to_string()).collect();
        lines.extend((0..10).map(|_| "sshd: login".to_string()));
        assert_eq!(select(&lines.join("\n")).unwrap(), Variant::System);
    }

    #[test]
    fn test_blank_lines_are_not_sampled() {
        let data = "\n\n   \nsshd one\n\nsshd two\nsshd three\n\nsshd four\n";
        assert_eq!(select(data).unwrap(), Variant::Auth);
    }

    #[test]
    fn test_json_first_line() {
        assert_eq!(
            select(r#"{"timestamp": "t", "service": "AuthService", "message": "x"}"#).unwrap(),
            Variant::Auth
        );
        assert_eq!(
            select(r#"{"timestamp": "t", "service": "api", "message": "Password reset"}"#).unwrap(),
            Variant::Auth
        );
        assert_eq!(
            select(r#"{"timestamp": "t", "service": "api", "message": "GET /health"}"#).unwrap(),
            Variant::System
        );
    }

    #[test]
    fn test_empty_source_is_an_error() {
        assert!(matches!(select(""), Err(AnalysisError::NoContent(_))));
        assert!(matches!(select("\n \n\t\n"), Err(AnalysisError::NoContent(_))));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = select_format_for_file(&dir.path().join("nope.log"), &InputConfig::default());
        assert!(matches!(result, Err(AnalysisError::Io(_))));
    }
}
