//! Event classification
//!
//! Decides which entries are authentication events, extracts user, source
//! address and outcome from them, and derives severities for system entries.

use regex::Regex;
use std::sync::LazyLock;

use crate::models::{AuthEvent, LogEntry, Outcome, Severity};

/// Service name fragments that make an entry auth relevant
pub const AUTH_SERVICES: &[&str] = &["sshd", "login", "su", "sudo", "auth", "security"];

/// Message fragments that make an entry auth relevant
pub const AUTH_KEYWORDS: &[&str] = &[
    "login",
    "password",
    "authentication",
    "session",
    "user",
    "failed",
    "success",
];

/// Message fragments that mark a successful attempt
pub const SUCCESS_KEYWORDS: &[&str] = &["accepted", "success", "successful", "opened"];

/// Explicit level tokens mapped to [`Severity::Error`]
pub const ERROR_LEVELS: &[&str] = &[
    "error",
    "err",
    "fatal",
    "critical",
    "crit",
    "alert",
    "emerg",
    "emergency",
];

/// Explicit level tokens mapped to [`Severity::Warning`]
pub const WARNING_LEVELS: &[&str] = &["warn", "warning"];

/// Message fragments that mark an error when no level is given
pub const ERROR_KEYWORDS: &[&str] = &[
    "error",
    "fail",
    "critical",
    "alert",
    "emerg",
    "exception",
    "crash",
];

/// Message fragments that mark a warning when no level is given
pub const WARNING_KEYWORDS: &[&str] = &["warn", "warning"];

/// "for alice", "for invalid user root", "user bob", "account carol"
static RE_USER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:for\s+(?:invalid\s+user\s+)?|user\s+|account\s+)(\S+)").expect("regex")
});

/// "from 10.0.0.1", "source 10.0.0.1"
static RE_SOURCE_IP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:from|source)\s+(\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3})").expect("regex")
});

const UNKNOWN: &str = "unknown";

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| haystack.contains(needle))
}

/// Whether a service/message pair describes an authentication event
pub fn is_auth_relevant(service: &str, message: &str) -> bool {
    contains_any(&service.to_lowercase(), AUTH_SERVICES)
        || contains_any(&message.to_lowercase(), AUTH_KEYWORDS)
}

/// First user name mentioned in a message
pub fn extract_user(message: &str) -> Option<&str> {
    RE_USER
        .captures(message)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// First IPv4 source address mentioned in a message
pub fn extract_source_ip(message: &str) -> Option<&str> {
    RE_SOURCE_IP
        .captures(message)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Success needs positive evidence; everything else is a failure
pub fn outcome_of(message: &str) -> Outcome {
    if contains_any(&message.to_lowercase(), SUCCESS_KEYWORDS) {
        Outcome::Success
    } else {
        Outcome::Failure
    }
}

/// Build the auth event for an entry, if the entry is auth relevant
pub fn classify_auth(entry: &LogEntry) -> Option<AuthEvent> {
    if !is_auth_relevant(&entry.service, &entry.message) {
        return None;
    }

    Some(AuthEvent {
        timestamp: entry.timestamp,
        outcome: outcome_of(&entry.message),
        user: extract_user(&entry.message).unwrap_or(UNKNOWN).to_string(),
        source_ip: extract_source_ip(&entry.message)
            .unwrap_or(UNKNOWN)
            .to_string(),
        message: entry.message.clone(),
    })
}

/// Map an explicit level token; unrecognized tokens are info
pub fn map_level(level: &str) -> Severity {
    let level = level.trim().to_lowercase();
    if ERROR_LEVELS.contains(&level.as_str()) {
        Severity::Error
    } else if WARNING_LEVELS.contains(&level.as_str()) {
        Severity::Warning
    } else {
        Severity::Info
    }
}

/// Derive a severity from message keywords
pub fn severity_from_message(message: &str) -> Severity {
    let lower = message.to_lowercase();
    if contains_any(&lower, ERROR_KEYWORDS) {
        Severity::Error
    } else if contains_any(&lower, WARNING_KEYWORDS) {
        Severity::Warning
    } else {
        Severity::Info
    }
}

/// An explicit level wins over message keywords
pub fn classify_severity(level: Option<&str>, message: &str) -> Severity {
    match level {
        Some(level) => map_level(level),
        None => severity_from_message(message),
    }
}
