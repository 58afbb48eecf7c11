//! Analyzer variants
//!
//! Both variants share one pass: read, summarize, detect anomalies, analyze
//! trends. The format selector picks which variant runs; there is no state
//! shared between passes.

use serde_json::{json, Value};
use std::io::BufRead;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

use super::summary::{summarize_auth, summarize_system};
use super::trends::{build_trends, daily_auth_series, daily_system_series};
use crate::config::{AuthRuleConfig, Config, SystemRuleConfig, TrendConfig};
use crate::detection::{classify_auth, classify_severity, rules, BruteForceDetector};
use crate::error::AnalysisError;
use crate::input::{open_capped, select_format, LineParser, LogReader, Variant};
use crate::models::{
    AnalysisResult, Anomaly, AuthEvent, AuthSummary, LogEntry, Summary, SystemSummary, Trends,
};

/// The four capabilities every analyzer variant provides
pub trait LogAnalyzer {
    /// Entries (and derived events) produced by [`LogAnalyzer::read`]
    type Dataset;
    /// Variant specific summary
    type Summary: Into<Summary>;

    fn variant(&self) -> Variant;

    /// Parse a whole source
    fn read<R: BufRead>(&self, reader: R) -> Result<Self::Dataset, AnalysisError>;

    /// `None` when the dataset holds no entries
    fn summarize(&self, data: &Self::Dataset) -> Option<Self::Summary>;

    fn detect_anomalies(&self, data: &Self::Dataset, summary: &Self::Summary) -> Vec<Anomaly>;

    fn analyze_trends(&self, data: &Self::Dataset) -> Trends;

    /// Run one complete pass over `reader`
    fn analyze<R: BufRead>(&self, reader: R) -> Result<AnalysisResult, AnalysisError> {
        let data = self.read(reader)?;

        let Some(summary) = self.summarize(&data) else {
            log::warn!("No valid entries found for {} analysis", self.variant());
            return Ok(AnalysisResult::empty());
        };
        let anomalies = self.detect_anomalies(&data, &summary);
        let trends = self.analyze_trends(&data);

        log::info!(
            "{} analysis finished: {} anomalies, trend {:?}",
            self.variant(),
            anomalies.len(),
            trends.trend_description
        );

        Ok(AnalysisResult {
            summary: summary.into(),
            anomalies,
            trends,
        })
    }
}

/// Entries of an auth log together with their auth events
#[derive(Debug, Clone, Default)]
pub struct AuthDataset {
    pub entries: Vec<LogEntry>,
    pub events: Vec<AuthEvent>,
}

/// Analyzer for authentication oriented logs
pub struct AuthLogAnalyzer {
    parser: LineParser,
    rules: AuthRuleConfig,
    trends: TrendConfig,
}

impl AuthLogAnalyzer {
    pub fn new(parser: LineParser, rules: AuthRuleConfig, trends: TrendConfig) -> Self {
        AuthLogAnalyzer {
            parser,
            rules,
            trends,
        }
    }
}

impl Default for AuthLogAnalyzer {
    fn default() -> Self {
        Self::new(
            LineParser::new(),
            AuthRuleConfig::default(),
            TrendConfig::default(),
        )
    }
}

impl LogAnalyzer for AuthLogAnalyzer {
    type Dataset = AuthDataset;
    type Summary = AuthSummary;

    fn variant(&self) -> Variant {
        Variant::Auth
    }

    fn read<R: BufRead>(&self, reader: R) -> Result<AuthDataset, AnalysisError> {
        let parsed = LogReader::new(self.parser.clone()).read_entries(reader)?;

        let entries: Vec<LogEntry> = parsed.into_iter().map(|line| line.entry).collect();
        let events: Vec<AuthEvent> = entries.iter().filter_map(classify_auth).collect();

        log::info!(
            "Read {} entries, {} auth events",
            entries.len(),
            events.len()
        );
        Ok(AuthDataset { entries, events })
    }

    fn summarize(&self, data: &AuthDataset) -> Option<AuthSummary> {
        summarize_auth(&data.entries, &data.events)
    }

    fn detect_anomalies(&self, data: &AuthDataset, summary: &AuthSummary) -> Vec<Anomaly> {
        if data.events.is_empty() {
            return Vec::new();
        }

        let mut anomalies = rules::user_high_failure(summary, &self.rules);
        anomalies.extend(rules::ip_high_failure(summary, &self.rules));
        anomalies.extend(rules::unusual_login_time(summary, &self.rules));
        anomalies.extend(
            BruteForceDetector::with_config(self.rules.brute_force.clone()).detect(&data.events),
        );
        anomalies
    }

    fn analyze_trends(&self, data: &AuthDataset) -> Trends {
        build_trends(daily_auth_series(&data.events), &self.trends)
    }
}

/// Analyzer for general system logs
pub struct SystemLogAnalyzer {
    parser: LineParser,
    rules: SystemRuleConfig,
    trends: TrendConfig,
}

impl SystemLogAnalyzer {
    pub fn new(parser: LineParser, rules: SystemRuleConfig, trends: TrendConfig) -> Self {
        SystemLogAnalyzer {
            parser,
            rules,
            trends,
        }
    }
}

impl Default for SystemLogAnalyzer {
    fn default() -> Self {
        Self::new(
            LineParser::new(),
            SystemRuleConfig::default(),
            TrendConfig::default(),
        )
    }
}

impl LogAnalyzer for SystemLogAnalyzer {
    type Dataset = Vec<LogEntry>;
    type Summary = SystemSummary;

    fn variant(&self) -> Variant {
        Variant::System
    }

    fn read<R: BufRead>(&self, reader: R) -> Result<Vec<LogEntry>, AnalysisError> {
        let parsed = LogReader::new(self.parser.clone()).read_entries(reader)?;

        let entries: Vec<LogEntry> = parsed
            .into_iter()
            .map(|line| {
                let severity = classify_severity(line.level.as_deref(), &line.entry.message);
                LogEntry {
                    severity: Some(severity),
                    ..line.entry
                }
            })
            .collect();

        log::info!("Read {} entries", entries.len());
        Ok(entries)
    }

    fn summarize(&self, data: &Vec<LogEntry>) -> Option<SystemSummary> {
        summarize_system(data)
    }

    fn detect_anomalies(&self, data: &Vec<LogEntry>, summary: &SystemSummary) -> Vec<Anomaly> {
        let mut anomalies: Vec<Anomaly> = rules::high_error_ratio(summary, &self.rules)
            .into_iter()
            .collect();
        anomalies.extend(rules::service_high_errors(data, summary, &self.rules));
        anomalies.extend(rules::time_based_anomalies(data, &self.rules));
        anomalies
    }

    fn analyze_trends(&self, data: &Vec<LogEntry>) -> Trends {
        build_trends(daily_system_series(data), &self.trends)
    }
}

/// Tagged choice between the two analyzer variants
pub enum Analyzer {
    Auth(AuthLogAnalyzer),
    System(SystemLogAnalyzer),
}

impl Analyzer {
    /// Build the analyzer for `variant` with the configured thresholds
    pub fn for_variant(variant: Variant, config: &Config) -> Self {
        Self::with_parser(variant, config, LineParser::new())
    }

    pub fn with_parser(variant: Variant, config: &Config, parser: LineParser) -> Self {
        match variant {
            Variant::Auth => Analyzer::Auth(AuthLogAnalyzer::new(
                parser,
                config.detection.auth.clone(),
                config.trends.clone(),
            )),
            Variant::System => Analyzer::System(SystemLogAnalyzer::new(
                parser,
                config.detection.system.clone(),
                config.trends.clone(),
            )),
        }
    }

    pub fn variant(&self) -> Variant {
        match self {
            Analyzer::Auth(a) => a.variant(),
            Analyzer::System(a) => a.variant(),
        }
    }

    pub fn analyze<R: BufRead>(&self, reader: R) -> Result<AnalysisResult, AnalysisError> {
        match self {
            Analyzer::Auth(a) => a.analyze(reader),
            Analyzer::System(a) => a.analyze(reader),
        }
    }
}

/// Analyze a source with an already selected variant
pub fn analyze<R: BufRead>(
    reader: R,
    variant: Variant,
    config: &Config,
) -> Result<AnalysisResult, AnalysisError> {
    Analyzer::for_variant(variant, config).analyze(reader)
}

/// Select the variant for a file, then analyze it, reading at most
/// `input.max_bytes`
pub fn analyze_file(path: &Path, config: &Config) -> Result<(Variant, AnalysisResult), AnalysisError> {
    let label = path.display().to_string();
    let max_bytes = config.input.max_bytes;

    let variant = select_format(open_capped(path, max_bytes)?, &config.input, &label)?;
    log::info!("Analyzing {} as {} log", label, variant);

    let result = analyze(open_capped(path, max_bytes)?, variant, config)?;
    Ok((variant, result))
}

/// Run an analysis, turning errors and panics into a message
pub fn run_guarded<F>(analysis: F) -> Result<AnalysisResult, String>
where
    F: FnOnce() -> Result<AnalysisResult, AnalysisError>,
{
    match panic::catch_unwind(AssertUnwindSafe(analysis)) {
        Ok(Ok(result)) => Ok(result),
        Ok(Err(e)) => Err(e.to_string()),
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "analysis panicked".to_string());
            Err(AnalysisError::Internal(message).to_string())
        }
    }
}

/// Render a guarded outcome as the document handed to persistence
pub fn to_document(outcome: Result<AnalysisResult, String>) -> Value {
    match outcome {
        Ok(result) => serde_json::to_value(&result)
            .unwrap_or_else(|e| json!({ "error": e.to_string() })),
        Err(message) => json!({ "error": message }),
    }
}

/// Analyze a file and never fail: errors become `{"error": "<message>"}`
pub fn analyze_log_file(path: &Path, config: &Config) -> Value {
    to_document(run_guarded(|| analyze_file(path, config).map(|(_, result)| result)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AnomalyKind, AnomalySeverity, TrendLabel};
    use std::io::Cursor;
    use std::io::Write;

    fn auth_analyzer() -> AuthLogAnalyzer {
        AuthLogAnalyzer::new(
            LineParser::with_year(2024),
            AuthRuleConfig::default(),
            TrendConfig::default(),
        )
    }

    fn system_analyzer() -> SystemLogAnalyzer {
        SystemLogAnalyzer::new(
            LineParser::with_year(2024),
            SystemRuleConfig::default(),
            TrendConfig::default(),
        )
    }

    fn sshd_scenario() -> String {
        let mut lines: Vec<String> = (0..6)
            .map(|minute| {
                format!(
                    "Jan  1 00:0{}:02 host sshd[10]: Failed password for invalid user root from 10.0.0.5",
                    minute
                )
            })
            .collect();
        lines.push("Jan  1 00:06:02 host sshd[10]: Accepted password for alice from 10.0.0.9".to_string());
        lines.join("\n")
    }

    fn kinds(anomalies: &[Anomaly]) -> Vec<&'static str> {
        anomalies.iter().map(|a| a.kind.name()).collect()
    }

    #[test]
    fn test_sshd_scenario() {
        let result = auth_analyzer().analyze(Cursor::new(sshd_scenario())).unwrap();

        let Summary::Auth(summary) = &result.summary else {
            panic!("expected auth summary");
        };
        assert_eq!(summary.failure_count, 6);
        assert_eq!(summary.success_count, 1);
        assert_eq!(summary.hourly_attempts[0].total, 7);

        let found = kinds(&result.anomalies);
        assert_eq!(
            found,
            vec!["user_high_failure", "ip_high_failure", "unusual_login_time"]
        );
        assert!(result.anomalies.iter().all(|a| a.severity == AnomalySeverity::Medium));
        assert!(matches!(
            &result.anomalies[0].kind,
            AnomalyKind::UserHighFailure { user, failure_count: 6, success_count: 0 } if user == "root"
        ));
        assert!(matches!(
            &result.anomalies[1].kind,
            AnomalyKind::IpHighFailure { ip, failure_count: 6, .. } if ip == "10.0.0.5"
        ));
        // seven auth events are too few for brute force detection
        assert_eq!(result.trends.series.len(), 1);
        assert_eq!(result.trends.trend_description, TrendLabel::InsufficientData);
    }

    #[test]
    fn test_brute_force_in_full_pass() {
        let data: String = (0..12)
            .map(|i| {
                format!(
                    "2024-03-10T14:00:{:02}Z host sshd[22]: Failed password for admin from 192.0.2.7\n",
                    i * 3
                )
            })
            .collect();
        let result = auth_analyzer().analyze(Cursor::new(data)).unwrap();

        let brute: Vec<_> = result
            .anomalies
            .iter()
            .filter(|a| a.kind.name() == "brute_force_attempt")
            .collect();
        assert_eq!(brute.len(), 1);
        assert_eq!(brute[0].severity, AnomalySeverity::High);
    }

    #[test]
    fn test_empty_source_gives_degenerate_result() {
        let result = auth_analyzer().analyze(Cursor::new("garbage\n\n")).unwrap();
        assert!(result.summary.is_empty());
        assert!(result.anomalies.is_empty());
        assert!(result.trends.series.is_empty());

        let document = serde_json::to_value(&result).unwrap();
        assert_eq!(document["summary"]["total_entries"], 0);
        assert_eq!(document["summary"]["error"], "no valid entries");
        assert_eq!(document["trends"]["trend_description"], "insufficient_data");
    }

    #[test]
    fn test_system_pass_with_json_lines() {
        let mut lines = Vec::new();
        for i in 0..6 {
            lines.push(format!(
                r#"{{"timestamp": "2024-05-01T10:00:0{}Z", "service": "db", "message": "query {}", "level": "error"}}"#,
                i, i
            ));
        }
        for i in 0..4 {
            lines.push(format!(
                r#"{{"timestamp": "2024-05-02T10:00:0{}Z", "service": "db", "message": "query failed {}", "level": "info"}}"#,
                i, i
            ));
        }
        let result = system_analyzer().analyze(Cursor::new(lines.join("\n"))).unwrap();

        let Summary::System(summary) = &result.summary else {
            panic!("expected system summary");
        };
        assert_eq!(summary.total_entries, 10);
        assert_eq!(summary.count_of(crate::models::Severity::Error), 6);
        assert_eq!(kinds(&result.anomalies), vec!["high_error_ratio"]);
        assert_eq!(result.anomalies[0].severity, AnomalySeverity::High);
        assert_eq!(result.trends.series.len(), 2);
        assert_eq!(result.trends.trend_description, TrendLabel::Falling);
    }

    #[test]
    fn test_result_document_shape() {
        let result = auth_analyzer().analyze(Cursor::new(sshd_scenario())).unwrap();
        let document = serde_json::to_value(&result).unwrap();

        assert_eq!(document["summary"]["hourly_attempts"].as_array().unwrap().len(), 24);
        assert_eq!(document["summary"]["log_start_time"], "2024-01-01 00:00:02");
        assert_eq!(document["anomalies"][0]["type"], "user_high_failure");
        assert_eq!(document["anomalies"][0]["severity"], "medium");
        assert_eq!(document["trends"]["series"][0]["date"], "2024-01-01");
        assert_eq!(document["trends"]["series"][0]["failure"], 6);
        assert_eq!(document["trends"]["series"][0]["total"], 7);
    }

    #[test]
    fn test_analyze_log_file_reports_errors() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::default();

        let missing = analyze_log_file(&dir.path().join("missing.log"), &config);
        assert!(missing["error"].is_string());

        let empty_path = dir.path().join("empty.log");
        std::fs::File::create(&empty_path).unwrap();
        let empty = analyze_log_file(&empty_path, &config);
        assert!(empty["error"].as_str().unwrap().contains("no analyzable content"));
    }

    #[test]
    fn test_analyze_file_selects_variant() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{}", sshd_scenario()).unwrap();

        let (variant, result) = analyze_file(file.path(), &Config::default()).unwrap();
        assert_eq!(variant, Variant::Auth);
        assert_eq!(result.summary.total_entries(), 7);
    }

    #[test]
    fn test_analyze_log_file_honours_byte_cap() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{}", sshd_scenario()).unwrap();
        let first_line = sshd_scenario().lines().next().unwrap().len() as u64 + 1;

        let mut config = Config::default();
        config.input.max_bytes = Some(first_line);

        let (_, result) = analyze_file(file.path(), &config).unwrap();
        assert_eq!(result.summary.total_entries(), 1);
        let document = analyze_log_file(file.path(), &config);
        assert_eq!(document["summary"]["total_entries"], 1);
    }

    #[test]
    fn test_run_guarded_catches_panics() {
        let outcome = run_guarded(|| panic!("boom"));
        assert!(outcome.unwrap_err().contains("boom"));
    }
}
