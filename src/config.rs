use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration for the analysis engine and its binaries
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Source sampling configuration
    pub input: InputConfig,
    /// Anomaly rule thresholds
    pub detection: DetectionConfig,
    /// Trend classification configuration
    pub trends: TrendConfig,
    /// Output configuration
    pub output: OutputConfig,
    /// Status/result store configuration
    pub storage: StorageConfig,
}

/// Source sampling configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Non-empty lines sampled by the format selector
    pub sample_lines: usize,
    /// Sampled auth lines needed (exclusive) to pick the auth analyzer
    pub auth_score_threshold: usize,
    /// Byte cap applied by callers before handing a source to the engine
    pub max_bytes: Option<u64>,
}

impl Default for InputConfig {
    fn default() -> Self {
        InputConfig {
            sample_lines: 20,
            auth_score_threshold: 3,
            max_bytes: None,
        }
    }
}

/// Anomaly rule thresholds
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    pub auth: AuthRuleConfig,
    pub system: SystemRuleConfig,
}

/// Thresholds of the authentication rules. Every comparison is strict.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthRuleConfig {
    /// Failures a user needs before `user_high_failure` is considered
    pub user_min_failures: usize,
    /// Failures must also exceed `success * user_failure_ratio`
    pub user_failure_ratio: usize,
    /// Above this a user finding is high severity
    pub user_high_failures: usize,
    /// Failures an address needs before `ip_high_failure` fires
    pub ip_min_failures: usize,
    /// Above this an address finding is high severity
    pub ip_high_failures: usize,
    /// First hour of the unusual login window (inclusive)
    pub night_start_hour: u32,
    /// Last hour of the unusual login window (inclusive)
    pub night_end_hour: u32,
    /// Attempts an unusual hour needs before it is reported
    pub night_min_attempts: usize,
    pub brute_force: BruteForceConfig,
}

impl Default for AuthRuleConfig {
    fn default() -> Self {
        AuthRuleConfig {
            user_min_failures: 3,
            user_failure_ratio: 3,
            user_high_failures: 10,
            ip_min_failures: 5,
            ip_high_failures: 20,
            night_start_hour: 0,
            night_end_hour: 5,
            night_min_attempts: 5,
            brute_force: BruteForceConfig::default(),
        }
    }
}

/// Sliding window brute force detection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BruteForceConfig {
    /// Auth events required (exclusive) before windows are examined
    pub min_events: usize,
    /// Consecutive events per window
    pub window_size: usize,
    /// Failures a window needs (inclusive)
    pub min_failures: usize,
    /// Window span must stay under this many seconds
    pub max_span_seconds: i64,
}

impl Default for BruteForceConfig {
    fn default() -> Self {
        BruteForceConfig {
            min_events: 10,
            window_size: 5,
            min_failures: 4,
            max_span_seconds: 300,
        }
    }
}

/// Thresholds of the system rules
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemRuleConfig {
    /// Error fraction above which `high_error_ratio` fires
    pub error_ratio: f64,
    /// Error fraction above which that finding is high severity
    pub high_error_ratio: f64,
    /// Errors a service needs before `service_high_errors` is considered
    pub service_min_errors: usize,
    /// Error fraction of a service's own entries needed
    pub service_error_ratio: f64,
    /// Entries required (exclusive) before hourly statistics are used
    pub time_min_entries: usize,
    /// Standard deviations above the hourly mean that count as anomalous
    pub stddev_factor: f64,
    /// Example messages attached to a time based finding
    pub sample_messages: usize,
}

impl Default for SystemRuleConfig {
    fn default() -> Self {
        SystemRuleConfig {
            error_ratio: 0.2,
            high_error_ratio: 0.5,
            service_min_errors: 10,
            service_error_ratio: 0.5,
            time_min_entries: 100,
            stddev_factor: 2.0,
            sample_messages: 3,
        }
    }
}

/// Trend classification configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendConfig {
    /// Day-over-day rate delta beyond which a trend is rising or falling
    pub rate_change_threshold: f64,
}

impl Default for TrendConfig {
    fn default() -> Self {
        TrendConfig {
            rate_change_threshold: 0.1,
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Output format: "json", "jsonl", or "console"
    pub format: String,
    /// Output file path (stdout when absent)
    pub file_path: Option<PathBuf>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            format: "json".to_string(),
            file_path: None,
        }
    }
}

/// Status/result store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite database holding file status records and results
    pub database_path: PathBuf,
    /// How often the worker looks for pending files
    pub poll_interval_ms: u64,
    /// Maximum analyses the worker runs at once
    pub worker_concurrency: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            database_path: PathBuf::from("logsight.db"),
            poll_interval_ms: 1000,
            worker_concurrency: 4,
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save configuration to a file
    pub fn to_file(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }
}
