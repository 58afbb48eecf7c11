pub mod analysis;
pub mod config;
pub mod detection;
pub mod error;
pub mod input;
pub mod models;
pub mod output;
pub mod persistence;
pub mod pipeline;

// Re-export commonly used types
pub use analysis::{analyze, analyze_file, analyze_log_file, Analyzer, LogAnalyzer};
pub use config::Config;
pub use error::AnalysisError;
pub use input::{select_format, Variant};
pub use models::{AnalysisResult, Anomaly, AnomalyKind, AuthEvent, LogEntry, Summary, Trends};
pub use persistence::{SqliteStatusStore, StatusStore};
pub use pipeline::process_log_file;
