pub mod analyzer;
pub mod summary;
pub mod trends;

pub use analyzer::{
    analyze, analyze_file, analyze_log_file, run_guarded, to_document, Analyzer, AuthDataset,
    AuthLogAnalyzer, LogAnalyzer, SystemLogAnalyzer,
};
