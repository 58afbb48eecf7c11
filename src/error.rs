//! Errors raised by the analysis engine

use thiserror::Error;

/// Failure of a whole analysis pass
///
/// Single bad lines never produce one of these; they are skipped.
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// The source is empty or holds only blank lines
    #[error("no analyzable content in {0}")]
    NoContent(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal analysis fault: {0}")]
    Internal(String),
}
