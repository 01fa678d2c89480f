//! Error types shared across the indexing crates

use std::path::PathBuf;

use thiserror::Error;

/// Failures local to one document. None of these abort another document's
/// indexing or the request loop.
#[derive(Debug, Error)]
pub enum IndexError {
    /// The parser rejected the source. The previous document model, if any,
    /// is retained so a transient syntax error does not lose index data.
    #[error("failed to parse {}: source contains syntax errors", path.display())]
    Parse { path: PathBuf },

    /// A query was made against a path that was never opened.
    #[error("no document open at {}", .0.display())]
    UnknownFile(PathBuf),
}
