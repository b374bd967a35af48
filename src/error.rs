//! Error type for the decode/correlate pipeline
//!
//! Almost nothing in the pipeline can fail: decoding is total, unmatched
//! enters are dropped and the sentinel is a normal stop. What remains is
//! I/O on the input stream and rejected configuration.

use thiserror::Error;

/// Errors surfaced by the engine
#[derive(Error, Debug)]
pub enum TraceError {
    #[error("IO error while reading trace: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid engine configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, TraceError>;
