//! Core error types for SFR Home.

use thiserror::Error;

/// Core error type for SFR Home operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The payload could not be read as XML at all.
    #[error("Undecodable XML payload: {0}")]
    Undecodable(String),
}
