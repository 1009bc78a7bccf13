//! Error types for the oscillation engine.
//!
//! Entropy failures never leave [`crate::entropy::EntropySource`]; they are
//! counted and degraded internally. Everything a caller can act on is an
//! [`OscillationError`].

use thiserror::Error;

/// Failure of a single raw entropy input.
#[derive(Debug, Error)]
pub enum EntropyError {
    /// The OS random number generator refused the request.
    #[error("OS random source failed: {0}")]
    Os(getrandom::Error),

    /// An input produced fewer bytes than requested.
    #[error("input '{input}' produced {actual} bytes, expected {expected}")]
    ShortRead {
        input: &'static str,
        expected: usize,
        actual: usize,
    },

    /// The input is not usable on this machine.
    #[error("input '{0}' is unavailable")]
    Unavailable(&'static str),
}

/// Store-level failure reported by an [`crate::store::OscillationStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing store could not be reached or read.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A session id that cannot be used as a storage key.
    #[error("invalid session id: {0}")]
    InvalidSessionId(String),

    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store record encoding error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors surfaced by the oscillation engine.
#[derive(Debug, Error)]
pub enum OscillationError {
    /// Bulk add or snapshot with differing value/timestamp counts.
    #[error("shape mismatch: {values} values but {timestamps} timestamps")]
    ShapeMismatch { values: usize, timestamps: usize },

    /// A timestamp string that is not ISO-8601.
    #[error("invalid ISO-8601 timestamp: {0:?}")]
    InvalidTimestamp(String),

    /// No in-memory buffer or stored state exists for this session.
    #[error("session not found: {0}")]
    SessionNotFound(String),

    /// Storage failure the caller asked to see, e.g. from an explicit
    /// session update. Serialization and I/O failures arrive wrapped here.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl OscillationError {
    /// Create a ShapeMismatch error.
    pub fn shape_mismatch(values: usize, timestamps: usize) -> Self {
        Self::ShapeMismatch { values, timestamps }
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, OscillationError>;
