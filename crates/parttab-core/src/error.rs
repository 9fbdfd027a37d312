//! Error types for partition table inspection
//!
//! Only genuinely hard conditions live here. A disk lacking a given table
//! format is the common case and is modeled as
//! [`Detection::Absent`](crate::types::Detection::Absent), never as an
//! error.

use thiserror::Error;

/// The main error type for parttab operations
#[derive(Error, Debug)]
pub enum Error {
    /// I/O failure in the underlying source; fatal for the current image
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The image ends before `offset + length`
    #[error("truncated read: {length} bytes at offset {offset}, only {available} available")]
    TruncatedRead {
        offset: u64,
        length: u64,
        available: u64,
    },

    /// Structurally impossible table data (declared sizes or counts that
    /// cannot be satisfied); fatal for the affected table only
    #[error("structural inconsistency: {0}")]
    Structural(String),

    /// Generic error with custom message
    #[error("{0}")]
    Custom(String),
}

/// Result type alias for parttab operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a structural inconsistency error
    pub fn structural(msg: impl Into<String>) -> Self {
        Error::Structural(msg.into())
    }

    /// Create a custom error from a string
    pub fn custom(msg: impl Into<String>) -> Self {
        Error::Custom(msg.into())
    }

    /// True for reads that ran off the end of the image
    pub fn is_truncated(&self) -> bool {
        matches!(self, Error::TruncatedRead { .. })
    }
}
