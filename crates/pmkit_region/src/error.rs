//! Error types for region operations.

use std::io;
use thiserror::Error;

/// Result type for region operations.
pub type RegionResult<T> = Result<T, RegionError>;

/// Errors that can occur while opening, accessing or persisting a region.
#[derive(Debug, Error)]
pub enum RegionError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A byte range falls outside the region.
    #[error("range out of bounds: offset {offset}, len {len}, size {size}")]
    OutOfBounds {
        /// The requested offset.
        offset: usize,
        /// The requested length.
        len: usize,
        /// The region size.
        size: usize,
    },

    /// An existing backing file does not have the requested size.
    #[error("region size mismatch: expected {expected} bytes, file has {actual}")]
    SizeMismatch {
        /// The size asked for by the caller.
        expected: u64,
        /// The size of the file on disk.
        actual: u64,
    },

    /// A region must contain at least one byte.
    #[error("region is empty")]
    Empty,

    /// Another process holds the backing file.
    #[error("region locked: another process has exclusive access")]
    Locked,

    /// The durability path rejected a persist request.
    #[error("persist failed for offset {offset}, len {len}: status {status}")]
    PersistFailed {
        /// Start of the range that could not be persisted.
        offset: usize,
        /// Length of the range.
        len: usize,
        /// Status code reported by the durability path.
        status: i32,
    },
}

impl RegionError {
    /// Creates a persist failure carrying the dependency's status code.
    pub fn persist_failed(offset: usize, len: usize, status: i32) -> Self {
        Self::PersistFailed {
            offset,
            len,
            status,
        }
    }
}
