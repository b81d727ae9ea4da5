//! Error types for pmkit core.

use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in pmkit core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Region or durability-dependency error, passed through unchanged.
    #[error("region error: {0}")]
    Region(#[from] pmkit_region::RegionError),

    /// A log region could not be recovered.
    #[error("log corruption at offset {offset}: {message}")]
    LogCorruption {
        /// Offset of the header where the scan gave up.
        offset: usize,
        /// Description of the corruption.
        message: String,
    },

    /// The region has no room for the request.
    #[error("no space: requested {requested} bytes, {available} available")]
    NoSpace {
        /// Bytes the operation needed.
        requested: usize,
        /// Bytes that were left.
        available: usize,
    },

    /// An argument violates the operation's contract.
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// Description of the violation.
        message: String,
    },

    /// The operation is not legal in the current state.
    #[error("invalid state: {message}")]
    InvalidState {
        /// Description of why the state does not allow the operation.
        message: String,
    },

    /// The naming table layout is inconsistent.
    #[error("naming table corruption: {message}")]
    NamingCorruption {
        /// Description of the corruption.
        message: String,
    },
}

impl CoreError {
    /// Creates a log corruption error.
    pub fn log_corruption(offset: usize, message: impl Into<String>) -> Self {
        Self::LogCorruption {
            offset,
            message: message.into(),
        }
    }

    /// Creates a no-space error.
    pub fn no_space(requested: usize, available: usize) -> Self {
        Self::NoSpace {
            requested,
            available,
        }
    }

    /// Creates an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Creates an invalid state error.
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }

    /// Creates a naming corruption error.
    pub fn naming_corruption(message: impl Into<String>) -> Self {
        Self::NamingCorruption {
            message: message.into(),
        }
    }

    /// Returns `true` if retrying after truncating or committing may succeed.
    #[must_use]
    pub fn is_no_space(&self) -> bool {
        matches!(self, Self::NoSpace { .. })
    }
}
