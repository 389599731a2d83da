//! Error types for trajectory segmentation.

use thiserror::Error;

/// Errors that can abort a segmentation call.
///
/// Every variant is raised before any output is produced, so a failed call
/// never leaves partial results behind.
#[derive(Debug, Clone, PartialEq, Error)]
#[cfg_attr(feature = "ffi", derive(uniffi::Error))]
#[cfg_attr(feature = "ffi", uniffi(flat_error))]
pub enum SegmentationError {
    /// The fix sequence was empty.
    #[error("no fixes to segment")]
    EmptyInput,

    /// Two fixes share a timestamp, so no speed can be derived between them.
    #[error("zero-length interval at timestamp {timestamp}")]
    DegenerateInterval {
        /// The shared timestamp (ms since epoch).
        timestamp: i64,
    },

    /// A fix carries non-finite or out-of-range coordinates.
    #[error("invalid fix at index {index}: ({latitude}, {longitude})")]
    InvalidFix {
        /// Position of the fix in the input.
        index: usize,
        /// Offending latitude.
        latitude: f64,
        /// Offending longitude.
        longitude: f64,
    },

    /// Timestamps went backwards.
    #[error("timestamp at index {index} goes backwards: {current} < {previous}")]
    NonMonotonicTimestamp {
        /// Position of the out-of-order fix.
        index: usize,
        /// Timestamp of the preceding fix.
        previous: i64,
        /// Timestamp of the out-of-order fix.
        current: i64,
    },

    /// Flat coordinate and timestamp buffers do not describe the same fixes.
    #[error("{coordinates} coordinates do not pair with {timestamps} timestamps")]
    MismatchedBuffers {
        /// Length of the flat `[lat, lng, ...]` buffer.
        coordinates: usize,
        /// Length of the timestamp buffer.
        timestamps: usize,
    },

    /// A threshold in the configuration is unusable.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl SegmentationError {
    /// Creates an invalid configuration error.
    #[must_use]
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig(reason.into())
    }
}

/// Convenience result alias.
pub type Result<T> = std::result::Result<T, SegmentationError>;
