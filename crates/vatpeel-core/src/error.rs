//! Error types for the vat-peel analysis core.
//!
//! Structural errors (mismatched lengths, non-monotone time, bad intervals)
//! indicate a bug in the caller and fail loudly. Insufficient-data conditions
//! are NOT errors; the calculator degrades the affected metrics to NaN and
//! keeps going.

use thiserror::Error;

/// A specialized `Result` type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Structural errors raised by the analysis core.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum CoreError {
    /// Sample arrays with different lengths were combined into one record.
    #[error("Mismatched array lengths: {times} times, {positions} positions, {forces} forces")]
    LengthMismatch {
        /// Number of time samples
        times: usize,
        /// Number of position samples
        positions: usize,
        /// Number of force samples
        forces: usize,
    },

    /// Time decreased between consecutive samples.
    #[error("Non-monotone time at sample {index}: {previous} -> {current}")]
    NonMonotonicTime {
        /// Index of the offending sample
        index: usize,
        /// Time of the preceding sample (s)
        previous: f64,
        /// Time of the offending sample (s)
        current: f64,
    },

    /// A sample-index interval is empty or inverted.
    #[error("Empty interval [{start}, {end})")]
    EmptyInterval {
        /// Interval start (inclusive)
        start: usize,
        /// Interval end (exclusive)
        end: usize,
    },

    /// Layer boundaries violate `l0 < l1 <= r0 < r1` or exceed the record.
    #[error("Invalid layer boundaries: {message}")]
    InvalidBoundaries {
        /// Description of the violation
        message: String,
    },

    /// An index points past the end of the parent record.
    #[error("Index {index} out of range for record of length {len}")]
    IndexOutOfRange {
        /// The offending index
        index: usize,
        /// Record length
        len: usize,
    },

    /// A configuration value is out of its valid domain.
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of the configuration error
        message: String,
    },
}

impl CoreError {
    /// Creates a new configuration error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates a new invalid-boundaries error.
    #[must_use]
    pub fn invalid_boundaries(message: impl Into<String>) -> Self {
        Self::InvalidBoundaries {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_mentions_offending_values() {
        let err = CoreError::NonMonotonicTime {
            index: 42,
            previous: 1.5,
            current: 1.2,
        };
        let msg = err.to_string();
        assert!(msg.contains("42"));
        assert!(msg.contains("1.5"));
    }

    #[test]
    fn configuration_helper() {
        let err = CoreError::configuration("median_kernel must be odd");
        assert!(err.to_string().contains("median_kernel"));
    }
}
