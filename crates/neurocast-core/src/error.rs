//! Error handling for the Neurocast bridge
//!
//! One error type shared by every crate in the workspace. Fatal conditions
//! (no stream, degenerate filter configuration) and contract violations
//! (oversized buffer writes) are distinct variants so the binary can report
//! them once and exit.

use thiserror::Error;

/// Result type alias for Neurocast operations
pub type NeurocastResult<T> = Result<T, NeurocastError>;

/// Error type for all Neurocast operations
#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum NeurocastError {
    /// No upstream stream of the requested type appeared before the timeout
    #[error("no {signal_type} stream found within {timeout_secs}s")]
    NoStreamFound {
        /// Declared signal type that was searched for
        signal_type: String,
        /// Discovery timeout in seconds
        timeout_secs: f64,
    },

    /// Filter cutoffs or clamp bounds cannot produce a valid filter
    #[error("invalid filter specification: {reason}")]
    InvalidFilterSpec {
        /// Description of the degenerate parameter
        reason: String,
    },

    /// Caller handed a component data it must never receive
    #[error("invalid input: {reason}")]
    InvalidInput {
        /// Description of the violated precondition
        reason: String,
    },

    /// Static configuration failed validation
    #[error("configuration error: {message}")]
    Configuration {
        /// Description of the configuration issue
        message: String,
    },

    /// Upstream sample source failed
    #[error("sample source error: {reason}")]
    Source {
        /// Source-specific error description
        reason: String,
    },

    /// Outgoing transport failed to hand off a value
    #[error("transport error: {reason}")]
    Transport {
        /// Transport-specific error description
        reason: String,
    },

    /// Spectral estimation could not run
    #[error("spectral estimation failed: {reason}")]
    Spectral {
        /// Description of the failure
        reason: String,
    },
}

/// Convenience macro for creating configuration errors
#[macro_export]
macro_rules! config_error {
    ($($arg:tt)+) => {
        $crate::error::NeurocastError::Configuration {
            message: format!($($arg)+),
        }
    };
}

/// Convenience macro for creating invalid-input errors
#[macro_export]
macro_rules! invalid_input {
    ($($arg:tt)+) => {
        $crate::error::NeurocastError::InvalidInput {
            reason: format!($($arg)+),
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = NeurocastError::NoStreamFound {
            signal_type: "EEG".to_string(),
            timeout_secs: 5.0,
        };
        let display = format!("{}", error);
        assert!(display.contains("no EEG stream"));
        assert!(display.contains("5s"));
    }

    #[test]
    fn test_error_equality() {
        let error1 = config_error!("chunk size {} exceeds window", 300);
        let error2 = NeurocastError::Configuration {
            message: "chunk size 300 exceeds window".to_string(),
        };
        assert_eq!(error1, error2);
    }
}
