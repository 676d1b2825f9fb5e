//! Error types for the scooter driver.
//!
//! Two layers of errors exist:
//!
//! - [`DecodeError`] describes why a single frame could not be turned into
//!   telemetry. These never leave the [`TelemetryEngine`](crate::TelemetryEngine):
//!   they are logged and the frame is dropped.
//! - [`ScooterError`] is what callers of the session API see. Transport
//!   failures are retried internally before they surface.
//!
//! ## Recovery and Retry
//!
//! ```rust
//! use m365::ScooterError;
//!
//! let error = ScooterError::transport("device not reachable");
//! if error.is_retryable() {
//!     for suggestion in error.recovery_suggestions() {
//!         println!("  - {}", suggestion);
//!     }
//! }
//! ```

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for driver operations.
pub type Result<T, E = ScooterError> = std::result::Result<T, E>;

/// Caller-facing error type.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ScooterError {
    #[error("Transport failure: {reason}")]
    Transport {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Operation timed out after {duration:?}")]
    Timeout { duration: Duration },

    #[error("Invalid configuration: {reason}")]
    Config { reason: String },

    #[error("Configuration file error: {path}")]
    ConfigFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Session has been shut down")]
    Shutdown,
}

impl ScooterError {
    /// Returns whether this error is potentially recoverable through retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            ScooterError::Transport { .. } => true,
            ScooterError::Timeout { .. } => true,
            ScooterError::Config { .. } => false,
            ScooterError::ConfigFile { .. } => false,
            ScooterError::Shutdown => false,
        }
    }

    /// Returns suggested recovery actions for this error.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            ScooterError::Transport { .. } => vec![
                "Make sure the scooter is powered on and in range",
                "Check that no other client holds the connection",
                "Restart the wireless adapter",
            ],
            ScooterError::Timeout { .. } => vec![
                "Increase the retry delay",
                "Move closer to the scooter",
            ],
            ScooterError::Config { .. } => vec![
                "Check configuration values against the documented ranges",
                "Remove the offending key to fall back to its default",
            ],
            ScooterError::ConfigFile { .. } => vec![
                "Check the configuration file exists and is readable",
                "Check file permissions",
            ],
            ScooterError::Shutdown => vec!["Create a new session"],
        }
    }

    /// Helper constructor for transport errors.
    pub fn transport(reason: impl Into<String>) -> Self {
        ScooterError::Transport { reason: reason.into(), source: None }
    }

    /// Helper constructor for transport errors with source.
    pub fn transport_with_source(
        reason: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        ScooterError::Transport { reason: reason.into(), source: Some(source) }
    }

    /// Helper constructor for configuration errors.
    pub fn config(reason: impl Into<String>) -> Self {
        ScooterError::Config { reason: reason.into() }
    }
}

/// Why a single frame produced no telemetry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Unknown attribute {0:#04x}")]
    UnknownAttribute(u8),

    #[error("Malformed frame header")]
    MalformedHeader,

    #[error("Payload of {attribute} is {actual} bytes, expected {expected}")]
    Inconsistent { attribute: &'static str, expected: usize, actual: usize },
}
