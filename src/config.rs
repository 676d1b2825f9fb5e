//! Driver configuration.
//!
//! Every field has a default, so an empty document is a valid configuration:
//!
//! ```yaml
//! retry:
//!   backoff:
//!     strategy: exponential
//!     initial_ms: 50
//!     max_ms: 1600
//!   max_attempts: 10
//! max_pending_fragments: 8
//! message_buffer: 64
//! command_queue: 16
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

use crate::protocol::reassembly::DEFAULT_MAX_PENDING;
use crate::retry::RetryPolicy;
use crate::{Result, ScooterError};

/// Tuning for a scooter session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// Reconnection policy
    pub retry: RetryPolicy,
    /// Fragments held while waiting for a continuation
    pub max_pending_fragments: usize,
    /// Decoded messages buffered per subscriber before it lags
    pub message_buffer: usize,
    /// Commands queued before `request` waits
    pub command_queue: usize,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            max_pending_fragments: DEFAULT_MAX_PENDING,
            message_buffer: 64,
            command_queue: 16,
        }
    }
}

impl DriverConfig {
    /// Parse and validate a YAML document.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: DriverConfig = serde_yaml_ng::from_str(yaml)
            .map_err(|e| ScooterError::config(format!("failed to parse driver config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a YAML file.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let yaml = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ScooterError::ConfigFile { path: path.to_path_buf(), source })?;
        debug!("Loaded driver config from {}", path.display());
        Self::from_yaml_str(&yaml)
    }

    /// Reject values the session cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.max_pending_fragments == 0 {
            return Err(ScooterError::config("max_pending_fragments must be at least 1"));
        }
        if self.message_buffer == 0 {
            return Err(ScooterError::config("message_buffer must be at least 1"));
        }
        if self.command_queue == 0 {
            return Err(ScooterError::config("command_queue must be at least 1"));
        }
        if self.retry.max_attempts == Some(0) {
            return Err(ScooterError::config("retry.max_attempts must be at least 1"));
        }
        Ok(())
    }
}
