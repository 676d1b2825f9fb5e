//! Reconnection policy.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::transport::Transport;
use crate::{Result, ScooterError};

/// Delay between consecutive connection attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum Backoff {
    /// Retry straight away
    Immediate,
    /// Same delay every time
    Fixed { delay_ms: u64 },
    /// Doubling delay, capped at `max_ms`
    Exponential { initial_ms: u64, max_ms: u64 },
}

/// How connection attempts are retried.
///
/// The default doubles a 50 ms delay up to 1.6 s and never gives up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub backoff: Backoff,
    /// Total attempts before giving up, `None` for unbounded
    pub max_attempts: Option<u32>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { backoff: Backoff::Exponential { initial_ms: 50, max_ms: 1600 }, max_attempts: None }
    }
}

impl RetryPolicy {
    pub fn immediate() -> Self {
        Self { backoff: Backoff::Immediate, max_attempts: None }
    }

    pub fn fixed(delay: Duration) -> Self {
        Self { backoff: Backoff::Fixed { delay_ms: delay.as_millis() as u64 }, max_attempts: None }
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = Some(attempts);
        self
    }

    /// Delay before retry number `retry` (zero-based).
    pub fn delay(&self, retry: u32) -> Duration {
        match self.backoff {
            Backoff::Immediate => Duration::ZERO,
            Backoff::Fixed { delay_ms } => Duration::from_millis(delay_ms),
            Backoff::Exponential { initial_ms, max_ms } => {
                let factor = 1u64 << retry.min(16);
                Duration::from_millis(initial_ms.saturating_mul(factor).min(max_ms))
            }
        }
    }

    /// Whether `attempts` failed attempts use up the budget.
    pub fn is_exhausted(&self, attempts: u32) -> bool {
        self.max_attempts.is_some_and(|max| attempts >= max)
    }
}

/// Connect `transport`, retrying retryable failures per `policy`.
///
/// Returns [`ScooterError::Shutdown`] as soon as `cancel` fires.
pub async fn connect_with_retry<T>(
    transport: &mut T,
    policy: &RetryPolicy,
    cancel: &CancellationToken,
) -> Result<()>
where
    T: Transport + ?Sized,
{
    let mut failures = 0u32;

    loop {
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ScooterError::Shutdown),
            result = transport.connect() => result,
        };

        let err = match result {
            Ok(()) => {
                if failures > 0 {
                    info!("Connected to {} after {} retries", transport.describe(), failures);
                } else {
                    info!("Connected to {}", transport.describe());
                }
                return Ok(());
            }
            Err(err) if !err.is_retryable() => return Err(err),
            Err(err) => err,
        };

        failures += 1;
        if policy.is_exhausted(failures) {
            warn!("Giving up on {} after {} attempts: {}", transport.describe(), failures, err);
            return Err(err);
        }

        let delay = policy.delay(failures - 1);
        warn!(
            "Connecting to {} failed (attempt {}): {}, retrying in {:?}",
            transport.describe(),
            failures,
            err,
            delay
        );

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ScooterError::Shutdown),
            _ = tokio::time::sleep(delay) => {}
        }
    }
}
