//! Transport trait for the link to the scooter, plus an in-memory replay.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::time::{Duration, Interval, MissedTickBehavior, interval};
use tracing::{debug, info, trace};

use crate::protocol::{HexDump, parse_hex};
use crate::{Result, ScooterError};

/// A bidirectional link to the scooter.
///
/// Implementations wrap a wireless stack (or anything else that can carry
/// frames) and are owned by the driver task, so they never need internal
/// locking.
#[async_trait::async_trait]
pub trait Transport: Send + 'static {
    /// Establish the link and subscribe to notifications.
    async fn connect(&mut self) -> Result<()>;

    /// Tear the link down. Called before every reconnect.
    async fn disconnect(&mut self) -> Result<()>;

    /// Send one complete frame.
    async fn write(&mut self, frame: &[u8]) -> Result<()>;

    /// Wait for the next notification payload.
    ///
    /// Returns:
    /// - `Ok(Some(bytes))` - A delivery arrived
    /// - `Ok(None)` - The link closed for good
    /// - `Err(e)` - The link failed and may be re-established
    ///
    /// Must be cancel safe: the driver races it against commands and shutdown.
    async fn next_notification(&mut self) -> Result<Option<Vec<u8>>>;

    /// Short label for log output.
    fn describe(&self) -> String {
        "transport".to_string()
    }
}

#[async_trait::async_trait]
impl<T: Transport + ?Sized> Transport for Box<T> {
    async fn connect(&mut self) -> Result<()> {
        (**self).connect().await
    }

    async fn disconnect(&mut self) -> Result<()> {
        (**self).disconnect().await
    }

    async fn write(&mut self, frame: &[u8]) -> Result<()> {
        (**self).write(frame).await
    }

    async fn next_notification(&mut self) -> Result<Option<Vec<u8>>> {
        (**self).next_notification().await
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

/// Frames written to a [`ReplayTransport`], readable after the transport has
/// been handed to a session.
#[derive(Debug, Clone, Default)]
pub struct WriteLog {
    frames: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl WriteLog {
    /// Copy of every frame written so far, oldest first.
    pub fn frames(&self) -> Vec<Vec<u8>> {
        self.frames.lock().map(|frames| frames.clone()).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.frames.lock().map(|frames| frames.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn push(&self, frame: &[u8]) {
        if let Ok(mut frames) = self.frames.lock() {
            frames.push(frame.to_vec());
        }
    }
}

/// Transport replaying recorded notification payloads.
///
/// Deliveries are handed out in order, optionally paced by a fixed interval.
/// Once exhausted the link reports closed.
#[derive(Debug)]
pub struct ReplayTransport {
    deliveries: VecDeque<Vec<u8>>,
    pace: Option<Duration>,
    ticker: Option<Interval>,
    connected: bool,
    connects: u32,
    written: WriteLog,
}

impl ReplayTransport {
    pub fn from_deliveries<I>(deliveries: I) -> Self
    where
        I: IntoIterator<Item = Vec<u8>>,
    {
        Self {
            deliveries: deliveries.into_iter().collect(),
            pace: None,
            ticker: None,
            connected: false,
            connects: 0,
            written: WriteLog::default(),
        }
    }

    /// Parse a capture: one hex-encoded delivery per line. Blank lines and
    /// lines starting with `#` are skipped.
    ///
    /// ```rust
    /// use m365::ReplayTransport;
    ///
    /// let capture = "# speed\n55 aa 04 23 01 b5 64 00 be fe\n";
    /// let replay = ReplayTransport::from_capture_str(capture).unwrap();
    /// assert_eq!(replay.remaining(), 1);
    /// ```
    pub fn from_capture_str(capture: &str) -> Result<Self> {
        let mut deliveries = Vec::new();
        for (index, line) in capture.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let bytes = parse_hex(line).ok_or_else(|| {
                ScooterError::config(format!("capture line {} is not hex: {:?}", index + 1, line))
            })?;
            deliveries.push(bytes);
        }
        info!("Loaded capture with {} deliveries", deliveries.len());
        Ok(Self::from_deliveries(deliveries))
    }

    /// Hand out one delivery per `period`.
    pub fn paced(mut self, period: Duration) -> Self {
        self.pace = Some(period);
        self.ticker = None;
        self
    }

    /// Handle on the frames written to this transport.
    pub fn write_log(&self) -> WriteLog {
        self.written.clone()
    }

    /// Deliveries not yet handed out.
    pub fn remaining(&self) -> usize {
        self.deliveries.len()
    }

    /// Number of successful `connect` calls.
    pub fn connect_count(&self) -> u32 {
        self.connects
    }
}

#[async_trait::async_trait]
impl Transport for ReplayTransport {
    async fn connect(&mut self) -> Result<()> {
        self.connected = true;
        self.connects += 1;
        debug!("Replay connected ({} deliveries queued)", self.deliveries.len());
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        self.connected = false;
        Ok(())
    }

    async fn write(&mut self, frame: &[u8]) -> Result<()> {
        if !self.connected {
            return Err(ScooterError::transport("replay is not connected"));
        }
        trace!("Replay write: {}", HexDump(frame));
        self.written.push(frame);
        Ok(())
    }

    async fn next_notification(&mut self) -> Result<Option<Vec<u8>>> {
        if !self.connected {
            return Err(ScooterError::transport("replay is not connected"));
        }
        if self.deliveries.is_empty() {
            debug!("Reached end of replay");
            return Ok(None);
        }

        if let Some(period) = self.pace {
            let ticker = self.ticker.get_or_insert_with(|| {
                let mut ticker = interval(period);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                ticker
            });
            ticker.tick().await;
        }

        Ok(self.deliveries.pop_front())
    }

    fn describe(&self) -> String {
        format!("replay ({} deliveries left)", self.deliveries.len())
    }
}
