//! Test utilities: a scriptable transport and frame builders.
//!
//! Shared by unit tests and benches.

#![cfg(any(test, feature = "benchmark"))]

use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

use crate::protocol::{Attribute, Direction, Message, ReadWrite};
use crate::transport::Transport;
use crate::{Result, ScooterError};

/// Encode a scooter-to-host frame for `attribute`.
pub fn frame(attribute: Attribute, payload: &[u8]) -> Vec<u8> {
    Message::encode(Direction::MotorToMaster, ReadWrite::Read, attribute.id(), payload).raw().to_vec()
}

/// A deterministic, non-trivial payload of the right width for `attribute`.
pub fn sample_payload(attribute: Attribute) -> Vec<u8> {
    (0..attribute.layout().width()).map(|i| (i as u8).wrapping_mul(7).wrapping_add(0x30)).collect()
}

/// `raw` cut into notification sized pieces.
pub fn split_deliveries(raw: &[u8], max_delivery: usize) -> Vec<Vec<u8>> {
    raw.chunks(max_delivery.max(1)).map(<[u8]>::to_vec).collect()
}

/// One step of the notification script.
#[derive(Debug, Clone)]
pub enum ReadStep {
    Deliver(Vec<u8>),
    Fail,
    Close,
}

#[derive(Debug, Default)]
struct ScriptLog {
    connect_attempts: u32,
    disconnects: u32,
    connect_failures: u32,
    write_failures: u32,
    writes: Vec<Vec<u8>>,
}

/// Shared view of a [`ScriptedTransport`] that stays usable after the
/// transport moved into a session.
#[derive(Debug, Clone)]
pub struct ScriptHandle {
    feed: mpsc::UnboundedSender<ReadStep>,
    log: Arc<Mutex<ScriptLog>>,
}

impl ScriptHandle {
    pub fn deliver(&self, bytes: impl Into<Vec<u8>>) {
        let _ = self.feed.send(ReadStep::Deliver(bytes.into()));
    }

    pub fn fail_read(&self) {
        let _ = self.feed.send(ReadStep::Fail);
    }

    pub fn close(&self) {
        let _ = self.feed.send(ReadStep::Close);
    }

    pub fn connect_attempts(&self) -> u32 {
        self.log.lock().unwrap().connect_attempts
    }

    pub fn disconnects(&self) -> u32 {
        self.log.lock().unwrap().disconnects
    }

    /// Frames successfully written, oldest first.
    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.log.lock().unwrap().writes.clone()
    }
}

/// Transport driven by a script of reads plus injected failures.
///
/// With the script exhausted, reads wait until more steps are fed through a
/// [`ScriptHandle`].
#[derive(Debug)]
pub struct ScriptedTransport {
    reads: mpsc::UnboundedReceiver<ReadStep>,
    handle: ScriptHandle,
    connected: bool,
    answer_reads: bool,
}

impl Default for ScriptedTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedTransport {
    pub fn new() -> Self {
        let (feed, reads) = mpsc::unbounded_channel();
        Self {
            reads,
            handle: ScriptHandle { feed, log: Arc::new(Mutex::new(ScriptLog::default())) },
            connected: false,
            answer_reads: false,
        }
    }

    /// Fail the next `count` connection attempts.
    pub fn fail_connects(self, count: u32) -> Self {
        self.handle.log.lock().unwrap().connect_failures = count;
        self
    }

    /// Fail the next `count` writes.
    pub fn fail_writes(self, count: u32) -> Self {
        self.handle.log.lock().unwrap().write_failures = count;
        self
    }

    pub fn deliver(self, bytes: impl Into<Vec<u8>>) -> Self {
        self.handle.deliver(bytes);
        self
    }

    pub fn fail_read(self) -> Self {
        self.handle.fail_read();
        self
    }

    pub fn close(self) -> Self {
        self.handle.close();
        self
    }

    /// Answer every read request with a [`sample_payload`] frame, like a
    /// scooter would.
    pub fn answer_reads(mut self) -> Self {
        self.answer_reads = true;
        self
    }

    pub fn handle(&self) -> ScriptHandle {
        self.handle.clone()
    }

    pub fn connect_attempts(&self) -> u32 {
        self.handle.connect_attempts()
    }
}

#[async_trait::async_trait]
impl Transport for ScriptedTransport {
    async fn connect(&mut self) -> Result<()> {
        let mut log = self.handle.log.lock().unwrap();
        log.connect_attempts += 1;
        if log.connect_failures > 0 {
            log.connect_failures -= 1;
            return Err(ScooterError::transport("scripted connect failure"));
        }
        self.connected = true;
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        self.handle.log.lock().unwrap().disconnects += 1;
        self.connected = false;
        Ok(())
    }

    async fn write(&mut self, frame: &[u8]) -> Result<()> {
        if !self.connected {
            return Err(ScooterError::transport("scripted transport is not connected"));
        }
        {
            let mut log = self.handle.log.lock().unwrap();
            if log.write_failures > 0 {
                log.write_failures -= 1;
                return Err(ScooterError::transport("scripted write failure"));
            }
            log.writes.push(frame.to_vec());
        }

        if self.answer_reads {
            if let Ok(request) = Message::try_from(frame) {
                if let (ReadWrite::Read, Some(attribute)) = (request.read_write(), request.attribute()) {
                    self.handle.deliver(self::frame(attribute, &sample_payload(attribute)));
                }
            }
        }
        Ok(())
    }

    async fn next_notification(&mut self) -> Result<Option<Vec<u8>>> {
        if !self.connected {
            return Err(ScooterError::transport("scripted transport is not connected"));
        }
        match self.reads.recv().await {
            Some(ReadStep::Deliver(bytes)) => Ok(Some(bytes)),
            Some(ReadStep::Fail) => Err(ScooterError::transport("scripted read failure")),
            Some(ReadStep::Close) | None => Ok(None),
        }
    }

    fn describe(&self) -> String {
        "scripted transport".to_string()
    }
}
