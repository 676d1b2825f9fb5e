//! Notification processing: reassembly, decoding and state merging.
//!
//! [`TelemetryEngine`] is the synchronous core behind a session. It does no
//! I/O; the driver hands it every notification payload in arrival order.

use tracing::{debug, trace, warn};

use crate::DecodeError;
use crate::protocol::{HexDump, Message, Reassembler, ReassemblyStats, decode};
use crate::state::DeviceState;
use crate::types::DecodedFields;

/// Observer notified once per successfully decoded message, after the state
/// has been updated.
pub trait MessageHandler: Send {
    fn on_message_decoded(&mut self, message: &Message, fields: &DecodedFields);
}

impl<F> MessageHandler for F
where
    F: FnMut(&Message, &DecodedFields) + Send,
{
    fn on_message_decoded(&mut self, message: &Message, fields: &DecodedFields) {
        self(message, fields)
    }
}

/// A validated frame together with what it decoded to.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedMessage {
    pub message: Message,
    pub fields: DecodedFields,
}

/// Engine counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStats {
    pub reassembly: ReassemblyStats,
    /// Messages decoded and merged
    pub decoded: u64,
    /// Frames carrying an attribute outside the catalog
    pub unknown_attributes: u64,
    /// Frames whose payload length disagreed with the catalog
    pub inconsistent_payloads: u64,
}

/// Owns the pending fragments and the device state of one session.
pub struct TelemetryEngine {
    reassembler: Reassembler,
    state: DeviceState,
    handler: Option<Box<dyn MessageHandler>>,
    stats: EngineStats,
}

impl Default for TelemetryEngine {
    fn default() -> Self {
        Self::new(Reassembler::default())
    }
}

impl std::fmt::Debug for TelemetryEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelemetryEngine")
            .field("reassembler", &self.reassembler)
            .field("state", &self.state)
            .field("has_handler", &self.handler.is_some())
            .field("stats", &self.stats)
            .finish()
    }
}

impl TelemetryEngine {
    pub fn new(reassembler: Reassembler) -> Self {
        Self { reassembler, state: DeviceState::new(), handler: None, stats: EngineStats::default() }
    }

    /// Engine holding at most `max_pending` fragments.
    pub fn with_max_pending(max_pending: usize) -> Self {
        Self::new(Reassembler::new(max_pending))
    }

    pub fn with_handler(mut self, handler: impl MessageHandler + 'static) -> Self {
        self.handler = Some(Box::new(handler));
        self
    }

    pub fn set_handler(&mut self, handler: Option<Box<dyn MessageHandler>>) {
        self.handler = handler;
    }

    /// Process one notification payload.
    ///
    /// Returns the messages it completed, already merged into the state and
    /// reported to the handler. Frames that fail to decode are logged and
    /// leave the state untouched.
    pub fn on_notification(&mut self, buf: &[u8]) -> Vec<DecodedMessage> {
        if buf.is_empty() {
            return Vec::new();
        }
        trace!("Notification ({} bytes): {}", buf.len(), HexDump(buf));

        let messages = self.reassembler.on_bytes(buf);
        let mut decoded = Vec::with_capacity(messages.len());

        for message in messages {
            match decode(&message) {
                Ok(fields) => {
                    debug!("Decoded {}: {} fields", message, fields.len());
                    self.state.merge(&fields);
                    if let Some(handler) = self.handler.as_mut() {
                        handler.on_message_decoded(&message, &fields);
                    }
                    self.stats.decoded += 1;
                    decoded.push(DecodedMessage { message, fields });
                }
                Err(DecodeError::UnknownAttribute(id)) => {
                    warn!("Unhandled attribute {:#04x}: {}", id, HexDump(message.raw()));
                    self.stats.unknown_attributes += 1;
                }
                Err(err) => {
                    debug!("Discarding {}: {}", message, err);
                    self.stats.inconsistent_payloads += 1;
                }
            }
        }

        decoded
    }

    pub fn state(&self) -> &DeviceState {
        &self.state
    }

    pub fn snapshot(&self) -> DeviceState {
        self.state.snapshot()
    }

    /// Forget pending fragments; state is kept.
    pub fn reset_link(&mut self) {
        self.reassembler.clear();
    }

    pub fn pending_fragments(&self) -> usize {
        self.reassembler.pending_len()
    }

    pub fn stats(&self) -> EngineStats {
        EngineStats { reassembly: self.reassembler.stats(), ..self.stats }
    }
}
