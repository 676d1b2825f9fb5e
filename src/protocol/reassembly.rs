//! Reassembly of frames split across several notification deliveries.
//!
//! A notification is capped at a small size, so longer frames arrive as two
//! deliveries. The first parses as [`ParseStatus::Disjointed`] and is kept as
//! a pending fragment. The second does not start with a sync marker and
//! parses as [`ParseStatus::InvalidHeader`]; it is then appended to each
//! pending fragment in arrival order until one concatenation yields a
//! complete frame. The first match wins and only that fragment is consumed.
//!
//! Pending fragments never expire on their own. The store is bounded by
//! `max_pending`: once full, the oldest fragment is evicted.

use std::collections::VecDeque;
use tracing::{debug, trace, warn};

use super::frame::{Message, ParseStatus, parse};
use super::hex::HexDump;

/// Default number of fragments held before the oldest is evicted.
pub const DEFAULT_MAX_PENDING: usize = 8;

/// Counters describing what the reassembler has done so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReassemblyStats {
    /// Frames emitted, whether direct or reassembled
    pub completed: u64,
    /// Frames emitted by joining a fragment with a later delivery
    pub reassembled: u64,
    /// Deliveries discarded because nothing could make sense of them
    pub dropped: u64,
    /// Complete-length frames rejected by checksum
    pub checksum_failures: u64,
    /// Fragments discarded to stay within the bound
    pub evicted: u64,
    /// Fragments currently waiting for a continuation
    pub pending: usize,
}

/// Pending fragment store and concatenation retry.
#[derive(Debug)]
pub struct Reassembler {
    pending: VecDeque<Vec<u8>>,
    max_pending: usize,
    stats: ReassemblyStats,
}

impl Default for Reassembler {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_PENDING)
    }
}

impl Reassembler {
    /// Create a reassembler holding at most `max_pending` fragments (minimum 1).
    pub fn new(max_pending: usize) -> Self {
        Self {
            pending: VecDeque::new(),
            max_pending: max_pending.max(1),
            stats: ReassemblyStats::default(),
        }
    }

    /// Feed one delivery, returning every frame it completes.
    ///
    /// Usually zero or one message; more when several frames were
    /// concatenated into the same delivery.
    pub fn on_bytes(&mut self, buf: &[u8]) -> Vec<Message> {
        let mut messages = Vec::new();
        let mut rest = buf;

        while !rest.is_empty() {
            match parse(rest) {
                ParseStatus::Complete { message, consumed } => {
                    self.stats.completed += 1;
                    messages.push(message);
                    rest = &rest[consumed..];
                }
                ParseStatus::Disjointed => {
                    self.store(rest);
                    break;
                }
                ParseStatus::InvalidHeader => {
                    if let Some((message, trailing)) = self.complete_pending(rest) {
                        messages.push(message);
                        rest = trailing;
                    } else {
                        trace!("Dropping {} unmatched bytes: {}", rest.len(), HexDump(rest));
                        self.stats.dropped += 1;
                        break;
                    }
                }
                ParseStatus::InvalidChecksum => {
                    debug!("Dropping frame with bad checksum: {}", HexDump(rest));
                    self.stats.checksum_failures += 1;
                    self.stats.dropped += 1;
                    break;
                }
            }
        }

        self.stats.pending = self.pending.len();
        messages
    }

    /// Try `fragment || buf` for each pending fragment, oldest first.
    ///
    /// On success the fragment is removed and the bytes of `buf` the frame did
    /// not use are returned alongside the message.
    fn complete_pending<'a>(&mut self, buf: &'a [u8]) -> Option<(Message, &'a [u8])> {
        for index in 0..self.pending.len() {
            let fragment = &self.pending[index];
            let mut combined = Vec::with_capacity(fragment.len() + buf.len());
            combined.extend_from_slice(fragment);
            combined.extend_from_slice(buf);

            if let ParseStatus::Complete { message, consumed } = parse(&combined) {
                let fragment_len = fragment.len();
                self.pending.remove(index);
                self.stats.completed += 1;
                self.stats.reassembled += 1;
                debug!("Reassembled {} from {} + {} bytes", message, fragment_len, buf.len());

                // A frame always extends past its fragment, so this never underflows
                let used = consumed - fragment_len;
                return Some((message, &buf[used..]));
            }
        }
        None
    }

    fn store(&mut self, fragment: &[u8]) {
        if self.pending.len() >= self.max_pending {
            if let Some(evicted) = self.pending.pop_front() {
                warn!(
                    "Pending fragment limit ({}) reached, evicting oldest: {}",
                    self.max_pending,
                    HexDump(&evicted)
                );
                self.stats.evicted += 1;
            }
        }
        trace!("Storing fragment: {}", HexDump(fragment));
        self.pending.push_back(fragment.to_vec());
    }

    /// Drop all pending fragments, e.g. after the link was re-established.
    pub fn clear(&mut self) {
        self.pending.clear();
        self.stats.pending = 0;
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn stats(&self) -> ReassemblyStats {
        self.stats
    }
}
