//! Frame parsing and encoding.
//!
//! Wire format of one frame:
//!
//! ```text
//! 55 aa | len | direction | read/write | attribute | payload (len - 2) | checksum (2, LE)
//! ```
//!
//! The checksum is the 16-bit sum of every byte from `len` through the end of
//! the payload, XOR `0xffff`.

use std::fmt;

use super::attribute::{Attribute, Direction, ReadWrite};
use super::hex::HexDump;
use crate::DecodeError;

/// Sync marker opening every frame.
pub const SYNC: [u8; 2] = [0x55, 0xAA];

/// Sync, length, direction, selector and attribute bytes.
pub const HEADER_LEN: usize = 6;

/// Checksum bytes.
pub const TRAILER_LEN: usize = 2;

/// Largest payload the length byte can describe.
pub const MAX_PAYLOAD_LEN: usize = u8::MAX as usize - 2;

/// A fully validated frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    direction: Direction,
    read_write: ReadWrite,
    attribute_id: u8,
    payload: Vec<u8>,
    raw: Vec<u8>,
}

impl Message {
    /// Build an outbound frame, computing length and checksum.
    ///
    /// # Panics
    ///
    /// Panics if `payload` is longer than [`MAX_PAYLOAD_LEN`].
    pub fn encode(
        direction: Direction,
        read_write: ReadWrite,
        attribute_id: u8,
        payload: &[u8],
    ) -> Self {
        assert!(payload.len() <= MAX_PAYLOAD_LEN, "payload of {} bytes is too long", payload.len());

        let mut raw = Vec::with_capacity(HEADER_LEN + payload.len() + TRAILER_LEN);
        raw.extend_from_slice(&SYNC);
        raw.push((payload.len() + 2) as u8);
        raw.push(direction.to_byte());
        raw.push(read_write.to_byte());
        raw.push(attribute_id);
        raw.extend_from_slice(payload);
        let sum = checksum(&raw[2..]);
        raw.extend_from_slice(&sum.to_le_bytes());

        Self { direction, read_write, attribute_id, payload: payload.to_vec(), raw }
    }

    /// Known attribute carried by this frame, if any.
    pub fn attribute(&self) -> Option<Attribute> {
        Attribute::from_id(self.attribute_id)
    }

    pub fn attribute_id(&self) -> u8 {
        self.attribute_id
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn read_write(&self) -> ReadWrite {
        self.read_write
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Original frame bytes, header and checksum included.
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.attribute() {
            Some(attribute) => write!(f, "{}", attribute)?,
            None => write!(f, "attribute {:#04x}", self.attribute_id)?,
        }
        write!(
            f,
            " ({:?}, {:?}) payload [{}]",
            self.direction,
            self.read_write,
            HexDump(&self.payload)
        )
    }
}

impl TryFrom<&[u8]> for Message {
    type Error = DecodeError;

    /// Strict conversion: `bytes` must hold exactly one valid frame.
    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        match parse(bytes) {
            ParseStatus::Complete { message, consumed } if consumed == bytes.len() => Ok(message),
            _ => Err(DecodeError::MalformedHeader),
        }
    }
}

/// Classification of one buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseStatus {
    /// A complete frame. `consumed` bytes belong to it; anything after is the
    /// start of another delivery concatenated onto this one.
    Complete { message: Message, consumed: usize },
    /// A valid header prefix, shorter than the declared frame length.
    Disjointed,
    /// Not a frame start: wrong sync bytes or an impossible length.
    InvalidHeader,
    /// Full length frame whose checksum does not match.
    InvalidChecksum,
}

impl ParseStatus {
    pub fn is_complete(&self) -> bool {
        matches!(self, ParseStatus::Complete { .. })
    }
}

/// 16-bit frame checksum over `bytes`.
pub fn checksum(bytes: &[u8]) -> u16 {
    bytes.iter().fold(0u16, |sum, byte| sum.wrapping_add(u16::from(*byte))) ^ 0xFFFF
}

/// Classify a buffer that is expected to begin at a frame boundary.
pub fn parse(buf: &[u8]) -> ParseStatus {
    match buf {
        [] => return ParseStatus::InvalidHeader,
        [first, ..] if *first != SYNC[0] => return ParseStatus::InvalidHeader,
        [_] => return ParseStatus::Disjointed,
        [_, second, ..] if *second != SYNC[1] => return ParseStatus::InvalidHeader,
        [_, _] => return ParseStatus::Disjointed,
        _ => {}
    }

    let declared = usize::from(buf[2]);
    if declared < 2 {
        return ParseStatus::InvalidHeader;
    }

    let total = declared + HEADER_LEN;
    if buf.len() < total {
        return ParseStatus::Disjointed;
    }

    let payload_end = total - TRAILER_LEN;
    let expected = checksum(&buf[2..payload_end]);
    let received = u16::from_le_bytes([buf[payload_end], buf[payload_end + 1]]);
    if expected != received {
        return ParseStatus::InvalidChecksum;
    }

    let message = Message {
        direction: Direction::from(buf[3]),
        read_write: ReadWrite::from(buf[4]),
        attribute_id: buf[5],
        payload: buf[HEADER_LEN..payload_end].to_vec(),
        raw: buf[..total].to_vec(),
    };

    ParseStatus::Complete { message, consumed: total }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn speed_frame() -> Vec<u8> {
        Message::encode(Direction::MotorToMaster, ReadWrite::Read, 0xB5, &[0x64, 0x00])
            .raw()
            .to_vec()
    }

    #[test]
    fn encodes_known_request() {
        // Classic "read 32 bytes of motor info" request
        let message = Message::encode(Direction::MasterToMotor, ReadWrite::Read, 0xB0, &[0x20]);
        assert_eq!(message.raw(), &[0x55, 0xAA, 0x03, 0x20, 0x01, 0xB0, 0x20, 0x0B, 0xFF]);
    }

    #[test]
    fn parses_complete_frame() {
        let raw = speed_frame();
        match parse(&raw) {
            ParseStatus::Complete { message, consumed } => {
                assert_eq!(consumed, raw.len());
                assert_eq!(message.attribute(), Some(Attribute::Speed));
                assert_eq!(message.direction(), Direction::MotorToMaster);
                assert_eq!(message.payload(), &[0x64, 0x00]);
                assert_eq!(message.raw(), raw.as_slice());
            }
            other => panic!("expected complete frame, got {:?}", other),
        }
    }

    #[test]
    fn unknown_attribute_still_parses() {
        let raw = Message::encode(Direction::MotorToMaster, ReadWrite::Read, 0xEE, &[1, 2]);
        match parse(raw.raw()) {
            ParseStatus::Complete { message, .. } => {
                assert_eq!(message.attribute(), None);
                assert_eq!(message.attribute_id(), 0xEE);
            }
            other => panic!("expected complete frame, got {:?}", other),
        }
    }

    #[test]
    fn header_prefixes_are_disjointed() {
        let raw = speed_frame();
        for cut in 1..raw.len() {
            assert_eq!(parse(&raw[..cut]), ParseStatus::Disjointed, "cut at {}", cut);
        }
    }

    #[test]
    fn invalid_headers() {
        assert_eq!(parse(&[]), ParseStatus::InvalidHeader);
        assert_eq!(parse(&[0x00, 0xAA, 0x04]), ParseStatus::InvalidHeader);
        assert_eq!(parse(&[0x55, 0x00, 0x04]), ParseStatus::InvalidHeader);
        assert_eq!(parse(&[0x55, 0xAA, 0x01, 0x23, 0x01, 0xB5, 0, 0]), ParseStatus::InvalidHeader);
    }

    #[test]
    fn corrupted_checksum_is_rejected() {
        let mut raw = speed_frame();
        let last = raw.len() - 1;
        raw[last] ^= 0xFF;
        assert_eq!(parse(&raw), ParseStatus::InvalidChecksum);
    }

    #[test]
    fn strict_conversion() {
        let raw = speed_frame();
        assert_eq!(Message::try_from(raw.as_slice()).map(|m| m.attribute_id()), Ok(0xB5));
        assert_eq!(Message::try_from(&raw[..4]), Err(DecodeError::MalformedHeader));

        let mut doubled = raw.clone();
        doubled.extend_from_slice(&raw);
        assert_eq!(Message::try_from(doubled.as_slice()), Err(DecodeError::MalformedHeader));
    }

    #[test]
    fn trailing_bytes_are_not_consumed() {
        let mut raw = speed_frame();
        let frame_len = raw.len();
        raw.extend_from_slice(&speed_frame());
        match parse(&raw) {
            ParseStatus::Complete { consumed, .. } => assert_eq!(consumed, frame_len),
            other => panic!("expected complete frame, got {:?}", other),
        }
    }

    proptest! {
        #[test]
        fn encoded_frames_parse_back(
            direction in any::<u8>(),
            selector in any::<u8>(),
            attribute in any::<u8>(),
            payload in prop::collection::vec(any::<u8>(), 0..64),
        ) {
            let encoded = Message::encode(direction.into(), selector.into(), attribute, &payload);
            prop_assert_eq!(encoded.raw().len(), HEADER_LEN + payload.len() + TRAILER_LEN);

            match parse(encoded.raw()) {
                ParseStatus::Complete { message, consumed } => {
                    prop_assert_eq!(consumed, encoded.raw().len());
                    prop_assert_eq!(message, encoded);
                }
                other => prop_assert!(false, "unexpected {:?}", other),
            }
        }

        #[test]
        fn garbage_never_panics(bytes in prop::collection::vec(any::<u8>(), 0..80)) {
            let _ = parse(&bytes);
        }
    }
}
