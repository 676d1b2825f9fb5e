//! Payload decoding into unit-scaled, named fields.

use super::attribute::Attribute;
use super::frame::Message;
use super::layout::{FieldSpec, Segment, Transform};
use crate::DecodeError;
use crate::types::{DecodedFields, FieldKind, Value};

/// Decode a parsed message using its attribute's layout.
///
/// Pure: the message is only read. Unknown attributes and payloads whose
/// length differs from the layout width yield an error and no fields.
pub fn decode(message: &Message) -> Result<DecodedFields, DecodeError> {
    let attribute = Attribute::try_from(message.attribute_id())?;
    decode_payload(attribute, message.payload())
}

/// Decode a bare payload for a known attribute.
pub fn decode_payload(attribute: Attribute, payload: &[u8]) -> Result<DecodedFields, DecodeError> {
    let layout = attribute.layout();
    let expected = layout.width();
    if payload.len() != expected {
        return Err(DecodeError::Inconsistent {
            attribute: attribute.name(),
            expected,
            actual: payload.len(),
        });
    }

    let mut fields = DecodedFields::with_capacity(layout.segments().len());
    let mut offset = 0;
    for segment in layout.segments() {
        let end = offset + segment.size();
        if let Segment::Field(spec) = segment {
            fields.insert(spec.name, read_field(spec, &payload[offset..end]));
        }
        offset = end;
    }

    Ok(fields)
}

/// `bytes` is exactly `spec.kind.size()` long.
fn read_field(spec: &FieldSpec, bytes: &[u8]) -> Value {
    match spec.kind {
        FieldKind::UInt8 => apply(spec.transform, i64::from(bytes[0])),
        FieldKind::UInt16 => apply(spec.transform, i64::from(u16::from_le_bytes([bytes[0], bytes[1]]))),
        FieldKind::Int16 => apply(spec.transform, i64::from(i16::from_le_bytes([bytes[0], bytes[1]]))),
        FieldKind::UInt32 => apply(
            spec.transform,
            i64::from(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])),
        ),
        FieldKind::Ascii(_) => Value::Text(ascii(bytes)),
        FieldKind::Flag(marker) => Value::Bool(bytes[0] == marker),
        FieldKind::Version => Value::Text(render_version(u16::from_le_bytes([bytes[0], bytes[1]]))),
    }
}

fn apply(transform: Transform, raw: i64) -> Value {
    match transform {
        Transform::None => Value::Int(raw),
        Transform::Divide(factor) => Value::Float(raw as f64 / factor),
        Transform::Offset(offset) => Value::Int(raw + offset),
    }
}

fn ascii(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).trim_end_matches(['\0', ' ']).to_string()
}

/// Render a firmware version word: high byte nibbles are the major and minor
/// digits, the low nibble of the low byte is the patch digit.
pub fn render_version(word: u16) -> String {
    let [lo, hi] = word.to_le_bytes();
    format!("V{:x}.{:x}.{:x}", hi >> 4, hi & 0x0F, lo & 0x0F)
}
