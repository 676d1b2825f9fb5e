//! Attribute catalog: payload layouts and unit transforms.
//!
//! Every known attribute maps to one static [`Layout`], an ordered list of
//! fields and skipped byte runs. All multi-byte fields are little-endian.
//! Skipped runs are padding or registers we do not interpret; they are never
//! surfaced as fields but count towards the payload width.

use crate::types::FieldKind;

/// Conversion from raw integer to engineering units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Transform {
    /// Raw value is kept as an integer
    None,
    /// Raw value divided by the factor, producing a float
    Divide(f64),
    /// Raw value shifted by the offset, staying an integer
    Offset(i64),
}

/// One named field in a payload.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub transform: Transform,
}

/// A payload segment: either a decoded field or ignored bytes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Segment {
    Field(FieldSpec),
    Skip(usize),
}

impl Segment {
    pub const fn size(&self) -> usize {
        match self {
            Segment::Field(spec) => spec.kind.size(),
            Segment::Skip(len) => *len,
        }
    }
}

/// Ordered payload description for one attribute.
#[derive(Debug, PartialEq)]
pub struct Layout {
    segments: &'static [Segment],
}

impl Layout {
    pub fn segments(&self) -> &'static [Segment] {
        self.segments
    }

    /// Decoded fields only, skipping padding.
    pub fn fields(&self) -> impl Iterator<Item = &'static FieldSpec> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Field(spec) => Some(spec),
            Segment::Skip(_) => None,
        })
    }

    /// Exact payload width in bytes.
    pub fn width(&self) -> usize {
        self.segments.iter().map(Segment::size).sum()
    }
}

const fn field(name: &'static str, kind: FieldKind, transform: Transform) -> Segment {
    Segment::Field(FieldSpec { name, kind, transform })
}

const fn raw(name: &'static str, kind: FieldKind) -> Segment {
    field(name, kind, Transform::None)
}

const fn divided(name: &'static str, kind: FieldKind, factor: f64) -> Segment {
    field(name, kind, Transform::Divide(factor))
}

use FieldKind::{Ascii, Flag, Int16, UInt8, UInt16, UInt32, Version};

pub static DISTANCE_LEFT: Layout =
    Layout { segments: &[divided("distance_left_km", UInt16, 100.0)] };

pub static SPEED: Layout = Layout { segments: &[divided("speed_kmh", UInt16, 100.0)] };

pub static DISTANCE_SINCE_STARTUP: Layout = Layout { segments: &[
    Segment::Skip(6),
    divided("distance_since_startup_km", UInt16, 1000.0),
] };

pub static TAIL_LIGHT: Layout =
    Layout { segments: &[raw("is_tail_light_on", Flag(0x02)), Segment::Skip(1)] };

pub static CRUISE: Layout =
    Layout { segments: &[raw("is_cruise_on", Flag(0x01)), Segment::Skip(1)] };

pub static BATTERY_INFO: Layout = Layout { segments: &[
    divided("battery_capacity", UInt16, 1000.0),
    raw("battery_percent", UInt16),
    divided("battery_current", Int16, 100.0),
    divided("battery_voltage", UInt16, 100.0),
    field("battery_temperature_1", UInt8, Transform::Offset(-20)),
    field("battery_temperature_2", UInt8, Transform::Offset(-20)),
] };

pub static BATTERY_VOLTAGE: Layout =
    Layout { segments: &[divided("battery_voltage", UInt16, 100.0)] };

pub static BATTERY_CURRENT: Layout =
    Layout { segments: &[divided("battery_current", Int16, 100.0)] };

pub static BATTERY_PERCENT: Layout = Layout { segments: &[raw("battery_percent", UInt16)] };

pub static GENERAL_INFO: Layout = Layout {
    segments: &[raw("serial", Ascii(14)), raw("pin", Ascii(6)), raw("version", Version)],
};

pub static MOTOR_INFO: Layout = Layout { segments: &[
    raw("error", UInt16),
    raw("warning", UInt16),
    raw("flags", UInt16),
    raw("workmode", UInt16),
    raw("battery_percent", UInt16),
    divided("speed_kmh", UInt16, 100.0),
    divided("speed_average_kmh", UInt16, 100.0),
    divided("odometer_km", UInt32, 1000.0),
    raw("trip_distance_m", Int16),
    raw("uptime_s", Int16),
    divided("frame_temperature", Int16, 10.0),
    Segment::Skip(8),
] };

pub static TRIP_INFO: Layout = Layout { segments: &[
    raw("uptime_s", UInt16),
    raw("trip_distance_m", UInt32),
    Segment::Skip(2),
    divided("frame_temperature", Int16, 10.0),
] };

pub static BATTERY_CELL_VOLTAGES: Layout = Layout { segments: &[
    divided("cell_1_voltage", UInt16, 100.0),
    divided("cell_2_voltage", UInt16, 100.0),
    divided("cell_3_voltage", UInt16, 100.0),
    divided("cell_4_voltage", UInt16, 100.0),
    divided("cell_5_voltage", UInt16, 100.0),
    divided("cell_6_voltage", UInt16, 100.0),
    divided("cell_7_voltage", UInt16, 100.0),
    divided("cell_8_voltage", UInt16, 100.0),
    divided("cell_9_voltage", UInt16, 100.0),
    divided("cell_10_voltage", UInt16, 100.0),
    Segment::Skip(7),
] };
