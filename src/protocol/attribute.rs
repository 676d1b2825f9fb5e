//! Protocol identifiers: attributes, directions and read/write selectors

use serde::{Deserialize, Serialize};
use std::fmt;

use super::layout::{self, Layout};

/// Telemetry or command register carried by a frame.
///
/// The numeric value is the register address a read request starts at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Attribute {
    GeneralInfo = 0x10,
    DistanceLeft = 0x25,
    BatteryInfo = 0x31,
    BatteryPercent = 0x32,
    BatteryCurrent = 0x33,
    BatteryVoltage = 0x34,
    TripInfo = 0x3A,
    BatteryCellVoltages = 0x40,
    Cruise = 0x7C,
    TailLight = 0x7D,
    MotorInfo = 0xB0,
    Speed = 0xB5,
    DistanceSinceStartup = 0xB6,
}

impl Attribute {
    /// Every known attribute, ordered by identifier.
    pub const ALL: [Attribute; 13] = [
        Attribute::GeneralInfo,
        Attribute::DistanceLeft,
        Attribute::BatteryInfo,
        Attribute::BatteryPercent,
        Attribute::BatteryCurrent,
        Attribute::BatteryVoltage,
        Attribute::TripInfo,
        Attribute::BatteryCellVoltages,
        Attribute::Cruise,
        Attribute::TailLight,
        Attribute::MotorInfo,
        Attribute::Speed,
        Attribute::DistanceSinceStartup,
    ];

    /// Look up an attribute by its wire identifier.
    pub fn from_id(id: u8) -> Option<Self> {
        Self::ALL.iter().copied().find(|attribute| attribute.id() == id)
    }

    pub const fn id(self) -> u8 {
        self as u8
    }

    pub const fn name(self) -> &'static str {
        match self {
            Attribute::GeneralInfo => "GeneralInfo",
            Attribute::DistanceLeft => "DistanceLeft",
            Attribute::BatteryInfo => "BatteryInfo",
            Attribute::BatteryPercent => "BatteryPercent",
            Attribute::BatteryCurrent => "BatteryCurrent",
            Attribute::BatteryVoltage => "BatteryVoltage",
            Attribute::TripInfo => "TripInfo",
            Attribute::BatteryCellVoltages => "BatteryCellVoltages",
            Attribute::Cruise => "Cruise",
            Attribute::TailLight => "TailLight",
            Attribute::MotorInfo => "MotorInfo",
            Attribute::Speed => "Speed",
            Attribute::DistanceSinceStartup => "DistanceSinceStartup",
        }
    }

    /// Payload layout used to decode responses for this attribute.
    pub fn layout(self) -> &'static Layout {
        match self {
            Attribute::GeneralInfo => &layout::GENERAL_INFO,
            Attribute::DistanceLeft => &layout::DISTANCE_LEFT,
            Attribute::BatteryInfo => &layout::BATTERY_INFO,
            Attribute::BatteryPercent => &layout::BATTERY_PERCENT,
            Attribute::BatteryCurrent => &layout::BATTERY_CURRENT,
            Attribute::BatteryVoltage => &layout::BATTERY_VOLTAGE,
            Attribute::TripInfo => &layout::TRIP_INFO,
            Attribute::BatteryCellVoltages => &layout::BATTERY_CELL_VOLTAGES,
            Attribute::Cruise => &layout::CRUISE,
            Attribute::TailLight => &layout::TAIL_LIGHT,
            Attribute::MotorInfo => &layout::MOTOR_INFO,
            Attribute::Speed => &layout::SPEED,
            Attribute::DistanceSinceStartup => &layout::DISTANCE_SINCE_STARTUP,
        }
    }

    /// Controller a read request for this attribute is addressed to.
    pub const fn target(self) -> Direction {
        match self {
            Attribute::BatteryInfo
            | Attribute::BatteryPercent
            | Attribute::BatteryCurrent
            | Attribute::BatteryVoltage
            | Attribute::BatteryCellVoltages => Direction::MasterToBattery,
            _ => Direction::MasterToMotor,
        }
    }

    /// Number of payload bytes a read request asks for.
    pub fn read_length(self) -> u8 {
        // Widest layout is 32 bytes
        self.layout().width() as u8
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl TryFrom<u8> for Attribute {
    type Error = crate::DecodeError;

    fn try_from(id: u8) -> Result<Self, Self::Error> {
        Attribute::from_id(id).ok_or(crate::DecodeError::UnknownAttribute(id))
    }
}

/// Source/destination pair of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    MasterToMotor,
    MasterToBattery,
    MotorToMaster,
    BatteryToMaster,
    Other(u8),
}

impl Direction {
    pub const fn to_byte(self) -> u8 {
        match self {
            Direction::MasterToMotor => 0x20,
            Direction::MasterToBattery => 0x22,
            Direction::MotorToMaster => 0x23,
            Direction::BatteryToMaster => 0x25,
            Direction::Other(byte) => byte,
        }
    }
}

impl From<u8> for Direction {
    fn from(byte: u8) -> Self {
        match byte {
            0x20 => Direction::MasterToMotor,
            0x22 => Direction::MasterToBattery,
            0x23 => Direction::MotorToMaster,
            0x25 => Direction::BatteryToMaster,
            other => Direction::Other(other),
        }
    }
}

/// Read/write selector of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReadWrite {
    Read,
    Write,
    Other(u8),
}

impl ReadWrite {
    pub const fn to_byte(self) -> u8 {
        match self {
            ReadWrite::Read => 0x01,
            ReadWrite::Write => 0x03,
            ReadWrite::Other(byte) => byte,
        }
    }
}

impl From<u8> for ReadWrite {
    fn from(byte: u8) -> Self {
        match byte {
            0x01 => ReadWrite::Read,
            0x03 => ReadWrite::Write,
            other => ReadWrite::Other(other),
        }
    }
}
