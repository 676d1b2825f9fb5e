//! Outbound commands.

use super::attribute::{Attribute, Direction, ReadWrite};
use super::frame::Message;

/// A request the caller wants delivered to the scooter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Ask the scooter to report an attribute; the answer arrives as a notification
    Read(Attribute),
    /// Switch the tail light on or off
    TailLight(bool),
    /// Switch cruise control on or off
    Cruise(bool),
    /// A frame built by the caller
    Raw(Message),
}

impl Command {
    /// Render the command into a frame.
    pub fn to_message(&self) -> Message {
        match self {
            Command::Read(attribute) => Message::encode(
                attribute.target(),
                ReadWrite::Read,
                attribute.id(),
                &[attribute.read_length()],
            ),
            Command::TailLight(on) => write_word(Attribute::TailLight, if *on { 0x0002 } else { 0 }),
            Command::Cruise(on) => write_word(Attribute::Cruise, if *on { 0x0001 } else { 0 }),
            Command::Raw(message) => message.clone(),
        }
    }

    /// Raw bytes to hand to the transport.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.to_message().raw().to_vec()
    }
}

impl From<Attribute> for Command {
    fn from(attribute: Attribute) -> Self {
        Command::Read(attribute)
    }
}

fn write_word(attribute: Attribute, value: u16) -> Message {
    Message::encode(Direction::MasterToMotor, ReadWrite::Write, attribute.id(), &value.to_le_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{ParseStatus, parse};

    #[test]
    fn read_requests() {
        assert_eq!(
            Command::Read(Attribute::MotorInfo).to_bytes(),
            vec![0x55, 0xAA, 0x03, 0x20, 0x01, 0xB0, 0x20, 0x0B, 0xFF]
        );

        let battery = Command::Read(Attribute::BatteryInfo).to_message();
        assert_eq!(battery.direction(), Direction::MasterToBattery);
        assert_eq!(battery.payload(), &[10]);
    }

    #[test]
    fn tail_light_commands() {
        let on = Command::TailLight(true).to_message();
        assert_eq!(on.read_write(), ReadWrite::Write);
        assert_eq!(on.attribute(), Some(Attribute::TailLight));
        assert_eq!(on.payload(), &[0x02, 0x00]);
        assert_eq!(Command::TailLight(false).to_message().payload(), &[0x00, 0x00]);
    }

    #[test]
    fn cruise_commands() {
        assert_eq!(Command::Cruise(true).to_message().payload(), &[0x01, 0x00]);
        assert_eq!(Command::Cruise(false).to_message().payload(), &[0x00, 0x00]);
    }

    #[test]
    fn every_command_is_a_valid_frame() {
        let mut commands: Vec<Command> = Attribute::ALL.iter().copied().map(Command::from).collect();
        commands.extend([
            Command::TailLight(true),
            Command::TailLight(false),
            Command::Cruise(true),
            Command::Cruise(false),
        ]);

        for command in commands {
            let bytes = command.to_bytes();
            assert!(matches!(parse(&bytes), ParseStatus::Complete { .. }), "{:?}", command);
        }
    }
}
