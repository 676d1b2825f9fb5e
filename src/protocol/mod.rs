//! Scooter wire protocol.
//!
//! - [`attribute`]: attribute identifiers, directions, read/write selectors
//! - [`layout`]: the attribute catalog, one payload layout per attribute
//! - [`frame`]: frame classification ([`parse`]) and encoding
//! - [`reassembly`]: rejoining frames split across deliveries
//! - [`decoder`]: payload to named, unit-scaled fields
//! - [`command`]: outbound requests

pub mod attribute;
pub mod command;
pub mod decoder;
pub mod frame;
mod hex;
pub mod layout;
pub mod reassembly;

pub use attribute::{Attribute, Direction, ReadWrite};
pub use command::Command;
pub use decoder::{decode, decode_payload, render_version};
pub use frame::{Message, ParseStatus, checksum, parse};
pub use hex::{HexDump, parse_hex};
pub use layout::{FieldSpec, Layout, Segment, Transform};
pub use reassembly::{Reassembler, ReassemblyStats};
