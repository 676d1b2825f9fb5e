//! Telemetry decoder and session driver for Xiaomi M365 electric scooters.
//!
//! The scooter streams its telemetry as short notification payloads over a
//! wireless link. This crate turns those payloads back into frames, decodes
//! them into named, unit-scaled values and keeps a last-known
//! [`DeviceState`].
//!
//! # Layers
//!
//! - **Protocol** ([`protocol`]): the attribute catalog, frame parser,
//!   reassembly of split frames, payload decoder and command encoder.
//!   Synchronous, allocation-light and free of I/O.
//! - **Engine** ([`TelemetryEngine`]): reassembly, decoding and state
//!   merging behind a single `on_notification` call.
//! - **Session** ([`ScooterConnection`]): a task that owns a [`Transport`],
//!   retries broken links and publishes state and messages as streams.
//!
//! ## Example (decoding captured payloads)
//!
//! ```rust
//! use m365::TelemetryEngine;
//!
//! let mut engine = TelemetryEngine::default();
//! engine.on_notification(&[0x55, 0xaa, 0x04, 0x23, 0x01, 0xb5, 0x64, 0x00, 0xbe, 0xfe]);
//! assert_eq!(engine.state().speed_kmh, Some(1.0));
//! ```
//!
//! ## Example (session)
//!
//! ```rust,no_run
//! use futures::StreamExt;
//! use m365::{Attribute, ReplayTransport, ScooterConnection, UpdateRate};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let capture = std::fs::read_to_string("ride.hex")?;
//!     let connection = ScooterConnection::connect(ReplayTransport::from_capture_str(&capture)?).await?;
//!     connection.request_attribute(Attribute::BatteryInfo).await?;
//!
//!     let mut states = Box::pin(connection.state_updates(UpdateRate::Max(4)));
//!     while let Some(state) = states.next().await {
//!         println!("{:?} km/h, {:?} %", state.speed_kmh, state.battery_percent);
//!     }
//!     Ok(())
//! }
//! ```

// Core types and error handling
mod error;
#[cfg(any(test, feature = "benchmark"))]
pub mod test_utils;
pub mod types;

// Wire protocol and decoding
pub mod engine;
pub mod protocol;
pub mod state;

// Session layer
pub mod config;
pub mod connection;
pub mod driver;
pub mod logging;
pub mod retry;
pub mod stream;
pub mod transport;

// Core exports
pub use error::*;
pub use types::*;

pub use config::DriverConfig;
pub use connection::{ScooterBuilder, ScooterConnection};
pub use engine::{DecodedMessage, EngineStats, MessageHandler, TelemetryEngine};
pub use protocol::{Attribute, Command, Direction, Message, ParseStatus, ReadWrite};
pub use retry::{Backoff, RetryPolicy};
pub use state::DeviceState;
pub use transport::{ReplayTransport, Transport, WriteLog};
