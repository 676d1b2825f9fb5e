//! End-to-end session tests through the public API.

use async_trait::async_trait;
use futures::StreamExt;
use m365::{
    Attribute, Command, DeviceState, DriverConfig, ReplayTransport, RetryPolicy, ScooterBuilder,
    ScooterConnection, ScooterError, Transport, UpdateRate,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(5);

/// Recorded ride: general info split over two deliveries, a battery report,
/// line noise and a tail light report.
const CAPTURE: &str = "\
# general info, serial 16132/00095292, pin 000000, firmware V0.8.1
55 aa 18 23 01 10 31 36 31 33 32 2f 30 30 30 39
35 32 39 32 30 30 30 30 30 30 01 08 c3 fb

# battery info: 7.8 Ah, 85 %, -1.5 A, 40.12 V
55 aa 0c 25 01 31 78 1e 55 00 6a ff ac 0f 2d 2c 34 fc

# noise the scooter sometimes sends between frames
00 00 00

# tail light on
55 aa 04 23 01 7d 02 00 58 ff
";

fn checksum(bytes: &[u8]) -> [u8; 2] {
    let sum = bytes.iter().fold(0u16, |sum, b| sum.wrapping_add(u16::from(*b))) ^ 0xFFFF;
    sum.to_le_bytes()
}

#[test]
fn capture_checksums_are_valid() {
    // Rebuild each complete frame of the capture and check its trailer
    let frames = [
        "55 aa 18 23 01 10 31 36 31 33 32 2f 30 30 30 39 35 32 39 32 30 30 30 30 30 30 01 08 c3 fb",
        "55 aa 0c 25 01 31 78 1e 55 00 6a ff ac 0f 2d 2c 34 fc",
        "55 aa 04 23 01 7d 02 00 58 ff",
    ];
    for text in frames {
        let bytes: Vec<u8> =
            text.split_whitespace().map(|b| u8::from_str_radix(b, 16).unwrap()).collect();
        let body_end = bytes.len() - 2;
        assert_eq!(checksum(&bytes[2..body_end]), [bytes[body_end], bytes[body_end + 1]], "{}", text);
    }
}

async fn final_state(connection: &ScooterConnection) -> DeviceState {
    let mut updates = Box::pin(connection.state_updates(UpdateRate::Native));
    timeout(WAIT, async {
        let mut last = None;
        while let Some(state) = updates.next().await {
            last = Some(state);
        }
        last
    })
    .await
    .expect("replay should finish")
    .map(|state| (*state).clone())
    .unwrap_or_default()
}

#[tokio::test]
async fn replayed_capture_builds_device_state() {
    let replay = ReplayTransport::from_capture_str(CAPTURE).unwrap();
    let connection = ScooterConnection::connect(replay).await.unwrap();

    let state = final_state(&connection).await;
    assert_eq!(state.serial.as_deref(), Some("16132/00095292"));
    assert_eq!(state.pin.as_deref(), Some("000000"));
    assert_eq!(state.version.as_deref(), Some("V0.8.1"));
    assert_eq!(state.battery_capacity, Some(7.8));
    assert_eq!(state.battery_percent, Some(85));
    assert_eq!(state.battery_current, Some(-1.5));
    assert_eq!(state.battery_voltage, Some(40.12));
    assert_eq!(state.battery_temperature_1, Some(25));
    assert_eq!(state.battery_temperature_2, Some(24));
    assert_eq!(state.is_tail_light_on, Some(true));
    assert_eq!(state.speed_kmh, None);
    assert!(connection.is_closed());

    let json = state.to_json().unwrap();
    assert!(json.contains("\"battery_voltage\": 40.12"));
    assert_eq!(DeviceState::from_json(&json).unwrap(), state);
}

#[tokio::test]
async fn handler_sees_messages_in_arrival_order() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);

    let replay = ReplayTransport::from_capture_str(CAPTURE).unwrap();
    let connection = ScooterBuilder::new(replay)
        .on_message(move |message: &m365::Message, _: &m365::DecodedFields| {
            sink.lock().unwrap().push(message.attribute());
        })
        .connect()
        .await
        .unwrap();

    final_state(&connection).await;
    assert_eq!(
        *seen.lock().unwrap(),
        vec![Some(Attribute::GeneralInfo), Some(Attribute::BatteryInfo), Some(Attribute::TailLight)]
    );
}

#[tokio::test]
async fn commands_reach_the_transport() {
    // Paced so the session is still open while the command is sent
    let replay = ReplayTransport::from_capture_str(CAPTURE).unwrap().paced(Duration::from_millis(50));
    let log = replay.write_log();
    let connection = ScooterConnection::connect(replay).await.unwrap();

    connection.set_tail_light(false).await.unwrap();
    assert_eq!(log.frames(), vec![Command::TailLight(false).to_bytes()]);
}

/// Transport whose link breaks on every other write.
struct FlakyLink {
    writes: Arc<Mutex<Vec<Vec<u8>>>>,
    connects: Arc<Mutex<u32>>,
    fail_next_write: bool,
}

#[async_trait]
impl Transport for FlakyLink {
    async fn connect(&mut self) -> m365::Result<()> {
        *self.connects.lock().unwrap() += 1;
        Ok(())
    }

    async fn disconnect(&mut self) -> m365::Result<()> {
        Ok(())
    }

    async fn write(&mut self, frame: &[u8]) -> m365::Result<()> {
        if std::mem::take(&mut self.fail_next_write) {
            return Err(ScooterError::transport("link dropped"));
        }
        self.fail_next_write = true;
        self.writes.lock().unwrap().push(frame.to_vec());
        Ok(())
    }

    async fn next_notification(&mut self) -> m365::Result<Option<Vec<u8>>> {
        std::future::pending().await
    }
}

#[tokio::test]
async fn flaky_link_is_recovered_per_command() {
    let writes = Arc::new(Mutex::new(Vec::new()));
    let connects = Arc::new(Mutex::new(0));
    let link = FlakyLink {
        writes: Arc::clone(&writes),
        connects: Arc::clone(&connects),
        fail_next_write: true,
    };

    let config = DriverConfig { retry: RetryPolicy::immediate(), ..DriverConfig::default() };
    let connection = ScooterBuilder::new(link).config(config).connect().await.unwrap();

    connection.request_attribute(Attribute::BatteryInfo).await.unwrap();
    connection.set_cruise(true).await.unwrap();

    assert_eq!(
        *writes.lock().unwrap(),
        vec![Command::Read(Attribute::BatteryInfo).to_bytes(), Command::Cruise(true).to_bytes()]
    );
    // Initial connect plus one reconnect per command
    assert_eq!(*connects.lock().unwrap(), 3);

    connection.shutdown().await;
}

#[tokio::test]
async fn config_from_yaml_drives_the_session() {
    let config = DriverConfig::from_yaml_str(
        "retry:\n  backoff:\n    strategy: fixed\n    delay_ms: 1\n  max_attempts: 2\nmax_pending_fragments: 2\n",
    )
    .unwrap();
    assert_eq!(config.max_pending_fragments, 2);

    let replay = ReplayTransport::from_capture_str(CAPTURE).unwrap();
    let connection = ScooterBuilder::new(replay).config(config).connect().await.unwrap();
    assert_eq!(final_state(&connection).await.battery_percent, Some(85));
}
