//! Last-known device state.
//!
//! [`DeviceState`] has one typed, optional slot per field the catalog can
//! produce. Merging decoded fields overwrites slots by name, so the most
//! recent message always wins, including for fields several attributes share
//! (`battery_percent`, `speed_kmh`, `frame_temperature`, ...).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::types::{DecodedFields, Value};

/// Conversion between a typed slot and a decoded [`Value`].
trait Slot: Sized {
    fn from_value(value: &Value) -> Option<Self>;
    fn to_value(&self) -> Value;
}

impl Slot for f64 {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_f64()
    }
    fn to_value(&self) -> Value {
        Value::Float(*self)
    }
}

impl Slot for i64 {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_i64()
    }
    fn to_value(&self) -> Value {
        Value::Int(*self)
    }
}

impl Slot for bool {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_bool()
    }
    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }
}

impl Slot for String {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_str().map(str::to_string)
    }
    fn to_value(&self) -> Value {
        Value::Text(self.clone())
    }
}

enum SlotUpdate {
    Set,
    TypeMismatch,
    Unknown,
}

macro_rules! device_state {
    ($( $(#[doc = $doc:literal])* $name:ident: $ty:ty, )*) => {
        /// Snapshot of every telemetry value seen so far. `None` means unknown.
        #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
        pub struct DeviceState {
            $( $(#[doc = $doc])* pub $name: Option<$ty>, )*

            /// Fields outside the known schema
            #[serde(flatten)]
            pub extra: BTreeMap<String, Value>,
        }

        impl DeviceState {
            /// Names of every typed slot.
            pub const FIELD_NAMES: &'static [&'static str] = &[$(stringify!($name)),*];

            fn set_slot(&mut self, name: &str, value: &Value) -> SlotUpdate {
                match name {
                    $(
                        stringify!($name) => match <$ty as Slot>::from_value(value) {
                            Some(converted) => {
                                self.$name = Some(converted);
                                SlotUpdate::Set
                            }
                            None => SlotUpdate::TypeMismatch,
                        },
                    )*
                    _ => SlotUpdate::Unknown,
                }
            }

            /// `None` when `name` is not a slot, `Some(None)` when the slot is unknown.
            fn slot(&self, name: &str) -> Option<Option<Value>> {
                match name {
                    $( stringify!($name) => Some(self.$name.as_ref().map(Slot::to_value)), )*
                    _ => None,
                }
            }
        }
    };
}

device_state! {
    /// km/h
    speed_kmh: f64,
    /// km/h
    speed_average_kmh: f64,
    /// km
    distance_left_km: f64,
    /// km
    distance_since_startup_km: f64,
    /// km
    odometer_km: f64,
    /// m
    trip_distance_m: i64,
    /// s
    uptime_s: i64,
    /// °C
    frame_temperature: f64,
    is_tail_light_on: bool,
    is_cruise_on: bool,

    /// %
    battery_percent: i64,
    /// Ah
    battery_capacity: f64,
    /// A, negative while charging
    battery_current: f64,
    /// V
    battery_voltage: f64,
    /// °C
    battery_temperature_1: i64,
    /// °C
    battery_temperature_2: i64,
    cell_1_voltage: f64,
    cell_2_voltage: f64,
    cell_3_voltage: f64,
    cell_4_voltage: f64,
    cell_5_voltage: f64,
    cell_6_voltage: f64,
    cell_7_voltage: f64,
    cell_8_voltage: f64,
    cell_9_voltage: f64,
    cell_10_voltage: f64,

    serial: String,
    pin: String,
    version: String,
    error: i64,
    warning: i64,
    flags: i64,
    workmode: i64,
}

impl DeviceState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite slots with the decoded fields, last writer wins.
    ///
    /// Names outside the schema land in [`extra`](Self::extra). A known name
    /// carrying a value of the wrong type is ignored.
    pub fn merge(&mut self, fields: &DecodedFields) {
        for (name, value) in fields.iter() {
            match self.set_slot(name, value) {
                SlotUpdate::Set => {}
                SlotUpdate::TypeMismatch => {
                    warn!("Ignoring {} = {:?}: wrong type for this field", name, value);
                }
                SlotUpdate::Unknown => {
                    debug!("Storing unrecognised field {} = {}", name, value);
                    self.extra.insert(name.to_string(), value.clone());
                }
            }
        }
    }

    /// Owned point-in-time copy.
    pub fn snapshot(&self) -> DeviceState {
        self.clone()
    }

    /// By-name lookup across typed slots and extra fields.
    pub fn get(&self, name: &str) -> Option<Value> {
        match self.slot(name) {
            Some(value) => value,
            None => self.extra.get(name).cloned(),
        }
    }

    /// Number of fields with a known value.
    pub fn known_fields(&self) -> usize {
        Self::FIELD_NAMES.iter().filter(|name| matches!(self.slot(name), Some(Some(_)))).count()
            + self.extra.len()
    }

    /// Pretty JSON with sorted keys and four-space indentation. Unknown slots
    /// are rendered as `null`.
    pub fn to_json(&self) -> serde_json::Result<String> {
        let sorted: BTreeMap<String, serde_json::Value> = match serde_json::to_value(self)? {
            serde_json::Value::Object(map) => map.into_iter().collect(),
            _ => BTreeMap::new(),
        };

        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
        sorted.serialize(&mut serializer)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{Attribute, decode_payload};
    use proptest::prelude::*;

    #[test]
    fn starts_unknown() {
        let state = DeviceState::new();
        assert_eq!(state.known_fields(), 0);
        for name in DeviceState::FIELD_NAMES {
            assert_eq!(state.get(name), None);
        }
    }

    #[test]
    fn every_catalog_field_has_a_slot() {
        for attribute in Attribute::ALL {
            for field in attribute.layout().fields() {
                assert!(
                    DeviceState::FIELD_NAMES.contains(&field.name),
                    "{} from {} has no slot",
                    field.name,
                    attribute
                );
            }
        }
    }

    #[test]
    fn catalog_output_merges_into_typed_slots() {
        let mut state = DeviceState::new();
        for attribute in Attribute::ALL {
            let payload = vec![0u8; attribute.layout().width()];
            state.merge(&decode_payload(attribute, &payload).unwrap());
        }
        assert!(state.extra.is_empty());
        assert_eq!(state.battery_temperature_1, Some(-20));
        assert_eq!(state.is_cruise_on, Some(false));
        assert_eq!(state.version.as_deref(), Some("V0.0.0"));
        assert_eq!(state.known_fields(), DeviceState::FIELD_NAMES.len());
    }

    #[test]
    fn last_writer_wins_across_attributes() {
        let mut state = DeviceState::new();
        let battery_info =
            decode_payload(Attribute::BatteryInfo, &[0, 0, 90, 0, 0, 0, 0, 0, 20, 20]).unwrap();
        state.merge(&battery_info);
        assert_eq!(state.battery_percent, Some(90));

        state.merge(&decode_payload(Attribute::BatteryPercent, &[42, 0]).unwrap());
        assert_eq!(state.battery_percent, Some(42));
        // Fields only the first message carried are untouched
        assert_eq!(state.battery_temperature_1, Some(0));
    }

    #[test]
    fn unknown_names_go_to_extra() {
        let mut state = DeviceState::new();
        let fields: DecodedFields = [("motor_phase_current", Value::Float(3.5))].into_iter().collect();
        state.merge(&fields);
        assert_eq!(state.extra.get("motor_phase_current"), Some(&Value::Float(3.5)));
        assert_eq!(state.get("motor_phase_current"), Some(Value::Float(3.5)));
    }

    #[test]
    fn mistyped_known_field_is_ignored() {
        let mut state = DeviceState::new();
        state.battery_percent = Some(50);
        let fields: DecodedFields = [("battery_percent", Value::from("full"))].into_iter().collect();
        state.merge(&fields);
        assert_eq!(state.battery_percent, Some(50));
        assert!(state.extra.is_empty());
    }

    #[test]
    fn json_is_sorted_and_complete() {
        let mut state = DeviceState::new();
        state.speed_kmh = Some(12.5);
        state.is_tail_light_on = Some(true);
        state.extra.insert("aaa_custom".into(), Value::Int(1));

        let json = state.to_json().unwrap();
        assert!(json.contains("\n    \"speed_kmh\": 12.5"));
        assert!(json.contains("\"is_tail_light_on\": true"));
        assert!(json.contains("\"odometer_km\": null"));

        let keys: Vec<&str> = json
            .lines()
            .filter_map(|line| line.trim().strip_prefix('"'))
            .filter_map(|rest| rest.split('"').next())
            .collect();
        let mut sorted = keys.clone();
        sorted.sort_unstable();
        assert_eq!(keys, sorted);
        assert_eq!(keys.len(), DeviceState::FIELD_NAMES.len() + 1);
    }

    #[test]
    fn json_round_trip() {
        let mut state = DeviceState::new();
        state.battery_voltage = Some(40.12);
        state.serial = Some("16132/00095292".into());
        state.extra.insert("custom".into(), Value::Bool(true));

        let restored = DeviceState::from_json(&state.to_json().unwrap()).unwrap();
        assert_eq!(restored, state);
    }

    proptest! {
        #[test]
        fn merge_is_last_writer_wins(values in prop::collection::vec(0i64..100, 1..20)) {
            let mut state = DeviceState::new();
            for value in &values {
                let fields: DecodedFields = [("battery_percent", *value)].into_iter().collect();
                state.merge(&fields);
            }
            prop_assert_eq!(state.battery_percent, values.last().copied());
        }
    }
}
