//! Core types for decoded telemetry.
//!
//! - [`FieldKind`] describes how a payload field is laid out on the wire
//! - [`Value`] holds a decoded, unit-scaled field value
//! - [`DecodedFields`] is the ordered name/value map produced per message
//! - [`UpdateRate`] controls how often state streams emit
//!
//! ## Usage Example
//!
//! ```rust
//! use m365::types::{DecodedFields, Value};
//!
//! let mut fields = DecodedFields::new();
//! fields.insert("speed_kmh", 12.5);
//! fields.insert("is_cruise_on", false);
//!
//! assert_eq!(fields.f64("speed_kmh"), Some(12.5));
//! assert_eq!(fields.get("is_cruise_on"), Some(&Value::Bool(false)));
//! ```

mod fields;
mod update_rate;
mod value;

pub use fields::DecodedFields;
pub use update_rate::UpdateRate;
pub use value::{FieldKind, Value};

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::time::Duration;

    proptest! {
        #[test]
        fn prop_field_kind_sizes_are_consistent(len in 1usize..32, marker in any::<u8>()) {
            prop_assert_eq!(FieldKind::Ascii(len).size(), len);
            prop_assert_eq!(FieldKind::Flag(marker).size(), 1);

            for kind in [FieldKind::UInt8, FieldKind::UInt16, FieldKind::Int16, FieldKind::UInt32, FieldKind::Version] {
                prop_assert!(kind.size() > 0 && kind.size() <= 4);
            }
        }

        #[test]
        fn prop_insert_replaces_existing_name(
            first in any::<i64>(),
            second in any::<i64>(),
        ) {
            let mut fields = DecodedFields::new();
            fields.insert("battery_percent", first);
            fields.insert("speed_kmh", 1.5);
            fields.insert("battery_percent", second);

            prop_assert_eq!(fields.len(), 2);
            prop_assert_eq!(fields.i64("battery_percent"), Some(second));
            let names: Vec<&str> = fields.names().collect();
            prop_assert_eq!(names, vec!["battery_percent", "speed_kmh"]);
        }

        #[test]
        fn prop_throttle_interval_matches_rate(hz in 1u32..1000) {
            let interval = UpdateRate::Max(hz).throttle_interval().unwrap();
            let expected = Duration::from_secs_f64(1.0 / hz as f64);
            prop_assert_eq!(interval, expected);
            prop_assert!(UpdateRate::Max(hz).needs_throttle());
        }
    }

    #[test]
    fn native_and_zero_rates_do_not_throttle() {
        assert_eq!(UpdateRate::Native.throttle_interval(), None);
        assert_eq!(UpdateRate::Max(0).normalize(), UpdateRate::Native);
        assert!(!UpdateRate::Max(0).needs_throttle());
    }

    #[test]
    fn value_views() {
        assert_eq!(Value::Int(4).as_f64(), Some(4.0));
        assert_eq!(Value::Float(4.5).as_i64(), None);
        assert_eq!(Value::from("V1.3.8").as_str(), Some("V1.3.8"));
        assert_eq!(Value::Bool(true).to_string(), "true");
    }

    #[test]
    fn value_serializes_untagged() {
        let json = serde_json::to_string(&vec![
            Value::Int(3),
            Value::Float(41.41),
            Value::Bool(true),
            Value::from("abc"),
        ])
        .unwrap();
        assert_eq!(json, r#"[3,41.41,true,"abc"]"#);

        let back: Vec<Value> = serde_json::from_str(&json).unwrap();
        assert_eq!(back[0], Value::Int(3));
        assert_eq!(back[1], Value::Float(41.41));
    }
}
