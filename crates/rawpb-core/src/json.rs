//! Boundary serialization of classified maps.
//!
//! A map serializes as an object keyed by the rendered [`FieldKey`], in
//! entry order. Nested maps become nested objects and raw bytes become
//! standard padded base64 text, which is the form
//! [`Encoder::encode_tree`](crate::Encoder::encode_tree) reads back.
//!
//! [`FieldKey`]: crate::map::FieldKey

use crate::map::{StructuredMap, WireValue};
use crate::text::{encode_base64, Base64Alphabet};
use serde::ser::{Serialize, SerializeMap, Serializer};

impl Serialize for StructuredMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (key, value) in self.iter() {
            map.serialize_entry(&key.to_string(), value)?;
        }
        map.end()
    }
}

impl Serialize for WireValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            WireValue::Varint(v) | WireValue::Int64(v) => serializer.serialize_i64(*v),
            WireValue::Int32(v) => serializer.serialize_i32(*v),
            WireValue::Float32(v) => serializer.serialize_f32(*v),
            WireValue::Float64(v) => serializer.serialize_f64(*v),
            WireValue::String(s) => serializer.serialize_str(s),
            WireValue::Embedded(map) | WireValue::Base64(map) => map.serialize(serializer),
            WireValue::Bytes(b) => {
                serializer.serialize_str(&encode_base64(b, Base64Alphabet::Standard, true))
            }
        }
    }
}

impl StructuredMap {
    /// Render the map as a JSON value.
    pub fn to_json(&self) -> serde_json::Value {
        // keys are always strings, so serialization cannot fail
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use crate::decode::decode;
    use crate::encode::Encoder;
    use serde_json::json;

    #[test]
    fn test_scenario_json_shapes() {
        let map = decode(&[0x08, 0x01]).unwrap();
        assert_eq!(map.to_json(), json!({"1:0:varint": 1}));

        let map = decode(&[0x12, 0x05, b'S', b't', b'e', b'v', b'e']).unwrap();
        assert_eq!(map.to_json(), json!({"2:0:string": "Steve"}));
    }

    #[test]
    fn test_serialize_matches_to_json() {
        let data = [0x0A, 0x03, 0x08, 0x96, 0x01, 0x12, 0x02, 0xFF, 0xFE, 0x1D, 0, 0, 0xC0, 0x3F];
        let map = decode(&data).unwrap();

        let via_serde = serde_json::to_value(&map).unwrap();
        assert_eq!(via_serde, map.to_json());
        assert_eq!(
            via_serde,
            json!({
                "1:0:embedded": {"1:0:varint": 150},
                "2:1:bytes": "//4=",
                "3:2:float32": 1.5
            })
        );
    }

    #[test]
    fn test_json_text_round_trip() {
        let data = [0x0A, 0x03, 0x08, 0x96, 0x01, 0x12, 0x02, 0xFF, 0xFE, 0x1A, 0x03, b'C', b'A', b'E'];
        let map = decode(&data).unwrap();

        let text = serde_json::to_string(&map).unwrap();
        let tree: serde_json::Value = serde_json::from_str(&text).unwrap();
        let rebuilt = Encoder::new().encode_tree(&tree).unwrap();

        assert_eq!(decode(&rebuilt).unwrap(), map);
    }

    #[test]
    fn test_non_finite_floats_render_as_null() {
        let mut map = crate::map::StructuredMap::ordered();
        map.push(1, crate::map::WireValue::Float64(f64::NAN));
        assert_eq!(map.to_json(), json!({"1:0:float64": null}));
    }
}
