//! Encoding from a generic JSON tree.
//!
//! The tree has the shape produced by serializing a [`StructuredMap`]:
//! objects keyed by `"<field>:<index>:<tag>"` or `"<field>:<tag>"`, with
//! member order preserved. Values are read according to the key's tag.
//!
//! [`StructuredMap`]: crate::map::StructuredMap

use super::{write_length_delimited, Encoder};
use crate::error::{Error, Result};
use crate::map::{FieldKey, TypeTag};
use crate::text::{decode_base64_lenient, url_decode};
use crate::wire::encode_varint;
use bytes::BufMut;
use serde_json::{Map, Value};
use tracing::debug;

impl Encoder {
    /// Encode a JSON object tree.
    ///
    /// `bytes` values may be base64 text or an array of byte values.
    /// `base64` values may be a nested object or literal base64 text; the
    /// text is decoded and re-encoded with the configured alphabet so both
    /// forms produce the same bytes.
    pub fn encode_tree(&self, tree: &Value) -> Result<Vec<u8>> {
        let object = tree
            .as_object()
            .ok_or_else(|| Error::type_mismatch("<root>", TypeTag::Embedded, json_kind(tree)))?;

        let mut out = Vec::new();
        self.write_object(object, &mut out)?;
        debug!(fields = object.len(), bytes = out.len(), "encoded tree");
        Ok(out)
    }

    fn write_object(&self, object: &Map<String, Value>, out: &mut Vec<u8>) -> Result<()> {
        for (name, value) in object {
            let key: FieldKey = name.parse()?;
            let mismatch = || Error::type_mismatch(name, key.tag, json_kind(value));

            self.write_header(key.field_number, key.tag, out)?;

            match key.tag {
                TypeTag::Varint => {
                    let v = as_i64_bits(value).ok_or_else(mismatch)?;
                    encode_varint(v as u64, out);
                }
                TypeTag::Int32 => {
                    let v = value
                        .as_i64()
                        .and_then(|v| i32::try_from(v).ok())
                        .ok_or_else(mismatch)?;
                    out.put_i32_le(v);
                }
                TypeTag::Float32 => {
                    let v = value.as_f64().ok_or_else(mismatch)?;
                    out.put_f32_le(v as f32);
                }
                TypeTag::Int64 => {
                    let v = as_i64_bits(value).ok_or_else(mismatch)?;
                    out.put_i64_le(v);
                }
                TypeTag::Float64 => {
                    let v = value.as_f64().ok_or_else(mismatch)?;
                    out.put_f64_le(v);
                }
                TypeTag::String => {
                    let s = value.as_str().ok_or_else(mismatch)?;
                    write_length_delimited(s.as_bytes(), out);
                }
                TypeTag::Bytes => {
                    let bytes = match value {
                        Value::String(s) => decode_base64_lenient(s)?,
                        Value::Array(items) => items
                            .iter()
                            .map(|item| item.as_u64().and_then(|b| u8::try_from(b).ok()))
                            .collect::<Option<Vec<u8>>>()
                            .ok_or_else(mismatch)?,
                        _ => return Err(mismatch()),
                    };
                    write_length_delimited(&bytes, out);
                }
                TypeTag::Embedded => {
                    let nested = value.as_object().ok_or_else(mismatch)?;
                    let mut inner = Vec::new();
                    self.write_object(nested, &mut inner)?;
                    write_length_delimited(&inner, out);
                }
                TypeTag::Base64 => {
                    let inner = match value {
                        Value::Object(nested) => {
                            let mut inner = Vec::new();
                            self.write_object(nested, &mut inner)?;
                            inner
                        }
                        Value::String(s) => decode_base64_lenient(&url_decode(s))?,
                        _ => return Err(mismatch()),
                    };
                    write_length_delimited(self.wrap_base64(&inner).as_bytes(), out);
                }
            }
        }

        Ok(())
    }
}

/// Signed integers as-is, unsigned ones above `i64::MAX` by bit pattern
fn as_i64_bits(value: &Value) -> Option<i64> {
    value
        .as_i64()
        .or_else(|| value.as_u64().map(|v| v as i64))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "integer",
        Value::String(_) => "text",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn encode_tree(tree: Value) -> Result<Vec<u8>> {
        Encoder::new().encode_tree(&tree)
    }

    #[test]
    fn test_tree_varint() {
        assert_eq!(encode_tree(json!({"1:0:varint": 1})).unwrap(), [0x08, 0x01]);
        assert_eq!(encode_tree(json!({"1:varint": 1})).unwrap(), [0x08, 0x01]);
    }

    #[test]
    fn test_tree_string() {
        assert_eq!(
            encode_tree(json!({"2:0:string": "Steve"})).unwrap(),
            [0x12, 0x05, b'S', b't', b'e', b'v', b'e']
        );
    }

    #[test]
    fn test_tree_preserves_member_order() {
        let tree: Value = serde_json::from_str(r#"{"2:0:varint": 2, "1:1:varint": 1}"#).unwrap();
        assert_eq!(Encoder::new().encode_tree(&tree).unwrap(), [0x10, 0x02, 0x08, 0x01]);
    }

    #[test]
    fn test_tree_base64_forms_agree() {
        let structured = encode_tree(json!({"1:0:base64": {"1:0:varint": 1}})).unwrap();
        let padded = encode_tree(json!({"1:0:base64": "CAE="})).unwrap();
        let unpadded = encode_tree(json!({"1:0:base64": "CAE"})).unwrap();
        let escaped = encode_tree(json!({"1:0:base64": "CAE%3D"})).unwrap();

        assert_eq!(structured, b"\x0a\x04CAE=");
        assert_eq!(padded, structured);
        assert_eq!(unpadded, structured);
        assert_eq!(escaped, structured);
    }

    #[test]
    fn test_tree_bytes_forms() {
        let from_text = encode_tree(json!({"1:0:bytes": "//4="})).unwrap();
        let from_array = encode_tree(json!({"1:0:bytes": [255, 254]})).unwrap();
        assert_eq!(from_text, [0x0A, 0x02, 0xFF, 0xFE]);
        assert_eq!(from_array, from_text);

        assert!(matches!(
            encode_tree(json!({"1:0:bytes": [256]})),
            Err(Error::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_tree_unsigned_varint() {
        let out = encode_tree(json!({"1:0:varint": u64::MAX})).unwrap();
        assert_eq!(out.len(), 11);
        assert_eq!(out[1..], [0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x01]);
    }

    #[test]
    fn test_tree_errors() {
        assert!(matches!(
            encode_tree(json!({"1:0:sint32": 1})),
            Err(Error::UnknownTypeTag { .. })
        ));
        assert!(matches!(
            encode_tree(json!({"one:varint": 1})),
            Err(Error::MalformedKey { .. })
        ));
        assert!(matches!(
            encode_tree(json!({"1:0:varint": "1"})),
            Err(Error::TypeMismatch { .. })
        ));
        assert!(matches!(
            encode_tree(json!({"1:0:int32": 1i64 << 40})),
            Err(Error::TypeMismatch { .. })
        ));
        assert!(matches!(
            encode_tree(json!({"1:0:embedded": [1, 2]})),
            Err(Error::TypeMismatch { .. })
        ));
        assert!(matches!(encode_tree(json!([1])), Err(Error::TypeMismatch { .. })));
    }

    #[test]
    fn test_tree_rejects_unencodable_field_numbers() {
        // 2^61 + 1 would shift into field 1
        assert!(matches!(
            encode_tree(json!({"2305843009213693953:0:varint": 7})),
            Err(Error::InvalidFieldNumber { number: 2_305_843_009_213_693_953 })
        ));
        assert!(matches!(
            encode_tree(json!({"0:0:varint": 7})),
            Err(Error::InvalidFieldNumber { number: 0 })
        ));
        assert!(matches!(
            encode_tree(json!({"1:0:embedded": {"536870912:0:varint": 7}})),
            Err(Error::InvalidFieldNumber { number: 536_870_912 })
        ));
    }

    #[test]
    fn test_tree_error_discards_partial_output() {
        let result = encode_tree(json!({
            "1:0:varint": 1,
            "2:1:embedded": {"1:0:float64": "oops"}
        }));
        assert!(result.is_err());
    }
}
