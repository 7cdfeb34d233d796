//! End-to-end decode and reconstruct tests on realistic payloads.

use pretty_assertions::assert_eq;
use prost::Message;
use prost_types::field_descriptor_proto::{Label, Type};
use prost_types::{DescriptorProto, FieldDescriptorProto, FileDescriptorProto};
use rawpb_core::text::unwrap_text_payload;
use rawpb_core::{
    decode, encode, Decoder, DecoderConfig, Encoder, Error, KeyPolicy, StructuredMap, WireValue,
};
use serde_json::json;

fn nested<'a>(map: &'a StructuredMap, key: &str) -> &'a StructuredMap {
    map.get_str(key)
        .and_then(WireValue::as_map)
        .unwrap_or_else(|| panic!("no nested map under {key}"))
}

fn sample_descriptor() -> FileDescriptorProto {
    let field = |name: &str, json_name: &str, number: i32, ty: Type| FieldDescriptorProto {
        name: Some(name.to_string()),
        number: Some(number),
        label: Some(Label::Optional as i32),
        r#type: Some(ty as i32),
        json_name: Some(json_name.to_string()),
        ..Default::default()
    };

    FileDescriptorProto {
        name: Some("example.proto".to_string()),
        package: Some("demo.v1".to_string()),
        message_type: vec![DescriptorProto {
            name: Some("User".to_string()),
            field: vec![
                field("id", "id", 1, Type::Int64),
                field("display_name", "displayName", 2, Type::String),
            ],
            ..Default::default()
        }],
        syntax: Some("proto3".to_string()),
        ..Default::default()
    }
}

#[test]
fn test_scenario_single_varint() {
    let data = [0x08, 0x01];
    let map = decode(&data).unwrap();

    assert_eq!(map.to_json(), json!({"1:0:varint": 1}));
    assert_eq!(encode(&map).unwrap(), data);
}

#[test]
fn test_scenario_single_string() {
    let data = [0x12, 0x05, 0x53, 0x74, 0x65, 0x76, 0x65];
    let map = decode(&data).unwrap();

    assert_eq!(map.to_json(), json!({"2:0:string": "Steve"}));
    assert_eq!(encode(&map).unwrap(), data);
}

#[test]
fn test_descriptor_structure() {
    let data = sample_descriptor().encode_to_vec();
    let map = decode(&data).unwrap();

    assert_eq!(
        map.to_json(),
        json!({
            "1:0:string": "example.proto",
            "2:1:string": "demo.v1",
            "4:2:embedded": {
                "1:0:string": "User",
                "2:1:embedded": {
                    "1:0:string": "id",
                    "3:1:varint": 1,
                    "4:2:varint": 1,
                    "5:3:varint": 3,
                    "10:4:string": "id"
                },
                "2:2:embedded": {
                    "1:0:string": "display_name",
                    "3:1:varint": 2,
                    "4:2:varint": 1,
                    "5:3:varint": 9,
                    "10:4:string": "displayName"
                }
            },
            "12:3:string": "proto3"
        })
    );
}

#[test]
fn test_descriptor_reconstructs_exactly() {
    let original = sample_descriptor();
    let data = original.encode_to_vec();

    let rebuilt = encode(&decode(&data).unwrap()).unwrap();
    assert_eq!(rebuilt, data);
    assert_eq!(FileDescriptorProto::decode(&rebuilt[..]).unwrap(), original);
}

#[test]
fn test_descriptor_through_json_text() {
    let data = sample_descriptor().encode_to_vec();
    let map = decode(&data).unwrap();

    let text = serde_json::to_string_pretty(&map).unwrap();
    let tree: serde_json::Value = serde_json::from_str(&text).unwrap();

    assert_eq!(Encoder::new().encode_tree(&tree).unwrap(), data);
}

#[test]
fn test_captured_token() {
    // continuation token as captured from a query string, unpadded
    let token = "4qmFsgJUEhhVQ2ExMG54U2hoek5yQ0UxbzJaT1B6dGcaOEVnWjJhV1JsYjNNWUF5QUFNQUU0QWVvREYwTm5Ua1JTUld0VFEyZHBXVGx4Y1ZZeVQxZHFPVVEw";
    let data = unwrap_text_payload(token).unwrap();

    let map = decode(&data).unwrap();
    let outer = nested(&map, "80226972:0:embedded");
    assert_eq!(
        outer.get_str("2:0:string"),
        Some(&WireValue::String("UCa10nxShhzNrCE1o2ZOPztg".to_string()))
    );

    let params = nested(outer, "3:1:base64");
    assert_eq!(params.get_str("2:0:string"), Some(&WireValue::String("videos".to_string())));
    assert_eq!(params.get_str("3:1:varint"), Some(&WireValue::Varint(3)));
    assert_eq!(params.get_str("4:2:varint"), Some(&WireValue::Varint(0)));

    let inner = nested(params, "61:5:base64");
    assert_eq!(nested(inner, "1:0:base64").get_str("1:0:varint"), Some(&WireValue::Varint(50)));
    assert_eq!(
        nested(inner, "2:1:embedded").get_str("1:0:varint"),
        Some(&WireValue::Varint(4_533_030_450_576_931_608))
    );

    // nested base64 gains padding, so compare structure rather than bytes
    let rebuilt = encode(&map).unwrap();
    assert_eq!(decode(&rebuilt).unwrap(), map);
}

#[test]
fn test_collapsing_vs_ordered() {
    let data = [0x08, 0x01, 0x12, 0x01, b'a', 0x08, 0x02];

    let ordered = decode(&data).unwrap();
    assert_eq!(
        ordered.to_json(),
        json!({"1:0:varint": 1, "2:1:string": "a", "1:2:varint": 2})
    );

    let collapsing = Decoder::with_config(DecoderConfig::new().policy(KeyPolicy::Collapsing))
        .decode(&data)
        .unwrap();
    assert_eq!(collapsing.to_json(), json!({"1:varint": 2, "2:string": "a"}));

    // collapsing drops the first occurrence, so only the survivors come back
    assert_eq!(encode(&collapsing).unwrap(), [0x08, 0x02, 0x12, 0x01, b'a']);
}

#[test]
fn test_same_field_different_types_collapse_separately() {
    let data = [0x08, 0x01, 0x0A, 0x01, b'x'];
    let map = Decoder::with_config(DecoderConfig::new().policy(KeyPolicy::Collapsing))
        .decode(&data)
        .unwrap();

    assert_eq!(map.to_json(), json!({"1:varint": 1, "1:string": "x"}));
}

#[test]
fn test_empty_length_delimited_round_trips_as_string() {
    let data = [0x0A, 0x00, 0x10, 0x07];
    let map = decode(&data).unwrap();

    assert_eq!(map.to_json(), json!({"1:0:string": "", "2:1:varint": 7}));
    assert_eq!(encode(&map).unwrap(), data);
}

#[test]
fn test_cascade_precedence() {
    // "CAE" is clean text that unwraps to a message: base64 beats string
    let map = decode(b"\x0a\x03CAE").unwrap();
    assert_eq!(map.to_json(), json!({"1:0:base64": {"1:0:varint": 1}}));

    // the same text with base64 detection off stays text
    let plain = Decoder::with_config(DecoderConfig::new().decode_base64(false))
        .decode(b"\x0a\x03CAE")
        .unwrap();
    assert_eq!(plain.to_json(), json!({"1:0:string": "CAE"}));

    // a parseable binary payload is a message, not bytes
    let map = decode(&[0x0A, 0x03, 0x08, 0x96, 0x01]).unwrap();
    assert_eq!(map.to_json(), json!({"1:0:embedded": {"1:0:varint": 150}}));

    // an unparseable binary payload falls through to bytes
    let map = decode(&[0x0A, 0x02, 0xFF, 0xFE]).unwrap();
    assert_eq!(map.to_json(), json!({"1:0:bytes": "//4="}));
}

#[test]
fn test_length_cap_wins_over_truncation() {
    // declared length 4 MiB + 1 with almost no bytes behind it
    let data = [0x0A, 0x81, 0x80, 0x80, 0x02, 0x00];

    assert!(matches!(
        decode(&data),
        Err(Error::LengthTooLarge { length: 4_194_305, max: 4_194_304 })
    ));
}

#[test]
fn test_tree_and_native_encoders_agree() {
    let data = sample_descriptor().encode_to_vec();
    let map = decode(&data).unwrap();

    let encoder = Encoder::new();
    assert_eq!(encoder.encode_tree(&map.to_json()).unwrap(), encoder.encode(&map).unwrap());
}

#[test]
fn test_hand_edited_tree() {
    let data = sample_descriptor().encode_to_vec();
    let mut tree = decode(&data).unwrap().to_json();
    tree["2:1:string"] = json!("demo.v2");

    let rebuilt = Encoder::new().encode_tree(&tree).unwrap();
    let descriptor = FileDescriptorProto::decode(&rebuilt[..]).unwrap();

    assert_eq!(descriptor.package.as_deref(), Some("demo.v2"));
    assert_eq!(descriptor.message_type, sample_descriptor().message_type);
}

#[test]
fn test_overlong_nested_varint_stays_bytes() {
    // reads as 1: { 4: 65 } only if the two-byte spelling of 65 is allowed,
    // and that message would write back as the text " A"
    let data = [0x0A, 0x03, 0x20, 0xC1, 0x00];
    let map = decode(&data).unwrap();

    assert_eq!(map.to_json(), json!({"1:0:bytes": "IMEA"}));
    assert_eq!(encode(&map).unwrap(), data);
    assert_eq!(decode(&encode(&map).unwrap()).unwrap(), map);
}

#[test]
fn test_base64_padding_growth_stays_bytes() {
    let mut data = vec![0x1A, 0x20, 0x0A, 0x1E];
    data.extend_from_slice(b"EhQHAAAAAAAAAAAAAAAAAAAAAAAAAA");
    let map = decode(&data).unwrap();

    assert_eq!(map.get_str("3:0:bytes"), Some(&WireValue::Bytes(data[2..].to_vec())));
    assert_eq!(encode(&map).unwrap(), data);
}

#[test]
fn test_overlong_top_level_varints_are_normalized() {
    let map = decode(&[0x88, 0x00, 0x81, 0x00]).unwrap();

    assert_eq!(map.to_json(), json!({"1:0:varint": 1}));
    assert_eq!(encode(&map).unwrap(), [0x08, 0x01]);
}
