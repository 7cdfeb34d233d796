//! Re-encoding classified maps to wire bytes.
//!
//! [`Encoder`] is the inverse of the decoder: every entry becomes a header
//! built from its field number and the wire type its tag maps to, followed
//! by the payload. Entries are written in map order. Any error aborts the
//! whole call; no partial output is returned.
//!
//! The same encoder also accepts a generic JSON tree (see
//! [`Encoder::encode_tree`]), so stored or hand-edited maps can be turned
//! back into bytes.

mod tree;

use crate::error::{Error, Result};
use crate::map::{StructuredMap, TypeTag, WireValue};
use crate::text::{encode_base64, Base64Alphabet};
use crate::wire::{encode_varint, make_header, WireType};
use crate::MAX_FIELD_NUMBER;
use bytes::BufMut;
use tracing::debug;

/// Wire type emitted for each type tag
pub fn wire_type_of(tag: TypeTag) -> WireType {
    match tag {
        TypeTag::Varint => WireType::Varint,
        TypeTag::Int32 | TypeTag::Float32 => WireType::Bit32,
        TypeTag::Int64 | TypeTag::Float64 => WireType::Bit64,
        TypeTag::String | TypeTag::Embedded | TypeTag::Base64 | TypeTag::Bytes => {
            WireType::LengthDelimited
        }
    }
}

/// Configuration for the encoder
#[derive(Debug, Clone)]
pub struct EncoderConfig {
    /// Alphabet for base64-wrapped messages
    pub alphabet: Base64Alphabet,
    /// Whether base64-wrapped messages carry `=` padding
    pub padding: bool,
    /// Reject field number 0 and numbers above 2^29 - 1. When off, only
    /// numbers that do not fit in a header are rejected.
    pub strict_field_numbers: bool,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            alphabet: Base64Alphabet::Standard,
            padding: true,
            strict_field_numbers: true,
        }
    }
}

impl EncoderConfig {
    /// Creates a new config with default values (standard alphabet, padded)
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the base64 alphabet
    pub fn alphabet(mut self, alphabet: Base64Alphabet) -> Self {
        self.alphabet = alphabet;
        self
    }

    /// Sets whether base64 output is padded
    pub fn padding(mut self, padding: bool) -> Self {
        self.padding = padding;
        self
    }

    /// Sets whether out-of-range field numbers are rejected
    pub fn strict_field_numbers(mut self, strict: bool) -> Self {
        self.strict_field_numbers = strict;
        self
    }
}

/// Wire format encoder for classified maps
#[derive(Debug, Clone)]
pub struct Encoder {
    config: EncoderConfig,
}

impl Default for Encoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Encoder {
    /// Creates a new encoder with default configuration
    pub fn new() -> Self {
        Self {
            config: EncoderConfig::new(),
        }
    }

    /// Creates a new encoder with custom configuration
    pub fn with_config(config: EncoderConfig) -> Self {
        Self { config }
    }

    /// Returns the configuration
    pub fn config(&self) -> &EncoderConfig {
        &self.config
    }

    /// Encode a map and everything nested in it.
    pub fn encode(&self, map: &StructuredMap) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        self.write_map(map, &mut out)?;
        debug!(fields = map.len(), bytes = out.len(), "encoded message");
        Ok(out)
    }

    fn write_map(&self, map: &StructuredMap, out: &mut Vec<u8>) -> Result<()> {
        for (key, value) in map.iter() {
            if key.tag != value.tag() {
                return Err(Error::type_mismatch(key, key.tag, value.tag().as_str()));
            }

            self.write_header(key.field_number, key.tag, out)?;

            match value {
                WireValue::Varint(v) => encode_varint(*v as u64, out),
                WireValue::Int32(v) => out.put_i32_le(*v),
                WireValue::Float32(v) => out.put_f32_le(*v),
                WireValue::Int64(v) => out.put_i64_le(*v),
                WireValue::Float64(v) => out.put_f64_le(*v),
                WireValue::String(s) => write_length_delimited(s.as_bytes(), out),
                WireValue::Bytes(b) => write_length_delimited(b, out),
                WireValue::Embedded(nested) => {
                    let mut inner = Vec::new();
                    self.write_map(nested, &mut inner)?;
                    write_length_delimited(&inner, out);
                }
                WireValue::Base64(nested) => {
                    let mut inner = Vec::new();
                    self.write_map(nested, &mut inner)?;
                    write_length_delimited(self.wrap_base64(&inner).as_bytes(), out);
                }
            }
        }

        Ok(())
    }

    fn write_header(&self, field_number: u64, tag: TypeTag, out: &mut impl BufMut) -> Result<()> {
        let valid = if self.config.strict_field_numbers {
            (1..=u64::from(MAX_FIELD_NUMBER)).contains(&field_number)
        } else {
            field_number <= u64::MAX >> 3
        };
        if !valid {
            return Err(Error::InvalidFieldNumber {
                number: field_number,
            });
        }

        encode_varint(make_header(field_number, wire_type_of(tag)), out);
        Ok(())
    }

    fn wrap_base64(&self, data: &[u8]) -> String {
        encode_base64(data, self.config.alphabet, self.config.padding)
    }
}

/// Length prefix is the payload's byte count
fn write_length_delimited(payload: &[u8], out: &mut impl BufMut) {
    encode_varint(payload.len() as u64, out);
    out.put_slice(payload);
}

/// Encode `map` with the default configuration.
pub fn encode(map: &StructuredMap) -> Result<Vec<u8>> {
    Encoder::new().encode(map)
}
