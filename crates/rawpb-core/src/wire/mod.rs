//! Low-level protobuf wire format primitives.
//!
//! Each protobuf field is encoded as:
//! - A varint "header" containing the field number and wire type
//! - The field data (format depends on wire type)
//!
//! Wire types:
//! - 0: VARINT (int32, int64, uint32, uint64, sint32, sint64, bool, enum)
//! - 1: I64 (fixed64, sfixed64, double)
//! - 2: LEN (string, bytes, embedded messages, packed repeated fields)
//! - 3, 4: SGROUP / EGROUP (recognized, never interpreted)
//! - 5: I32 (fixed32, sfixed32, float)

mod varint;

use crate::error::{Error, Result};

pub use varint::{
    decode_varint, decode_varint_canonical, encode_varint, encoded_len, MAX_VARINT_LEN,
};

/// Protobuf wire types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum WireType {
    /// Variable-length integer
    Varint = 0,
    /// 64-bit fixed-width
    Bit64 = 1,
    /// Length-delimited (strings, bytes, embedded messages)
    LengthDelimited = 2,
    /// Start group (deprecated)
    StartGroup = 3,
    /// End group (deprecated)
    EndGroup = 4,
    /// 32-bit fixed-width
    Bit32 = 5,
}

impl WireType {
    /// The 3-bit value carried in a field header
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for WireType {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(WireType::Varint),
            1 => Ok(WireType::Bit64),
            2 => Ok(WireType::LengthDelimited),
            3 => Ok(WireType::StartGroup),
            4 => Ok(WireType::EndGroup),
            5 => Ok(WireType::Bit32),
            _ => Err(Error::UnsupportedWireType { wire_type: value }),
        }
    }
}

/// Split a decoded header varint into field number and wire type.
///
/// Group wire types are recognized but rejected with
/// [`Error::UnsupportedWireType`], as are the undefined values 6 and 7.
pub fn parse_header(header: u64) -> Result<(u64, WireType)> {
    let field_number = header >> 3;
    let wire_type = WireType::try_from((header & 0x07) as u8)?;

    match wire_type {
        WireType::StartGroup | WireType::EndGroup => Err(Error::UnsupportedWireType {
            wire_type: wire_type.as_u8(),
        }),
        _ => Ok((field_number, wire_type)),
    }
}

/// Build the header varint value for a field.
pub fn make_header(field_number: u64, wire_type: WireType) -> u64 {
    (field_number << 3) | u64::from(wire_type.as_u8())
}
