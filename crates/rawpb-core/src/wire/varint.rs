//! Base-128 variable-length integers.
//!
//! Seven payload bits per byte, least significant group first; the top bit
//! of every byte but the last is set. No zigzag transform is applied in
//! either direction.

use crate::error::{Error, Result};
use bytes::{Buf, BufMut};

/// Maximum bytes in an encoded 64-bit varint
pub const MAX_VARINT_LEN: usize = 10;

/// Decode a varint from the front of `buf`, advancing past it.
///
/// Fails with [`Error::Truncated`] if the input ends mid-value and with
/// [`Error::MalformedVarint`] if the tenth byte still carries a
/// continuation bit.
pub fn decode_varint(buf: &mut impl Buf) -> Result<u64> {
    let mut result: u64 = 0;

    for i in 0..MAX_VARINT_LEN {
        if !buf.has_remaining() {
            return Err(Error::truncated(i + 1, i));
        }

        let byte = buf.get_u8();
        result |= u64::from(byte & 0x7F) << (7 * i);

        if byte & 0x80 == 0 {
            return Ok(result);
        }
    }

    Err(Error::MalformedVarint)
}

/// Decode a varint, rejecting any encoding but the shortest.
///
/// Overlong forms (`0x80 0x00` for zero) and a tenth byte carrying bits
/// beyond the 64th fail with [`Error::NonCanonicalVarint`], so every
/// accepted varint re-encodes to the bytes it was read from.
pub fn decode_varint_canonical(buf: &mut &[u8]) -> Result<u64> {
    let start = *buf;
    let value = decode_varint(buf)?;
    let used = start.len() - buf.len();

    if used != encoded_len(value) || (used == MAX_VARINT_LEN && start[used - 1] > 1) {
        return Err(Error::NonCanonicalVarint { length: used });
    }

    Ok(value)
}

/// Append `value` to `buf` as a varint.
pub fn encode_varint(value: u64, buf: &mut impl BufMut) {
    let mut value = value;

    while value >= 0x80 {
        buf.put_u8((value as u8 & 0x7F) | 0x80);
        value >>= 7;
    }

    buf.put_u8(value as u8);
}

/// Number of bytes `value` occupies once encoded.
pub fn encoded_len(value: u64) -> usize {
    // ceil(significant_bits / 7), with zero taking one byte
    let bits = 64 - (value | 1).leading_zeros() as usize;
    (bits + 6) / 7
}
