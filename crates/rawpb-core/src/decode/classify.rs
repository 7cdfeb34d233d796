//! Value classification heuristics.
//!
//! No bit-level signal separates a float from an integer of the same
//! width, so fixed-width fields use a plausibility predicate: the bits
//! read as a float when they form a finite number that is zero or whose
//! magnitude falls inside the configured window. Anything else is an
//! integer. Small integers land on subnormal floats and large ones on huge
//! exponents, both outside the window.
//!
//! Length-delimited payloads are classified by a fixed cascade, each step
//! tried only when the previous one fails:
//!
//! 1. empty payload: empty string
//! 2. invalid UTF-8, or text with control bytes other than `\t` `\n` `\r`:
//!    nested message, else raw bytes
//! 3. clean text: base64-wrapped nested message, else string
//!
//! A failed step falls through only on errors from reading the payload
//! (see [`Error::is_recoverable`](crate::Error::is_recoverable)); anything
//! else aborts the decode.

use super::{Decoder, DecoderConfig, Scope};
use crate::encode::{Encoder, EncoderConfig};
use crate::error::Result;
use crate::map::{StructuredMap, WireValue};
use crate::text::unwrap_text_payload;
use tracing::trace;

pub(super) fn fixed32(bits: [u8; 4], config: &DecoderConfig) -> WireValue {
    let float = f32::from_le_bytes(bits);
    if is_plausible_float(f64::from(float), config) {
        WireValue::Float32(float)
    } else {
        WireValue::Int32(i32::from_le_bytes(bits))
    }
}

pub(super) fn fixed64(bits: [u8; 8], config: &DecoderConfig) -> WireValue {
    let float = f64::from_le_bytes(bits);
    if is_plausible_float(float, config) {
        WireValue::Float64(float)
    } else {
        WireValue::Int64(i64::from_le_bytes(bits))
    }
}

fn is_plausible_float(value: f64, config: &DecoderConfig) -> bool {
    if !value.is_finite() {
        return false;
    }

    let magnitude = value.abs();
    magnitude == 0.0
        || (magnitude >= config.float_min_magnitude && magnitude < config.float_max_magnitude)
}

/// True if `payload` holds a C0 control byte other than tab, LF or CR.
fn has_disallowed_control(payload: &[u8]) -> bool {
    payload
        .iter()
        .any(|&b| b <= 0x1F && !matches!(b, b'\t' | b'\n' | b'\r'))
}

fn is_clean_text(payload: &[u8]) -> bool {
    std::str::from_utf8(payload).is_ok() && !has_disallowed_control(payload)
}

fn contains_base64(map: &StructuredMap) -> bool {
    map.iter().any(|(_, value)| match value {
        WireValue::Base64(_) => true,
        WireValue::Embedded(inner) => contains_base64(inner),
        _ => false,
    })
}

impl Decoder {
    pub(super) fn classify_length_delimited(
        &self,
        payload: &[u8],
        depth: usize,
    ) -> Result<WireValue> {
        if payload.is_empty() {
            return Ok(WireValue::String(String::new()));
        }

        let text = match std::str::from_utf8(payload) {
            Ok(text) if !has_disallowed_control(payload) => text,
            Ok(_) => {
                trace!(len = payload.len(), "text holds control bytes");
                return self.embedded_or_bytes(payload, depth);
            }
            Err(_) => return self.embedded_or_bytes(payload, depth),
        };

        if self.config.decode_base64 {
            if let Some(map) = self.try_base64(text, depth)? {
                return Ok(WireValue::Base64(map));
            }
        }

        Ok(WireValue::String(text.to_string()))
    }

    fn embedded_or_bytes(&self, payload: &[u8], depth: usize) -> Result<WireValue> {
        let map = match self.decode_message(payload, depth + 1, Scope::Nested) {
            Ok(map) => map,
            Err(e) if e.is_recoverable() => {
                trace!(error = %e, len = payload.len(), "not a nested message, keeping bytes");
                return Ok(WireValue::Bytes(payload.to_vec()));
            }
            Err(e) => return Err(e),
        };

        if contains_base64(&map) && self.rewrites_as_text(&map) {
            trace!(len = payload.len(), "nested message would re-encode as text, keeping bytes");
            return Ok(WireValue::Bytes(payload.to_vec()));
        }

        Ok(WireValue::Embedded(map))
    }

    /// Base64 text may gain padding when written back, which shifts the
    /// length prefixes around it. If the rewritten message no longer holds a
    /// control byte it would come back as text instead of a message.
    fn rewrites_as_text(&self, map: &StructuredMap) -> bool {
        let encoder = Encoder::with_config(EncoderConfig::new().strict_field_numbers(false));
        match encoder.encode(map) {
            Ok(bytes) => is_clean_text(&bytes),
            Err(e) => {
                trace!(error = %e, "nested message cannot be re-encoded");
                true
            }
        }
    }

    fn try_base64(&self, text: &str, depth: usize) -> Result<Option<StructuredMap>> {
        let decoded = match unwrap_text_payload(text) {
            Ok(decoded) if !decoded.is_empty() => decoded,
            Ok(_) => return Ok(None),
            Err(e) if e.is_recoverable() => {
                trace!(error = %e, "text is not base64");
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        match self.decode_message(&decoded, depth + 1, Scope::Nested) {
            Ok(map) => Ok(Some(map)),
            Err(e) if e.is_recoverable() => {
                trace!(error = %e, "base64 payload is not a message");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}
