//! Heuristic, schema-less message decoding.
//!
//! [`Decoder`] walks a byte range field by field, reading each header with
//! the varint codec and dispatching on the wire type. Fixed-width fields
//! are classified as float or integer by a magnitude predicate, and
//! length-delimited fields go through the text / base64 / nested message /
//! raw bytes cascade of the `classify` submodule.
//!
//! ## Example
//!
//! ```
//! use rawpb_core::{Decoder, WireValue};
//!
//! let map = Decoder::new().decode(&[0x08, 0x01])?;
//! assert_eq!(map.get_str("1:0:varint"), Some(&WireValue::Varint(1)));
//! # Ok::<(), rawpb_core::Error>(())
//! ```

mod classify;

use crate::error::{Error, Result};
use crate::map::{KeyPolicy, StructuredMap, WireValue};
use crate::wire::{decode_varint, decode_varint_canonical, parse_header, WireType};
use crate::MAX_FIELD_NUMBER;
use bytes::Buf;
use tracing::{debug, trace};

/// Default cap on a single length-delimited field (4 MiB)
pub const DEFAULT_MAX_FIELD_LENGTH: u64 = 4 * 1024 * 1024;

/// Default cap on nested message depth
pub const DEFAULT_MAX_DEPTH: usize = 100;

/// What to do when a top-level field header cannot be read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HeaderErrorPolicy {
    /// Fail the whole decode
    #[default]
    Abort,
    /// Skip one byte past the start of the bad header and try again
    Resync,
}

/// Where a message sits relative to the input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    TopLevel,
    /// A payload tried as a nested message during classification
    Nested,
}

impl Scope {
    /// Nested payloads accept only shortest-form varints, so whatever they
    /// decode to is written back byte for byte.
    fn read_varint(self, buf: &mut &[u8]) -> Result<u64> {
        match self {
            Scope::TopLevel => decode_varint(buf),
            Scope::Nested => decode_varint_canonical(buf),
        }
    }
}

/// Configuration for the decoder
#[derive(Debug, Clone)]
pub struct DecoderConfig {
    /// Key policy of produced maps
    pub policy: KeyPolicy,
    /// Try to unwrap clean text as base64 holding a nested message
    pub decode_base64: bool,
    /// Largest accepted length-delimited field
    pub max_field_length: u64,
    /// Deepest accepted message nesting (the top-level message is depth 0)
    pub max_depth: usize,
    /// Fixed-width values at or above this magnitude are read as integers
    pub float_max_magnitude: f64,
    /// Non-zero fixed-width values below this magnitude are read as integers
    pub float_min_magnitude: f64,
    /// Handling of unreadable top-level headers
    pub on_header_error: HeaderErrorPolicy,
    /// Reject field number 0 and numbers above 2^29 - 1
    pub strict_field_numbers: bool,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            policy: KeyPolicy::Ordered,
            decode_base64: true,
            max_field_length: DEFAULT_MAX_FIELD_LENGTH,
            max_depth: DEFAULT_MAX_DEPTH,
            float_max_magnitude: 1e30,
            float_min_magnitude: 1e-30,
            on_header_error: HeaderErrorPolicy::Abort,
            strict_field_numbers: true,
        }
    }
}

impl DecoderConfig {
    /// Creates a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the key policy
    pub fn policy(mut self, policy: KeyPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Sets whether base64-wrapped messages are detected
    pub fn decode_base64(mut self, enabled: bool) -> Self {
        self.decode_base64 = enabled;
        self
    }

    /// Sets the length-delimited field cap
    pub fn max_field_length(mut self, max: u64) -> Self {
        self.max_field_length = max;
        self
    }

    /// Sets the nesting cap
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Sets the magnitude window in which fixed-width values read as floats
    pub fn float_magnitude(mut self, min: f64, max: f64) -> Self {
        self.float_min_magnitude = min;
        self.float_max_magnitude = max;
        self
    }

    /// Sets the header error policy
    pub fn on_header_error(mut self, policy: HeaderErrorPolicy) -> Self {
        self.on_header_error = policy;
        self
    }

    /// Sets whether out-of-range field numbers are rejected
    pub fn strict_field_numbers(mut self, strict: bool) -> Self {
        self.strict_field_numbers = strict;
        self
    }
}

/// Schema-less protobuf decoder
#[derive(Debug, Clone, Default)]
pub struct Decoder {
    config: DecoderConfig,
}

impl Decoder {
    /// Creates a new decoder with default configuration
    pub fn new() -> Self {
        Self {
            config: DecoderConfig::default(),
        }
    }

    /// Creates a new decoder with custom configuration
    pub fn with_config(config: DecoderConfig) -> Self {
        Self { config }
    }

    /// Returns the configuration
    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// Decode a complete message.
    ///
    /// Errors in top-level field headers and values abort the decode unless
    /// [`HeaderErrorPolicy::Resync`] is set, in which case unreadable headers
    /// are skipped one byte at a time. Nested payloads are always decoded
    /// strictly, since their failure is what drives classification: header
    /// errors abort them and overlong varints are rejected, leaving the
    /// payload as raw bytes.
    pub fn decode(&self, data: &[u8]) -> Result<StructuredMap> {
        let map = self.decode_message(data, 0, Scope::TopLevel)?;
        debug!(bytes = data.len(), fields = map.len(), "decoded message");
        Ok(map)
    }

    fn decode_message(
        &self,
        data: &[u8],
        depth: usize,
        scope: Scope,
    ) -> Result<StructuredMap> {
        if depth > self.config.max_depth {
            return Err(Error::DepthExceeded {
                limit: self.config.max_depth,
            });
        }

        let resync = scope == Scope::TopLevel
            && self.config.on_header_error == HeaderErrorPolicy::Resync;
        let mut map = StructuredMap::new(self.config.policy);
        let mut buf = data;

        while buf.has_remaining() {
            let field_start = buf;

            let (field_number, wire_type) = match self.read_header(&mut buf, scope) {
                Ok(header) => header,
                Err(e) if resync => {
                    debug!(
                        offset = data.len() - field_start.len(),
                        error = %e,
                        "skipping byte after unreadable header"
                    );
                    buf = &field_start[1..];
                    continue;
                }
                Err(e) => return Err(e),
            };

            let value = self.read_value(wire_type, &mut buf, depth, scope)?;
            trace!(field_number, tag = %value.tag(), depth, "classified field");
            map.push(field_number, value);
        }

        Ok(map)
    }

    fn read_header(&self, buf: &mut &[u8], scope: Scope) -> Result<(u64, WireType)> {
        let (field_number, wire_type) = parse_header(scope.read_varint(buf)?)?;

        if self.config.strict_field_numbers
            && (field_number == 0 || field_number > u64::from(MAX_FIELD_NUMBER))
        {
            return Err(Error::InvalidFieldNumber {
                number: field_number,
            });
        }

        Ok((field_number, wire_type))
    }

    fn read_value(
        &self,
        wire_type: WireType,
        buf: &mut &[u8],
        depth: usize,
        scope: Scope,
    ) -> Result<WireValue> {
        match wire_type {
            WireType::Varint => Ok(WireValue::Varint(scope.read_varint(buf)? as i64)),
            WireType::Bit32 => {
                let bits = take_array::<4>(buf)?;
                Ok(classify::fixed32(bits, &self.config))
            }
            WireType::Bit64 => {
                let bits = take_array::<8>(buf)?;
                Ok(classify::fixed64(bits, &self.config))
            }
            WireType::LengthDelimited => {
                let length = scope.read_varint(buf)?;
                if length > self.config.max_field_length {
                    return Err(Error::LengthTooLarge {
                        length,
                        max: self.config.max_field_length,
                    });
                }

                let available = buf.len();
                let length = usize::try_from(length)
                    .ok()
                    .filter(|&len| len <= available)
                    .ok_or_else(|| Error::truncated(length as usize, available))?;

                let (payload, rest) = buf.split_at(length);
                *buf = rest;
                self.classify_length_delimited(payload, depth)
            }
            WireType::StartGroup | WireType::EndGroup => Err(Error::UnsupportedWireType {
                wire_type: wire_type.as_u8(),
            }),
        }
    }
}

fn take_array<const N: usize>(buf: &mut &[u8]) -> Result<[u8; N]> {
    if buf.remaining() < N {
        return Err(Error::truncated(N, buf.remaining()));
    }

    let mut out = [0u8; N];
    buf.copy_to_slice(&mut out);
    Ok(out)
}

/// Decode `data` with the default configuration.
pub fn decode(data: &[u8]) -> Result<StructuredMap> {
    Decoder::new().decode(data)
}
