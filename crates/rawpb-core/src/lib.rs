//! # rawpb-core
//!
//! A library for decoding protobuf wire data without a `.proto` schema.
//!
//! This crate provides the core functionality for:
//! - Reading and writing base-128 varints and field headers
//! - Heuristically classifying each field (integer, float, text, raw bytes,
//!   nested message, base64-wrapped nested message)
//! - Re-encoding the classified structure, or a JSON rendering of it, back
//!   into wire bytes
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`wire`]: Varint codec and field header parsing
//! - [`map`]: The classified representation ([`StructuredMap`], [`FieldKey`])
//! - [`decode`]: The heuristic decoder
//! - [`encode`]: Reconstruction from maps and from JSON trees
//! - [`text`]: URL and base64 unwrapping of captured payloads
//! - [`error`]: Error types and handling
//!
//! ## Example
//!
//! ```
//! use rawpb_core::{Decoder, Encoder};
//!
//! let data = [0x12, 0x05, b'S', b't', b'e', b'v', b'e'];
//!
//! let map = Decoder::new().decode(&data)?;
//! assert_eq!(serde_json::to_string(&map).unwrap(), r#"{"2:0:string":"Steve"}"#);
//!
//! let bytes = Encoder::new().encode(&map)?;
//! assert_eq!(bytes, data);
//! # Ok::<(), rawpb_core::Error>(())
//! ```
//!
//! Classification is a heuristic. Re-encoding is guaranteed to reproduce the
//! same classified structure, not the same bytes: base64 text may gain
//! padding, and payloads with more than one plausible reading settle on the
//! first one the decoder tries.

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unreachable_pub)]

pub mod decode;
pub mod encode;
pub mod error;
mod json;
pub mod map;
pub mod text;
pub mod wire;

// Re-export primary types for convenience
pub use decode::{decode, Decoder, DecoderConfig, HeaderErrorPolicy};
pub use encode::{encode, Encoder, EncoderConfig};
pub use error::{Error, Result};
pub use map::{FieldKey, KeyPolicy, StructuredMap, TypeTag, WireValue};
pub use text::Base64Alphabet;

/// Crate version for programmatic access
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Maximum valid protobuf field number (2^29 - 1)
pub const MAX_FIELD_NUMBER: u32 = 536_870_911;
