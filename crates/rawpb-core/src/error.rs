//! Error types for the rawpb-core library.
//!
//! Decoding errors (`Truncated` through `DepthExceeded`) are raised while
//! walking wire bytes. Inside a length-delimited field they are absorbed by
//! the classification cascade; at the top level they abort the decode.
//! Reconstruction errors are always fatal to the whole call.

use crate::map::TypeTag;
use thiserror::Error;

/// Result type alias for rawpb operations
pub type Result<T> = std::result::Result<T, Error>;

/// Comprehensive error type for all rawpb operations
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// The input ended before a required read completed
    #[error("unexpected end of input: needed {needed} bytes, {available} available")]
    Truncated {
        /// Bytes the current read required
        needed: usize,
        /// Bytes that were left in the input
        available: usize,
    },

    /// A varint ran past the maximum encoded width
    #[error("malformed varint: more than {max} continuation bytes", max = crate::wire::MAX_VARINT_LEN)]
    MalformedVarint,

    /// A varint inside a nested payload used more bytes than its value needs
    #[error("non-canonical varint: {length} bytes for a shorter value")]
    NonCanonicalVarint {
        /// Bytes the varint occupied
        length: usize,
    },

    /// A length-delimited field declared a length above the configured cap
    #[error("length-delimited field declares {length} bytes, limit is {max}")]
    LengthTooLarge {
        /// Declared length
        length: u64,
        /// Configured cap
        max: u64,
    },

    /// Group tags and the undefined wire types 6 and 7
    #[error("unsupported wire type {wire_type}")]
    UnsupportedWireType {
        /// The raw 3-bit wire type
        wire_type: u8,
    },

    /// Field number outside the valid protobuf range
    #[error("invalid field number {number}: must be between 1 and {max}", max = crate::MAX_FIELD_NUMBER)]
    InvalidFieldNumber {
        /// The offending field number
        number: u64,
    },

    /// Nested messages went deeper than the configured limit
    #[error("nesting depth exceeds limit of {limit}")]
    DepthExceeded {
        /// Configured nesting limit
        limit: usize,
    },

    /// A key names a type tag outside the fixed table
    #[error("unknown type tag '{tag}'")]
    UnknownTypeTag {
        /// The unrecognized tag text
        tag: String,
    },

    /// A value's run-time type does not agree with its key's type tag
    #[error("type mismatch for '{key}': tag is {expected}, value is {found}")]
    TypeMismatch {
        /// The composite key of the entry
        key: String,
        /// Tag carried by the key
        expected: TypeTag,
        /// Description of the value actually present
        found: String,
    },

    /// A composite key that is not `<field>:<tag>` or `<field>:<index>:<tag>`
    #[error("malformed field key '{key}'")]
    MalformedKey {
        /// The key as given
        key: String,
    },

    /// Base64 text whose unpadded length is 1 modulo 4
    #[error("invalid base64 padding: unpadded length {length} is 1 modulo 4")]
    InvalidPadding {
        /// Length after stripping `=`
        length: usize,
    },

    /// Base64 text that failed to decode
    #[error("invalid base64: {0}")]
    InvalidBase64(#[from] base64::DecodeError),
}

impl Error {
    /// Creates a new truncation error
    pub fn truncated(needed: usize, available: usize) -> Self {
        Self::Truncated { needed, available }
    }

    /// Creates a new type mismatch error
    pub fn type_mismatch(key: impl ToString, expected: TypeTag, found: impl Into<String>) -> Self {
        Self::TypeMismatch {
            key: key.to_string(),
            expected,
            found: found.into(),
        }
    }

    /// Creates a new malformed key error
    pub fn malformed_key(key: impl Into<String>) -> Self {
        Self::MalformedKey { key: key.into() }
    }

    /// Creates a new unknown type tag error
    pub fn unknown_type_tag(tag: impl Into<String>) -> Self {
        Self::UnknownTypeTag { tag: tag.into() }
    }

    /// Returns true if the error stems from reading input, wire bytes or
    /// base64 text. The length-delimited cascade swallows these and moves
    /// on to its next step; anything else is passed up.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Truncated { .. }
                | Self::MalformedVarint
                | Self::NonCanonicalVarint { .. }
                | Self::LengthTooLarge { .. }
                | Self::UnsupportedWireType { .. }
                | Self::InvalidFieldNumber { .. }
                | Self::DepthExceeded { .. }
                | Self::InvalidPadding { .. }
                | Self::InvalidBase64(_)
        )
    }
}
