//! The classified intermediate representation.
//!
//! A [`StructuredMap`] is what the decoder produces and what both
//! reconstructors consume. Each entry is keyed by a [`FieldKey`]: the field
//! number, an optional document-order occurrence index, and the inferred
//! [`TypeTag`]. At the serialization boundary the key is rendered as
//! `"<field>:<index>:<tag>"` or `"<field>:<tag>"`.

use crate::error::{Error, Result};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Inferred semantic type of a field value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeTag {
    /// Base-128 varint
    Varint,
    /// 32-bit fixed field read as an IEEE float
    Float32,
    /// 32-bit fixed field read as a little-endian integer
    Int32,
    /// 64-bit fixed field read as an IEEE double
    Float64,
    /// 64-bit fixed field read as a little-endian integer
    Int64,
    /// Length-delimited UTF-8 text
    String,
    /// Length-delimited nested message
    Embedded,
    /// Length-delimited base64 text wrapping a nested message
    Base64,
    /// Length-delimited opaque bytes
    Bytes,
}

impl TypeTag {
    /// Every tag, in table order
    pub const ALL: [TypeTag; 9] = [
        TypeTag::Varint,
        TypeTag::Float32,
        TypeTag::Int32,
        TypeTag::Float64,
        TypeTag::Int64,
        TypeTag::String,
        TypeTag::Embedded,
        TypeTag::Base64,
        TypeTag::Bytes,
    ];

    /// The tag as it appears in composite keys
    pub fn as_str(&self) -> &'static str {
        match self {
            TypeTag::Varint => "varint",
            TypeTag::Float32 => "float32",
            TypeTag::Int32 => "int32",
            TypeTag::Float64 => "float64",
            TypeTag::Int64 => "int64",
            TypeTag::String => "string",
            TypeTag::Embedded => "embedded",
            TypeTag::Base64 => "base64",
            TypeTag::Bytes => "bytes",
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TypeTag {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        TypeTag::ALL
            .into_iter()
            .find(|tag| tag.as_str() == s)
            .ok_or_else(|| Error::unknown_type_tag(s))
    }
}

/// Composite identity of a map entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldKey {
    /// Protobuf field number
    pub field_number: u64,
    /// Document-order occurrence index (ordered maps only)
    pub index: Option<u64>,
    /// Inferred type of the value
    pub tag: TypeTag,
}

impl FieldKey {
    /// Key carrying an occurrence index
    pub fn indexed(field_number: u64, index: u64, tag: TypeTag) -> Self {
        Self {
            field_number,
            index: Some(index),
            tag,
        }
    }

    /// Key without an occurrence index
    pub fn collapsed(field_number: u64, tag: TypeTag) -> Self {
        Self {
            field_number,
            index: None,
            tag,
        }
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.index {
            Some(index) => write!(f, "{}:{}:{}", self.field_number, index, self.tag),
            None => write!(f, "{}:{}", self.field_number, self.tag),
        }
    }
}

impl FromStr for FieldKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split(':').collect();
        let (number, index, tag) = match parts.as_slice() {
            [number, tag] => (number, None, tag),
            [number, index, tag] => (number, Some(index), tag),
            _ => return Err(Error::malformed_key(s)),
        };

        let field_number = number.parse().map_err(|_| Error::malformed_key(s))?;
        let index = index
            .map(|i| i.parse::<u64>())
            .transpose()
            .map_err(|_| Error::malformed_key(s))?;

        Ok(Self {
            field_number,
            index,
            tag: tag.parse()?,
        })
    }
}

/// A classified field value
#[derive(Debug, Clone, PartialEq)]
pub enum WireValue {
    /// Varint, the unsigned 64-bit magnitude reinterpreted as signed
    Varint(i64),
    /// 32-bit float
    Float32(f32),
    /// 32-bit integer
    Int32(i32),
    /// 64-bit float
    Float64(f64),
    /// 64-bit integer
    Int64(i64),
    /// UTF-8 text
    String(String),
    /// Nested message
    Embedded(StructuredMap),
    /// Nested message carried as base64 text
    Base64(StructuredMap),
    /// Opaque bytes
    Bytes(Vec<u8>),
}

impl WireValue {
    /// The type tag matching this variant
    pub fn tag(&self) -> TypeTag {
        match self {
            WireValue::Varint(_) => TypeTag::Varint,
            WireValue::Float32(_) => TypeTag::Float32,
            WireValue::Int32(_) => TypeTag::Int32,
            WireValue::Float64(_) => TypeTag::Float64,
            WireValue::Int64(_) => TypeTag::Int64,
            WireValue::String(_) => TypeTag::String,
            WireValue::Embedded(_) => TypeTag::Embedded,
            WireValue::Base64(_) => TypeTag::Base64,
            WireValue::Bytes(_) => TypeTag::Bytes,
        }
    }

    /// The nested map, for embedded and base64 values
    pub fn as_map(&self) -> Option<&StructuredMap> {
        match self {
            WireValue::Embedded(map) | WireValue::Base64(map) => Some(map),
            _ => None,
        }
    }
}

/// How keys are built when fields are appended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyPolicy {
    /// Every key carries an occurrence index; repeated fields are kept
    #[default]
    Ordered,
    /// Keys omit the index; a later field with the same number and tag
    /// replaces the earlier value
    Collapsing,
}

/// Insertion-ordered map from [`FieldKey`] to [`WireValue`]
#[derive(Debug, Clone, Default)]
pub struct StructuredMap {
    policy: KeyPolicy,
    entries: Vec<(FieldKey, WireValue)>,
    // key -> slot in `entries`
    positions: HashMap<FieldKey, usize>,
    next_index: u64,
}

impl StructuredMap {
    /// Creates an empty map with the given key policy
    pub fn new(policy: KeyPolicy) -> Self {
        Self {
            policy,
            entries: Vec::new(),
            positions: HashMap::new(),
            next_index: 0,
        }
    }

    /// Creates an empty map with the ordered policy
    pub fn ordered() -> Self {
        Self::new(KeyPolicy::Ordered)
    }

    /// Creates an empty map with the collapsing policy
    pub fn collapsing() -> Self {
        Self::new(KeyPolicy::Collapsing)
    }

    /// Returns the key policy
    pub fn policy(&self) -> KeyPolicy {
        self.policy
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the map has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append a field value, building its key from the map's policy.
    ///
    /// Under [`KeyPolicy::Ordered`] the key takes the next occurrence index.
    /// Under [`KeyPolicy::Collapsing`] an existing entry with the same field
    /// number and tag is overwritten in place.
    pub fn push(&mut self, field_number: u64, value: WireValue) -> FieldKey {
        let tag = value.tag();
        let key = match self.policy {
            KeyPolicy::Ordered => {
                let key = FieldKey::indexed(field_number, self.next_index, tag);
                self.next_index += 1;
                key
            }
            KeyPolicy::Collapsing => FieldKey::collapsed(field_number, tag),
        };
        self.insert(key, value);
        key
    }

    /// Insert under an explicit key, returning the value it replaced.
    ///
    /// The key is stored as given; its tag is only checked against the value
    /// at reconstruction time.
    pub fn insert(&mut self, key: FieldKey, value: WireValue) -> Option<WireValue> {
        if let Some(index) = key.index {
            self.next_index = self.next_index.max(index.saturating_add(1));
        }

        match self.positions.get(&key) {
            Some(&slot) => Some(std::mem::replace(&mut self.entries[slot].1, value)),
            None => {
                self.positions.insert(key, self.entries.len());
                self.entries.push((key, value));
                None
            }
        }
    }

    /// Look up a value by key
    pub fn get(&self, key: &FieldKey) -> Option<&WireValue> {
        self.positions.get(key).map(|&slot| &self.entries[slot].1)
    }

    /// Look up a value by its rendered key, e.g. `"2:0:string"`
    pub fn get_str(&self, key: &str) -> Option<&WireValue> {
        key.parse::<FieldKey>().ok().and_then(|key| self.get(&key))
    }

    /// Iterate entries in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&FieldKey, &WireValue)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    /// Iterate keys in insertion order
    pub fn keys(&self) -> impl Iterator<Item = &FieldKey> {
        self.entries.iter().map(|(k, _)| k)
    }
}

impl PartialEq for StructuredMap {
    fn eq(&self, other: &Self) -> bool {
        self.policy == other.policy && self.entries == other.entries
    }
}
