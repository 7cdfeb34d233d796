//! Text unwrapping helpers.
//!
//! Captured protobuf payloads often travel as URL-escaped, unpadded base64
//! (query-string tokens, cookies). These helpers undo that wrapping, and
//! the decoder uses the same path to detect base64-wrapped nested messages.

use crate::error::{Error, Result};
use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD, URL_SAFE, URL_SAFE_NO_PAD};
use base64::Engine;
use std::borrow::Cow;

/// Base64 alphabet used when emitting base64-wrapped messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Base64Alphabet {
    /// `+` and `/`
    #[default]
    Standard,
    /// `-` and `_`
    UrlSafe,
}

/// Restore the `=` padding of base64 text.
///
/// Existing padding is stripped first, so correctly padded input comes back
/// unchanged. Fails with [`Error::InvalidPadding`] when the unpadded length
/// is 1 modulo 4, which no valid encoding can produce.
pub fn repair_padding(text: &str) -> Result<String> {
    let trimmed = text.trim_end_matches('=');

    match trimmed.len() % 4 {
        0 => Ok(trimmed.to_string()),
        1 => Err(Error::InvalidPadding {
            length: trimmed.len(),
        }),
        rem => {
            let mut padded = String::with_capacity(trimmed.len() + 4 - rem);
            padded.push_str(trimmed);
            padded.extend(std::iter::repeat('=').take(4 - rem));
            Ok(padded)
        }
    }
}

/// Decode `%XX` escapes.
///
/// Malformed escapes are kept verbatim and `+` is left alone, since it is
/// a meaningful base64 character. Escapes that produce invalid UTF-8 are
/// replaced with U+FFFD.
pub fn url_decode(text: &str) -> Cow<'_, str> {
    if !text.contains('%') {
        return Cow::Borrowed(text);
    }

    let bytes = text.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let (Some(hi), Some(lo)) = (hex_value(bytes[i + 1]), hex_value(bytes[i + 2])) {
                out.push(hi << 4 | lo);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }

    Cow::Owned(String::from_utf8_lossy(&out).into_owned())
}

fn hex_value(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

/// Decode base64 in either alphabet, with or without padding.
pub fn decode_base64_lenient(text: &str) -> Result<Vec<u8>> {
    let normalized: String = text
        .chars()
        .map(|c| match c {
            '-' => '+',
            '_' => '/',
            c => c,
        })
        .collect();

    let padded = repair_padding(&normalized)?;
    Ok(STANDARD.decode(padded)?)
}

/// URL-decode then leniently base64-decode a text payload.
pub fn unwrap_text_payload(text: &str) -> Result<Vec<u8>> {
    decode_base64_lenient(&url_decode(text))
}

/// Encode bytes as base64 text.
pub fn encode_base64(data: &[u8], alphabet: Base64Alphabet, padding: bool) -> String {
    match (alphabet, padding) {
        (Base64Alphabet::Standard, true) => STANDARD.encode(data),
        (Base64Alphabet::Standard, false) => STANDARD_NO_PAD.encode(data),
        (Base64Alphabet::UrlSafe, true) => URL_SAFE.encode(data),
        (Base64Alphabet::UrlSafe, false) => URL_SAFE_NO_PAD.encode(data),
    }
}
