//! # Inline Payload Parsing
//!
//! `data:` URLs carry their payload in the key itself and bypass the store
//! and the network entirely; the loader only needs the raw bytes out.

use crate::error::{LoaderError, Result};
use base64::engine::general_purpose;
use base64::Engine;
use bytes::Bytes;

/// Whether a resource key is an inline payload rather than a fetchable URL.
pub fn is_data_url(key: &str) -> bool {
    key.starts_with("data:")
}

/// Extract the payload bytes of a `data:` URL.
///
/// Supports both encodings defined for the scheme: `;base64` payloads and
/// percent-encoded text payloads.
pub fn decode(url: &str) -> Result<Bytes> {
    let rest = url
        .strip_prefix("data:")
        .ok_or_else(|| LoaderError::Decode("not a data: URL".to_string()))?;

    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| LoaderError::Decode("data: URL has no payload separator".to_string()))?;

    if header
        .rsplit(';')
        .next()
        .is_some_and(|param| param.eq_ignore_ascii_case("base64"))
    {
        let decoded = general_purpose::STANDARD
            .decode(payload.trim())
            .map_err(|e| LoaderError::Decode(format!("invalid base64 payload: {e}")))?;
        Ok(Bytes::from(decoded))
    } else {
        percent_decode(payload)
    }
}

fn percent_decode(payload: &str) -> Result<Bytes> {
    let raw = payload.as_bytes();
    let mut out = Vec::with_capacity(raw.len());
    let mut i = 0;

    while i < raw.len() {
        match raw[i] {
            b'%' => {
                let hex = raw
                    .get(i + 1..i + 3)
                    .and_then(|pair| std::str::from_utf8(pair).ok())
                    .and_then(|pair| u8::from_str_radix(pair, 16).ok())
                    .ok_or_else(|| {
                        LoaderError::Decode("invalid percent-encoding in data: URL".to_string())
                    })?;
                out.push(hex);
                i += 3;
            }
            byte => {
                out.push(byte);
                i += 1;
            }
        }
    }

    Ok(Bytes::from(out))
}
