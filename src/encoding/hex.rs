//! Hex helpers with optional `0x` handling

use crate::error::{EngineError, EngineResult};

/// Lowercase hex without prefix
pub fn encode(bytes: impl AsRef<[u8]>) -> String {
    ::hex::encode(bytes)
}

/// Lowercase hex with a `0x` prefix
pub fn encode_prefixed(bytes: impl AsRef<[u8]>) -> String {
    format!("0x{}", ::hex::encode(bytes))
}

/// Strip an optional `0x`/`0X` prefix
pub fn strip_prefix(s: &str) -> &str {
    s.strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s)
}

/// Decode hex, accepting an optional `0x` prefix.
///
/// Odd-length or non-hex input is a `Decode` error.
pub fn decode(s: &str) -> EngineResult<Vec<u8>> {
    let body = strip_prefix(s.trim());
    if body.len() % 2 != 0 {
        return Err(EngineError::decode(format!(
            "hex string has odd length {}",
            body.len()
        )));
    }
    Ok(::hex::decode(body)?)
}

/// Decode hex into a fixed-size array
pub fn decode_array<const N: usize>(s: &str) -> EngineResult<[u8; N]> {
    let bytes = decode(s)?;
    bytes.try_into().map_err(|v: Vec<u8>| {
        EngineError::decode(format!("expected {} bytes, got {}", N, v.len()))
    })
}
