//! Fixed-width padding

use crate::error::{EngineError, EngineResult};

/// Zero-pad `bytes` on the left to `width`.
///
/// Input wider than `width` is rejected rather than truncated.
pub fn left_pad(bytes: &[u8], width: usize) -> EngineResult<Vec<u8>> {
    if bytes.len() > width {
        return Err(EngineError::serialization(format!(
            "{} bytes do not fit in a {}-byte field",
            bytes.len(),
            width
        )));
    }
    let mut out = vec![0u8; width - bytes.len()];
    out.extend_from_slice(bytes);
    Ok(out)
}

/// Zero-pad `bytes` on the right to `width`
pub fn right_pad(bytes: &[u8], width: usize) -> EngineResult<Vec<u8>> {
    if bytes.len() > width {
        return Err(EngineError::serialization(format!(
            "{} bytes do not fit in a {}-byte field",
            bytes.len(),
            width
        )));
    }
    let mut out = bytes.to_vec();
    out.resize(width, 0);
    Ok(out)
}

/// Left-pad into a 32-byte word
pub fn word(bytes: &[u8]) -> EngineResult<[u8; 32]> {
    let mut out = [0u8; 32];
    if bytes.len() > 32 {
        return Err(EngineError::serialization(format!(
            "{} bytes do not fit in a 32-byte word",
            bytes.len()
        )));
    }
    out[32 - bytes.len()..].copy_from_slice(bytes);
    Ok(out)
}

/// Round `len` up to the next multiple of 32
pub fn padded_len(len: usize) -> usize {
    len.div_ceil(32) * 32
}
