//! Base58 and Base58Check
//!
//! Thin layer over `bs58` that fixes the engine's edge-case semantics:
//! empty or whitespace-only input decodes to no bytes, and an invalid
//! character is a typed `Decode` error. [`decode_lenient`] keeps the
//! older "empty on failure" behaviour for callers that want it.

use bitcoin::hashes::{sha256d, Hash};

use crate::error::{EngineError, EngineResult};

/// Length of the Base58Check checksum
pub const CHECKSUM_LEN: usize = 4;

/// Alphabet used for a Base58 string
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Base58Alphabet {
    #[default]
    Bitcoin,
    Xrp,
}

impl Base58Alphabet {
    fn inner(self) -> &'static bs58::Alphabet {
        match self {
            Base58Alphabet::Bitcoin => bs58::Alphabet::BITCOIN,
            Base58Alphabet::Xrp => bs58::Alphabet::RIPPLE,
        }
    }
}

pub fn encode(bytes: &[u8]) -> String {
    encode_with(bytes, Base58Alphabet::Bitcoin)
}

pub fn encode_with(bytes: &[u8], alphabet: Base58Alphabet) -> String {
    bs58::encode(bytes)
        .with_alphabet(alphabet.inner())
        .into_string()
}

pub fn decode(text: &str) -> EngineResult<Vec<u8>> {
    decode_with(text, Base58Alphabet::Bitcoin)
}

pub fn decode_with(text: &str, alphabet: Base58Alphabet) -> EngineResult<Vec<u8>> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(Vec::new());
    }
    Ok(bs58::decode(text)
        .with_alphabet(alphabet.inner())
        .into_vec()?)
}

/// Decode, returning empty bytes on any invalid character
pub fn decode_lenient(text: &str) -> Vec<u8> {
    decode(text).unwrap_or_default()
}

/// First four bytes of double SHA-256
pub fn checksum(data: &[u8]) -> [u8; CHECKSUM_LEN] {
    let hash = sha256d::Hash::hash(data);
    let mut out = [0u8; CHECKSUM_LEN];
    out.copy_from_slice(&hash[..CHECKSUM_LEN]);
    out
}

pub fn encode_check(payload: &[u8]) -> String {
    encode_check_with(payload, Base58Alphabet::Bitcoin)
}

pub fn encode_check_with(payload: &[u8], alphabet: Base58Alphabet) -> String {
    let mut data = Vec::with_capacity(payload.len() + CHECKSUM_LEN);
    data.extend_from_slice(payload);
    data.extend_from_slice(&checksum(payload));
    encode_with(&data, alphabet)
}

pub fn decode_check(text: &str) -> EngineResult<Vec<u8>> {
    decode_check_with(text, Base58Alphabet::Bitcoin)
}

/// Decode and verify the trailing checksum, returning the payload
pub fn decode_check_with(text: &str, alphabet: Base58Alphabet) -> EngineResult<Vec<u8>> {
    let mut data = decode_with(text, alphabet)?;
    if data.len() < CHECKSUM_LEN {
        return Err(EngineError::decode(format!(
            "base58check payload too short: {} bytes",
            data.len()
        )));
    }
    let split = data.len() - CHECKSUM_LEN;
    if checksum(&data[..split]) != data[split..] {
        return Err(EngineError::decode("base58check checksum mismatch"));
    }
    data.truncate(split);
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leading_zeros() {
        assert_eq!(encode(&[0, 0, 1]), "112");
        assert_eq!(decode("112").unwrap(), vec![0, 0, 1]);
        assert_eq!(encode(&[0]), "1");
    }

    #[test]
    fn test_empty_and_whitespace() {
        assert_eq!(encode(&[]), "");
        assert_eq!(decode("").unwrap(), Vec::<u8>::new());
        assert_eq!(decode("   \n").unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn test_invalid_character() {
        // 0, O, I and l are not in the alphabet
        assert!(matches!(decode("0OIl"), Err(EngineError::Decode(_))));
        assert!(decode_lenient("0OIl").is_empty());
        assert_eq!(decode_lenient("112"), vec![0, 0, 1]);
    }

    #[test]
    fn test_known_vector() {
        assert_eq!(encode(b"hello world"), "StV1DL6CwTryKyV");
        assert_eq!(decode("StV1DL6CwTryKyV").unwrap(), b"hello world");
    }

    #[test]
    fn test_check_round_trip_and_tamper() {
        let payload = [0x00, 0x01, 0x02, 0x03];
        let text = encode_check(&payload);
        assert_eq!(decode_check(&text).unwrap(), payload);

        let mut tampered: Vec<char> = text.chars().collect();
        let last = tampered.len() - 1;
        tampered[last] = if tampered[last] == '2' { '3' } else { '2' };
        let tampered: String = tampered.into_iter().collect();
        assert!(decode_check(&tampered).is_err());
    }

    #[test]
    fn test_xrp_alphabet() {
        // Leading zero maps to 'r' in the XRP alphabet
        let text = encode_check_with(&[0u8; 21], Base58Alphabet::Xrp);
        assert!(text.starts_with('r'));
        assert_eq!(
            decode_check_with(&text, Base58Alphabet::Xrp).unwrap(),
            vec![0u8; 21]
        );
    }
}
