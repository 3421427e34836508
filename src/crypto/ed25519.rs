//! Ed25519 helpers
//!
//! Used by: XRP (0xED-prefixed keys), Tezos tz1, Algorand.

use ed25519_dalek::{Signature, Signer as _, SigningKey, Verifier as _, VerifyingKey};

use crate::error::{EngineError, EngineResult};

/// Marker byte XRP puts in front of ed25519 public keys
pub const XRP_ED25519_PREFIX: u8 = 0xED;

/// Raw 32-byte key, stripping an XRP `0xED` prefix when present
pub fn raw_public_key(bytes: &[u8]) -> EngineResult<[u8; 32]> {
    let raw = match bytes.len() {
        32 => bytes,
        33 if bytes[0] == XRP_ED25519_PREFIX => &bytes[1..],
        n => {
            return Err(EngineError::invalid_request(format!(
                "ed25519 public key must be 32 bytes, got {}",
                n
            )))
        }
    };
    let mut out = [0u8; 32];
    out.copy_from_slice(raw);
    Ok(out)
}

pub fn public_key_from_private(private_key: &[u8]) -> EngineResult<[u8; 32]> {
    Ok(signing_key(private_key)?.verifying_key().to_bytes())
}

fn signing_key(private_key: &[u8]) -> EngineResult<SigningKey> {
    let secret: [u8; 32] = private_key.try_into().map_err(|_| {
        EngineError::signature(format!(
            "ed25519 private key must be 32 bytes, got {}",
            private_key.len()
        ))
    })?;
    Ok(SigningKey::from_bytes(&secret))
}

pub fn sign(message: &[u8], private_key: &[u8]) -> EngineResult<[u8; 64]> {
    Ok(signing_key(private_key)?.sign(message).to_bytes())
}

pub fn verify(message: &[u8], signature: &[u8], public_key: &[u8]) -> bool {
    let Ok(raw) = raw_public_key(public_key) else {
        return false;
    };
    let Ok(key) = VerifyingKey::from_bytes(&raw) else {
        return false;
    };
    let Ok(sig) = Signature::from_slice(signature) else {
        return false;
    };
    key.verify(message, &sig).is_ok()
}
