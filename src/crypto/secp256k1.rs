//! secp256k1 helpers
//!
//! Used by: Bitcoin, Litecoin, Dogecoin, every EVM chain, XRP and Tezos tz2.

use bitcoin::secp256k1::ecdsa::{RecoverableSignature, RecoveryId, Signature};
use bitcoin::secp256k1::{All, Message, PublicKey, Secp256k1, SecretKey};
use std::sync::OnceLock;

use crate::error::{EngineError, EngineResult};

/// Order of the curve divided by two, big-endian
pub const HALF_ORDER: [u8; 32] = [
    0x7f, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
    0x5d, 0x57, 0x6e, 0x73, 0x57, 0xa4, 0x50, 0x1d, 0xdf, 0xe9, 0x2f, 0x46, 0x68, 0x1b, 0x20, 0xa0,
];

pub(crate) fn context() -> &'static Secp256k1<All> {
    static CONTEXT: OnceLock<Secp256k1<All>> = OnceLock::new();
    CONTEXT.get_or_init(Secp256k1::new)
}

/// Parse a 33-byte compressed or 65-byte uncompressed key
pub fn parse_public_key(bytes: &[u8]) -> EngineResult<PublicKey> {
    if bytes.len() != 33 && bytes.len() != 65 {
        return Err(EngineError::invalid_request(format!(
            "secp256k1 public key must be 33 or 65 bytes, got {}",
            bytes.len()
        )));
    }
    PublicKey::from_slice(bytes)
        .map_err(|e| EngineError::invalid_request(format!("invalid secp256k1 public key: {}", e)))
}

pub fn compress(bytes: &[u8]) -> EngineResult<[u8; 33]> {
    Ok(parse_public_key(bytes)?.serialize())
}

pub fn decompress(bytes: &[u8]) -> EngineResult<[u8; 65]> {
    Ok(parse_public_key(bytes)?.serialize_uncompressed())
}

pub fn is_compressed(bytes: &[u8]) -> bool {
    bytes.len() == 33
}

fn message(hash: &[u8]) -> EngineResult<Message> {
    Message::from_digest_slice(hash)
        .map_err(|_| EngineError::signature(format!("expected a 32-byte digest, got {}", hash.len())))
}

/// Sign a 32-byte digest, returning `r ‖ s ‖ recid`
pub fn sign_recoverable(hash: &[u8], private_key: &[u8]) -> EngineResult<[u8; 65]> {
    let sk = SecretKey::from_slice(private_key)
        .map_err(|e| EngineError::signature(format!("invalid secp256k1 private key: {}", e)))?;
    let sig = context().sign_ecdsa_recoverable(&message(hash)?, &sk);
    let (recovery_id, compact) = sig.serialize_compact();

    let mut out = [0u8; 65];
    out[..64].copy_from_slice(&compact);
    out[64] = recovery_id.to_i32() as u8;
    Ok(out)
}

pub fn verify(hash: &[u8], compact: &[u8], public_key: &[u8]) -> bool {
    let (Ok(msg), Ok(sig), Ok(pk)) = (
        message(hash),
        Signature::from_compact(compact),
        parse_public_key(public_key),
    ) else {
        return false;
    };
    let mut sig = sig;
    sig.normalize_s();
    context().verify_ecdsa(&msg, &sig, &pk).is_ok()
}

/// Recover the signing key of `r ‖ s` under `recovery_id`
pub fn recover(hash: &[u8], compact: &[u8; 64], recovery_id: u8) -> EngineResult<PublicKey> {
    let rec_id = RecoveryId::from_i32(recovery_id as i32)
        .map_err(|_| EngineError::signature(format!("recovery id {} out of range", recovery_id)))?;
    let sig = RecoverableSignature::from_compact(compact, rec_id)?;
    Ok(context().recover_ecdsa(&message(hash)?, &sig)?)
}

/// Whether `s` is in the upper half of the curve order
pub fn is_high_s(s: &[u8; 32]) -> bool {
    s[..] > HALF_ORDER[..]
}

/// Replace a high `s` with `n - s`; returns whether it flipped
pub fn normalize_s(compact: &mut [u8; 64]) -> EngineResult<bool> {
    let mut s = [0u8; 32];
    s.copy_from_slice(&compact[32..]);
    if !is_high_s(&s) {
        return Ok(false);
    }
    let mut sig = Signature::from_compact(compact)?;
    sig.normalize_s();
    compact.copy_from_slice(&sig.serialize_compact());
    Ok(true)
}
