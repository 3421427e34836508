//! Curve and signature adapter
//!
//! Thin wrappers over `secp256k1` and `ed25519-dalek`, plus the per-chain
//! signature re-encodings in [`signature`].

pub mod ed25519;
pub mod hash;
pub mod secp256k1;
pub mod signature;

pub use hash::{hash160, keccak256, sha256, sha256d, sha512_half};
pub use signature::{
    recover_recovery_id, to_bitcoin_message_signature, to_der, to_evm_signature, VPolicy,
};

use crate::error::EngineResult;
use crate::types::{Curve, RawSignature};

/// Sign `hash` with a private key.
///
/// The engine itself never holds keys; this exists for software signers and
/// tests. secp256k1 signatures come back as `r ‖ s ‖ recid`.
pub fn sign(hash: &[u8], private_key: &[u8], curve: Curve) -> EngineResult<RawSignature> {
    match curve {
        Curve::Secp256k1 => {
            RawSignature::from_bytes(secp256k1::sign_recoverable(hash, private_key)?.to_vec())
        }
        Curve::Ed25519 | Curve::Ed25519Slip0010 => {
            RawSignature::from_bytes(ed25519::sign(hash, private_key)?.to_vec())
        }
    }
}

pub fn verify(hash: &[u8], signature: &RawSignature, public_key: &[u8], curve: Curve) -> bool {
    match curve {
        Curve::Secp256k1 => secp256k1::verify(hash, &signature.compact(), public_key),
        Curve::Ed25519 | Curve::Ed25519Slip0010 => {
            ed25519::verify(hash, &signature.as_bytes()[..64], public_key)
        }
    }
}

/// Public key for a private key on `curve` (compressed for secp256k1)
pub fn public_key(private_key: &[u8], curve: Curve) -> EngineResult<Vec<u8>> {
    match curve {
        Curve::Secp256k1 => {
            let sk = bitcoin::secp256k1::SecretKey::from_slice(private_key)?;
            Ok(bitcoin::secp256k1::PublicKey::from_secret_key(secp256k1::context(), &sk)
                .serialize()
                .to_vec())
        }
        Curve::Ed25519 | Curve::Ed25519Slip0010 => {
            Ok(ed25519::public_key_from_private(private_key)?.to_vec())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_verify_both_curves() {
        let sk = [0x44u8; 32];
        let hash = [0x55u8; 32];
        for curve in [Curve::Secp256k1, Curve::Ed25519, Curve::Ed25519Slip0010] {
            let pk = public_key(&sk, curve).unwrap();
            let sig = sign(&hash, &sk, curve).unwrap();
            assert!(verify(&hash, &sig, &pk, curve), "{}", curve);
            assert!(!verify(&[0u8; 32], &sig, &pk, curve), "{}", curve);
        }
    }
}
