//! Signature adapter
//!
//! Signers hand back raw `r ‖ s` (optionally with a trailing `v`). Each chain
//! wants something different on the wire: EVM needs `r ‖ s ‖ v` with a
//! chain-dependent `v`, Bitcoin scripts need DER, and signed messages need a
//! one-byte header. Everything here enforces low-S.

use serde::{Deserialize, Serialize};

use super::secp256k1;
use crate::error::{EngineError, EngineResult};
use crate::types::RawSignature;

/// Header base for a P2PKH address over an uncompressed key
pub const HEADER_UNCOMPRESSED: u8 = 27;
/// Header base for a P2PKH address over a compressed key
pub const HEADER_COMPRESSED: u8 = 31;
/// Header base for bech32 (segwit) addresses
pub const HEADER_SEGWIT: u8 = 39;

/// How the EVM `v` value is derived from the recovery id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VPolicy {
    /// 27 + recid
    Legacy,
    /// chain_id * 2 + 35 + recid
    Eip155 { chain_id: u64 },
    /// recid, used by typed transactions
    Parity,
}

impl VPolicy {
    /// `v` for a recovery id; EIP-155 values above one byte are not supported
    pub fn v(&self, recovery_id: u8) -> EngineResult<u64> {
        if recovery_id > 1 {
            return Err(EngineError::signature(format!(
                "recovery id {} cannot be encoded as an EVM v",
                recovery_id
            )));
        }
        let v = match self {
            VPolicy::Legacy => 27 + recovery_id as u64,
            VPolicy::Eip155 { chain_id } => chain_id
                .checked_mul(2)
                .and_then(|v| v.checked_add(35 + recovery_id as u64))
                .ok_or_else(|| EngineError::signature(format!("chain id {} too large", chain_id)))?,
            VPolicy::Parity => recovery_id as u64,
        };
        Ok(v)
    }
}

/// Low-S `r ‖ s` together with the recovery id that matches `public_key`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecoveredSignature {
    pub compact: [u8; 64],
    pub recovery_id: u8,
}

impl RecoveredSignature {
    pub fn r(&self) -> &[u8] {
        &self.compact[..32]
    }

    pub fn s(&self) -> &[u8] {
        &self.compact[32..]
    }
}

/// Normalize to low-S and find the recovery id that yields `public_key`.
///
/// A trailing `v` from the signer is ignored; recovery is authoritative.
pub fn recover_recovery_id(
    hash: &[u8],
    raw: &RawSignature,
    public_key: &[u8],
) -> EngineResult<RecoveredSignature> {
    let expected = secp256k1::parse_public_key(public_key)
        .map_err(|e| EngineError::signature(e.to_string()))?;
    let mut compact = raw.compact();
    secp256k1::normalize_s(&mut compact)?;

    for recovery_id in 0..4u8 {
        match secp256k1::recover(hash, &compact, recovery_id) {
            Ok(key) if key == expected => {
                return Ok(RecoveredSignature {
                    compact,
                    recovery_id,
                })
            }
            _ => continue,
        }
    }
    Err(EngineError::signature(
        "signature does not recover to the account public key",
    ))
}

/// `r ‖ s ‖ v` for EVM transactions and messages
pub fn to_evm_signature(
    hash: &[u8],
    raw: &RawSignature,
    public_key: &[u8],
    policy: VPolicy,
) -> EngineResult<(RecoveredSignature, u64)> {
    let recovered = recover_recovery_id(hash, raw, public_key)?;
    let v = policy.v(recovered.recovery_id)?;
    Ok((recovered, v))
}

/// 65-byte `r ‖ s ‖ v`, for policies whose `v` fits in one byte
pub fn to_evm_signature_bytes(
    hash: &[u8],
    raw: &RawSignature,
    public_key: &[u8],
    policy: VPolicy,
) -> EngineResult<[u8; 65]> {
    let (recovered, v) = to_evm_signature(hash, raw, public_key, policy)?;
    let v = u8::try_from(v)
        .map_err(|_| EngineError::signature(format!("v value {} does not fit in one byte", v)))?;
    let mut out = [0u8; 65];
    out[..64].copy_from_slice(&recovered.compact);
    out[64] = v;
    Ok(out)
}

/// Strict DER encoding of `(r, s)` with low-S
pub fn to_der(raw: &RawSignature) -> EngineResult<Vec<u8>> {
    let mut sig = bitcoin::secp256k1::ecdsa::Signature::from_compact(&raw.compact())?;
    sig.normalize_s();
    Ok(sig.serialize_der().to_vec())
}

/// Header byte base for an address style
pub fn message_header_base(public_key: &[u8], address: &str) -> u8 {
    if is_bech32_address(address) {
        HEADER_SEGWIT
    } else if secp256k1::is_compressed(public_key) {
        HEADER_COMPRESSED
    } else {
        HEADER_UNCOMPRESSED
    }
}

fn is_bech32_address(address: &str) -> bool {
    bech32::decode(address).is_ok()
}

/// `header ‖ r ‖ s` for a Bitcoin signed message.
///
/// A 65-byte raw signature must carry `v` in 27..=30; a 64-byte one has its
/// recovery id found by public-key recovery.
pub fn to_bitcoin_message_signature(
    raw: &RawSignature,
    hash: &[u8],
    public_key: &[u8],
    address: &str,
) -> EngineResult<[u8; 65]> {
    let (compact, recovery_id) = match raw.v() {
        Some(v) => {
            if !(27..=30).contains(&v) {
                return Err(EngineError::signature(format!(
                    "v must be in 27..=30, got {}",
                    v
                )));
            }
            (raw.compact(), v - 27)
        }
        None => {
            let recovered = recover_recovery_id(hash, raw, public_key)?;
            (recovered.compact, recovered.recovery_id)
        }
    };

    let mut out = [0u8; 65];
    out[0] = message_header_base(public_key, address) + recovery_id;
    out[1..].copy_from_slice(&compact);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::hash::bitcoin_message_hash;
    use crate::crypto::secp256k1;
    use bitcoin::secp256k1::{PublicKey, SecretKey};

    fn keypair(seed: u8) -> ([u8; 32], PublicKey) {
        let sk = [seed; 32];
        let secret = SecretKey::from_slice(&sk).unwrap();
        (sk, PublicKey::from_secret_key(secp256k1::context(), &secret))
    }

    #[test]
    fn test_v_policies() {
        assert_eq!(VPolicy::Legacy.v(1).unwrap(), 28);
        assert_eq!(VPolicy::Eip155 { chain_id: 1 }.v(0).unwrap(), 37);
        assert_eq!(VPolicy::Eip155 { chain_id: 137 }.v(1).unwrap(), 310);
        assert_eq!(VPolicy::Parity.v(1).unwrap(), 1);
        assert!(VPolicy::Parity.v(2).is_err());
    }

    #[test]
    fn test_recovery_matches_key() {
        let (sk, pk) = keypair(0x31);
        let hash = [0x42u8; 32];
        let sig = secp256k1::sign_recoverable(&hash, &sk).unwrap();
        let raw = RawSignature::from_bytes(sig[..64].to_vec()).unwrap();

        let recovered = recover_recovery_id(&hash, &raw, &pk.serialize_uncompressed()).unwrap();
        assert_eq!(recovered.recovery_id, sig[64]);

        let (_, other_pk) = keypair(0x32);
        assert!(matches!(
            recover_recovery_id(&hash, &raw, &other_pk.serialize()),
            Err(EngineError::Signature(_))
        ));
    }

    #[test]
    fn test_der_is_low_s() {
        let mut compact = [0u8; 64];
        hex::decode_to_slice(
            "F408C40F8D8B4A40E35502355C87FBBF218EC9ECB036D42DAA6211EAD4498A6FBC800E82CB2CC0FAB1D68FD3F8E895EC3E0DCB5A05342F5153210142E4224D4C",
            &mut compact,
        )
        .unwrap();
        let der = to_der(&RawSignature::from_bytes(compact.to_vec()).unwrap()).unwrap();
        assert_eq!(der[0], 0x30);
        let hex = hex::encode_upper(&der);
        assert!(hex.ends_with("437FF17D34D33F054E29702C07176A127CA1118CAA1470EA6CB15D49EC13F3F5"));
    }

    #[test]
    fn test_message_header_bases() {
        let (_, pk) = keypair(0x05);
        let compressed = pk.serialize();
        let uncompressed = pk.serialize_uncompressed();

        assert_eq!(
            message_header_base(&compressed, "bc1qc2zwqqucrqvvtyxfn78ajm8w2sgyjf5edc40am"),
            39
        );
        assert_eq!(message_header_base(&compressed, "1JjXGY5KEcbT35uAo6P9A7DebBn4DXnjdQ"), 31);
        assert_eq!(
            message_header_base(&uncompressed, "1HTBz4DRWpDET1QNMqsWKJ39WyWcwPWexK"),
            27
        );
    }

    #[test]
    fn test_bitcoin_message_signature_with_v() {
        let (sk, pk) = keypair(0x09);
        let hash = bitcoin_message_hash(b"hello");
        let sig = secp256k1::sign_recoverable(&hash, &sk).unwrap();

        let mut with_v = sig[..64].to_vec();
        with_v.push(27 + sig[64]);
        let raw = RawSignature::from_bytes(with_v).unwrap();

        let out = to_bitcoin_message_signature(
            &raw,
            &hash,
            &pk.serialize(),
            "1JjXGY5KEcbT35uAo6P9A7DebBn4DXnjdQ",
        )
        .unwrap();
        assert_eq!(out[0], 31 + sig[64]);
        assert_eq!(&out[1..], &sig[..64]);
    }

    #[test]
    fn test_bitcoin_message_signature_rejects_bad_v() {
        let mut bytes = vec![1u8; 64];
        bytes.push(31);
        let raw = RawSignature::from_bytes(bytes).unwrap();
        assert!(matches!(
            to_bitcoin_message_signature(&raw, &[0u8; 32], &[2u8; 33], "1abc"),
            Err(EngineError::Signature(_))
        ));
    }
}
