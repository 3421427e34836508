//! Hash functions used across chains

use bitcoin::hashes::{hash160, sha256, sha256d, Hash};
use blake2::digest::consts::U20;
use blake2::{Blake2b, Digest};
use sha2::{Sha512, Sha512_256};
use tiny_keccak::{Hasher, Keccak};

/// Prefix of the Bitcoin signed-message digest
pub const BITCOIN_MESSAGE_MAGIC: &[u8] = b"\x18Bitcoin Signed Message:\n";

pub fn sha256(data: &[u8]) -> [u8; 32] {
    sha256::Hash::hash(data).to_byte_array()
}

pub fn sha256d(data: &[u8]) -> [u8; 32] {
    sha256d::Hash::hash(data).to_byte_array()
}

/// RIPEMD-160 of SHA-256
pub fn hash160(data: &[u8]) -> [u8; 20] {
    hash160::Hash::hash(data).to_byte_array()
}

/// Keccak256 hash (Ethereum flavour, not SHA3)
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak::v256();
    hasher.update(data);
    let mut out = [0u8; 32];
    hasher.finalize(&mut out);
    out
}

/// First 32 bytes of SHA-512
pub fn sha512_half(data: &[u8]) -> [u8; 32] {
    let digest = Sha512::digest(data);
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest[..32]);
    out
}

pub fn sha512_256(data: &[u8]) -> [u8; 32] {
    Sha512_256::digest(data).into()
}

pub fn blake2b_160(data: &[u8]) -> [u8; 20] {
    let mut hasher = Blake2b::<U20>::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Bitcoin message digest: `sha256d(magic ‖ varint(len) ‖ message)`
pub fn bitcoin_message_hash(message: &[u8]) -> [u8; 32] {
    let mut data = Vec::with_capacity(BITCOIN_MESSAGE_MAGIC.len() + 9 + message.len());
    data.extend_from_slice(BITCOIN_MESSAGE_MAGIC);
    crate::serializer::utxo::write_compact_size(&mut data, message.len() as u64);
    data.extend_from_slice(message);
    sha256d(&data)
}
