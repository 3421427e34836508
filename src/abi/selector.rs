//! Function selectors

use crate::crypto::hash::keccak256;

/// First 4 bytes of keccak256 of a canonical signature
pub fn selector_from_signature(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// `0x`-prefixed selector
pub fn selector_hex(signature: &str) -> String {
    crate::encoding::hex::encode_prefixed(selector_from_signature(signature))
}

/// ERC-20 selectors
pub struct KnownSelectors;

impl KnownSelectors {
    pub const TRANSFER: [u8; 4] = [0xa9, 0x05, 0x9c, 0xbb]; // transfer(address,uint256)
    pub const APPROVE: [u8; 4] = [0x09, 0x5e, 0xa7, 0xb3]; // approve(address,uint256)
    pub const BALANCE_OF: [u8; 4] = [0x70, 0xa0, 0x82, 0x31]; // balanceOf(address)
    pub const ALLOWANCE: [u8; 4] = [0xdd, 0x62, 0xed, 0x3e]; // allowance(address,address)

    /// Signature for a known selector
    pub fn identify(selector: &[u8; 4]) -> Option<&'static str> {
        match *selector {
            Self::TRANSFER => Some("transfer(address,uint256)"),
            Self::APPROVE => Some("approve(address,uint256)"),
            Self::BALANCE_OF => Some("balanceOf(address)"),
            Self::ALLOWANCE => Some("allowance(address,address)"),
            _ => None,
        }
    }
}
