//! EVM addresses with EIP-55 checksums

use super::{ensure_curve, ensure_type, AddressService};
use crate::crypto::{keccak256, secp256k1};
use crate::error::{EngineError, EngineResult};
use crate::types::{Address, AddressType, Chain, Curve};

/// Address service shared by every EVM chain
#[derive(Debug, Clone, Copy)]
pub struct EthereumAddressService {
    chain: Chain,
}

impl EthereumAddressService {
    pub fn new(chain: Chain) -> Self {
        Self { chain }
    }
}

/// Last 20 bytes of keccak256 over the uncompressed key (without 0x04)
pub fn address_bytes(public_key: &[u8]) -> EngineResult<[u8; 20]> {
    let full = secp256k1::decompress(public_key)?;
    let hash = keccak256(&full[1..]);
    let mut out = [0u8; 20];
    out.copy_from_slice(&hash[12..]);
    Ok(out)
}

/// Convert raw address bytes to checksummed Ethereum address
pub fn to_checksum_address(address: &[u8; 20]) -> String {
    let lower = hex::encode(address);
    let hash = keccak256(lower.as_bytes());

    let mut result = String::from("0x");
    for (i, ch) in lower.chars().enumerate() {
        let byte = hash[i / 2];
        let nibble = if i % 2 == 0 { byte >> 4 } else { byte & 0x0f };

        if ch.is_ascii_digit() || nibble < 8 {
            result.push(ch);
        } else {
            result.push(ch.to_ascii_uppercase());
        }
    }

    result
}

/// Parse a `0x`-prefixed address, enforcing the checksum on mixed case
pub fn parse_address(address: &str) -> EngineResult<[u8; 20]> {
    let body = address
        .strip_prefix("0x")
        .ok_or_else(|| EngineError::invalid_address(format!("{}: missing 0x prefix", address)))?;
    if body.len() != 40 || !body.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(EngineError::invalid_address(format!(
            "{}: expected 40 hex characters",
            address
        )));
    }

    let mut bytes = [0u8; 20];
    hex::decode_to_slice(body, &mut bytes)?;

    let has_lower = body.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = body.chars().any(|c| c.is_ascii_uppercase());
    if has_lower && has_upper && to_checksum_address(&bytes) != address {
        return Err(EngineError::invalid_address(format!(
            "{}: EIP-55 checksum mismatch",
            address
        )));
    }
    Ok(bytes)
}

impl AddressService for EthereumAddressService {
    fn chain(&self) -> Chain {
        self.chain
    }

    fn make_address_typed(
        &self,
        public_key: &[u8],
        curve: Curve,
        address_type: AddressType,
    ) -> EngineResult<Address> {
        ensure_curve(self.chain, curve)?;
        ensure_type(self, address_type)?;
        let bytes = address_bytes(public_key)?;
        Ok(Address::new(to_checksum_address(&bytes), address_type))
    }

    fn validate(&self, address: &str) -> bool {
        parse_address(address).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_make_address_from_compressed_key() {
        let service = EthereumAddressService::new(Chain::Ethereum);
        let key = hex::decode("0241DCD64B5F4A039FC339A16300A833A883B218909F2EBCAF3906651C76842C45")
            .unwrap();
        let address = service.make_address(&key, Curve::Secp256k1).unwrap();
        assert_eq!(address.value, "0x6ECa00c52AFC728CDbF42E817d712e175bb23C7d");
        assert!(service.validate(&address.value));
    }

    #[test]
    fn test_make_address_from_uncompressed_key() {
        let service = EthereumAddressService::new(Chain::Polygon);
        let key = hex::decode("04BAEC8CD3BA50FDFE1E8CF2B04B58E17041245341CD1F1C6B3A496B48956DB4C896A6848BCF8FCFC33B88341507DD25E5F4609386C68086C74CF472B86E5C3820").unwrap();
        assert_eq!(
            service.make_address(&key, Curve::Secp256k1).unwrap().value,
            "0xc63763572D45171e4C25cA0818b44E5Dd7F5c15B"
        );
    }

    #[test]
    fn test_checksum_validation() {
        let service = EthereumAddressService::new(Chain::Ethereum);
        assert!(service.validate("0x6eca00c52afc728cdbf42e817d712e175bb23c7d"));
        assert!(service.validate("0x6ECA00C52AFC728CDBF42E817D712E175BB23C7D"));
        assert!(!service.validate("0x6eCa00c52AFC728CDbF42E817d712e175bb23C7d"));
        assert!(!service.validate("6eca00c52afc728cdbf42e817d712e175bb23c7d"));
        assert!(!service.validate("0x6eca00c52afc728cdbf42e817d712e175bb23c"));
    }

    #[test]
    fn test_rejects_ed25519() {
        let service = EthereumAddressService::new(Chain::Ethereum);
        assert!(matches!(
            service.make_address(&[1u8; 32], Curve::Ed25519),
            Err(EngineError::UnsupportedCurve { .. })
        ));
    }
}
