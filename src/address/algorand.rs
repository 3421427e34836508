//! Algorand addresses: base32(key ‖ checksum), 58 characters

use data_encoding::BASE32_NOPAD;

use super::{ensure_curve, ensure_type, AddressService};
use crate::crypto::ed25519;
use crate::crypto::hash::sha512_256;
use crate::error::EngineResult;
use crate::types::{Address, AddressType, Chain, Curve};

pub const ADDRESS_LEN: usize = 58;

#[derive(Debug, Clone, Copy, Default)]
pub struct AlgorandAddressService;

fn checksum(key: &[u8]) -> [u8; 4] {
    let hash = sha512_256(key);
    let mut out = [0u8; 4];
    out.copy_from_slice(&hash[28..]);
    out
}

impl AddressService for AlgorandAddressService {
    fn chain(&self) -> Chain {
        Chain::Algorand
    }

    fn make_address_typed(
        &self,
        public_key: &[u8],
        curve: Curve,
        address_type: AddressType,
    ) -> EngineResult<Address> {
        ensure_curve(Chain::Algorand, curve)?;
        ensure_type(self, address_type)?;
        let key = ed25519::raw_public_key(public_key)?;

        let mut bytes = Vec::with_capacity(36);
        bytes.extend_from_slice(&key);
        bytes.extend_from_slice(&checksum(&key));
        Ok(Address::new(BASE32_NOPAD.encode(&bytes), address_type))
    }

    fn validate(&self, address: &str) -> bool {
        if address.len() != ADDRESS_LEN {
            return false;
        }
        match BASE32_NOPAD.decode(address.as_bytes()) {
            Ok(bytes) if bytes.len() == 36 => checksum(&bytes[..32])[..] == bytes[32..],
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;

    #[test]
    fn test_validate() {
        let service = AlgorandAddressService;
        assert!(service.validate("ZW3ISEHZUHPO7OZGMKLKIIMKVICOUDRCERI454I3DB2BH52HGLSO67W754"));
        assert!(!service.validate("me@google.com"));
        assert!(!service.validate(""));
        assert!(!service.validate("0x6ECa00c52AFC728CDbF42E817d712e175bb23C7d"));
        assert!(!service.validate("ZW3ISEHZUHPO7OZGMKLKIIMKVICOUDRCERI454I3DB2BH52HGLSO67W755"));
    }

    #[test]
    fn test_round_trip() {
        let service = AlgorandAddressService;
        let key = hex::decode("9FE5BB2CC7D83C1DA10845AFD8A34B141FD8FD72500B95B1547E12B9BB8AAC3D")
            .unwrap();
        let address = service.make_address(&key, Curve::Ed25519).unwrap();
        assert_eq!(address.value.len(), ADDRESS_LEN);
        assert!(service.validate(&address.value));
    }

    #[test]
    fn test_rejects_secp256k1() {
        assert!(matches!(
            AlgorandAddressService.make_address(&[2u8; 33], Curve::Secp256k1),
            Err(EngineError::UnsupportedCurve { .. })
        ));
    }
}
