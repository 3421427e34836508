//! XRP Ledger classic addresses

use super::{ensure_curve, ensure_type, AddressService};
use crate::crypto::ed25519::{self, XRP_ED25519_PREFIX};
use crate::crypto::{hash160, secp256k1};
use crate::encoding::base58::{self, Base58Alphabet};
use crate::error::{EngineError, EngineResult};
use crate::types::{Address, AddressType, Chain, Curve};

/// Version byte of an account ID
pub const ACCOUNT_ID_VERSION: u8 = 0x00;

#[derive(Debug, Clone, Copy)]
pub struct XrpAddressService {
    chain: Chain,
}

impl XrpAddressService {
    pub fn new(chain: Chain) -> Self {
        Self { chain }
    }
}

/// 33-byte key as it appears in `SigningPubKey`
pub fn signing_public_key(public_key: &[u8], curve: Curve) -> EngineResult<Vec<u8>> {
    match curve {
        Curve::Secp256k1 => Ok(secp256k1::compress(public_key)?.to_vec()),
        Curve::Ed25519 | Curve::Ed25519Slip0010 => {
            let raw = ed25519::raw_public_key(public_key)?;
            let mut out = Vec::with_capacity(33);
            out.push(XRP_ED25519_PREFIX);
            out.extend_from_slice(&raw);
            Ok(out)
        }
    }
}

pub fn account_id(public_key: &[u8], curve: Curve) -> EngineResult<[u8; 20]> {
    Ok(hash160(&signing_public_key(public_key, curve)?))
}

pub fn encode_account_id(account: &[u8; 20]) -> String {
    let mut payload = Vec::with_capacity(21);
    payload.push(ACCOUNT_ID_VERSION);
    payload.extend_from_slice(account);
    base58::encode_check_with(&payload, Base58Alphabet::Xrp)
}

/// Account ID behind an `r`-address
pub fn decode_account_id(address: &str) -> EngineResult<[u8; 20]> {
    let invalid = |reason: &str| EngineError::invalid_address(format!("{}: {}", address, reason));

    if !address.starts_with('r') {
        return Err(invalid("XRP addresses start with 'r'"));
    }
    if !(25..=35).contains(&address.len()) {
        return Err(invalid("length must be 25 to 35 characters"));
    }
    let payload = base58::decode_check_with(address, Base58Alphabet::Xrp)
        .map_err(|e| invalid(&e.to_string()))?;
    if payload.len() != 21 || payload[0] != ACCOUNT_ID_VERSION {
        return Err(invalid("not an account ID"));
    }
    let mut out = [0u8; 20];
    out.copy_from_slice(&payload[1..]);
    Ok(out)
}

impl AddressService for XrpAddressService {
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
        let account = account_id(public_key, curve)?;
        Ok(Address::new(encode_account_id(&account), address_type))
    }

    fn validate(&self, address: &str) -> bool {
        decode_account_id(address).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secp256k1_address() {
        let service = XrpAddressService::new(Chain::Xrp);
        let key = hex::decode("0241DCD64B5F4A039FC339A16300A833A883B218909F2EBCAF3906651C76842C45")
            .unwrap();
        let address = service.make_address(&key, Curve::Secp256k1).unwrap();
        assert_eq!(address.value, "rJjXGYnKNcbTsnuwoaP9wfDebB8hDX8jdQ");
        assert!(service.validate(&address.value));
    }

    #[test]
    fn test_ed25519_address() {
        let service = XrpAddressService::new(Chain::Xrp);
        let key = hex::decode("9FE5BB2CC7D83C1DA10845AFD8A34B141FD8FD72500B95B1547E12B9BB8AAC3D")
            .unwrap();
        let expected = "rPhmKhkYoMiqC2xqHYhtPLnicWQi85uDf2";
        assert_eq!(service.make_address(&key, Curve::Ed25519).unwrap().value, expected);

        // already-prefixed keys are accepted
        let mut prefixed = vec![0xED];
        prefixed.extend_from_slice(&key);
        assert_eq!(
            service.make_address(&prefixed, Curve::Ed25519Slip0010).unwrap().value,
            expected
        );
    }

    #[test]
    fn test_validation_failures() {
        let service = XrpAddressService::new(Chain::Xrp);
        assert!(!service.validate("xJjXGYnKNcbTsnuwoaP9wfDebB8hDX8jdQ"));
        assert!(!service.validate("rJjXGYnKNcbTsnuwoaP9wfDebB8hDX8jdR"));
        assert!(!service.validate("r123"));
        assert!(!service.validate(""));
    }
}
