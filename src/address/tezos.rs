//! Tezos implicit accounts (tz1, tz2)

use super::{ensure_curve, ensure_type, AddressService};
use crate::crypto::hash::blake2b_160;
use crate::crypto::{ed25519, secp256k1};
use crate::encoding::base58;
use crate::error::EngineResult;
use crate::types::{Address, AddressType, Chain, Curve};

const TZ1_PREFIX: [u8; 3] = [6, 161, 159];
const TZ2_PREFIX: [u8; 3] = [6, 161, 161];
const TZ3_PREFIX: [u8; 3] = [6, 161, 164];

#[derive(Debug, Clone, Copy, Default)]
pub struct TezosAddressService;

impl AddressService for TezosAddressService {
    fn chain(&self) -> Chain {
        Chain::Tezos
    }

    fn make_address_typed(
        &self,
        public_key: &[u8],
        curve: Curve,
        address_type: AddressType,
    ) -> EngineResult<Address> {
        ensure_curve(Chain::Tezos, curve)?;
        ensure_type(self, address_type)?;

        let (prefix, hash) = match curve {
            Curve::Secp256k1 => (TZ2_PREFIX, blake2b_160(&secp256k1::compress(public_key)?)),
            Curve::Ed25519 | Curve::Ed25519Slip0010 => {
                (TZ1_PREFIX, blake2b_160(&ed25519::raw_public_key(public_key)?))
            }
        };

        let mut payload = Vec::with_capacity(23);
        payload.extend_from_slice(&prefix);
        payload.extend_from_slice(&hash);
        Ok(Address::new(base58::encode_check(&payload), address_type))
    }

    fn validate(&self, address: &str) -> bool {
        match base58::decode_check(address) {
            Ok(payload) if payload.len() == 23 => {
                [TZ1_PREFIX, TZ2_PREFIX, TZ3_PREFIX].contains(&[payload[0], payload[1], payload[2]])
            }
            _ => false,
        }
    }
}
