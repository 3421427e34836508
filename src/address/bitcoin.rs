//! Bitcoin-family addresses (Bitcoin, Litecoin, Dogecoin)
//!
//! Default is native segwit P2WPKH on networks that have a bech32 HRP and
//! P2PKH elsewhere. Legacy P2PKH hashes the key exactly as given, so
//! compressed and uncompressed keys yield different addresses.

use bech32::{u5, FromBase32, ToBase32, Variant};

use super::{ensure_curve, ensure_type, AddressService};
use crate::crypto::{hash160, secp256k1};
use crate::encoding::base58;
use crate::error::{EngineError, EngineResult};
use crate::types::{Address, AddressType, Chain, Curve};

/// Version bytes and HRP of a UTXO network
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UtxoNetwork {
    pub chain: Chain,
    pub p2pkh_prefix: u8,
    pub p2sh_prefix: u8,
    pub bech32_hrp: Option<String>,
}

impl UtxoNetwork {
    pub fn new(chain: Chain, p2pkh_prefix: u8, p2sh_prefix: u8, bech32_hrp: Option<&str>) -> Self {
        Self {
            chain,
            p2pkh_prefix,
            p2sh_prefix,
            bech32_hrp: bech32_hrp.map(str::to_string),
        }
    }

    pub fn bitcoin() -> Self {
        Self::new(Chain::Bitcoin, 0x00, 0x05, Some("bc"))
    }

    pub fn bitcoin_testnet() -> Self {
        Self::new(Chain::BitcoinTestnet, 0x6f, 0xc4, Some("tb"))
    }

    pub fn litecoin() -> Self {
        Self::new(Chain::Litecoin, 0x30, 0x32, Some("ltc"))
    }

    pub fn dogecoin() -> Self {
        Self::new(Chain::Dogecoin, 0x1e, 0x16, None)
    }

    /// Built-in parameters for a UTXO chain
    pub fn for_chain(chain: Chain) -> Option<Self> {
        match chain {
            Chain::Bitcoin => Some(Self::bitcoin()),
            Chain::BitcoinTestnet => Some(Self::bitcoin_testnet()),
            Chain::Litecoin => Some(Self::litecoin()),
            Chain::Dogecoin => Some(Self::dogecoin()),
            _ => None,
        }
    }

    pub fn supports_segwit(&self) -> bool {
        self.bech32_hrp.is_some()
    }

    pub fn p2pkh(&self, pubkey_hash: &[u8; 20]) -> String {
        let mut payload = Vec::with_capacity(21);
        payload.push(self.p2pkh_prefix);
        payload.extend_from_slice(pubkey_hash);
        base58::encode_check(&payload)
    }

    pub fn p2sh(&self, script_hash: &[u8; 20]) -> String {
        let mut payload = Vec::with_capacity(21);
        payload.push(self.p2sh_prefix);
        payload.extend_from_slice(script_hash);
        base58::encode_check(&payload)
    }

    pub fn witness(&self, version: u8, program: &[u8]) -> EngineResult<String> {
        let hrp = self.bech32_hrp.as_deref().ok_or_else(|| {
            EngineError::invalid_request(format!("{} has no segwit addresses", self.chain))
        })?;
        let version = u5::try_from_u8(version)?;
        let variant = if version.to_u8() == 0 {
            Variant::Bech32
        } else {
            Variant::Bech32m
        };
        let mut data = vec![version];
        data.extend(program.to_base32());
        Ok(bech32::encode(hrp, data, variant)?)
    }

    /// Decode any address of this network into its locking template
    pub fn decode(&self, address: &str) -> EngineResult<UtxoDestination> {
        if address.is_empty() {
            return Err(EngineError::invalid_address("empty address"));
        }

        if let Some(hrp) = self.bech32_hrp.as_deref() {
            let prefix = format!("{}1", hrp);
            let has_prefix = address
                .get(..prefix.len())
                .map_or(false, |head| head.eq_ignore_ascii_case(&prefix));
            // all-upper or all-lower only; bech32 rejects mixed case itself
            if has_prefix {
                return self.decode_bech32(address, hrp);
            }
        }

        let payload = base58::decode_check(address)
            .map_err(|e| EngineError::invalid_address(format!("{}: {}", address, e)))?;
        if payload.len() != 21 {
            return Err(EngineError::invalid_address(format!(
                "{}: payload is {} bytes",
                address,
                payload.len()
            )));
        }
        let mut hash = [0u8; 20];
        hash.copy_from_slice(&payload[1..]);
        match payload[0] {
            v if v == self.p2pkh_prefix => Ok(UtxoDestination::P2pkh(hash)),
            v if v == self.p2sh_prefix => Ok(UtxoDestination::P2sh(hash)),
            v => Err(EngineError::invalid_address(format!(
                "{}: version byte 0x{:02x} is not a {} address",
                address, v, self.chain
            ))),
        }
    }

    fn decode_bech32(&self, address: &str, hrp: &str) -> EngineResult<UtxoDestination> {
        let invalid = |reason: &str| EngineError::invalid_address(format!("{}: {}", address, reason));

        let (decoded_hrp, data, variant) =
            bech32::decode(address).map_err(|e| invalid(&e.to_string()))?;
        if decoded_hrp != hrp {
            return Err(invalid("network mismatch"));
        }
        let (version, program) = data.split_first().ok_or_else(|| invalid("empty witness program"))?;
        let version = version.to_u8();
        let program = Vec::<u8>::from_base32(program).map_err(|e| invalid(&e.to_string()))?;

        let expected_variant = if version == 0 {
            Variant::Bech32
        } else {
            Variant::Bech32m
        };
        if variant != expected_variant {
            return Err(invalid("wrong bech32 variant for witness version"));
        }
        let valid_length = match version {
            0 => program.len() == 20 || program.len() == 32,
            1..=16 => (2..=40).contains(&program.len()),
            _ => false,
        };
        if !valid_length {
            return Err(invalid("bad witness program length"));
        }
        Ok(UtxoDestination::Witness { version, program })
    }
}

/// Locking template an address resolves to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UtxoDestination {
    P2pkh([u8; 20]),
    P2sh([u8; 20]),
    Witness { version: u8, program: Vec<u8> },
}

impl UtxoDestination {
    pub fn is_segwit(&self) -> bool {
        matches!(self, UtxoDestination::Witness { .. })
    }
}

impl AddressService for UtxoNetwork {
    fn chain(&self) -> Chain {
        self.chain
    }

    fn address_types(&self) -> &[AddressType] {
        if self.supports_segwit() {
            &[AddressType::Default, AddressType::Legacy, AddressType::Compat]
        } else {
            &[AddressType::Default, AddressType::Legacy]
        }
    }

    fn make_address_typed(
        &self,
        public_key: &[u8],
        curve: Curve,
        address_type: AddressType,
    ) -> EngineResult<Address> {
        ensure_curve(self.chain, curve)?;
        ensure_type(self, address_type)?;
        let key = secp256k1::parse_public_key(public_key)?;

        let value = match (address_type, self.supports_segwit()) {
            (AddressType::Default, true) => self.witness(0, &hash160(&key.serialize()))?,
            (AddressType::Default, false) | (AddressType::Legacy, _) => {
                self.p2pkh(&hash160(public_key))
            }
            (AddressType::Compat, _) => {
                let redeem = crate::serializer::script::p2wpkh(&hash160(&key.serialize()));
                self.p2sh(&hash160(&redeem))
            }
        };
        Ok(Address::new(value, address_type))
    }

    fn validate(&self, address: &str) -> bool {
        self.decode(address).is_ok()
    }
}
