//! Chain → address service lookup

use std::collections::HashMap;

use super::{
    AddressService, AlgorandAddressService, EthereumAddressService, TezosAddressService,
    UtxoNetwork, XrpAddressService,
};
use crate::error::{EngineError, EngineResult};
use crate::types::{Address, AddressType, Chain, ChainFamily, PublicKeyMaterial};

/// Address services keyed by chain, built once at startup
pub struct AddressRegistry {
    services: HashMap<Chain, Box<dyn AddressService>>,
}

impl AddressRegistry {
    pub fn empty() -> Self {
        Self {
            services: HashMap::new(),
        }
    }

    /// Registry with the built-in parameters for every chain
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        for chain in Chain::ALL {
            registry.register(default_service(chain));
        }
        registry
    }

    /// Replace the service for `service.chain()`
    pub fn register(&mut self, service: Box<dyn AddressService>) {
        self.services.insert(service.chain(), service);
    }

    pub fn get(&self, chain: Chain) -> EngineResult<&dyn AddressService> {
        self.services
            .get(&chain)
            .map(|s| s.as_ref())
            .ok_or_else(|| EngineError::invalid_request(format!("no address service for {}", chain)))
    }

    pub fn make_address(
        &self,
        chain: Chain,
        key: &PublicKeyMaterial,
        address_type: AddressType,
    ) -> EngineResult<Address> {
        self.get(chain)?
            .make_address_typed(key.signing_key(), key.curve, address_type)
    }

    pub fn validate(&self, chain: Chain, address: &str) -> bool {
        self.get(chain)
            .map(|service| service.validate(address))
            .unwrap_or(false)
    }

    /// Validate or fail with `InvalidAddress`
    pub fn require_valid(&self, chain: Chain, address: &str) -> EngineResult<()> {
        if self.get(chain)?.validate(address) {
            Ok(())
        } else {
            Err(EngineError::invalid_address(format!(
                "{} is not a valid {} address",
                address, chain
            )))
        }
    }

    pub fn chains(&self) -> impl Iterator<Item = Chain> + '_ {
        self.services.keys().copied()
    }
}

impl Default for AddressRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

fn default_service(chain: Chain) -> Box<dyn AddressService> {
    match chain.family() {
        ChainFamily::Utxo => match UtxoNetwork::for_chain(chain) {
            Some(network) => Box::new(network),
            None => Box::new(UtxoNetwork::bitcoin()),
        },
        ChainFamily::Evm => Box::new(EthereumAddressService::new(chain)),
        ChainFamily::LedgerAccount => Box::new(XrpAddressService::new(chain)),
        ChainFamily::Tezos => Box::new(TezosAddressService),
        ChainFamily::Algorand => Box::new(AlgorandAddressService),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Curve;

    #[test]
    fn test_every_chain_registered() {
        let registry = AddressRegistry::with_defaults();
        for chain in Chain::ALL {
            assert_eq!(registry.get(chain).unwrap().chain(), chain);
        }
    }

    #[test]
    fn test_make_address_uses_derived_key() {
        let registry = AddressRegistry::default();
        let seed = hex::decode("0241DCD64B5F4A039FC339A16300A833A883B218909F2EBCAF3906651C76842C45")
            .unwrap();
        let key = PublicKeyMaterial::new(vec![0u8; 33], Curve::Secp256k1)
            .with_derived(seed, "m/44'/60'/0'/0/0");

        let address = registry
            .make_address(Chain::Ethereum, &key, AddressType::Default)
            .unwrap();
        assert_eq!(address.value, "0x6ECa00c52AFC728CDbF42E817d712e175bb23C7d");
    }

    #[test]
    fn test_require_valid() {
        let registry = AddressRegistry::default();
        assert!(registry
            .require_valid(Chain::Xrp, "rPhmKhkYoMiqC2xqHYhtPLnicWQi85uDf2")
            .is_ok());
        assert!(matches!(
            registry.require_valid(Chain::Xrp, "0x6ECa00c52AFC728CDbF42E817d712e175bb23C7d"),
            Err(EngineError::InvalidAddress(_))
        ));
    }

    #[test]
    fn test_empty_registry() {
        let registry = AddressRegistry::empty();
        assert!(registry.get(Chain::Bitcoin).is_err());
        assert!(!registry.validate(Chain::Bitcoin, "1JjXGY5KEcbT35uAo6P9A7DebBn4DXnjdQ"));
    }
}
