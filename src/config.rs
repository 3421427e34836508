//! Engine configuration
//!
//! Per-network parameters and UTXO selection policy, loaded from JSON or
//! taken from the built-in defaults.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

use crate::address::{AddressRegistry, UtxoNetwork};
use crate::builder::selection::{SelectionLimits, DEFAULT_MAX_INPUTS, DEFAULT_MAX_TRIES};
use crate::error::{EngineError, EngineResult};
use crate::fees::FeeTier;
use crate::serializer::utxo::DEFAULT_SEQUENCE;
use crate::types::{Chain, ChainFamily};

/// Parameters of one network
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkParams {
    pub chain: Chain,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub p2pkh_prefix: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub p2sh_prefix: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bech32_hrp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<u64>,
    /// Sign XRP payloads with the test-network prefix
    #[serde(default)]
    pub xrp_test_network: bool,
    pub decimals: u32,
    pub symbol: String,
    /// Network-wide dust floor in minor units
    #[serde(default)]
    pub dust_threshold: u64,
}

impl NetworkParams {
    /// Built-in parameters for `chain`
    pub fn builtin(chain: Chain) -> Self {
        let utxo = UtxoNetwork::for_chain(chain);
        Self {
            chain,
            p2pkh_prefix: utxo.as_ref().map(|n| n.p2pkh_prefix),
            p2sh_prefix: utxo.as_ref().map(|n| n.p2sh_prefix),
            bech32_hrp: utxo.and_then(|n| n.bech32_hrp),
            chain_id: chain.chain_id(),
            xrp_test_network: chain == Chain::XrpTestnet,
            decimals: chain.decimals(),
            symbol: chain.symbol().to_string(),
            dust_threshold: 0,
        }
    }

    /// Address parameters for a UTXO chain
    pub fn utxo_network(&self) -> EngineResult<UtxoNetwork> {
        match (self.p2pkh_prefix, self.p2sh_prefix) {
            (Some(p2pkh), Some(p2sh)) => Ok(UtxoNetwork::new(
                self.chain,
                p2pkh,
                p2sh,
                self.bech32_hrp.as_deref(),
            )),
            _ => Err(EngineError::config(format!(
                "{} has no address prefixes",
                self.chain
            ))),
        }
    }
}

/// Coin selection and input defaults for UTXO chains
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtxoPolicy {
    pub max_inputs: usize,
    pub max_selection_tries: usize,
    pub default_sequence: u32,
}

impl Default for UtxoPolicy {
    fn default() -> Self {
        Self {
            max_inputs: DEFAULT_MAX_INPUTS,
            max_selection_tries: DEFAULT_MAX_TRIES,
            default_sequence: DEFAULT_SEQUENCE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub networks: Vec<NetworkParams>,
    #[serde(default)]
    pub default_tier: FeeTier,
    #[serde(default)]
    pub utxo: UtxoPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            networks: Chain::ALL.iter().map(|c| NetworkParams::builtin(*c)).collect(),
            default_tier: FeeTier::default(),
            utxo: UtxoPolicy::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> EngineResult<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| EngineError::config(format!("invalid configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> EngineResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| EngineError::config(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> EngineResult<()> {
        let mut seen = HashSet::new();
        for network in &self.networks {
            if !seen.insert(network.chain) {
                return Err(EngineError::config(format!(
                    "{} is configured twice",
                    network.chain
                )));
            }
            if network.chain_id == Some(0) {
                return Err(EngineError::config(format!(
                    "{} has chain id 0",
                    network.chain
                )));
            }
            if network.chain.is_evm() && network.chain_id.is_none() {
                return Err(EngineError::config(format!(
                    "{} needs a chain id",
                    network.chain
                )));
            }
            if matches!(network.bech32_hrp.as_deref(), Some(hrp) if hrp.trim().is_empty()) {
                return Err(EngineError::config(format!(
                    "{} has an empty bech32 HRP",
                    network.chain
                )));
            }
            if network.chain.is_utxo() {
                network.utxo_network()?;
            }
        }
        if self.utxo.max_inputs == 0 || self.utxo.max_selection_tries == 0 {
            return Err(EngineError::config(
                "UTXO selection limits must be greater than zero",
            ));
        }
        Ok(())
    }

    pub fn network(&self, chain: Chain) -> EngineResult<&NetworkParams> {
        self.networks
            .iter()
            .find(|n| n.chain == chain)
            .ok_or_else(|| EngineError::config(format!("{} is not configured", chain)))
    }

    pub fn selection_limits(&self, chain: Chain) -> EngineResult<SelectionLimits> {
        Ok(SelectionLimits {
            max_inputs: self.utxo.max_inputs,
            max_tries: self.utxo.max_selection_tries,
            dust_threshold: self.network(chain)?.dust_threshold,
        })
    }

    /// Address services for every configured network
    pub fn address_registry(&self) -> EngineResult<AddressRegistry> {
        let mut registry = AddressRegistry::with_defaults();
        for network in &self.networks {
            if network.chain.family() == ChainFamily::Utxo {
                registry.register(Box::new(network.utxo_network()?));
            }
        }
        Ok(registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.networks.len(), Chain::ALL.len());
        assert_eq!(config.network(Chain::Polygon).unwrap().chain_id, Some(137));
        assert!(config.network(Chain::XrpTestnet).unwrap().xrp_test_network);
        assert_eq!(config.utxo.default_sequence, 0xffff_fffa);
    }

    #[test]
    fn test_json_round_trip() {
        let config = EngineConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(EngineConfig::from_json_str(&json).unwrap(), config);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{
            "networks": [
                { "chain": "litecoin", "p2pkh_prefix": 48, "p2sh_prefix": 50,
                  "bech32_hrp": "ltc", "decimals": 8, "symbol": "LTC", "dust_threshold": 1000 }
            ]
        }"#;
        let config = EngineConfig::from_json_str(json).unwrap();
        assert_eq!(config.default_tier, FeeTier::Normal);
        assert_eq!(config.selection_limits(Chain::Litecoin).unwrap().dust_threshold, 1000);
        assert!(config.network(Chain::Bitcoin).is_err());
    }

    #[test]
    fn test_rejects_duplicates() {
        let mut config = EngineConfig::default();
        config.networks.push(NetworkParams::builtin(Chain::Bitcoin));
        assert!(matches!(config.validate(), Err(EngineError::Config(_))));
    }

    #[test]
    fn test_rejects_zero_chain_id_and_empty_hrp() {
        let mut config = EngineConfig::default();
        config.networks[4].chain_id = Some(0);
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.networks[0].bech32_hrp = Some(String::new());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_custom_hrp_reaches_registry() {
        let mut config = EngineConfig::default();
        config.networks[1].bech32_hrp = Some("bcrt".to_string());
        let registry = config.address_registry().unwrap();
        assert!(!registry.validate(Chain::BitcoinTestnet, "tb1qw508d6qejxtdg4y5r3zarvary0c5xw7kxpjzsx"));
    }
}
