//! Fee Estimator
//!
//! Tiered quotes in, fee amount plus builder parameters out.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::encoding::bigint::{self, U256};
use crate::error::{EngineError, EngineResult};
use crate::types::{Amount, Chain, ChainFamily, Fee, FeeParameters};

// =============================================================================
// Tiers & Quotes
// =============================================================================

/// How fast the caller wants the transaction confirmed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeeTier {
    Minimal,
    #[default]
    Normal,
    Priority,
}

impl fmt::Display for FeeTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FeeTier::Minimal => "minimal",
            FeeTier::Normal => "normal",
            FeeTier::Priority => "priority",
        };
        f.write_str(name)
    }
}

impl std::str::FromStr for FeeTier {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "minimal" | "slow" | "low" => Ok(FeeTier::Minimal),
            "normal" | "medium" => Ok(FeeTier::Normal),
            "priority" | "fast" | "high" => Ok(FeeTier::Priority),
            _ => Err(EngineError::invalid_request(format!("unknown fee tier: {}", s))),
        }
    }
}

/// One quote per tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierQuotes<T> {
    pub minimal: T,
    pub normal: T,
    pub priority: T,
}

impl<T: Copy> TierQuotes<T> {
    pub fn new(minimal: T, normal: T, priority: T) -> Self {
        Self {
            minimal,
            normal,
            priority,
        }
    }

    pub fn get(&self, tier: FeeTier) -> T {
        match tier {
            FeeTier::Minimal => self.minimal,
            FeeTier::Normal => self.normal,
            FeeTier::Priority => self.priority,
        }
    }
}

/// Fee-market snapshot for one chain, as reported by a provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FeeMarket {
    /// sat/vbyte rates and the expected transaction size
    Utxo {
        sat_per_vbyte: TierQuotes<u64>,
        estimated_vbytes: u64,
    },
    EvmLegacy {
        gas_limit: u64,
        gas_price: TierQuotes<U256>,
    },
    Eip1559 {
        gas_limit: u64,
        base_fee: U256,
        priority_fee: TierQuotes<U256>,
    },
    /// Reference fee, optionally tiered by open-ledger quotes
    Xrp {
        base_drops: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        open_ledger: Option<TierQuotes<u64>>,
    },
}

/// Gas limits for common call kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvmCallKind {
    CoinTransfer,
    TokenTransfer,
    TokenApproval,
    ContractCall,
}

pub fn recommended_gas_limit(kind: EvmCallKind) -> u64 {
    match kind {
        EvmCallKind::CoinTransfer => 21000,
        EvmCallKind::TokenTransfer => 65000,
        EvmCallKind::TokenApproval => 50000,
        EvmCallKind::ContractCall => 150000,
    }
}

// =============================================================================
// Estimation
// =============================================================================

/// Fee for `tier` on `chain`; the market must belong to the chain's family
pub fn estimate_fee(chain: Chain, market: &FeeMarket, tier: FeeTier) -> EngineResult<Fee> {
    let mismatch = || {
        EngineError::invalid_request(format!(
            "{:?} fee market does not apply to {}",
            market, chain
        ))
    };

    let (units, parameters) = match (chain.family(), market) {
        (
            ChainFamily::Utxo,
            FeeMarket::Utxo {
                sat_per_vbyte,
                estimated_vbytes,
            },
        ) => {
            let rate = sat_per_vbyte.get(tier);
            (
                U256::from_u64(calculate_utxo_fee(*estimated_vbytes, rate)?),
                FeeParameters::Utxo { sat_per_byte: rate },
            )
        }
        (ChainFamily::Evm, FeeMarket::EvmLegacy { gas_limit, gas_price }) => {
            let gas_price = gas_price.get(tier);
            (
                calculate_evm_fee(*gas_limit, gas_price)?,
                FeeParameters::EvmLegacy {
                    gas_limit: *gas_limit,
                    gas_price,
                },
            )
        }
        (
            ChainFamily::Evm,
            FeeMarket::Eip1559 {
                gas_limit,
                base_fee,
                priority_fee,
            },
        ) => {
            let priority_fee = priority_fee.get(tier);
            let max_fee_per_gas = max_fee_per_gas(*base_fee, priority_fee)?;
            (
                calculate_evm_fee(*gas_limit, max_fee_per_gas)?,
                FeeParameters::Eip1559 {
                    gas_limit: *gas_limit,
                    max_fee_per_gas,
                    priority_fee,
                },
            )
        }
        (
            ChainFamily::LedgerAccount,
            FeeMarket::Xrp {
                base_drops,
                open_ledger,
            },
        ) => {
            let drops = open_ledger
                .map(|quotes| quotes.get(tier).max(*base_drops))
                .unwrap_or(*base_drops);
            (U256::from_u64(drops), FeeParameters::Fixed)
        }
        (ChainFamily::Tezos | ChainFamily::Algorand, _) => {
            return Err(EngineError::invalid_request(format!(
                "no fee model for {}",
                chain
            )))
        }
        _ => return Err(mismatch()),
    };

    let value = bigint::from_minor_units(units, chain.decimals())?;
    tracing::trace!(%chain, %tier, fee = %value, "estimated fee");
    Ok(Fee {
        amount: Amount::coin(chain, value),
        parameters,
    })
}

/// `estimated_vbytes × rate` in satoshis
pub fn calculate_utxo_fee(estimated_vbytes: u64, sat_per_vbyte: u64) -> EngineResult<u64> {
    estimated_vbytes
        .checked_mul(sat_per_vbyte)
        .ok_or_else(|| EngineError::invalid_request("UTXO fee overflows 64 bits"))
}

/// `gas_limit × price` in wei
pub fn calculate_evm_fee(gas_limit: u64, price_per_gas: U256) -> EngineResult<U256> {
    price_per_gas
        .checked_mul_u64(gas_limit)
        .ok_or_else(|| EngineError::invalid_request("EVM fee overflows 256 bits"))
}

/// Headroom of two base fees on top of the tip
pub fn max_fee_per_gas(base_fee: U256, priority_fee: U256) -> EngineResult<U256> {
    base_fee
        .checked_mul_u64(2)
        .and_then(|doubled| doubled.checked_add(priority_fee))
        .ok_or_else(|| EngineError::invalid_request("max fee per gas overflows 256 bits"))
}
