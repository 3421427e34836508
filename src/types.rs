//! Shared types for the transaction engine
//!
//! All data structures that cross module boundaries are defined here
//! for consistent serialization.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::encoding::bigint::{self, U256};
use crate::error::{EngineError, EngineResult};

// =============================================================================
// Chain Types
// =============================================================================

/// Supported blockchain networks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Chain {
    Bitcoin,
    BitcoinTestnet,
    Litecoin,
    Dogecoin,
    Ethereum,
    EthereumSepolia,
    Bnb,
    Polygon,
    Arbitrum,
    Optimism,
    Base,
    Avalanche,
    Xrp,
    XrpTestnet,
    Tezos,
    Algorand,
}

/// Transaction encoding family a chain belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainFamily {
    Utxo,
    Evm,
    LedgerAccount,
    Tezos,
    Algorand,
}

impl Chain {
    pub const ALL: [Chain; 16] = [
        Chain::Bitcoin,
        Chain::BitcoinTestnet,
        Chain::Litecoin,
        Chain::Dogecoin,
        Chain::Ethereum,
        Chain::EthereumSepolia,
        Chain::Bnb,
        Chain::Polygon,
        Chain::Arbitrum,
        Chain::Optimism,
        Chain::Base,
        Chain::Avalanche,
        Chain::Xrp,
        Chain::XrpTestnet,
        Chain::Tezos,
        Chain::Algorand,
    ];

    pub fn family(&self) -> ChainFamily {
        match self {
            Chain::Bitcoin | Chain::BitcoinTestnet | Chain::Litecoin | Chain::Dogecoin => {
                ChainFamily::Utxo
            }
            Chain::Ethereum
            | Chain::EthereumSepolia
            | Chain::Bnb
            | Chain::Polygon
            | Chain::Arbitrum
            | Chain::Optimism
            | Chain::Base
            | Chain::Avalanche => ChainFamily::Evm,
            Chain::Xrp | Chain::XrpTestnet => ChainFamily::LedgerAccount,
            Chain::Tezos => ChainFamily::Tezos,
            Chain::Algorand => ChainFamily::Algorand,
        }
    }

    pub fn is_evm(&self) -> bool {
        self.family() == ChainFamily::Evm
    }

    pub fn is_utxo(&self) -> bool {
        self.family() == ChainFamily::Utxo
    }

    pub fn is_testnet(&self) -> bool {
        matches!(
            self,
            Chain::BitcoinTestnet | Chain::EthereumSepolia | Chain::XrpTestnet
        )
    }

    pub fn chain_id(&self) -> Option<u64> {
        match self {
            Chain::Ethereum => Some(1),
            Chain::EthereumSepolia => Some(11155111),
            Chain::Bnb => Some(56),
            Chain::Polygon => Some(137),
            Chain::Arbitrum => Some(42161),
            Chain::Optimism => Some(10),
            Chain::Base => Some(8453),
            Chain::Avalanche => Some(43114),
            _ => None,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Chain::Bitcoin | Chain::BitcoinTestnet => "BTC",
            Chain::Litecoin => "LTC",
            Chain::Dogecoin => "DOGE",
            Chain::Ethereum | Chain::EthereumSepolia => "ETH",
            Chain::Bnb => "BNB",
            Chain::Polygon => "POL",
            Chain::Arbitrum | Chain::Optimism | Chain::Base => "ETH",
            Chain::Avalanche => "AVAX",
            Chain::Xrp | Chain::XrpTestnet => "XRP",
            Chain::Tezos => "XTZ",
            Chain::Algorand => "ALGO",
        }
    }

    pub fn decimals(&self) -> u32 {
        match self {
            Chain::Bitcoin | Chain::BitcoinTestnet | Chain::Litecoin | Chain::Dogecoin => 8,
            Chain::Xrp | Chain::XrpTestnet | Chain::Tezos | Chain::Algorand => 6,
            _ => 18,
        }
    }

    /// Curves whose keys this chain can derive addresses from
    pub fn supported_curves(&self) -> &'static [Curve] {
        match self.family() {
            ChainFamily::Utxo | ChainFamily::Evm => &[Curve::Secp256k1],
            ChainFamily::LedgerAccount | ChainFamily::Tezos => {
                &[Curve::Secp256k1, Curve::Ed25519, Curve::Ed25519Slip0010]
            }
            ChainFamily::Algorand => &[Curve::Ed25519, Curve::Ed25519Slip0010],
        }
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Chain::Bitcoin => "bitcoin",
            Chain::BitcoinTestnet => "bitcoin-testnet",
            Chain::Litecoin => "litecoin",
            Chain::Dogecoin => "dogecoin",
            Chain::Ethereum => "ethereum",
            Chain::EthereumSepolia => "ethereum-sepolia",
            Chain::Bnb => "bnb",
            Chain::Polygon => "polygon",
            Chain::Arbitrum => "arbitrum",
            Chain::Optimism => "optimism",
            Chain::Base => "base",
            Chain::Avalanche => "avalanche",
            Chain::Xrp => "xrp",
            Chain::XrpTestnet => "xrp-testnet",
            Chain::Tezos => "tezos",
            Chain::Algorand => "algorand",
        };
        f.write_str(name)
    }
}

impl std::str::FromStr for Chain {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "bitcoin" | "btc" => Ok(Chain::Bitcoin),
            "bitcoin_testnet" | "btc_testnet" => Ok(Chain::BitcoinTestnet),
            "litecoin" | "ltc" => Ok(Chain::Litecoin),
            "dogecoin" | "doge" => Ok(Chain::Dogecoin),
            "ethereum" | "eth" => Ok(Chain::Ethereum),
            "ethereum_sepolia" | "sepolia" => Ok(Chain::EthereumSepolia),
            "bnb" | "bsc" => Ok(Chain::Bnb),
            "polygon" | "matic" | "pol" => Ok(Chain::Polygon),
            "arbitrum" | "arb" => Ok(Chain::Arbitrum),
            "optimism" | "op" => Ok(Chain::Optimism),
            "base" => Ok(Chain::Base),
            "avalanche" | "avax" => Ok(Chain::Avalanche),
            "xrp" | "ripple" => Ok(Chain::Xrp),
            "xrp_testnet" => Ok(Chain::XrpTestnet),
            "tezos" | "xtz" => Ok(Chain::Tezos),
            "algorand" | "algo" => Ok(Chain::Algorand),
            _ => Err(EngineError::invalid_request(format!("unknown chain: {}", s))),
        }
    }
}

// =============================================================================
// Keys & Addresses
// =============================================================================

/// Elliptic curve of a key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Curve {
    Secp256k1,
    Ed25519,
    /// Ed25519 keys derived with SLIP-0010; identical on the wire
    Ed25519Slip0010,
}

impl Curve {
    pub fn is_ed25519(&self) -> bool {
        matches!(self, Curve::Ed25519 | Curve::Ed25519Slip0010)
    }
}

impl fmt::Display for Curve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Curve::Secp256k1 => "secp256k1",
            Curve::Ed25519 => "ed25519",
            Curve::Ed25519Slip0010 => "ed25519_slip0010",
        };
        f.write_str(name)
    }
}

impl std::str::FromStr for Curve {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "secp256k1" | "secp" => Ok(Curve::Secp256k1),
            "ed25519" | "ed" => Ok(Curve::Ed25519),
            "ed25519_slip0010" | "slip0010" => Ok(Curve::Ed25519Slip0010),
            _ => Err(EngineError::invalid_request(format!("unknown curve: {}", s))),
        }
    }
}

/// Public key material owned by the wallet layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKeyMaterial {
    #[serde(with = "hex_bytes")]
    pub seed_key: Vec<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "hex_bytes_opt")]
    pub derived_key: Option<Vec<u8>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub derivation_path: Option<String>,
    pub curve: Curve,
}

impl PublicKeyMaterial {
    pub fn new(seed_key: Vec<u8>, curve: Curve) -> Self {
        Self {
            seed_key,
            derived_key: None,
            derivation_path: None,
            curve,
        }
    }

    pub fn with_derived(mut self, derived_key: Vec<u8>, path: impl Into<String>) -> Self {
        self.derived_key = Some(derived_key);
        self.derivation_path = Some(path.into());
        self
    }

    /// Key that signs for this account
    pub fn signing_key(&self) -> &[u8] {
        self.derived_key.as_deref().unwrap_or(&self.seed_key)
    }
}

/// Address style
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressType {
    #[default]
    Default,
    Legacy,
    Compat,
}

/// A derived address; only address services construct these
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Address {
    pub value: String,
    #[serde(rename = "type")]
    pub address_type: AddressType,
}

impl Address {
    pub(crate) fn new(value: impl Into<String>, address_type: AddressType) -> Self {
        Self {
            value: value.into(),
            address_type,
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

// =============================================================================
// Amounts & Fees
// =============================================================================

/// What an amount denominates
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AmountKind {
    Coin,
    Token { contract_address: String },
    FeeResource,
    Reserve,
}

/// A decimal amount with its currency precision
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Amount {
    pub value: Decimal,
    pub currency_symbol: String,
    pub decimals: u32,
    #[serde(flatten)]
    pub kind: AmountKind,
}

impl Amount {
    pub fn coin(chain: Chain, value: Decimal) -> Self {
        Self {
            value,
            currency_symbol: chain.symbol().to_string(),
            decimals: chain.decimals(),
            kind: AmountKind::Coin,
        }
    }

    pub fn token(
        symbol: impl Into<String>,
        contract_address: impl Into<String>,
        decimals: u32,
        value: Decimal,
    ) -> Self {
        Self {
            value,
            currency_symbol: symbol.into(),
            decimals,
            kind: AmountKind::Token {
                contract_address: contract_address.into(),
            },
        }
    }

    /// Amount from an integer count of minor units
    pub fn from_minor_units(chain: Chain, units: u64) -> Self {
        let value = Decimal::from_i128_with_scale(units as i128, chain.decimals());
        Self::coin(chain, value.normalize())
    }

    /// `value × 10^decimals`, truncated
    pub fn to_minor_units(&self) -> EngineResult<U256> {
        bigint::to_minor_units(&self.value, self.decimals)
    }

    /// Minor units that must fit in 64 bits (UTXO and XRP amounts)
    pub fn to_minor_units_u64(&self) -> EngineResult<u64> {
        let units = self.to_minor_units()?;
        units.to_u64().ok_or_else(|| {
            EngineError::invalid_request(format!(
                "{} {} exceeds the 64-bit minor unit range",
                self.value, self.currency_symbol
            ))
        })
    }

    /// Reject negative values and precision beyond `decimals`
    pub fn check_precision(&self) -> EngineResult<()> {
        if self.value.is_sign_negative() && !self.value.is_zero() {
            return Err(EngineError::invalid_request(format!(
                "negative amount: {}",
                self.value
            )));
        }
        let scale = self.value.normalize().scale();
        if scale > self.decimals {
            return Err(EngineError::invalid_request(format!(
                "{} has {} fractional digits, {} allows {}",
                self.value, scale, self.currency_symbol, self.decimals
            )));
        }
        Ok(())
    }

    pub fn is_token(&self) -> bool {
        matches!(self.kind, AmountKind::Token { .. })
    }
}

/// Chain-specific fee parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FeeParameters {
    Utxo { sat_per_byte: u64 },
    EvmLegacy { gas_limit: u64, gas_price: U256 },
    Eip1559 { gas_limit: u64, max_fee_per_gas: U256, priority_fee: U256 },
    Fixed,
}

/// A fee amount with the parameters that produced it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fee {
    pub amount: Amount,
    pub parameters: FeeParameters,
}

// =============================================================================
// Transaction Request & Chain State
// =============================================================================

/// Ordering applied to UTXO inputs and outputs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxOrdering {
    /// Selection order for inputs, destination first for outputs
    #[default]
    None,
    /// BIP-69 lexicographic ordering
    Bip69,
}

/// Memo attached to an XRP transaction
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct XrpMemo {
    #[serde(default, with = "hex_bytes_opt")]
    pub memo_type: Option<Vec<u8>>,
    #[serde(default, with = "hex_bytes_opt")]
    pub memo_data: Option<Vec<u8>>,
}

/// Chain-specific extras carried by a request
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "snake_case")]
pub enum TransactionParams {
    #[default]
    None,
    Utxo {
        #[serde(default)]
        sequence: Option<u32>,
        #[serde(default)]
        ordering: TxOrdering,
    },
    Evm {
        #[serde(default)]
        nonce: Option<u64>,
        #[serde(default, with = "hex_bytes_opt")]
        data: Option<Vec<u8>>,
    },
    Xrp {
        #[serde(default)]
        destination_tag: Option<u32>,
        #[serde(default)]
        memos: Vec<XrpMemo>,
    },
}

/// A requested transfer; consumed once by a builder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRequest {
    pub amount: Amount,
    pub fee: Fee,
    pub source_address: String,
    pub destination_address: String,
    #[serde(default)]
    pub change_address: Option<String>,
    #[serde(default)]
    pub params: TransactionParams,
}

/// Unspent output owned by the source account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnspentOutput {
    /// Transaction id in display (big-endian hex) order
    pub txid: String,
    pub vout: u32,
    pub amount: u64,
    /// Locking script of the output
    #[serde(with = "hex_bytes")]
    pub script: Vec<u8>,
}

/// Network state a builder needs, supplied by the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "snake_case")]
pub enum ChainState {
    Utxo {
        unspents: Vec<UnspentOutput>,
    },
    Evm {
        nonce: u64,
    },
    Xrp {
        sequence: u32,
        #[serde(default)]
        last_ledger_sequence: Option<u32>,
    },
}

// =============================================================================
// Payloads, Signatures & Raw Transactions
// =============================================================================

/// One byte sequence to be signed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayloadEntry {
    #[serde(with = "hex_bytes")]
    pub data: Vec<u8>,
    /// Input or field the signature belongs to
    pub index: usize,
    pub description: String,
}

/// Ordered set of byte sequences to sign
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SigningPayload {
    pub entries: Vec<PayloadEntry>,
}

impl SigningPayload {
    pub fn single(data: Vec<u8>, description: impl Into<String>) -> Self {
        Self {
            entries: vec![PayloadEntry {
                data,
                index: 0,
                description: description.into(),
            }],
        }
    }

    pub fn push(&mut self, data: Vec<u8>, description: impl Into<String>) {
        let index = self.entries.len();
        self.entries.push(PayloadEntry {
            data,
            index,
            description: description.into(),
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Byte sequences in signing order
    pub fn hashes(&self) -> Vec<Vec<u8>> {
        self.entries.iter().map(|e| e.data.clone()).collect()
    }
}

/// Raw signature as returned by a signer: `r ‖ s` or `r ‖ s ‖ v`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RawSignature(#[serde(with = "hex_bytes")] Vec<u8>);

impl<'de> Deserialize<'de> for RawSignature {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let bytes = hex_bytes::deserialize(deserializer)?;
        RawSignature::from_bytes(bytes).map_err(serde::de::Error::custom)
    }
}

impl RawSignature {
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> EngineResult<Self> {
        let bytes = bytes.into();
        match bytes.len() {
            64 | 65 => Ok(Self(bytes)),
            n => Err(EngineError::signature(format!(
                "expected 64 or 65 signature bytes, got {}",
                n
            ))),
        }
    }

    pub fn from_parts(r: [u8; 32], s: [u8; 32], v: Option<u8>) -> Self {
        let mut bytes = Vec::with_capacity(65);
        bytes.extend_from_slice(&r);
        bytes.extend_from_slice(&s);
        if let Some(v) = v {
            bytes.push(v);
        }
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn r(&self) -> [u8; 32] {
        let mut r = [0u8; 32];
        r.copy_from_slice(&self.0[..32]);
        r
    }

    pub fn s(&self) -> [u8; 32] {
        let mut s = [0u8; 32];
        s.copy_from_slice(&self.0[32..64]);
        s
    }

    pub fn compact(&self) -> [u8; 64] {
        let mut out = [0u8; 64];
        out.copy_from_slice(&self.0[..64]);
        out
    }

    /// Trailing recovery byte, if the signer supplied one
    pub fn v(&self) -> Option<u8> {
        self.0.get(64).copied()
    }
}

/// Signatures aligned 1:1 with a [`SigningPayload`]
pub type SignatureSet = Vec<RawSignature>;

/// Final broadcastable transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTransaction {
    #[serde(with = "hex_bytes")]
    pub bytes: Vec<u8>,
    /// Transaction id, when the family defines one locally
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
}

impl RawTransaction {
    pub fn to_hex(&self) -> String {
        hex::encode(&self.bytes)
    }
}

// =============================================================================
// Serde helpers
// =============================================================================

pub(crate) mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        crate::encoding::hex::decode(&s).map_err(serde::de::Error::custom)
    }
}

pub(crate) mod hex_bytes_opt {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        bytes: &Option<Vec<u8>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match bytes {
            Some(b) => serializer.serialize_some(&hex::encode(b)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Vec<u8>>, D::Error> {
        let s: Option<String> = Option::deserialize(deserializer)?;
        s.map(|s| crate::encoding::hex::decode(&s).map_err(serde::de::Error::custom))
            .transpose()
    }
}
