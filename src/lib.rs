//! Chain Transaction Engine
//!
//! Builds, signs and serializes transactions for Bitcoin-family, EVM and
//! XRP Ledger networks, and derives and validates addresses for those plus
//! Tezos and Algorand.
//!
//! # Architecture
//!
//! This crate provides:
//! - **encoding**: hex, Base58, padding and 256-bit integer helpers
//! - **crypto**: secp256k1 / ed25519 signing adapters and signature re-encoding
//! - **address**: per-chain address derivation and validation
//! - **abi** / **eip712**: EVM contract calldata and typed-data hashing
//! - **serializer**: Bitcoin, RLP and XRP binary formats
//! - **builder**: the `Draft -> PayloadReady -> Signed -> Finalized` pipeline
//! - **fees**: tiered fee estimation
//! - **config** / **logging**: engine configuration and injected log sinks
//!
//! # Keys
//!
//! The engine only ever sees public keys. Signing happens behind the
//! [`Signer`] trait; [`LocalSigner`] exists for tests and tooling.
//!
//! # Example
//!
//! ```rust,ignore
//! use chain_tx_engine::{Chain, EngineConfig, LocalSigner, TransactionEngine};
//!
//! let engine = TransactionEngine::new(EngineConfig::default())?;
//! let tx = engine
//!     .build(Chain::Bitcoin, request, key, &provider, &signer)
//!     .await?;
//! println!("{}", tx.to_hex());
//! ```

pub mod abi;
pub mod address;
pub mod builder;
pub mod config;
pub mod crypto;
pub mod eip712;
pub mod encoding;
pub mod error;
pub mod fees;
pub mod logging;
pub mod serializer;
pub mod types;

// Re-export key types for convenience
pub use error::{
    BuildStage, EngineError, EngineResult, ErrorCode, ErrorReport, ProviderError, SignerError,
};
pub use types::*;

pub use address::{AddressRegistry, AddressService};
pub use builder::{
    FamilyBuilder, LocalSigner, NetworkProvider, Signer, TransactionBuild, TransactionEngine,
};
pub use config::{EngineConfig, NetworkParams, UtxoPolicy};
pub use encoding::U256;
pub use fees::{estimate_fee, FeeMarket, FeeTier, TierQuotes};
pub use logging::{LogEntry, LogLevel, MemorySink, NoopSink, TraceSink, TracingSink};
