//! Transaction Builder
//!
//! A build moves through `Draft -> PayloadReady -> Signed -> Finalized`.
//! Each state is a distinct type and every transition consumes the build,
//! so a payload cannot be signed twice and a raw transaction cannot be
//! produced before its signatures were checked.
//!
//! The family-specific work lives in [`utxo`], [`evm`] and [`xrp`]; this
//! module only sequences it, validates the request and wraps failures with
//! the stage they terminated.

pub mod evm;
pub mod selection;
pub mod utxo;
pub mod xrp;

use async_trait::async_trait;
use std::sync::Arc;
use zeroize::Zeroizing;

use crate::address::{ensure_curve, AddressRegistry};
use crate::config::EngineConfig;
use crate::crypto;
use crate::error::{BuildStage, EngineError, EngineResult, ProviderError, SignerError};
use crate::fees::{self, FeeMarket, FeeTier};
use crate::logging::{LogEntry, NoopSink, TraceSink};
use crate::serializer::utxo::SignedInput;
use crate::types::{
    Chain, ChainFamily, ChainState, Curve, Fee, PublicKeyMaterial, RawSignature, RawTransaction,
    SigningPayload, TransactionRequest,
};

pub use evm::{EvmBuilder, EvmSignature, EvmTransaction, PreparedEvm};
pub use selection::{CoinSelector, FeeMode, Selection, SelectionError, SelectionLimits};
pub use utxo::{PreparedUtxo, UtxoBuilder};
pub use xrp::{PreparedXrp, XrpBuilder};

const LOG_MODULE: &str = "builder";

// =============================================================================
// External capabilities
// =============================================================================

/// Signs byte sequences with the key behind a [`PublicKeyMaterial`].
///
/// Returns one signature per input, in order. The engine never sees the
/// private key.
#[async_trait]
pub trait Signer: Send + Sync {
    async fn sign(
        &self,
        hashes: &[Vec<u8>],
        key: &PublicKeyMaterial,
    ) -> Result<Vec<RawSignature>, SignerError>;
}

/// Source of chain state and fee quotes
#[async_trait]
pub trait NetworkProvider: Send + Sync {
    async fn chain_state(&self, chain: Chain, address: &str) -> Result<ChainState, ProviderError>;

    async fn fee_market(&self, chain: Chain) -> Result<FeeMarket, ProviderError>;
}

/// In-process signer over a raw private key
pub struct LocalSigner {
    private_key: Zeroizing<Vec<u8>>,
    curve: Curve,
}

impl LocalSigner {
    pub fn new(private_key: Vec<u8>, curve: Curve) -> Self {
        Self {
            private_key: Zeroizing::new(private_key),
            curve,
        }
    }

    /// Public key matching this signer (compressed for secp256k1)
    pub fn public_key(&self) -> EngineResult<PublicKeyMaterial> {
        Ok(PublicKeyMaterial::new(
            crypto::public_key(&self.private_key, self.curve)?,
            self.curve,
        ))
    }
}

impl std::fmt::Debug for LocalSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalSigner")
            .field("curve", &self.curve)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Signer for LocalSigner {
    async fn sign(
        &self,
        hashes: &[Vec<u8>],
        key: &PublicKeyMaterial,
    ) -> Result<Vec<RawSignature>, SignerError> {
        if key.curve != self.curve {
            return Err(SignerError::Rejected(format!(
                "signer holds a {} key, request is for {}",
                self.curve, key.curve
            )));
        }
        hashes
            .iter()
            .map(|hash| {
                crypto::sign(hash, &self.private_key, self.curve)
                    .map_err(|e| SignerError::Rejected(e.to_string()))
            })
            .collect()
    }
}

// =============================================================================
// Family dispatch
// =============================================================================

/// Builder for one chain family
#[derive(Debug, Clone)]
pub enum FamilyBuilder {
    Utxo(UtxoBuilder),
    Evm(EvmBuilder),
    Xrp(XrpBuilder),
}

impl FamilyBuilder {
    pub fn for_chain(chain: Chain, config: &EngineConfig) -> EngineResult<Self> {
        let network = config.network(chain)?;
        match chain.family() {
            ChainFamily::Utxo => Ok(FamilyBuilder::Utxo(UtxoBuilder::new(
                network.utxo_network()?,
                config.selection_limits(chain)?,
                config.utxo.default_sequence,
            ))),
            ChainFamily::Evm => {
                let chain_id = network.chain_id.ok_or_else(|| {
                    EngineError::config(format!("{} needs a chain id", chain))
                })?;
                Ok(FamilyBuilder::Evm(EvmBuilder::new(chain, chain_id)))
            }
            ChainFamily::LedgerAccount => Ok(FamilyBuilder::Xrp(XrpBuilder::new(
                chain,
                network.xrp_test_network,
            ))),
            ChainFamily::Tezos | ChainFamily::Algorand => Err(EngineError::invalid_request(
                format!("transaction building is not supported for {}", chain),
            )),
        }
    }

    fn prepare(
        &self,
        request: &TransactionRequest,
        state: &ChainState,
        key: &PublicKeyMaterial,
    ) -> EngineResult<(Prepared, SigningPayload)> {
        match self {
            FamilyBuilder::Utxo(builder) => {
                let (prepared, payload) = builder.prepare(request, state)?;
                Ok((Prepared::Utxo(prepared), payload))
            }
            FamilyBuilder::Evm(builder) => {
                let (prepared, payload) = builder.prepare(request, state)?;
                Ok((Prepared::Evm(prepared), payload))
            }
            FamilyBuilder::Xrp(builder) => {
                let (prepared, payload) = builder.prepare(request, state, key)?;
                Ok((Prepared::Xrp(prepared), payload))
            }
        }
    }
}

/// Unsigned transaction of any family
#[derive(Debug, Clone)]
pub enum Prepared {
    Utxo(PreparedUtxo),
    Evm(PreparedEvm),
    Xrp(PreparedXrp),
}

/// Signatures in the family's canonical encoding
#[derive(Debug, Clone)]
pub enum EncodedSignatures {
    Utxo(Vec<SignedInput>),
    Evm(EvmSignature),
    Xrp(Vec<u8>),
}

impl Prepared {
    fn encode(
        &self,
        payload: &SigningPayload,
        signatures: &[RawSignature],
        key: &PublicKeyMaterial,
    ) -> EngineResult<EncodedSignatures> {
        match self {
            Prepared::Utxo(p) => p
                .encode_signatures(payload, signatures, key)
                .map(EncodedSignatures::Utxo),
            Prepared::Evm(p) => p
                .encode_signature(payload, signatures, key)
                .map(EncodedSignatures::Evm),
            Prepared::Xrp(p) => p
                .encode_signature(payload, signatures, key)
                .map(EncodedSignatures::Xrp),
        }
    }

    fn finalize(&self, signatures: EncodedSignatures) -> EngineResult<RawTransaction> {
        match (self, signatures) {
            (Prepared::Utxo(p), EncodedSignatures::Utxo(inputs)) => p.finalize(&inputs),
            (Prepared::Evm(p), EncodedSignatures::Evm(signature)) => Ok(p.finalize(&signature)),
            (Prepared::Xrp(p), EncodedSignatures::Xrp(signature)) => p.finalize(signature),
            _ => Err(EngineError::serialization(
                "signatures belong to a different transaction family",
            )),
        }
    }
}

// =============================================================================
// Build state machine
// =============================================================================

pub struct Draft {
    builder: FamilyBuilder,
    registry: Arc<AddressRegistry>,
    request: TransactionRequest,
    state: ChainState,
}

pub struct PayloadReady {
    prepared: Prepared,
    payload: SigningPayload,
}

pub struct Signed {
    prepared: Prepared,
    signatures: EncodedSignatures,
}

pub struct Finalized {
    transaction: RawTransaction,
}

/// One transaction on its way from request to raw bytes
pub struct TransactionBuild<S> {
    chain: Chain,
    key: PublicKeyMaterial,
    sink: Arc<dyn TraceSink>,
    state: S,
}

impl<S> TransactionBuild<S> {
    pub fn chain(&self) -> Chain {
        self.chain
    }

    fn advance<T>(self, state: T) -> TransactionBuild<T> {
        TransactionBuild {
            chain: self.chain,
            key: self.key,
            sink: self.sink,
            state,
        }
    }
}

impl TransactionBuild<Draft> {
    pub fn new(
        chain: Chain,
        builder: FamilyBuilder,
        registry: Arc<AddressRegistry>,
        request: TransactionRequest,
        state: ChainState,
        key: PublicKeyMaterial,
    ) -> Self {
        Self {
            chain,
            key,
            sink: Arc::new(NoopSink),
            state: Draft {
                builder,
                registry,
                request,
                state,
            },
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn TraceSink>) -> Self {
        self.sink = sink;
        self
    }

    fn validate(&self) -> EngineResult<()> {
        let draft = &self.state;
        ensure_curve(self.chain, self.key.curve)?;
        draft
            .registry
            .require_valid(self.chain, &draft.request.destination_address)?;
        draft.request.amount.check_precision()?;
        draft.request.fee.amount.check_precision()?;
        Ok(())
    }

    /// Validate the request and compute the signing payload
    pub fn prepare(self) -> EngineResult<TransactionBuild<PayloadReady>> {
        let outcome = self.validate().and_then(|_| {
            self.state
                .builder
                .prepare(&self.state.request, &self.state.state, &self.key)
        });
        let (prepared, payload) = match outcome {
            Ok(ok) => ok,
            Err(e) => {
                LogEntry::warn(LOG_MODULE, "prepare failed")
                    .field("chain", self.chain)
                    .field("error", &e)
                    .record(self.sink.as_ref());
                return Err(e.at_stage(BuildStage::Draft));
            }
        };

        LogEntry::debug(LOG_MODULE, "payload ready")
            .field("chain", self.chain)
            .field("entries", payload.len())
            .address_field("destination", &self.state.request.destination_address)
            .record(self.sink.as_ref());
        Ok(self.advance(PayloadReady { prepared, payload }))
    }
}

impl TransactionBuild<PayloadReady> {
    pub fn payload(&self) -> &SigningPayload {
        &self.state.payload
    }

    pub fn prepared(&self) -> &Prepared {
        &self.state.prepared
    }

    /// Hand the payload to the signer and re-encode what comes back
    pub async fn sign(self, signer: &dyn Signer) -> EngineResult<TransactionBuild<Signed>> {
        let hashes = self.state.payload.hashes();
        let outcome = match signer.sign(&hashes, &self.key).await {
            Ok(raw) => self.apply_signatures(&raw),
            Err(e) => Err(EngineError::from(e)),
        };
        match outcome {
            Ok(signatures) => {
                let prepared = self.state.prepared.clone();
                Ok(self.advance(Signed {
                    prepared,
                    signatures,
                }))
            }
            Err(e) => {
                LogEntry::warn(LOG_MODULE, "signing failed")
                    .field("chain", self.chain)
                    .field("error", &e)
                    .record(self.sink.as_ref());
                Err(e.at_stage(BuildStage::Signed))
            }
        }
    }

    /// Accept signatures produced out of band
    pub fn with_signatures(self, raw: &[RawSignature]) -> EngineResult<TransactionBuild<Signed>> {
        let signatures = self
            .apply_signatures(raw)
            .map_err(|e| e.at_stage(BuildStage::Signed))?;
        let prepared = self.state.prepared.clone();
        Ok(self.advance(Signed {
            prepared,
            signatures,
        }))
    }

    fn apply_signatures(&self, raw: &[RawSignature]) -> EngineResult<EncodedSignatures> {
        let payload = &self.state.payload;
        if raw.len() != payload.len() {
            return Err(EngineError::signature(format!(
                "signer returned {} signatures for {} payload entries",
                raw.len(),
                payload.len()
            )));
        }
        self.state.prepared.encode(payload, raw, &self.key)
    }
}

impl TransactionBuild<Signed> {
    /// Splice the signatures into the broadcastable transaction
    pub fn finalize(self) -> EngineResult<TransactionBuild<Finalized>> {
        let Signed {
            prepared,
            signatures,
        } = &self.state;
        let transaction = prepared
            .finalize(signatures.clone())
            .map_err(|e| e.at_stage(BuildStage::Finalized))?;

        LogEntry::info(LOG_MODULE, "transaction finalized")
            .field("chain", self.chain)
            .field("size", transaction.bytes.len())
            .field("tx_hash", transaction.hash.as_deref().unwrap_or(""))
            .record(self.sink.as_ref());
        Ok(self.advance(Finalized { transaction }))
    }
}

impl TransactionBuild<Finalized> {
    pub fn transaction(&self) -> &RawTransaction {
        &self.state.transaction
    }

    pub fn into_transaction(self) -> RawTransaction {
        self.state.transaction
    }
}

// =============================================================================
// Engine facade
// =============================================================================

/// Configuration, address services and logging shared by all builds
pub struct TransactionEngine {
    config: EngineConfig,
    registry: Arc<AddressRegistry>,
    sink: Arc<dyn TraceSink>,
}

impl TransactionEngine {
    pub fn new(config: EngineConfig) -> EngineResult<Self> {
        config.validate()?;
        let registry = Arc::new(config.address_registry()?);
        Ok(Self {
            config,
            registry,
            sink: Arc::new(NoopSink),
        })
    }

    pub fn with_sink(mut self, sink: Arc<dyn TraceSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry(&self) -> &AddressRegistry {
        &self.registry
    }

    pub fn builder_for(&self, chain: Chain) -> EngineResult<FamilyBuilder> {
        FamilyBuilder::for_chain(chain, &self.config)
    }

    /// Start a build from caller-supplied chain state
    pub fn draft(
        &self,
        chain: Chain,
        request: TransactionRequest,
        state: ChainState,
        key: PublicKeyMaterial,
    ) -> EngineResult<TransactionBuild<Draft>> {
        let builder = self
            .builder_for(chain)
            .map_err(|e| e.at_stage(BuildStage::Draft))?;
        Ok(TransactionBuild::new(
            chain,
            builder,
            Arc::clone(&self.registry),
            request,
            state,
            key,
        )
        .with_sink(Arc::clone(&self.sink)))
    }

    /// Fetch state, prepare, sign and finalize in one go
    pub async fn build(
        &self,
        chain: Chain,
        request: TransactionRequest,
        key: PublicKeyMaterial,
        provider: &dyn NetworkProvider,
        signer: &dyn Signer,
    ) -> EngineResult<RawTransaction> {
        let state = provider
            .chain_state(chain, &request.source_address)
            .await
            .map_err(|e| EngineError::from(e).at_stage(BuildStage::Draft))?;

        let build = self
            .draft(chain, request, state, key)?
            .prepare()?
            .sign(signer)
            .await?
            .finalize()?;
        Ok(build.into_transaction())
    }

    /// Fee for `tier`, or the configured default tier
    pub async fn estimate_fee(
        &self,
        chain: Chain,
        provider: &dyn NetworkProvider,
        tier: Option<FeeTier>,
    ) -> EngineResult<Fee> {
        let market = provider.fee_market(chain).await?;
        fees::estimate_fee(chain, &market, tier.unwrap_or(self.config.default_tier))
    }
}
