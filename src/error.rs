//! Unified error types for the transaction engine
//!
//! Every fallible operation returns [`EngineError`]. Errors carry a stable
//! [`ErrorCode`] so callers (and the CLI) can report them without matching on
//! message text.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::types::Curve;

/// Main error type for all engine operations
#[derive(Debug, Error)]
pub enum EngineError {
    /// Address requested with a curve the chain rejects
    #[error("{chain} does not support the {curve} curve")]
    UnsupportedCurve { chain: String, curve: Curve },

    /// Malformed, empty or checksum-failed address
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// Amount/decimals/kind mismatch or a feature the chain lacks
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Malformed signature bytes or out-of-range recovery id
    #[error("signature error: {0}")]
    Signature(String),

    /// Base58/hex/bech32 decode failure
    #[error("decode error: {0}")]
    Decode(String),

    /// Internal invariant violated while building a payload
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Failure reported by the caller-supplied signer, unchanged
    #[error(transparent)]
    Signer(#[from] SignerError),

    /// Failure reported by the network provider, unchanged
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// Invalid engine configuration
    #[error("configuration error: {0}")]
    Config(String),

    /// A transaction build failed at the named stage
    #[error("build failed at {stage}: {source}")]
    Build {
        stage: BuildStage,
        #[source]
        source: Box<EngineError>,
    },
}

impl EngineError {
    pub fn unsupported_curve(chain: impl fmt::Display, curve: Curve) -> Self {
        Self::UnsupportedCurve {
            chain: chain.to_string(),
            curve,
        }
    }

    pub fn invalid_address(msg: impl Into<String>) -> Self {
        Self::InvalidAddress(msg.into())
    }

    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    pub fn signature(msg: impl Into<String>) -> Self {
        Self::Signature(msg.into())
    }

    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Wrap this error with the build stage it terminated.
    ///
    /// Already-staged errors keep their original stage.
    pub fn at_stage(self, stage: BuildStage) -> Self {
        match self {
            err @ EngineError::Build { .. } => err,
            other => EngineError::Build {
                stage,
                source: Box::new(other),
            },
        }
    }

    /// The error with any stage wrapper removed
    pub fn root(&self) -> &EngineError {
        match self {
            EngineError::Build { source, .. } => source.root(),
            other => other,
        }
    }

    pub fn stage(&self) -> Option<BuildStage> {
        match self {
            EngineError::Build { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            EngineError::UnsupportedCurve { .. } => ErrorCode::UnsupportedCurve,
            EngineError::InvalidAddress(_) => ErrorCode::InvalidAddress,
            EngineError::InvalidRequest(_) => ErrorCode::InvalidRequest,
            EngineError::Signature(_) => ErrorCode::SignatureError,
            EngineError::Decode(_) => ErrorCode::DecodeError,
            EngineError::Serialization(_) => ErrorCode::SerializationError,
            EngineError::Signer(_) => ErrorCode::SignerFailed,
            EngineError::Provider(_) => ErrorCode::ProviderFailed,
            EngineError::Config(_) => ErrorCode::ConfigError,
            EngineError::Build { source, .. } => source.code(),
        }
    }

    /// Serializable summary for FFI/CLI consumers
    pub fn report(&self) -> ErrorReport {
        ErrorReport {
            code: self.code(),
            message: self.root().to_string(),
            stage: self.stage(),
        }
    }
}

/// Error codes for categorization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    UnsupportedCurve,
    InvalidAddress,
    InvalidRequest,
    SignatureError,
    DecodeError,
    SerializationError,
    SignerFailed,
    ProviderFailed,
    ConfigError,
}

/// Stage of the build state machine an error terminated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildStage {
    Draft,
    PayloadReady,
    Signed,
    Finalized,
}

impl fmt::Display for BuildStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BuildStage::Draft => "draft",
            BuildStage::PayloadReady => "payload_ready",
            BuildStage::Signed => "signed",
            BuildStage::Finalized => "finalized",
        };
        f.write_str(name)
    }
}

/// Serializable error summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorReport {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<BuildStage>,
}

/// Error raised by a [`Signer`](crate::builder::Signer) implementation
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SignerError {
    #[error("signing was cancelled")]
    Cancelled,
    #[error("signer rejected the request: {0}")]
    Rejected(String),
    #[error("signer unavailable: {0}")]
    Unavailable(String),
}

/// Error raised by a [`NetworkProvider`](crate::builder::NetworkProvider)
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    #[error("network provider failed: {0}")]
    Network(String),
    #[error("chain state unavailable for {0}")]
    Unavailable(String),
}

/// Result type alias for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

impl From<hex::FromHexError> for EngineError {
    fn from(e: hex::FromHexError) -> Self {
        EngineError::Decode(format!("hex: {}", e))
    }
}

impl From<bs58::decode::Error> for EngineError {
    fn from(e: bs58::decode::Error) -> Self {
        EngineError::Decode(format!("base58: {}", e))
    }
}

impl From<bech32::Error> for EngineError {
    fn from(e: bech32::Error) -> Self {
        EngineError::Decode(format!("bech32: {}", e))
    }
}

impl From<secp256k1::Error> for EngineError {
    fn from(e: secp256k1::Error) -> Self {
        EngineError::Signature(format!("secp256k1: {}", e))
    }
}

impl From<ed25519_dalek::SignatureError> for EngineError {
    fn from(e: ed25519_dalek::SignatureError) -> Self {
        EngineError::Signature(format!("ed25519: {}", e))
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(e: serde_json::Error) -> Self {
        EngineError::InvalidRequest(format!("json: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_report_serialization() {
        let err = EngineError::invalid_request("amount has 9 decimals, chain allows 8")
            .at_stage(BuildStage::Draft);

        let json = serde_json::to_string(&err.report()).unwrap();
        assert!(json.contains("invalid_request"));
        assert!(json.contains("\"stage\":\"draft\""));
        assert!(json.contains("chain allows 8"));
    }

    #[test]
    fn test_stage_is_not_rewrapped() {
        let err = EngineError::signature("bad v")
            .at_stage(BuildStage::Signed)
            .at_stage(BuildStage::Finalized);

        assert_eq!(err.stage(), Some(BuildStage::Signed));
        assert_eq!(err.code(), ErrorCode::SignatureError);
    }

    #[test]
    fn test_signer_error_passes_through() {
        let err: EngineError = SignerError::Cancelled.into();
        assert_eq!(err.to_string(), "signing was cancelled");
        assert!(matches!(err.root(), EngineError::Signer(SignerError::Cancelled)));
    }
}
