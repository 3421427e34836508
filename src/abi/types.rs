//! ABI type definitions

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::encoding::U256;
use crate::error::EngineError;

/// Solidity types supported by the encoder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbiType {
    /// `uintN`, N in 8..=256 step 8
    Uint(usize),
    /// `intN`, N in 8..=256 step 8
    Int(usize),
    Address,
    Bool,
    /// `bytes1` through `bytes32`
    FixedBytes(usize),
    Bytes,
    String,
    Array(Box<AbiType>),
    FixedArray(Box<AbiType>, usize),
    Tuple(Vec<AbiType>),
}

impl AbiType {
    /// Dynamic types are encoded in the tail behind an offset
    pub fn is_dynamic(&self) -> bool {
        match self {
            AbiType::Bytes | AbiType::String | AbiType::Array(_) => true,
            AbiType::FixedArray(inner, _) => inner.is_dynamic(),
            AbiType::Tuple(components) => components.iter().any(|t| t.is_dynamic()),
            _ => false,
        }
    }

    /// Bytes this type occupies in the head of an enclosing tuple
    pub fn head_size(&self) -> usize {
        match self {
            AbiType::Tuple(components) if !self.is_dynamic() => {
                components.iter().map(|t| t.head_size()).sum()
            }
            AbiType::FixedArray(inner, size) if !self.is_dynamic() => inner.head_size() * size,
            _ => 32,
        }
    }

    /// Canonical spelling used in signatures
    pub fn canonical_type(&self) -> String {
        match self {
            AbiType::Uint(bits) => format!("uint{}", bits),
            AbiType::Int(bits) => format!("int{}", bits),
            AbiType::Address => "address".to_string(),
            AbiType::Bool => "bool".to_string(),
            AbiType::FixedBytes(size) => format!("bytes{}", size),
            AbiType::Bytes => "bytes".to_string(),
            AbiType::String => "string".to_string(),
            AbiType::Array(inner) => format!("{}[]", inner.canonical_type()),
            AbiType::FixedArray(inner, size) => format!("{}[{}]", inner.canonical_type(), size),
            AbiType::Tuple(components) => {
                let inner = components
                    .iter()
                    .map(|t| t.canonical_type())
                    .collect::<Vec<_>>()
                    .join(",");
                format!("({})", inner)
            }
        }
    }

    fn parse_bits(digits: &str, default: usize, kind: &str) -> Result<usize, AbiError> {
        if digits.is_empty() {
            return Ok(default);
        }
        let bits: usize = digits
            .parse()
            .map_err(|_| AbiError::InvalidType(format!("invalid {} size: {}", kind, digits)))?;
        if bits == 0 || bits > 256 || bits % 8 != 0 {
            return Err(AbiError::InvalidType(format!("unsupported {} size: {}", kind, bits)));
        }
        Ok(bits)
    }

    /// Split tuple components on top-level commas
    pub(crate) fn split_components(s: &str) -> Result<Vec<AbiType>, AbiError> {
        let mut components = Vec::new();
        let mut current = String::new();
        let mut depth = 0i32;

        for c in s.chars() {
            match c {
                '(' => {
                    depth += 1;
                    current.push(c);
                }
                ')' => {
                    depth -= 1;
                    current.push(c);
                }
                ',' if depth == 0 => {
                    components.push(current.trim().parse()?);
                    current.clear();
                }
                _ => current.push(c),
            }
        }
        if !current.trim().is_empty() {
            components.push(current.trim().parse()?);
        }
        Ok(components)
    }
}

impl FromStr for AbiType {
    type Err = AbiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();

        if let Some(inner) = s.strip_suffix("[]") {
            return Ok(AbiType::Array(Box::new(inner.parse()?)));
        }
        if s.ends_with(']') {
            if let Some(idx) = s.rfind('[') {
                let size_str = &s[idx + 1..s.len() - 1];
                let size: usize = size_str
                    .parse()
                    .map_err(|_| AbiError::InvalidType(format!("invalid array size: {}", size_str)))?;
                return Ok(AbiType::FixedArray(Box::new(s[..idx].parse()?), size));
            }
        }
        if s.starts_with('(') && s.ends_with(')') {
            return Ok(AbiType::Tuple(Self::split_components(&s[1..s.len() - 1])?));
        }

        match s {
            "address" => Ok(AbiType::Address),
            "bool" => Ok(AbiType::Bool),
            "bytes" => Ok(AbiType::Bytes),
            "string" => Ok(AbiType::String),
            s if s.starts_with("bytes") => {
                let size: usize = s[5..]
                    .parse()
                    .map_err(|_| AbiError::InvalidType(format!("invalid bytes size: {}", s)))?;
                if size == 0 || size > 32 {
                    return Err(AbiError::InvalidType(format!("bytes size must be 1-32: {}", size)));
                }
                Ok(AbiType::FixedBytes(size))
            }
            s if s.starts_with("uint") => Ok(AbiType::Uint(Self::parse_bits(&s[4..], 256, "uint")?)),
            s if s.starts_with("int") => Ok(AbiType::Int(Self::parse_bits(&s[3..], 256, "int")?)),
            _ => Err(AbiError::InvalidType(format!("unknown type: {}", s))),
        }
    }
}

impl fmt::Display for AbiType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical_type())
    }
}

/// Runtime value for an [`AbiType`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbiValue {
    Uint(U256),
    /// Signed values up to 128 bits, sign-extended on encode
    Int(i128),
    Address([u8; 20]),
    Bool(bool),
    FixedBytes(Vec<u8>),
    Bytes(Vec<u8>),
    String(String),
    Array(Vec<AbiValue>),
    Tuple(Vec<AbiValue>),
}

impl AbiValue {
    pub fn uint(value: u64) -> Self {
        AbiValue::Uint(U256::from_u64(value))
    }

    /// Parse an address with or without `0x`; checksum is not enforced here
    pub fn address_from_str(s: &str) -> Result<Self, AbiError> {
        let bytes = crate::encoding::hex::decode_array::<20>(s)
            .map_err(|e| AbiError::InvalidValue(format!("address: {}", e)))?;
        Ok(AbiValue::Address(bytes))
    }

    /// Best-effort type of the value, used in mismatch errors
    pub fn type_hint(&self) -> String {
        match self {
            AbiValue::Uint(_) => "uint".to_string(),
            AbiValue::Int(_) => "int".to_string(),
            AbiValue::Address(_) => "address".to_string(),
            AbiValue::Bool(_) => "bool".to_string(),
            AbiValue::FixedBytes(b) => format!("bytes{}", b.len()),
            AbiValue::Bytes(_) => "bytes".to_string(),
            AbiValue::String(_) => "string".to_string(),
            AbiValue::Array(values) => format!("array of {}", values.len()),
            AbiValue::Tuple(values) => format!("tuple of {}", values.len()),
        }
    }
}

/// ABI encoding errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AbiError {
    #[error("invalid type: {0}")]
    InvalidType(String),
    #[error("invalid value: {0}")]
    InvalidValue(String),
    #[error("type mismatch: expected {expected}, got {got}")]
    TypeMismatch { expected: String, got: String },
    #[error("value does not fit in {0} bits")]
    Overflow(usize),
    #[error("invalid signature: {0}")]
    InvalidSignature(String),
    #[error("decoding error: {0}")]
    Decoding(String),
}

impl From<AbiError> for EngineError {
    fn from(e: AbiError) -> Self {
        match e {
            AbiError::Decoding(msg) => EngineError::Decode(format!("abi: {}", msg)),
            other => EngineError::InvalidRequest(format!("abi: {}", other)),
        }
    }
}
