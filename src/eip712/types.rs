//! Typed data definitions

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::EngineError;

/// A field in a struct type definition
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TypedDataField {
    pub name: String,
    /// e.g. "address", "uint256", "Person[]"
    #[serde(rename = "type")]
    pub type_name: String,
}

impl TypedDataField {
    pub fn new(name: &str, type_name: &str) -> Self {
        Self {
            name: name.to_string(),
            type_name: type_name.to_string(),
        }
    }
}

/// Domain values; only present fields take part in the separator
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Eip712Domain {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Number, decimal string or hex string
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<serde_json::Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub verifying_contract: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub salt: Option<String>,
}

impl Eip712Domain {
    /// `EIP712Domain` fields in canonical order, restricted to present values
    pub fn fields(&self) -> Vec<TypedDataField> {
        let mut fields = Vec::new();
        if self.name.is_some() {
            fields.push(TypedDataField::new("name", "string"));
        }
        if self.version.is_some() {
            fields.push(TypedDataField::new("version", "string"));
        }
        if self.chain_id.is_some() {
            fields.push(TypedDataField::new("chainId", "uint256"));
        }
        if self.verifying_contract.is_some() {
            fields.push(TypedDataField::new("verifyingContract", "address"));
        }
        if self.salt.is_some() {
            fields.push(TypedDataField::new("salt", "bytes32"));
        }
        fields
    }
}

/// Complete `eth_signTypedData_v4` payload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypedData {
    /// Struct name to fields
    pub types: HashMap<String, Vec<TypedDataField>>,
    pub primary_type: String,
    pub domain: Eip712Domain,
    pub message: serde_json::Value,
}

impl TypedData {
    pub fn from_json(json: &str) -> Result<Self, Eip712Error> {
        serde_json::from_str(json).map_err(|e| Eip712Error::InvalidJson(e.to_string()))
    }

    /// Primary type must be defined and every referenced type resolvable
    pub fn validate(&self) -> Result<(), Eip712Error> {
        if !self.types.contains_key(&self.primary_type) {
            return Err(Eip712Error::InvalidPrimaryType(self.primary_type.clone()));
        }
        for fields in self.types.values() {
            for field in fields {
                let base = super::encoder::base_type(&field.type_name);
                if !is_atomic_type(base) && !is_dynamic_type(base) && !self.types.contains_key(base) {
                    return Err(Eip712Error::InvalidType(field.type_name.clone()));
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Eip712Error {
    #[error("invalid JSON: {0}")]
    InvalidJson(String),

    #[error("invalid type: {0}")]
    InvalidType(String),

    #[error("invalid primary type: {0}")]
    InvalidPrimaryType(String),

    #[error("missing field: {0}")]
    MissingField(String),

    #[error("invalid value for type {type_name}: {value}")]
    InvalidValue { type_name: String, value: String },

    #[error("invalid address: {0}")]
    InvalidAddress(String),
}

impl Eip712Error {
    pub(crate) fn invalid_value(type_name: &str, value: impl ToString) -> Self {
        Eip712Error::InvalidValue {
            type_name: type_name.to_string(),
            value: value.to_string(),
        }
    }
}

impl From<Eip712Error> for EngineError {
    fn from(e: Eip712Error) -> Self {
        match e {
            Eip712Error::InvalidAddress(msg) => EngineError::InvalidAddress(msg),
            other => EngineError::InvalidRequest(format!("eip712: {}", other)),
        }
    }
}

/// Fixed-size types: address, bool, uintN, intN, bytesN
pub fn is_atomic_type(type_name: &str) -> bool {
    match type_name {
        "address" | "bool" => true,
        t if t.starts_with("uint") => valid_int_bits(&t[4..]),
        t if t.starts_with("int") => valid_int_bits(&t[3..]),
        t if t.starts_with("bytes") && t != "bytes" => t[5..]
            .parse::<u32>()
            .map(|n| (1..=32).contains(&n))
            .unwrap_or(false),
        _ => false,
    }
}

fn valid_int_bits(bits: &str) -> bool {
    bits.parse::<u32>()
        .map(|n| n > 0 && n <= 256 && n % 8 == 0)
        .unwrap_or(false)
}

pub fn is_dynamic_type(type_name: &str) -> bool {
    type_name == "bytes" || type_name == "string"
}
