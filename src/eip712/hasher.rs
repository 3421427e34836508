//! Domain separator and final digest

use super::encoder::{encode_data, encode_field};
use super::types::*;
use crate::crypto::hash::keccak256;
use std::collections::HashMap;

const EIP712_PREFIX: &[u8] = b"\x19\x01";
const DOMAIN_TYPE: &str = "EIP712Domain";

/// `hashStruct(eip712Domain)` over the fields present in `domain`
pub fn domain_separator(domain: &Eip712Domain) -> Result<[u8; 32], Eip712Error> {
    let mut types = HashMap::new();
    types.insert(DOMAIN_TYPE.to_string(), domain.fields());

    let value = serde_json::to_value(domain).map_err(|e| Eip712Error::InvalidJson(e.to_string()))?;
    Ok(keccak256(&encode_data(DOMAIN_TYPE, &value, &types)?))
}

/// `keccak256(typeHash ‖ encodeData(s))`
pub fn hash_struct(
    type_name: &str,
    data: &serde_json::Value,
    types: &HashMap<String, Vec<TypedDataField>>,
) -> Result<[u8; 32], Eip712Error> {
    encode_field(type_name, data, types)
}

/// Intermediate hashes, exposed for signers that display them
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Eip712PreImage {
    pub domain_separator: [u8; 32],
    pub struct_hash: [u8; 32],
    pub final_hash: [u8; 32],
}

pub fn pre_image(typed_data: &TypedData) -> Result<Eip712PreImage, Eip712Error> {
    typed_data.validate()?;

    let domain_separator = domain_separator(&typed_data.domain)?;
    let struct_hash = hash_struct(&typed_data.primary_type, &typed_data.message, &typed_data.types)?;

    let mut data = Vec::with_capacity(2 + 32 + 32);
    data.extend_from_slice(EIP712_PREFIX);
    data.extend_from_slice(&domain_separator);
    data.extend_from_slice(&struct_hash);

    Ok(Eip712PreImage {
        domain_separator,
        struct_hash,
        final_hash: keccak256(&data),
    })
}

/// `keccak256(0x19 0x01 ‖ domainSeparator ‖ hashStruct(message))`
pub fn hash_typed_data(typed_data: &TypedData) -> Result<[u8; 32], Eip712Error> {
    Ok(pre_image(typed_data)?.final_hash)
}
