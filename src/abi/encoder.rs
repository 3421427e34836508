//! Head/tail ABI encoder

use super::selector::selector_from_signature;
use super::types::*;
use crate::encoding::U256;

/// Encode an unsigned integer into a 32-byte slot
pub fn encode_uint(value: U256) -> [u8; 32] {
    value.to_be_bytes()
}

/// Read an unsigned integer back from the first 32-byte slot of `data`
pub fn decode_uint(data: &[u8]) -> Result<U256, AbiError> {
    let slot: &[u8; 32] = data
        .get(..32)
        .and_then(|s| s.try_into().ok())
        .ok_or_else(|| AbiError::Decoding(format!("need 32 bytes, got {}", data.len())))?;
    Ok(U256::from_word(slot))
}

fn encode_int(value: i128, bits: usize) -> Result<[u8; 32], AbiError> {
    if bits < 128 {
        let bound = 1i128 << (bits - 1);
        if value < -bound || value >= bound {
            return Err(AbiError::Overflow(bits));
        }
    }
    let fill = if value < 0 { 0xff } else { 0x00 };
    let mut slot = [fill; 32];
    slot[16..].copy_from_slice(&value.to_be_bytes());
    Ok(slot)
}

// widths are whole bytes, so comparing trimmed lengths is exact
fn fits_bits(value: &U256, bits: usize) -> bool {
    value.to_be_bytes_trimmed().len() * 8 <= bits
}

/// ABI encoder
pub struct AbiEncoder;

impl AbiEncoder {
    /// Encode one value of a static or dynamic type
    pub fn encode_value(value: &AbiValue, abi_type: &AbiType) -> Result<Vec<u8>, AbiError> {
        match (value, abi_type) {
            (AbiValue::Uint(u), AbiType::Uint(bits)) => {
                if !fits_bits(u, *bits) {
                    return Err(AbiError::Overflow(*bits));
                }
                Ok(encode_uint(*u).to_vec())
            }
            (AbiValue::Int(i), AbiType::Int(bits)) => Ok(encode_int(*i, *bits)?.to_vec()),
            (AbiValue::Address(addr), AbiType::Address) => {
                let mut slot = [0u8; 32];
                slot[12..].copy_from_slice(addr);
                Ok(slot.to_vec())
            }
            (AbiValue::Bool(b), AbiType::Bool) => {
                let mut slot = [0u8; 32];
                slot[31] = u8::from(*b);
                Ok(slot.to_vec())
            }
            (AbiValue::FixedBytes(bytes), AbiType::FixedBytes(size)) => {
                if bytes.len() != *size {
                    return Err(AbiError::TypeMismatch {
                        expected: abi_type.canonical_type(),
                        got: value.type_hint(),
                    });
                }
                let mut slot = [0u8; 32];
                slot[..bytes.len()].copy_from_slice(bytes);
                Ok(slot.to_vec())
            }
            (AbiValue::Bytes(bytes), AbiType::Bytes) => Ok(Self::encode_dynamic_bytes(bytes)),
            (AbiValue::String(s), AbiType::String) => Ok(Self::encode_dynamic_bytes(s.as_bytes())),
            (AbiValue::Array(values), AbiType::Array(inner)) => {
                let mut out = encode_uint(U256::from_u64(values.len() as u64)).to_vec();
                let types = vec![(**inner).clone(); values.len()];
                out.extend_from_slice(&Self::encode_tuple(values, &types)?);
                Ok(out)
            }
            (AbiValue::Array(values), AbiType::FixedArray(inner, size)) => {
                if values.len() != *size {
                    return Err(AbiError::TypeMismatch {
                        expected: abi_type.canonical_type(),
                        got: value.type_hint(),
                    });
                }
                let types = vec![(**inner).clone(); values.len()];
                Self::encode_tuple(values, &types)
            }
            (AbiValue::Tuple(values), AbiType::Tuple(types)) => {
                if values.len() != types.len() {
                    return Err(AbiError::TypeMismatch {
                        expected: abi_type.canonical_type(),
                        got: value.type_hint(),
                    });
                }
                Self::encode_tuple(values, types)
            }
            _ => Err(AbiError::TypeMismatch {
                expected: abi_type.canonical_type(),
                got: value.type_hint(),
            }),
        }
    }

    /// Encode a parameter list
    pub fn encode(values: &[AbiValue], types: &[AbiType]) -> Result<Vec<u8>, AbiError> {
        if values.len() != types.len() {
            return Err(AbiError::InvalidValue(format!(
                "{} values for {} types",
                values.len(),
                types.len()
            )));
        }
        Self::encode_tuple(values, types)
    }

    fn encode_tuple(values: &[AbiValue], types: &[AbiType]) -> Result<Vec<u8>, AbiError> {
        let head_size: usize = types.iter().map(|t| t.head_size()).sum();
        let mut head = Vec::with_capacity(head_size);
        let mut tail = Vec::new();

        for (value, abi_type) in values.iter().zip(types) {
            let encoded = Self::encode_value(value, abi_type)?;
            if abi_type.is_dynamic() {
                let offset = (head_size + tail.len()) as u64;
                head.extend_from_slice(&encode_uint(U256::from_u64(offset)));
                tail.extend_from_slice(&encoded);
            } else {
                head.extend_from_slice(&encoded);
            }
        }

        head.extend_from_slice(&tail);
        Ok(head)
    }

    fn encode_dynamic_bytes(bytes: &[u8]) -> Vec<u8> {
        let padded = crate::encoding::padding::padded_len(bytes.len());
        let mut out = Vec::with_capacity(32 + padded);
        out.extend_from_slice(&encode_uint(U256::from_u64(bytes.len() as u64)));
        out.extend_from_slice(bytes);
        out.resize(32 + padded, 0);
        out
    }

    /// Selector followed by the encoded arguments, e.g. `transfer(address,uint256)`
    pub fn encode_call(signature: &str, values: &[AbiValue]) -> Result<Vec<u8>, AbiError> {
        let types = parse_signature_types(signature)?;
        let params = Self::encode(values, &types)?;

        let mut out = Vec::with_capacity(4 + params.len());
        out.extend_from_slice(&selector_from_signature(signature));
        out.extend_from_slice(&params);
        Ok(out)
    }
}

/// Parameter types of `name(type,...)`
pub fn parse_signature_types(signature: &str) -> Result<Vec<AbiType>, AbiError> {
    let start = signature
        .find('(')
        .ok_or_else(|| AbiError::InvalidSignature(format!("missing '(' in {}", signature)))?;
    let end = signature
        .rfind(')')
        .filter(|end| *end > start)
        .ok_or_else(|| AbiError::InvalidSignature(format!("missing ')' in {}", signature)))?;
    AbiType::split_components(&signature[start + 1..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_address_and_bool() {
        let mut addr = [0u8; 20];
        addr[0] = 0xde;
        addr[19] = 0xad;
        let encoded = AbiEncoder::encode_value(&AbiValue::Address(addr), &AbiType::Address).unwrap();
        assert_eq!(encoded[12], 0xde);
        assert_eq!(encoded[31], 0xad);

        let encoded = AbiEncoder::encode_value(&AbiValue::Bool(true), &AbiType::Bool).unwrap();
        assert_eq!(encoded[31], 1);
    }

    #[test]
    fn test_encode_negative_int() {
        let encoded = AbiEncoder::encode_value(&AbiValue::Int(-1), &AbiType::Int(256)).unwrap();
        assert_eq!(encoded, vec![0xff; 32]);
        assert_eq!(
            AbiEncoder::encode_value(&AbiValue::Int(128), &AbiType::Int(8)),
            Err(AbiError::Overflow(8))
        );
    }

    #[test]
    fn test_uint_width_is_checked() {
        assert_eq!(
            AbiEncoder::encode_value(&AbiValue::uint(256), &AbiType::Uint(8)),
            Err(AbiError::Overflow(8))
        );
        assert!(AbiEncoder::encode_value(&AbiValue::uint(255), &AbiType::Uint(8)).is_ok());
    }

    #[test]
    fn test_encode_fixed_bytes_right_padded() {
        let value = AbiValue::FixedBytes(vec![0xde, 0xad, 0xbe, 0xef]);
        let encoded = AbiEncoder::encode_value(&value, &AbiType::FixedBytes(4)).unwrap();
        assert_eq!(&encoded[..4], &[0xde, 0xad, 0xbe, 0xef]);
        assert!(encoded[4..].iter().all(|b| *b == 0));
    }

    #[test]
    fn test_encode_mixed_dynamic_static() {
        let values = vec![
            AbiValue::uint(42),
            AbiValue::String("test".to_string()),
            AbiValue::uint(100),
        ];
        let types = vec![AbiType::Uint(256), AbiType::String, AbiType::Uint(256)];
        let encoded = AbiEncoder::encode(&values, &types).unwrap();

        assert_eq!(encoded.len(), 160);
        assert_eq!(encoded[31], 42);
        assert_eq!(encoded[63], 96);
        assert_eq!(encoded[95], 100);
        assert_eq!(encoded[127], 4);
        assert_eq!(&encoded[128..132], b"test");
    }

    #[test]
    fn test_encode_dynamic_array() {
        let value = AbiValue::Array(vec![AbiValue::uint(1), AbiValue::uint(2)]);
        let encoded =
            AbiEncoder::encode_value(&value, &AbiType::Array(Box::new(AbiType::Uint(256)))).unwrap();
        assert_eq!(encoded.len(), 96);
        assert_eq!(encoded[31], 2);
        assert_eq!(encoded[95], 2);
    }

    #[test]
    fn test_decode_uint() {
        let slot = encode_uint(U256::from_u64(1000));
        assert_eq!(decode_uint(&slot).unwrap(), U256::from_u64(1000));
        assert!(matches!(decode_uint(&slot[..31]), Err(AbiError::Decoding(_))));
    }

    #[test]
    fn test_signature_types() {
        let types = parse_signature_types("swap((address,uint256),bytes)").unwrap();
        assert_eq!(types.len(), 2);
        assert!(parse_signature_types("broken").is_err());
        assert!(parse_signature_types("noargs()").unwrap().is_empty());
    }
}
