//! Type and data encoding

use super::types::*;
use crate::crypto::hash::keccak256;
use crate::encoding::U256;
use std::collections::{BTreeSet, HashMap};

type Types = HashMap<String, Vec<TypedDataField>>;

/// `Person[]` -> `Person`, `uint256[2][]` -> `uint256`
pub fn base_type(type_name: &str) -> &str {
    match type_name.find('[') {
        Some(pos) => &type_name[..pos],
        None => type_name,
    }
}

/// `Primary(fields)` followed by every referenced struct, alphabetically
pub fn encode_type(type_name: &str, types: &Types) -> Result<String, Eip712Error> {
    let fields = types
        .get(type_name)
        .ok_or_else(|| Eip712Error::InvalidType(type_name.to_string()))?;

    let mut result = format_type(type_name, fields);
    for dep in find_type_dependencies(type_name, types) {
        if dep == type_name {
            continue;
        }
        if let Some(dep_fields) = types.get(&dep) {
            result.push_str(&format_type(&dep, dep_fields));
        }
    }
    Ok(result)
}

fn format_type(type_name: &str, fields: &[TypedDataField]) -> String {
    let fields: Vec<String> = fields
        .iter()
        .map(|f| format!("{} {}", f.type_name, f.name))
        .collect();
    format!("{}({})", type_name, fields.join(","))
}

/// Struct types reachable from `type_name`, itself included
pub fn find_type_dependencies(type_name: &str, types: &Types) -> BTreeSet<String> {
    let mut found = BTreeSet::new();
    let mut to_visit = vec![type_name.to_string()];

    while let Some(current) = to_visit.pop() {
        if found.contains(&current) {
            continue;
        }
        if let Some(fields) = types.get(&current) {
            found.insert(current);
            for field in fields {
                let base = base_type(&field.type_name);
                if types.contains_key(base) && !found.contains(base) {
                    to_visit.push(base.to_string());
                }
            }
        }
    }
    found
}

pub fn type_hash(type_name: &str, types: &Types) -> Result<[u8; 32], Eip712Error> {
    Ok(keccak256(encode_type(type_name, types)?.as_bytes()))
}

/// `typeHash ‖ enc(field_1) ‖ ... ‖ enc(field_n)`
pub fn encode_data(
    type_name: &str,
    value: &serde_json::Value,
    types: &Types,
) -> Result<Vec<u8>, Eip712Error> {
    let obj = value
        .as_object()
        .ok_or_else(|| Eip712Error::invalid_value(type_name, value))?;
    let fields = types
        .get(type_name)
        .ok_or_else(|| Eip712Error::InvalidType(type_name.to_string()))?;

    let mut encoded = Vec::with_capacity(32 * (fields.len() + 1));
    encoded.extend_from_slice(&type_hash(type_name, types)?);
    for field in fields {
        let field_value = obj
            .get(&field.name)
            .ok_or_else(|| Eip712Error::MissingField(format!("{}.{}", type_name, field.name)))?;
        encoded.extend_from_slice(&encode_field(&field.type_name, field_value, types)?);
    }
    Ok(encoded)
}

/// One 32-byte word; dynamic values, structs and arrays are hashed
pub fn encode_field(
    type_name: &str,
    value: &serde_json::Value,
    types: &Types,
) -> Result<[u8; 32], Eip712Error> {
    if type_name.ends_with(']') {
        return encode_array(type_name, value, types);
    }
    match type_name {
        "string" => {
            let s = value
                .as_str()
                .ok_or_else(|| Eip712Error::invalid_value(type_name, value))?;
            Ok(keccak256(s.as_bytes()))
        }
        "bytes" => Ok(keccak256(&parse_hex(type_name, value)?)),
        t if types.contains_key(t) => Ok(keccak256(&encode_data(t, value, types)?)),
        t => encode_atomic(t, value),
    }
}

fn encode_array(
    type_name: &str,
    value: &serde_json::Value,
    types: &Types,
) -> Result<[u8; 32], Eip712Error> {
    let items = value
        .as_array()
        .ok_or_else(|| Eip712Error::invalid_value(type_name, value))?;
    let open = type_name
        .rfind('[')
        .ok_or_else(|| Eip712Error::InvalidType(type_name.to_string()))?;
    let element_type = &type_name[..open];
    let size = &type_name[open + 1..type_name.len() - 1];

    if !size.is_empty() {
        let expected: usize = size
            .parse()
            .map_err(|_| Eip712Error::InvalidType(type_name.to_string()))?;
        if expected != items.len() {
            return Err(Eip712Error::invalid_value(
                type_name,
                format!("{} elements", items.len()),
            ));
        }
    }

    let mut encoded = Vec::with_capacity(32 * items.len());
    for item in items {
        encoded.extend_from_slice(&encode_field(element_type, item, types)?);
    }
    Ok(keccak256(&encoded))
}

fn encode_atomic(type_name: &str, value: &serde_json::Value) -> Result<[u8; 32], Eip712Error> {
    let mut word = [0u8; 32];

    if type_name == "address" {
        let s = value
            .as_str()
            .ok_or_else(|| Eip712Error::invalid_value(type_name, value))?;
        let address = crate::encoding::hex::decode_array::<20>(s)
            .map_err(|e| Eip712Error::InvalidAddress(format!("{}: {}", s, e)))?;
        word[12..].copy_from_slice(&address);
        return Ok(word);
    }

    if type_name == "bool" {
        let b = value
            .as_bool()
            .ok_or_else(|| Eip712Error::invalid_value(type_name, value))?;
        word[31] = u8::from(b);
        return Ok(word);
    }

    if let Some(bits) = type_name.strip_prefix("uint") {
        let bits: usize = bits
            .parse()
            .map_err(|_| Eip712Error::InvalidType(type_name.to_string()))?;
        let n = parse_uint(type_name, value)?;
        if n.to_be_bytes_trimmed().len() * 8 > bits {
            return Err(Eip712Error::invalid_value(type_name, value));
        }
        return Ok(n.to_be_bytes());
    }

    if let Some(bits) = type_name.strip_prefix("int") {
        let bits: u32 = bits
            .parse()
            .ok()
            .filter(|bits| (1..=256).contains(bits))
            .ok_or_else(|| Eip712Error::InvalidType(type_name.to_string()))?;
        let (negative, magnitude) = parse_int(type_name, value)?;
        let limit = U256::pow2(bits - 1).ok_or_else(|| Eip712Error::InvalidType(type_name.to_string()))?;
        let in_range = if negative { magnitude <= limit } else { magnitude < limit };
        if !in_range {
            return Err(Eip712Error::invalid_value(type_name, value));
        }
        let encoded = if negative { magnitude.wrapping_neg() } else { magnitude };
        return Ok(encoded.to_be_bytes());
    }

    if let Some(size) = type_name.strip_prefix("bytes") {
        let size: usize = size
            .parse()
            .map_err(|_| Eip712Error::InvalidType(type_name.to_string()))?;
        let bytes = parse_hex(type_name, value)?;
        if bytes.len() > size {
            return Err(Eip712Error::invalid_value(
                type_name,
                format!("{} bytes", bytes.len()),
            ));
        }
        word[..bytes.len()].copy_from_slice(&bytes);
        return Ok(word);
    }

    Err(Eip712Error::InvalidType(type_name.to_string()))
}

/// Number, decimal string or `0x` hex string
fn parse_uint(type_name: &str, value: &serde_json::Value) -> Result<U256, Eip712Error> {
    let parsed = match value {
        serde_json::Value::Number(n) => match n.as_u64() {
            Some(u) => Ok(U256::from_u64(u)),
            None => U256::from_dec(&n.to_string()),
        },
        serde_json::Value::String(s) => U256::parse(s),
        _ => return Err(Eip712Error::invalid_value(type_name, value)),
    };
    parsed.map_err(|_| Eip712Error::invalid_value(type_name, value))
}

/// Sign and magnitude of a number, decimal string or `0x` hex string
fn parse_int(type_name: &str, value: &serde_json::Value) -> Result<(bool, U256), Eip712Error> {
    let parsed = match value {
        serde_json::Value::Number(n) => match (n.as_i64(), n.as_u64()) {
            (Some(i), _) => Some((i < 0, U256::from_u64(i.unsigned_abs()))),
            (None, Some(u)) => Some((false, U256::from_u64(u))),
            _ => None,
        },
        serde_json::Value::String(s) => {
            let (negative, digits) = match s.strip_prefix('-') {
                Some(rest) => (true, rest),
                None => (false, s.as_str()),
            };
            U256::parse(digits).ok().map(|n| (negative, n))
        }
        _ => None,
    };
    parsed.ok_or_else(|| Eip712Error::invalid_value(type_name, value))
}

fn parse_hex(type_name: &str, value: &serde_json::Value) -> Result<Vec<u8>, Eip712Error> {
    let s = value
        .as_str()
        .ok_or_else(|| Eip712Error::invalid_value(type_name, value))?;
    crate::encoding::hex::decode(s).map_err(|_| Eip712Error::invalid_value(type_name, s))
}

#[cfg(test)]
mod encoder_tests {
    use super::*;
    use serde_json::json;

    fn mail_types() -> Types {
        let mut types = HashMap::new();
        types.insert(
            "Mail".to_string(),
            vec![
                TypedDataField::new("from", "Person"),
                TypedDataField::new("to", "Person"),
                TypedDataField::new("contents", "string"),
            ],
        );
        types.insert(
            "Person".to_string(),
            vec![
                TypedDataField::new("name", "string"),
                TypedDataField::new("wallet", "address"),
            ],
        );
        types
    }

    #[test]
    fn test_encode_type_with_dependencies() {
        assert_eq!(
            encode_type("Mail", &mail_types()).unwrap(),
            "Mail(Person from,Person to,string contents)Person(string name,address wallet)"
        );
    }

    #[test]
    fn test_base_type() {
        assert_eq!(base_type("Person[]"), "Person");
        assert_eq!(base_type("uint256[2][]"), "uint256");
        assert_eq!(base_type("address"), "address");
    }

    #[test]
    fn test_full_width_uint() {
        let max = "0xffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffffff";
        let word = encode_field("uint256", &json!(max), &Types::new()).unwrap();
        assert_eq!(word, [0xff; 32]);
        assert!(encode_field("uint8", &json!(256), &Types::new()).is_err());
    }

    #[test]
    fn test_negative_int_is_sign_extended() {
        let word = encode_field("int256", &json!(-2), &Types::new()).unwrap();
        assert_eq!(word[0], 0xff);
        assert_eq!(word[31], 0xfe);
    }

    #[test]
    fn test_int256_uses_full_width() {
        let min = "-57896044618658097711785492504343953926634992332820282019728792003956564819968";
        let word = encode_field("int256", &json!(min), &Types::new()).unwrap();
        let mut expected = [0u8; 32];
        expected[0] = 0x80;
        assert_eq!(word, expected);

        let max = "57896044618658097711785492504343953926634992332820282019728792003956564819967";
        let word = encode_field("int256", &json!(max), &Types::new()).unwrap();
        let mut expected = [0xff; 32];
        expected[0] = 0x7f;
        assert_eq!(word, expected);

        let beyond = "57896044618658097711785492504343953926634992332820282019728792003956564819968";
        assert!(encode_field("int256", &json!(beyond), &Types::new()).is_err());
        assert!(encode_field("int8", &json!(-129), &Types::new()).is_err());
        assert_eq!(encode_field("int8", &json!(-128), &Types::new()).unwrap()[31], 0x80);
        assert!(encode_field("int8", &json!(128), &Types::new()).is_err());
    }

    #[test]
    fn test_missing_field() {
        let err = encode_data("Person", &json!({"name": "Cow"}), &mail_types()).unwrap_err();
        assert_eq!(err, Eip712Error::MissingField("Person.wallet".to_string()));
    }

    #[test]
    fn test_fixed_array_length_checked() {
        let err = encode_field("uint8[2]", &json!([1, 2, 3]), &Types::new());
        assert!(matches!(err, Err(Eip712Error::InvalidValue { .. })));
    }
}
