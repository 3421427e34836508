//! Recursive Length Prefix encoding

use crate::encoding::bigint::U256;

pub fn encode_u64(val: u64) -> Vec<u8> {
    let bytes = val.to_be_bytes();
    let leading_zeros = bytes.iter().take_while(|&&b| b == 0).count();
    encode_bytes(&bytes[leading_zeros..])
}

pub fn encode_u256(val: &U256) -> Vec<u8> {
    encode_bytes(&val.to_be_bytes_trimmed())
}

pub fn encode_bytes(data: &[u8]) -> Vec<u8> {
    if data.len() == 1 && data[0] < 0x80 {
        return data.to_vec();
    }

    let mut result = encode_header(0x80, 0xb7, data.len());
    result.extend_from_slice(data);
    result
}

/// Wrap already-encoded items in a list
pub fn encode_list(items: &[Vec<u8>]) -> Vec<u8> {
    let payload_len = items.iter().map(Vec::len).sum();
    let mut result = encode_header(0xc0, 0xf7, payload_len);
    for item in items {
        result.extend_from_slice(item);
    }
    result
}

fn encode_header(short_base: u8, long_base: u8, len: usize) -> Vec<u8> {
    if len < 56 {
        return vec![short_base + len as u8];
    }
    let len_bytes = encode_length(len);
    let mut result = Vec::with_capacity(1 + len_bytes.len() + len);
    result.push(long_base + len_bytes.len() as u8);
    result.extend_from_slice(&len_bytes);
    result
}

fn encode_length(len: usize) -> Vec<u8> {
    let bytes = len.to_be_bytes();
    let leading_zeros = bytes.iter().take_while(|&&b| b == 0).count();
    bytes[leading_zeros..].to_vec()
}
