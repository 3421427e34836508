//! ERC-20 calldata

use super::encoder::AbiEncoder;
use super::types::{AbiError, AbiValue};
use crate::encoding::U256;

pub fn transfer(to: [u8; 20], amount: U256) -> Result<Vec<u8>, AbiError> {
    AbiEncoder::encode_call(
        "transfer(address,uint256)",
        &[AbiValue::Address(to), AbiValue::Uint(amount)],
    )
}

pub fn approve(spender: [u8; 20], amount: U256) -> Result<Vec<u8>, AbiError> {
    AbiEncoder::encode_call(
        "approve(address,uint256)",
        &[AbiValue::Address(spender), AbiValue::Uint(amount)],
    )
}

pub fn balance_of(owner: [u8; 20]) -> Result<Vec<u8>, AbiError> {
    AbiEncoder::encode_call("balanceOf(address)", &[AbiValue::Address(owner)])
}

pub fn allowance(owner: [u8; 20], spender: [u8; 20]) -> Result<Vec<u8>, AbiError> {
    AbiEncoder::encode_call(
        "allowance(address,address)",
        &[AbiValue::Address(owner), AbiValue::Address(spender)],
    )
}
