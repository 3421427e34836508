//! Contract-call encoding for EVM chains
//!
//! - Solidity types as [`AbiType`], runtime values as [`AbiValue`]
//! - Head/tail encoding of parameter lists
//! - 4-byte function selectors
//! - ERC-20 calldata helpers

pub mod types;
pub mod encoder;
pub mod selector;
pub mod erc20;


pub use types::*;
pub use encoder::*;
pub use selector::*;
