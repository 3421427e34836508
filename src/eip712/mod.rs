//! EIP-712 typed structured data hashing
//!
//! Produces `keccak256(0x19 0x01 ‖ domainSeparator ‖ hashStruct(message))`,
//! the 32-byte digest handed to a secp256k1 signer.
//!
//! # Reference
//! - <https://eips.ethereum.org/EIPS/eip-712>
//!
//! # Example
//! ```rust,ignore
//! use chain_tx_engine::eip712::{hash_typed_data, TypedData};
//!
//! let typed_data = TypedData::from_json(json_string)?;
//! let digest = hash_typed_data(&typed_data)?;
//! ```

pub mod types;
pub mod encoder;
pub mod hasher;

pub use types::*;
pub use encoder::*;
pub use hasher::*;
