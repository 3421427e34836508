//! Numeric and text encoding primitives
//!
//! Leaf module: nothing here depends on the rest of the engine except the
//! error type.

pub mod base58;
pub mod bigint;
pub mod hex;
pub mod lenient;
pub mod padding;

pub use base58::Base58Alphabet;
pub use bigint::U256;
pub use lenient::{parse_lenient, LenientParse};
