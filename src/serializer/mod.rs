//! Chain-native binary serializers
//!
//! Pure functions over typed inputs; nothing here talks to a signer or a
//! network. Builders in [`crate::builder`] assemble these into transactions.

pub mod rlp;
pub mod script;
pub mod utxo;
pub mod xrp;
