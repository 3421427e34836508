//! EVM transactions
//!
//! Legacy transactions are signed with EIP-155 replay protection:
//! `keccak256(rlp([nonce, gasPrice, gasLimit, to, value, data, chainId, 0, 0]))`.
//! EIP-1559 transactions sign
//! `keccak256(0x02 || rlp([chainId, nonce, maxPriorityFeePerGas, maxFeePerGas, gasLimit, to, value, data, accessList]))`
//! with an empty access list.

use serde::{Deserialize, Serialize};

use crate::abi::erc20;
use crate::address::ethereum::parse_address;
use crate::crypto::hash::keccak256;
use crate::crypto::signature::{self, RecoveredSignature, VPolicy};
use crate::encoding::U256;
use crate::error::{EngineError, EngineResult};
use crate::serializer::rlp;
use crate::types::{
    AmountKind, Chain, ChainState, FeeParameters, PublicKeyMaterial, RawSignature, RawTransaction,
    SigningPayload, TransactionParams, TransactionRequest,
};

const EIP1559_TX_TYPE: u8 = 0x02;

/// Gas pricing of a transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EvmGas {
    Legacy {
        gas_price: U256,
    },
    Eip1559 {
        max_fee_per_gas: U256,
        priority_fee: U256,
    },
}

/// Unsigned EVM transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvmTransaction {
    pub chain_id: u64,
    pub nonce: u64,
    pub gas_limit: u64,
    pub gas: EvmGas,
    pub to: [u8; 20],
    /// Value in wei
    pub value: U256,
    pub data: Vec<u8>,
}

impl EvmTransaction {
    pub fn is_typed(&self) -> bool {
        matches!(self.gas, EvmGas::Eip1559 { .. })
    }

    /// How `v` is written into the signed form
    pub fn v_policy(&self) -> VPolicy {
        match self.gas {
            EvmGas::Legacy { .. } => VPolicy::Eip155 {
                chain_id: self.chain_id,
            },
            EvmGas::Eip1559 { .. } => VPolicy::Parity,
        }
    }

    /// RLP items shared by the unsigned and signed forms
    fn items(&self) -> Vec<Vec<u8>> {
        let mut items = Vec::with_capacity(12);
        match &self.gas {
            EvmGas::Legacy { gas_price } => {
                items.push(rlp::encode_u64(self.nonce));
                items.push(rlp::encode_u256(gas_price));
                items.push(rlp::encode_u64(self.gas_limit));
                items.push(rlp::encode_bytes(&self.to));
                items.push(rlp::encode_u256(&self.value));
                items.push(rlp::encode_bytes(&self.data));
            }
            EvmGas::Eip1559 {
                max_fee_per_gas,
                priority_fee,
            } => {
                items.push(rlp::encode_u64(self.chain_id));
                items.push(rlp::encode_u64(self.nonce));
                items.push(rlp::encode_u256(priority_fee));
                items.push(rlp::encode_u256(max_fee_per_gas));
                items.push(rlp::encode_u64(self.gas_limit));
                items.push(rlp::encode_bytes(&self.to));
                items.push(rlp::encode_u256(&self.value));
                items.push(rlp::encode_bytes(&self.data));
                // access list
                items.push(rlp::encode_list(&[]));
            }
        }
        items
    }

    fn envelope(&self, items: &[Vec<u8>]) -> Vec<u8> {
        let list = rlp::encode_list(items);
        if self.is_typed() {
            let mut out = Vec::with_capacity(list.len() + 1);
            out.push(EIP1559_TX_TYPE);
            out.extend_from_slice(&list);
            out
        } else {
            list
        }
    }

    /// Bytes whose keccak256 is signed
    pub fn signing_preimage(&self) -> Vec<u8> {
        let mut items = self.items();
        if !self.is_typed() {
            items.push(rlp::encode_u64(self.chain_id));
            items.push(rlp::encode_u64(0));
            items.push(rlp::encode_u64(0));
        }
        self.envelope(&items)
    }

    pub fn signing_hash(&self) -> [u8; 32] {
        keccak256(&self.signing_preimage())
    }

    /// Signed encoding; `r` and `s` are written as minimal integers
    pub fn encode_signed(&self, signature: &EvmSignature) -> Vec<u8> {
        let mut items = self.items();
        items.push(rlp::encode_u64(signature.v));
        items.push(rlp::encode_u256(&U256::from_word(&signature.r())));
        items.push(rlp::encode_u256(&U256::from_word(&signature.s())));
        self.envelope(&items)
    }
}

/// Low-S signature with the `v` the transaction type expects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvmSignature {
    pub recovered: RecoveredSignature,
    pub v: u64,
}

impl EvmSignature {
    pub fn r(&self) -> [u8; 32] {
        let mut r = [0u8; 32];
        r.copy_from_slice(self.recovered.r());
        r
    }

    pub fn s(&self) -> [u8; 32] {
        let mut s = [0u8; 32];
        s.copy_from_slice(self.recovered.s());
        s
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedEvm {
    pub transaction: EvmTransaction,
}

/// Builds coin transfers, ERC-20 transfers and contract calls for one chain
#[derive(Debug, Clone)]
pub struct EvmBuilder {
    chain: Chain,
    chain_id: u64,
}

impl EvmBuilder {
    pub fn new(chain: Chain, chain_id: u64) -> Self {
        Self { chain, chain_id }
    }

    pub fn for_chain(chain: Chain) -> Option<Self> {
        chain.chain_id().map(|id| Self::new(chain, id))
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Calldata for `approve(spender, amount)`; only EVM chains have it
    pub fn approve_data(chain: Chain, spender: &str, amount: U256) -> EngineResult<Vec<u8>> {
        if !chain.is_evm() {
            return Err(EngineError::invalid_request(format!(
                "{} has no token approvals",
                chain
            )));
        }
        Ok(erc20::approve(parse_address(spender)?, amount)?)
    }

    pub fn prepare(
        &self,
        request: &TransactionRequest,
        state: &ChainState,
    ) -> EngineResult<(PreparedEvm, SigningPayload)> {
        let (nonce_override, raw_data) = match &request.params {
            TransactionParams::Evm { nonce, data } => (*nonce, data.clone()),
            TransactionParams::None => (None, None),
            other => {
                return Err(EngineError::invalid_request(format!(
                    "unexpected parameters for an EVM transaction: {:?}",
                    other
                )))
            }
        };
        let nonce = match (nonce_override, state) {
            (Some(nonce), _) => nonce,
            (None, ChainState::Evm { nonce }) => *nonce,
            (None, other) => {
                return Err(EngineError::invalid_request(format!(
                    "expected EVM chain state, got {:?}",
                    other
                )))
            }
        };

        let (gas_limit, gas) = match &request.fee.parameters {
            FeeParameters::EvmLegacy {
                gas_limit,
                gas_price,
            } => (
                *gas_limit,
                EvmGas::Legacy {
                    gas_price: *gas_price,
                },
            ),
            FeeParameters::Eip1559 {
                gas_limit,
                max_fee_per_gas,
                priority_fee,
            } => {
                if priority_fee > max_fee_per_gas {
                    return Err(EngineError::invalid_request(format!(
                        "priority fee {} exceeds max fee {}",
                        priority_fee, max_fee_per_gas
                    )));
                }
                (
                    *gas_limit,
                    EvmGas::Eip1559 {
                        max_fee_per_gas: *max_fee_per_gas,
                        priority_fee: *priority_fee,
                    },
                )
            }
            other => {
                return Err(EngineError::invalid_request(format!(
                    "EVM transaction needs gas parameters, got {:?}",
                    other
                )))
            }
        };

        let destination = parse_address(&request.destination_address)?;
        let units = request.amount.to_minor_units()?;
        let (to, value, data) = match &request.amount.kind {
            AmountKind::Token { contract_address } => {
                if raw_data.is_some() {
                    return Err(EngineError::invalid_request(
                        "token transfers cannot carry extra call data",
                    ));
                }
                let contract = parse_address(contract_address)?;
                (contract, U256::ZERO, erc20::transfer(destination, units)?)
            }
            AmountKind::Coin => (destination, units, raw_data.unwrap_or_default()),
            other => {
                return Err(EngineError::invalid_request(format!(
                    "{:?} amounts cannot be sent",
                    other
                )))
            }
        };

        let transaction = EvmTransaction {
            chain_id: self.chain_id,
            nonce,
            gas_limit,
            gas,
            to,
            value,
            data,
        };
        let hash = transaction.signing_hash();
        tracing::debug!(
            chain = %self.chain,
            nonce,
            typed = transaction.is_typed(),
            "prepared EVM transaction"
        );

        let description = format!(
            "{} tx {} wei to {}",
            self.chain,
            transaction.value,
            crate::encoding::hex::encode_prefixed(transaction.to)
        );
        Ok((
            PreparedEvm { transaction },
            SigningPayload::single(hash.to_vec(), description),
        ))
    }
}

impl PreparedEvm {
    /// Normalize the single signature and derive `v` by key recovery
    pub fn encode_signature(
        &self,
        payload: &SigningPayload,
        signatures: &[RawSignature],
        key: &PublicKeyMaterial,
    ) -> EngineResult<EvmSignature> {
        let (entry, raw) = match (payload.entries.as_slice(), signatures) {
            ([entry], [raw]) => (entry, raw),
            _ => {
                return Err(EngineError::signature(format!(
                    "{} signatures for {} payload entries",
                    signatures.len(),
                    payload.len()
                )))
            }
        };
        let (recovered, v) = signature::to_evm_signature(
            &entry.data,
            raw,
            key.signing_key(),
            self.transaction.v_policy(),
        )?;
        Ok(EvmSignature { recovered, v })
    }

    pub fn finalize(&self, signature: &EvmSignature) -> RawTransaction {
        let bytes = self.transaction.encode_signed(signature);
        let hash = crate::encoding::hex::encode_prefixed(keccak256(&bytes));
        RawTransaction {
            bytes,
            hash: Some(hash),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Amount, Fee};
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn request(amount: Amount, parameters: FeeParameters, destination: &str) -> TransactionRequest {
        TransactionRequest {
            amount,
            fee: Fee {
                amount: Amount::from_minor_units(Chain::Ethereum, 0),
                parameters,
            },
            source_address: "0xb1123efF798183B7Cb32F62607D3D39E950d9cc3".to_string(),
            destination_address: destination.to_string(),
            change_address: None,
            params: TransactionParams::None,
        }
    }

    fn signed(prepared: &PreparedEvm, payload: &SigningPayload, key: &str, sig: &str) -> RawTransaction {
        let key = PublicKeyMaterial::new(hex::decode(key).unwrap(), crate::types::Curve::Secp256k1);
        let raw = RawSignature::from_bytes(hex::decode(sig).unwrap()).unwrap();
        let signature = prepared.encode_signature(payload, &[raw], &key).unwrap();
        prepared.finalize(&signature)
    }

    #[test]
    fn test_legacy_coin_transfer() {
        let req = request(
            Amount::coin(Chain::Ethereum, Decimal::from_str("0.1").unwrap()),
            FeeParameters::EvmLegacy {
                gas_limit: 21000,
                gas_price: U256::from_u64(476_190_476_190),
            },
            "0x7655b9b19ffab8b897f836857dae22a1e7f8d735",
        );
        let builder = EvmBuilder::new(Chain::Ethereum, 1);
        let (prepared, payload) = builder.prepare(&req, &ChainState::Evm { nonce: 15 }).unwrap();

        assert_eq!(
            hex::encode(&payload.entries[0].data),
            "bdbecf64b443f82d1f9fda3f2d6ba69af6d82029b8271339b7e775613ae57761"
        );

        let tx = signed(
            &prepared,
            &payload,
            "04EB30400CE9D1DEED12B84D4161A1FA922EF4185A155EF3EC208078B3807B126FA22C335081AAEBF161095C11C7D8BD550EF8882A3125B0EE9AE96DDDE1AE743F",
            "B945398FB90158761F6D61789B594D042F0F490F9656FBFFAE8F18B49D5F30054F43EE43CCAB2703F0E2E4E61D99CF3D4A875CD759569787CF0AED02415434C6",
        );
        assert_eq!(
            tx.to_hex(),
            "f86c0f856edf2a079e825208947655b9b19ffab8b897f836857dae22a1e7f8d73588016345785d8a00008025a0b945398fb90158761f6d61789b594d042f0f490f9656fbffae8f18b49d5f3005a04f43ee43ccab2703f0e2e4e61d99cf3d4a875cd759569787cf0aed02415434c6"
        );
    }

    #[test]
    fn test_eip1559_token_transfer() {
        let amount = Amount::token(
            "USDT",
            "0xc2132d05d31c914a87c6611c10748aeb04b58e8f",
            6,
            Decimal::ONE,
        );
        let req = request(
            amount,
            FeeParameters::Eip1559 {
                gas_limit: 47525,
                max_fee_per_gas: U256::from_u64(138_077_377_799),
                priority_fee: U256::from_u64(30_000_000_000),
            },
            "0x90e4d59c8583e37426b37d1d7394b6008a987c67",
        );
        let builder = EvmBuilder::new(Chain::Polygon, 137);
        let (prepared, payload) = builder.prepare(&req, &ChainState::Evm { nonce: 195 }).unwrap();

        assert_eq!(prepared.transaction.value, U256::ZERO);
        assert_eq!(
            hex::encode(&payload.entries[0].data),
            "7843727fd03b42156222548815759dda5ac888033372157edffdde58fc05eff5"
        );

        let tx = signed(
            &prepared,
            &payload,
            "043b08e56e38404199eb3320f32fdc7557029d4a4c39adae01cc47afd86cfa9a25fcbfaa2acda3ab33560a1d482a2088f3bb2c7b313fd11f50dd8fe508165d4ecf",
            "b8291b199416b39434f3c3b8cfd273afb41fa25f2ae66f8a4c56b08ad1749a122148b8bbbdeb7761031799ffbcbc7c0ee1dd4482f516bd6a33387ea5bce8cb7d",
        );
        assert_eq!(
            tx.to_hex(),
            "02f8b3818981c38506fc23ac008520260d950782b9a594c2132d05d31c914a87c6611c10748aeb04b58e8f80b844a9059cbb00000000000000000000000090e4d59c8583e37426b37d1d7394b6008a987c6700000000000000000000000000000000000000000000000000000000000f4240c080a0b8291b199416b39434f3c3b8cfd273afb41fa25f2ae66f8a4c56b08ad1749a12a02148b8bbbdeb7761031799ffbcbc7c0ee1dd4482f516bd6a33387ea5bce8cb7d"
        );
    }

    #[test]
    fn test_eip1559_approve_call() {
        let data = EvmBuilder::approve_data(
            Chain::Base,
            "0x111111125421cA6dc452d289314280a0f8842A65",
            U256::MAX,
        )
        .unwrap();
        let mut req = request(
            Amount::coin(Chain::Base, Decimal::ZERO),
            FeeParameters::Eip1559 {
                gas_limit: 47000,
                max_fee_per_gas: U256::from_u64(7_250_107),
                priority_fee: U256::from_u64(2_000_000),
            },
            "0x940181a94a35a4569e4529a3cdfb74e38fd98631",
        );
        req.params = TransactionParams::Evm {
            nonce: Some(10),
            data: Some(data),
        };

        let builder = EvmBuilder::new(Chain::Base, 8453);
        let (prepared, payload) = builder.prepare(&req, &ChainState::Evm { nonce: 0 }).unwrap();
        assert_eq!(prepared.transaction.nonce, 10);
        assert_eq!(
            hex::encode(&payload.entries[0].data),
            "bbada4215ac1d69b8c30449afd4dae224d32177c5a80877d4220756ad14b9852"
        );

        let tx = signed(
            &prepared,
            &payload,
            "04c0b0bebaf7cec052a1fb2919c83a3d192713a65c3675a22ad9a2f76d5da1cfb0d4fec9da0bc71b5a405758a2e0349e2d151bfff6ec3d50441f0adb947a8a44a1",
            "cc6163663ccdadf4489e9753b0307c0fb1eed7fe92a7b0a6b3cb0f6d24f9109e7dd41e4e30c6777b27688527af3c4ec69ed053246ca05d1b3b8c3da127c30eb0",
        );
        assert!(tx.to_hex().ends_with(
            "c001a0cc6163663ccdadf4489e9753b0307c0fb1eed7fe92a7b0a6b3cb0f6d24f9109ea07dd41e4e30c6777b27688527af3c4ec69ed053246ca05d1b3b8c3da127c30eb0"
        ));
    }

    #[test]
    fn test_approve_rejected_off_evm() {
        let err = EvmBuilder::approve_data(
            Chain::Xrp,
            "0x111111125421cA6dc452d289314280a0f8842A65",
            U256::ONE,
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::InvalidRequest(_)));
    }

    #[test]
    fn test_requires_gas_parameters() {
        let req = request(
            Amount::coin(Chain::Ethereum, Decimal::ONE),
            FeeParameters::Fixed,
            "0x7655b9b19ffab8b897f836857dae22a1e7f8d735",
        );
        let err = EvmBuilder::new(Chain::Ethereum, 1)
            .prepare(&req, &ChainState::Evm { nonce: 0 })
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidRequest(_)));
    }

    #[test]
    fn test_signature_count_mismatch() {
        let req = request(
            Amount::coin(Chain::Ethereum, Decimal::ONE),
            FeeParameters::EvmLegacy {
                gas_limit: 21000,
                gas_price: U256::from_u64(1),
            },
            "0x7655b9b19ffab8b897f836857dae22a1e7f8d735",
        );
        let (prepared, payload) = EvmBuilder::new(Chain::Ethereum, 1)
            .prepare(&req, &ChainState::Evm { nonce: 0 })
            .unwrap();
        let key = PublicKeyMaterial::new(vec![0x02; 33], crate::types::Curve::Secp256k1);
        let err = prepared.encode_signature(&payload, &[], &key).unwrap_err();
        assert!(matches!(err, EngineError::Signature(_)));
    }
}
