//! XRP Ledger Payment transactions

use crate::address::xrp::{decode_account_id, signing_public_key};
use crate::crypto::{self, hash::sha512_half, signature};
use crate::error::{EngineError, EngineResult};
use crate::serializer::xrp::{
    XrpField, XrpTransaction, XrpValue, TF_FULLY_CANONICAL_SIG, TRANSACTION_TYPE_PAYMENT,
};
use crate::types::{
    Chain, ChainState, Curve, PublicKeyMaterial, RawSignature, RawTransaction, SigningPayload,
    TransactionParams, TransactionRequest, XrpMemo,
};

#[derive(Debug, Clone)]
pub struct XrpBuilder {
    chain: Chain,
    test_network: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedXrp {
    pub transaction: XrpTransaction,
    pub curve: Curve,
}

fn memo_object(memo: &XrpMemo) -> XrpValue {
    let mut fields = Vec::with_capacity(2);
    if let Some(memo_type) = &memo.memo_type {
        fields.push((XrpField::MemoType, XrpValue::Blob(memo_type.clone())));
    }
    if let Some(memo_data) = &memo.memo_data {
        fields.push((XrpField::MemoData, XrpValue::Blob(memo_data.clone())));
    }
    XrpValue::Object(fields)
}

impl XrpBuilder {
    pub fn new(chain: Chain, test_network: bool) -> Self {
        Self {
            chain,
            test_network,
        }
    }

    pub fn for_chain(chain: Chain) -> Self {
        Self::new(chain, chain.is_testnet())
    }

    pub fn prepare(
        &self,
        request: &TransactionRequest,
        state: &ChainState,
        key: &PublicKeyMaterial,
    ) -> EngineResult<(PreparedXrp, SigningPayload)> {
        let (sequence, last_ledger_sequence) = match state {
            ChainState::Xrp {
                sequence,
                last_ledger_sequence,
            } => (*sequence, *last_ledger_sequence),
            other => {
                return Err(EngineError::invalid_request(format!(
                    "expected XRP chain state, got {:?}",
                    other
                )))
            }
        };
        if request.amount.is_token() {
            return Err(EngineError::invalid_request(
                "issued currency payments are not supported",
            ));
        }
        let (destination_tag, memos) = match &request.params {
            TransactionParams::Xrp {
                destination_tag,
                memos,
            } => (*destination_tag, memos.as_slice()),
            TransactionParams::None => (None, &[][..]),
            other => {
                return Err(EngineError::invalid_request(format!(
                    "unexpected parameters for an XRP transaction: {:?}",
                    other
                )))
            }
        };

        let account = decode_account_id(&request.source_address)?;
        let destination = decode_account_id(&request.destination_address)?;
        let public_key = signing_public_key(key.signing_key(), key.curve)?;

        let mut transaction = XrpTransaction::default()
            .with(
                XrpField::TransactionType,
                XrpValue::UInt16(TRANSACTION_TYPE_PAYMENT),
            )
            .with(XrpField::Flags, XrpValue::UInt32(TF_FULLY_CANONICAL_SIG))
            .with(XrpField::Sequence, XrpValue::UInt32(sequence))
            .with(
                XrpField::Amount,
                XrpValue::Drops(request.amount.to_minor_units_u64()?),
            )
            .with(
                XrpField::Fee,
                XrpValue::Drops(request.fee.amount.to_minor_units_u64()?),
            )
            .with(XrpField::SigningPubKey, XrpValue::Blob(public_key))
            .with(XrpField::Account, XrpValue::AccountId(account))
            .with(XrpField::Destination, XrpValue::AccountId(destination));

        if let Some(tag) = destination_tag {
            transaction.set(XrpField::DestinationTag, XrpValue::UInt32(tag));
        }
        if let Some(last) = last_ledger_sequence {
            transaction.set(XrpField::LastLedgerSequence, XrpValue::UInt32(last));
        }
        if !memos.is_empty() {
            let items = memos
                .iter()
                .map(|memo| (XrpField::Memo, memo_object(memo)))
                .collect();
            transaction.set(XrpField::Memos, XrpValue::Array(items));
        }

        let signing_data = transaction.signing_data(self.test_network)?;
        let data = match key.curve {
            Curve::Secp256k1 => sha512_half(&signing_data).to_vec(),
            Curve::Ed25519 | Curve::Ed25519Slip0010 => signing_data,
        };
        tracing::debug!(chain = %self.chain, sequence, curve = %key.curve, "prepared XRP payment");

        Ok((
            PreparedXrp {
                transaction,
                curve: key.curve,
            },
            SigningPayload::single(data, format!("{} payment", self.chain)),
        ))
    }
}

impl PreparedXrp {
    /// `TxnSignature` bytes: DER for secp256k1, raw 64 bytes for ed25519
    pub fn encode_signature(
        &self,
        payload: &SigningPayload,
        signatures: &[RawSignature],
        key: &PublicKeyMaterial,
    ) -> EngineResult<Vec<u8>> {
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
        if !crypto::verify(&entry.data, raw, key.signing_key(), self.curve) {
            return Err(EngineError::signature(
                "signature does not verify against the account key",
            ));
        }
        match self.curve {
            Curve::Secp256k1 => signature::to_der(raw),
            Curve::Ed25519 | Curve::Ed25519Slip0010 => Ok(raw.as_bytes()[..64].to_vec()),
        }
    }

    pub fn finalize(&self, txn_signature: Vec<u8>) -> EngineResult<RawTransaction> {
        let signed = self
            .transaction
            .clone()
            .with(XrpField::TxnSignature, XrpValue::Blob(txn_signature));
        let bytes = signed.serialize()?;
        let hash = XrpTransaction::transaction_id(&bytes);
        Ok(RawTransaction {
            bytes,
            hash: Some(hash),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::xrp::{account_id, encode_account_id};
    use crate::serializer::xrp::{SIGNING_PREFIX, TEST_SIGNING_PREFIX};
    use crate::types::{Amount, Fee, FeeParameters};
    use rust_decimal::Decimal;
    use std::str::FromStr;

    const ED_SECRET: [u8; 32] = [7u8; 32];
    const SECP_SECRET: [u8; 32] = [3u8; 32];

    fn key(curve: Curve) -> (PublicKeyMaterial, [u8; 32]) {
        let secret = match curve {
            Curve::Secp256k1 => SECP_SECRET,
            _ => ED_SECRET,
        };
        let public = crypto::public_key(&secret, curve).unwrap();
        (PublicKeyMaterial::new(public, curve), secret)
    }

    fn request(key: &PublicKeyMaterial, chain: Chain) -> TransactionRequest {
        let source = encode_account_id(&account_id(key.signing_key(), key.curve).unwrap());
        TransactionRequest {
            amount: Amount::coin(chain, Decimal::from_str("12.5").unwrap()),
            fee: Fee {
                amount: Amount::from_minor_units(chain, 12),
                parameters: FeeParameters::Fixed,
            },
            source_address: source,
            destination_address: encode_account_id(&[0x42; 20]),
            change_address: None,
            params: TransactionParams::Xrp {
                destination_tag: Some(7),
                memos: vec![XrpMemo {
                    memo_type: Some(b"text/plain".to_vec()),
                    memo_data: Some(b"hello".to_vec()),
                }],
            },
        }
    }

    fn state() -> ChainState {
        ChainState::Xrp {
            sequence: 42,
            last_ledger_sequence: Some(1_000),
        }
    }

    #[test]
    fn test_payment_fields() {
        let (key, _) = key(Curve::Secp256k1);
        let (prepared, payload) = XrpBuilder::for_chain(Chain::Xrp)
            .prepare(&request(&key, Chain::Xrp), &state(), &key)
            .unwrap();

        let tx = &prepared.transaction;
        assert_eq!(tx.get(XrpField::Amount), Some(&XrpValue::Drops(12_500_000)));
        assert_eq!(tx.get(XrpField::Fee), Some(&XrpValue::Drops(12)));
        assert_eq!(tx.get(XrpField::Sequence), Some(&XrpValue::UInt32(42)));
        assert_eq!(tx.get(XrpField::DestinationTag), Some(&XrpValue::UInt32(7)));
        assert_eq!(
            tx.get(XrpField::LastLedgerSequence),
            Some(&XrpValue::UInt32(1_000))
        );
        assert!(tx.get(XrpField::Memos).is_some());
        assert_eq!(payload.entries[0].data.len(), 32);
    }

    #[test]
    fn test_ed25519_payload_is_prefixed_message() {
        let (key, _) = key(Curve::Ed25519);
        let (_, payload) = XrpBuilder::for_chain(Chain::Xrp)
            .prepare(&request(&key, Chain::Xrp), &state(), &key)
            .unwrap();
        assert_eq!(&payload.entries[0].data[..4], &SIGNING_PREFIX);

        let (_, payload) = XrpBuilder::for_chain(Chain::XrpTestnet)
            .prepare(&request(&key, Chain::XrpTestnet), &state(), &key)
            .unwrap();
        assert_eq!(&payload.entries[0].data[..4], &TEST_SIGNING_PREFIX);
    }

    #[test]
    fn test_sign_and_finalize() {
        for curve in [Curve::Secp256k1, Curve::Ed25519] {
            let (key, secret) = key(curve);
            let (prepared, payload) = XrpBuilder::for_chain(Chain::Xrp)
                .prepare(&request(&key, Chain::Xrp), &state(), &key)
                .unwrap();

            let raw = crypto::sign(&payload.entries[0].data, &secret, curve).unwrap();
            let txn_signature = prepared.encode_signature(&payload, &[raw], &key).unwrap();
            let tx = prepared.finalize(txn_signature.clone()).unwrap();

            assert_eq!(tx.hash.as_deref(), Some(XrpTransaction::transaction_id(&tx.bytes).as_str()));
            let signature_hex = hex::encode(&txn_signature);
            assert!(tx.to_hex().contains(&signature_hex));
            if curve == Curve::Secp256k1 {
                assert_eq!(txn_signature[0], 0x30);
            } else {
                assert_eq!(txn_signature.len(), 64);
            }
        }
    }

    #[test]
    fn test_wrong_key_rejected() {
        let (key, _) = key(Curve::Ed25519);
        let (prepared, payload) = XrpBuilder::for_chain(Chain::Xrp)
            .prepare(&request(&key, Chain::Xrp), &state(), &key)
            .unwrap();
        let raw = crypto::sign(&payload.entries[0].data, &[9u8; 32], Curve::Ed25519).unwrap();
        let err = prepared.encode_signature(&payload, &[raw], &key).unwrap_err();
        assert!(matches!(err, EngineError::Signature(_)));
    }

    #[test]
    fn test_rejects_foreign_state() {
        let (key, _) = key(Curve::Ed25519);
        let err = XrpBuilder::for_chain(Chain::Xrp)
            .prepare(&request(&key, Chain::Xrp), &ChainState::Evm { nonce: 1 }, &key)
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidRequest(_)));
    }
}
