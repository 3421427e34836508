//! Bitcoin-family transactions

use crate::address::UtxoNetwork;
use crate::crypto::{secp256k1, signature};
use crate::error::{EngineError, EngineResult};
use crate::serializer::script::{self, ScriptType};
use crate::serializer::utxo::{OutPoint, SignedInput, TxIn, TxOut, UnsignedTransaction, SIGHASH_ALL};
use crate::types::{
    ChainState, FeeParameters, PublicKeyMaterial, RawSignature, RawTransaction, SigningPayload,
    TransactionParams, TransactionRequest, TxOrdering,
};

use super::selection::{CoinSelector, FeeMode, SelectionInput, SelectionLimits, SelectionTarget};

/// Builds P2PKH/P2WPKH spends for one network
#[derive(Debug, Clone)]
pub struct UtxoBuilder {
    network: UtxoNetwork,
    limits: SelectionLimits,
    default_sequence: u32,
}

/// Unsigned transaction plus what the selector decided
#[derive(Debug, Clone)]
pub struct PreparedUtxo {
    pub transaction: UnsignedTransaction,
    pub fee: u64,
    pub change: u64,
}

impl UtxoBuilder {
    pub fn new(network: UtxoNetwork, limits: SelectionLimits, default_sequence: u32) -> Self {
        Self {
            network,
            limits,
            default_sequence,
        }
    }

    pub fn network(&self) -> &UtxoNetwork {
        &self.network
    }

    fn fee_mode(request: &TransactionRequest) -> EngineResult<FeeMode> {
        let exact = request.fee.amount.to_minor_units_u64()?;
        if exact > 0 {
            return Ok(FeeMode::Exactly(exact));
        }
        match request.fee.parameters {
            FeeParameters::Utxo { sat_per_byte } if sat_per_byte > 0 => {
                Ok(FeeMode::Calculate(sat_per_byte))
            }
            ref other => Err(EngineError::invalid_request(format!(
                "UTXO transaction needs a fee amount or a sat/byte rate, got {:?}",
                other
            ))),
        }
    }

    pub fn prepare(
        &self,
        request: &TransactionRequest,
        state: &ChainState,
    ) -> EngineResult<(PreparedUtxo, SigningPayload)> {
        let unspents = match state {
            ChainState::Utxo { unspents } => unspents,
            other => {
                return Err(EngineError::invalid_request(format!(
                    "expected UTXO chain state, got {:?}",
                    other
                )))
            }
        };
        if request.amount.is_token() {
            return Err(EngineError::invalid_request(format!(
                "{} has no token transfers",
                self.network.chain
            )));
        }

        let (sequence, ordering) = match &request.params {
            TransactionParams::Utxo { sequence, ordering } => (
                sequence.unwrap_or(self.default_sequence),
                *ordering,
            ),
            TransactionParams::None => (self.default_sequence, TxOrdering::None),
            other => {
                return Err(EngineError::invalid_request(format!(
                    "unexpected parameters for a UTXO transaction: {:?}",
                    other
                )))
            }
        };

        let destination_script = script::for_destination(&self.network.decode(&request.destination_address)?)?;
        let change_address = request
            .change_address
            .as_deref()
            .unwrap_or(&request.source_address);
        let change_script = script::for_destination(&self.network.decode(change_address)?)?;

        let inputs: Vec<SelectionInput> = unspents
            .iter()
            .enumerate()
            .map(|(position, u)| SelectionInput {
                position,
                amount: u.amount,
                script_type: ScriptType::classify(&u.script),
            })
            .collect();

        let target = SelectionTarget {
            amount: request.amount.to_minor_units_u64()?,
            destination: ScriptType::classify(&destination_script),
            change: ScriptType::classify(&change_script),
        };
        let dust = target.destination.dust_threshold().max(self.limits.dust_threshold);
        if target.amount < dust {
            return Err(EngineError::invalid_request(format!(
                "amount {} is below the dust threshold {}",
                target.amount, dust
            )));
        }

        let selection = CoinSelector::new(self.limits).select(&inputs, target, Self::fee_mode(request)?)?;
        let (change, fee) = (selection.change, selection.fee);
        if change < 0 {
            return Err(EngineError::invalid_request(format!(
                "inputs do not cover amount {} plus fee {}",
                target.amount, fee
            )));
        }
        tracing::debug!(
            chain = %self.network.chain,
            inputs = selection.inputs.len(),
            fee,
            change,
            "selected unspents"
        );

        let tx_inputs = selection
            .inputs
            .iter()
            .map(|selected| {
                let unspent = &unspents[selected.position];
                Ok(TxIn {
                    previous_output: OutPoint::from_display(&unspent.txid, unspent.vout)?,
                    prev_script_pubkey: unspent.script.clone(),
                    value: unspent.amount,
                    sequence,
                })
            })
            .collect::<EngineResult<Vec<_>>>()?;

        let mut outputs = vec![TxOut {
            value: target.amount,
            script_pubkey: destination_script,
        }];
        if change > 0 {
            outputs.push(TxOut {
                value: change as u64,
                script_pubkey: change_script,
            });
        }

        let mut transaction = UnsignedTransaction::new(tx_inputs, outputs);
        if ordering == TxOrdering::Bip69 {
            transaction.sort_bip69();
        }

        let mut payload = SigningPayload::default();
        for (input, hash) in transaction.inputs.iter().zip(transaction.signature_hashes()?) {
            payload.push(
                hash.to_vec(),
                format!(
                    "input {}:{}",
                    input.previous_output.display_txid(),
                    input.previous_output.vout
                ),
            );
        }

        Ok((
            PreparedUtxo {
                transaction,
                fee,
                change: change as u64,
            },
            payload,
        ))
    }
}

impl PreparedUtxo {
    /// DER + sighash per input, each checked against the account key
    pub fn encode_signatures(
        &self,
        payload: &SigningPayload,
        signatures: &[RawSignature],
        key: &PublicKeyMaterial,
    ) -> EngineResult<Vec<SignedInput>> {
        if signatures.len() != payload.len() {
            return Err(EngineError::signature(format!(
                "{} signatures for {} payload entries",
                signatures.len(),
                payload.len()
            )));
        }

        let signing_key = key.signing_key();
        self.transaction
            .inputs
            .iter()
            .zip(payload.entries.iter().zip(signatures))
            .map(|(input, (entry, raw))| {
                let public_key = match input.script_type() {
                    ScriptType::P2wpkh => secp256k1::compress(signing_key)?.to_vec(),
                    _ => signing_key.to_vec(),
                };
                if !secp256k1::verify(&entry.data, &raw.compact(), &public_key) {
                    return Err(EngineError::signature(format!(
                        "signature for {} does not verify",
                        entry.description
                    )));
                }
                let mut der = signature::to_der(raw)?;
                der.push(SIGHASH_ALL as u8);
                Ok(SignedInput {
                    signature: der,
                    public_key,
                })
            })
            .collect()
    }

    pub fn finalize(&self, signed: &[SignedInput]) -> EngineResult<RawTransaction> {
        let (bytes, txid) = self.transaction.serialize_signed(signed)?;
        Ok(RawTransaction {
            bytes,
            hash: Some(txid),
        })
    }
}
