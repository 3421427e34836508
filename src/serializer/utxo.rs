//! Bitcoin-style transaction serialization
//!
//! Legacy SIGHASH_ALL digests for P2PKH inputs, BIP-143 digests for P2WPKH
//! inputs, and the signed wire format with or without witness data.

use serde::{Deserialize, Serialize};

use super::script::{self, ScriptType};
use crate::crypto::hash::sha256d;
use crate::error::{EngineError, EngineResult};

pub const SIGHASH_ALL: u32 = 0x01;
pub const DEFAULT_VERSION: i32 = 1;
/// Sequence used when a request does not set one
pub const DEFAULT_SEQUENCE: u32 = 0xffff_fffa;

/// Bitcoin CompactSize integer
pub fn write_compact_size(out: &mut Vec<u8>, n: u64) {
    match n {
        0..=0xfc => out.push(n as u8),
        0xfd..=0xffff => {
            out.push(0xfd);
            out.extend_from_slice(&(n as u16).to_le_bytes());
        }
        0x1_0000..=0xffff_ffff => {
            out.push(0xfe);
            out.extend_from_slice(&(n as u32).to_le_bytes());
        }
        _ => {
            out.push(0xff);
            out.extend_from_slice(&n.to_le_bytes());
        }
    }
}

fn write_var_bytes(out: &mut Vec<u8>, bytes: &[u8]) {
    write_compact_size(out, bytes.len() as u64);
    out.extend_from_slice(bytes);
}

/// Reference to a previous output; `txid` is in internal (little-endian) order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutPoint {
    pub txid: [u8; 32],
    pub vout: u32,
}

impl OutPoint {
    /// From the big-endian hex txid shown by explorers
    pub fn from_display(txid: &str, vout: u32) -> EngineResult<Self> {
        let mut bytes: [u8; 32] = crate::encoding::hex::decode_array(txid)?;
        bytes.reverse();
        Ok(Self { txid: bytes, vout })
    }

    pub fn display_txid(&self) -> String {
        let mut bytes = self.txid;
        bytes.reverse();
        hex::encode(bytes)
    }

    fn write(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.txid);
        out.extend_from_slice(&self.vout.to_le_bytes());
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxIn {
    pub previous_output: OutPoint,
    /// Locking script of the output being spent
    pub prev_script_pubkey: Vec<u8>,
    pub value: u64,
    pub sequence: u32,
}

impl TxIn {
    pub fn script_type(&self) -> ScriptType {
        ScriptType::classify(&self.prev_script_pubkey)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOut {
    pub value: u64,
    pub script_pubkey: Vec<u8>,
}

impl TxOut {
    fn write(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.value.to_le_bytes());
        write_var_bytes(out, &self.script_pubkey);
    }
}

/// Signature material for one input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedInput {
    /// DER signature followed by the sighash byte
    pub signature: Vec<u8>,
    pub public_key: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsignedTransaction {
    pub version: i32,
    pub inputs: Vec<TxIn>,
    pub outputs: Vec<TxOut>,
    pub locktime: u32,
}

impl UnsignedTransaction {
    pub fn new(inputs: Vec<TxIn>, outputs: Vec<TxOut>) -> Self {
        Self {
            version: DEFAULT_VERSION,
            inputs,
            outputs,
            locktime: 0,
        }
    }

    /// BIP-69: inputs by (display txid, vout), outputs by (value, script)
    pub fn sort_bip69(&mut self) {
        self.inputs.sort_by(|a, b| {
            let mut ta = a.previous_output.txid;
            let mut tb = b.previous_output.txid;
            ta.reverse();
            tb.reverse();
            ta.cmp(&tb)
                .then(a.previous_output.vout.cmp(&b.previous_output.vout))
        });
        self.outputs.sort_by(|a, b| {
            a.value
                .cmp(&b.value)
                .then_with(|| a.script_pubkey.cmp(&b.script_pubkey))
        });
    }

    pub fn has_witness_inputs(&self) -> bool {
        self.inputs.iter().any(|i| i.script_type().is_segwit())
    }

    /// One SIGHASH_ALL digest per input, in input order
    pub fn signature_hashes(&self) -> EngineResult<Vec<[u8; 32]>> {
        (0..self.inputs.len())
            .map(|index| match self.inputs[index].script_type() {
                ScriptType::P2pkh => Ok(self.legacy_sighash(index)),
                ScriptType::P2wpkh => self.segwit_sighash(index),
                other => Err(EngineError::serialization(format!(
                    "input {} spends an unsupported {:?} output",
                    index, other
                ))),
            })
            .collect()
    }

    /// Pre-segwit digest with the spent script substituted at `index`
    fn legacy_sighash(&self, index: usize) -> [u8; 32] {
        let mut data = Vec::new();
        data.extend_from_slice(&self.version.to_le_bytes());

        write_compact_size(&mut data, self.inputs.len() as u64);
        for (i, input) in self.inputs.iter().enumerate() {
            input.previous_output.write(&mut data);
            if i == index {
                write_var_bytes(&mut data, &input.prev_script_pubkey);
            } else {
                data.push(0x00);
            }
            data.extend_from_slice(&input.sequence.to_le_bytes());
        }

        write_compact_size(&mut data, self.outputs.len() as u64);
        for output in &self.outputs {
            output.write(&mut data);
        }

        data.extend_from_slice(&self.locktime.to_le_bytes());
        data.extend_from_slice(&SIGHASH_ALL.to_le_bytes());
        sha256d(&data)
    }

    /// BIP-143 digest
    fn segwit_sighash(&self, index: usize) -> EngineResult<[u8; 32]> {
        let input = &self.inputs[index];

        let mut prevouts = Vec::with_capacity(self.inputs.len() * 36);
        let mut sequences = Vec::with_capacity(self.inputs.len() * 4);
        for inp in &self.inputs {
            inp.previous_output.write(&mut prevouts);
            sequences.extend_from_slice(&inp.sequence.to_le_bytes());
        }
        let mut outputs = Vec::new();
        for out in &self.outputs {
            out.write(&mut outputs);
        }

        let mut data = Vec::with_capacity(156 + 26);
        data.extend_from_slice(&self.version.to_le_bytes());
        data.extend_from_slice(&sha256d(&prevouts));
        data.extend_from_slice(&sha256d(&sequences));
        input.previous_output.write(&mut data);
        write_var_bytes(&mut data, &script::p2wpkh_script_code(&input.prev_script_pubkey)?);
        data.extend_from_slice(&input.value.to_le_bytes());
        data.extend_from_slice(&input.sequence.to_le_bytes());
        data.extend_from_slice(&sha256d(&outputs));
        data.extend_from_slice(&self.locktime.to_le_bytes());
        data.extend_from_slice(&SIGHASH_ALL.to_le_bytes());
        Ok(sha256d(&data))
    }

    fn write_body(&self, out: &mut Vec<u8>, script_sigs: &[Vec<u8>]) {
        write_compact_size(out, self.inputs.len() as u64);
        for (input, script_sig) in self.inputs.iter().zip(script_sigs) {
            input.previous_output.write(out);
            write_var_bytes(out, script_sig);
            out.extend_from_slice(&input.sequence.to_le_bytes());
        }
        write_compact_size(out, self.outputs.len() as u64);
        for output in &self.outputs {
            output.write(out);
        }
    }

    /// Serialization with empty scriptSigs
    pub fn serialize_unsigned(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&self.version.to_le_bytes());
        self.write_body(&mut out, &vec![Vec::new(); self.inputs.len()]);
        out.extend_from_slice(&self.locktime.to_le_bytes());
        out
    }

    /// Wire bytes and txid with signatures spliced in
    pub fn serialize_signed(&self, signed: &[SignedInput]) -> EngineResult<(Vec<u8>, String)> {
        if signed.len() != self.inputs.len() {
            return Err(EngineError::signature(format!(
                "{} signatures for {} inputs",
                signed.len(),
                self.inputs.len()
            )));
        }

        let mut script_sigs = Vec::with_capacity(signed.len());
        let mut witnesses: Vec<Vec<&[u8]>> = Vec::with_capacity(signed.len());
        for (input, sig) in self.inputs.iter().zip(signed) {
            if input.script_type().is_segwit() {
                script_sigs.push(Vec::new());
                witnesses.push(vec![sig.signature.as_slice(), sig.public_key.as_slice()]);
            } else {
                script_sigs.push(script::p2pkh_script_sig(&sig.signature, &sig.public_key)?);
                witnesses.push(Vec::new());
            }
        }

        let mut stripped = Vec::new();
        stripped.extend_from_slice(&self.version.to_le_bytes());
        self.write_body(&mut stripped, &script_sigs);
        stripped.extend_from_slice(&self.locktime.to_le_bytes());
        let mut txid = sha256d(&stripped);
        txid.reverse();
        let txid = hex::encode(txid);

        if !self.has_witness_inputs() {
            return Ok((stripped, txid));
        }

        let mut out = Vec::with_capacity(stripped.len() + signed.len() * 108 + 2);
        out.extend_from_slice(&self.version.to_le_bytes());
        out.extend_from_slice(&[0x00, 0x01]);
        self.write_body(&mut out, &script_sigs);
        for stack in &witnesses {
            write_compact_size(&mut out, stack.len() as u64);
            for item in stack {
                write_var_bytes(&mut out, item);
            }
        }
        out.extend_from_slice(&self.locktime.to_le_bytes());
        Ok((out, txid))
    }
}
