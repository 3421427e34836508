//! Bitcoin script templates

use serde::{Deserialize, Serialize};

use crate::address::UtxoDestination;
use crate::error::{EngineError, EngineResult};

pub const OP_0: u8 = 0x00;
pub const OP_PUSHDATA1: u8 = 0x4c;
pub const OP_PUSHDATA2: u8 = 0x4d;
pub const OP_PUSHDATA4: u8 = 0x4e;
pub const OP_1: u8 = 0x51;
pub const OP_DUP: u8 = 0x76;
pub const OP_EQUAL: u8 = 0x87;
pub const OP_EQUALVERIFY: u8 = 0x88;
pub const OP_HASH160: u8 = 0xa9;
pub const OP_CHECKSIG: u8 = 0xac;

/// Standard output templates the engine can spend or pay to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScriptType {
    P2pkh,
    P2sh,
    P2wpkh,
    P2wsh,
    P2tr,
    Unknown,
}

impl ScriptType {
    pub fn classify(script: &[u8]) -> Self {
        match script {
            [OP_DUP, OP_HASH160, 0x14, .., OP_EQUALVERIFY, OP_CHECKSIG] if script.len() == 25 => {
                ScriptType::P2pkh
            }
            [OP_HASH160, 0x14, .., OP_EQUAL] if script.len() == 23 => ScriptType::P2sh,
            [OP_0, 0x14, ..] if script.len() == 22 => ScriptType::P2wpkh,
            [OP_0, 0x20, ..] if script.len() == 34 => ScriptType::P2wsh,
            [OP_1, 0x20, ..] if script.len() == 34 => ScriptType::P2tr,
            _ => ScriptType::Unknown,
        }
    }

    pub fn is_segwit(&self) -> bool {
        matches!(self, ScriptType::P2wpkh | ScriptType::P2wsh | ScriptType::P2tr)
    }

    /// Virtual size of an input spending this template
    pub fn input_vsize(&self) -> Option<u64> {
        match self {
            ScriptType::P2pkh => Some(148),
            ScriptType::P2wpkh => Some(68),
            // nested P2WPKH is the only P2SH spend the engine signs
            ScriptType::P2sh => Some(91),
            ScriptType::P2tr => Some(58),
            ScriptType::P2wsh | ScriptType::Unknown => None,
        }
    }

    /// Size of an output paying to this template
    pub fn output_size(&self) -> u64 {
        match self {
            ScriptType::P2pkh => 34,
            ScriptType::P2sh => 32,
            ScriptType::P2wpkh => 31,
            ScriptType::P2wsh | ScriptType::P2tr => 43,
            ScriptType::Unknown => 34,
        }
    }

    /// Minimum relayable output value at the default dust relay fee
    pub fn dust_threshold(&self) -> u64 {
        match self {
            ScriptType::P2pkh | ScriptType::Unknown => 546,
            ScriptType::P2sh => 540,
            ScriptType::P2wpkh => 294,
            ScriptType::P2wsh | ScriptType::P2tr => 330,
        }
    }
}

/// Minimal push of `data`
pub fn push_data(out: &mut Vec<u8>, data: &[u8]) -> EngineResult<()> {
    let len = data.len();
    if len < OP_PUSHDATA1 as usize {
        out.push(len as u8);
    } else if len <= 0xff {
        out.push(OP_PUSHDATA1);
        out.push(len as u8);
    } else if len <= 0xffff {
        out.push(OP_PUSHDATA2);
        out.extend_from_slice(&(len as u16).to_le_bytes());
    } else if let Ok(len) = u32::try_from(len) {
        out.push(OP_PUSHDATA4);
        out.extend_from_slice(&len.to_le_bytes());
    } else {
        return Err(EngineError::serialization("push exceeds 4 GiB"));
    }
    out.extend_from_slice(data);
    Ok(())
}

pub fn p2pkh(pubkey_hash: &[u8; 20]) -> Vec<u8> {
    let mut script = Vec::with_capacity(25);
    script.extend_from_slice(&[OP_DUP, OP_HASH160, 0x14]);
    script.extend_from_slice(pubkey_hash);
    script.extend_from_slice(&[OP_EQUALVERIFY, OP_CHECKSIG]);
    script
}

pub fn p2sh(script_hash: &[u8; 20]) -> Vec<u8> {
    let mut script = Vec::with_capacity(23);
    script.extend_from_slice(&[OP_HASH160, 0x14]);
    script.extend_from_slice(script_hash);
    script.push(OP_EQUAL);
    script
}

pub fn p2wpkh(pubkey_hash: &[u8; 20]) -> Vec<u8> {
    let mut script = Vec::with_capacity(22);
    script.extend_from_slice(&[OP_0, 0x14]);
    script.extend_from_slice(pubkey_hash);
    script
}

/// `OP_n <program>` for witness version `n`
pub fn witness_program(version: u8, program: &[u8]) -> EngineResult<Vec<u8>> {
    if version > 16 || program.len() < 2 || program.len() > 40 {
        return Err(EngineError::serialization(format!(
            "invalid witness program: version {}, {} bytes",
            version,
            program.len()
        )));
    }
    let mut script = Vec::with_capacity(program.len() + 2);
    script.push(if version == 0 { OP_0 } else { OP_1 + version - 1 });
    script.push(program.len() as u8);
    script.extend_from_slice(program);
    Ok(script)
}

/// Locking script for a decoded address
pub fn for_destination(destination: &UtxoDestination) -> EngineResult<Vec<u8>> {
    match destination {
        UtxoDestination::P2pkh(hash) => Ok(p2pkh(hash)),
        UtxoDestination::P2sh(hash) => Ok(p2sh(hash)),
        UtxoDestination::Witness { version, program } => witness_program(*version, program),
    }
}

/// BIP-143 script code for a P2WPKH output: the equivalent P2PKH script
pub fn p2wpkh_script_code(script_pubkey: &[u8]) -> EngineResult<Vec<u8>> {
    if ScriptType::classify(script_pubkey) != ScriptType::P2wpkh {
        return Err(EngineError::serialization("script is not P2WPKH"));
    }
    let mut hash = [0u8; 20];
    hash.copy_from_slice(&script_pubkey[2..22]);
    Ok(p2pkh(&hash))
}

/// `push(sig) push(pubkey)` for a P2PKH spend
pub fn p2pkh_script_sig(signature: &[u8], public_key: &[u8]) -> EngineResult<Vec<u8>> {
    let mut script = Vec::with_capacity(signature.len() + public_key.len() + 2);
    push_data(&mut script, signature)?;
    push_data(&mut script, public_key)?;
    Ok(script)
}
