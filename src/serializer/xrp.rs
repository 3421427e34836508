//! XRP Ledger canonical binary format
//!
//! Fields are a typed list; serialization sorts by (type code, field code)
//! and writes 1 to 3 byte field IDs. Only the field set the Payment builder
//! needs is modelled.

use serde::{Deserialize, Serialize};

use crate::crypto::hash::sha512_half;
use crate::error::{EngineError, EngineResult};

/// Signing prefix on production networks ("STX\0")
pub const SIGNING_PREFIX: [u8; 4] = [0x53, 0x54, 0x58, 0x00];
/// Signing prefix on test networks
pub const TEST_SIGNING_PREFIX: [u8; 4] = [0x73, 0x74, 0x78, 0x00];
/// Prefix of the transaction ID digest ("TXN\0")
pub const TRANSACTION_ID_PREFIX: [u8; 4] = [0x54, 0x58, 0x4e, 0x00];

pub const OBJECT_END_MARKER: u8 = 0xe1;
pub const ARRAY_END_MARKER: u8 = 0xf1;

/// Largest native amount in drops
pub const MAX_DROPS: u64 = 100_000_000_000_000_000;

pub const TRANSACTION_TYPE_PAYMENT: u16 = 0;
pub const TF_FULLY_CANONICAL_SIG: u32 = 0x8000_0000;

const AMOUNT_POSITIVE_BIT: u64 = 0x4000_0000_0000_0000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum TypeCode {
    UInt16 = 1,
    UInt32 = 2,
    Amount = 6,
    Blob = 7,
    AccountId = 8,
    StObject = 14,
    StArray = 15,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum XrpField {
    TransactionType,
    Flags,
    Sequence,
    DestinationTag,
    LastLedgerSequence,
    Amount,
    Fee,
    SigningPubKey,
    TxnSignature,
    Account,
    Destination,
    Memos,
    Memo,
    MemoType,
    MemoData,
}

impl XrpField {
    pub fn type_code(&self) -> TypeCode {
        match self {
            XrpField::TransactionType => TypeCode::UInt16,
            XrpField::Flags
            | XrpField::Sequence
            | XrpField::DestinationTag
            | XrpField::LastLedgerSequence => TypeCode::UInt32,
            XrpField::Amount | XrpField::Fee => TypeCode::Amount,
            XrpField::SigningPubKey
            | XrpField::TxnSignature
            | XrpField::MemoType
            | XrpField::MemoData => TypeCode::Blob,
            XrpField::Account | XrpField::Destination => TypeCode::AccountId,
            XrpField::Memo => TypeCode::StObject,
            XrpField::Memos => TypeCode::StArray,
        }
    }

    pub fn nth(&self) -> u8 {
        match self {
            XrpField::TransactionType => 2,
            XrpField::Flags => 2,
            XrpField::Sequence => 4,
            XrpField::DestinationTag => 14,
            XrpField::LastLedgerSequence => 27,
            XrpField::Amount => 1,
            XrpField::Fee => 8,
            XrpField::SigningPubKey => 3,
            XrpField::TxnSignature => 4,
            XrpField::Account => 1,
            XrpField::Destination => 3,
            XrpField::Memos => 9,
            XrpField::Memo => 10,
            XrpField::MemoType => 12,
            XrpField::MemoData => 13,
        }
    }

    pub fn is_signing_field(&self) -> bool {
        !matches!(self, XrpField::TxnSignature)
    }

    fn sort_key(&self) -> (TypeCode, u8) {
        (self.type_code(), self.nth())
    }
}

/// Value of a field; must agree with the field's type code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum XrpValue {
    UInt16(u16),
    UInt32(u32),
    /// Native XRP in drops
    Drops(u64),
    Blob(Vec<u8>),
    AccountId([u8; 20]),
    Object(Vec<(XrpField, XrpValue)>),
    Array(Vec<(XrpField, XrpValue)>),
}

impl XrpValue {
    fn type_code(&self) -> TypeCode {
        match self {
            XrpValue::UInt16(_) => TypeCode::UInt16,
            XrpValue::UInt32(_) => TypeCode::UInt32,
            XrpValue::Drops(_) => TypeCode::Amount,
            XrpValue::Blob(_) => TypeCode::Blob,
            XrpValue::AccountId(_) => TypeCode::AccountId,
            XrpValue::Object(_) => TypeCode::StObject,
            XrpValue::Array(_) => TypeCode::StArray,
        }
    }
}

/// Field ID in 1 to 3 bytes
pub fn field_id(type_code: u8, field_code: u8) -> Vec<u8> {
    match (type_code < 16, field_code < 16) {
        (true, true) => vec![(type_code << 4) | field_code],
        (false, true) => vec![field_code, type_code],
        (true, false) => vec![type_code << 4, field_code],
        (false, false) => vec![0x00, type_code, field_code],
    }
}

/// Variable-length prefix in 1 to 3 bytes
pub fn encode_vl_length(len: usize) -> EngineResult<Vec<u8>> {
    if len <= 192 {
        Ok(vec![len as u8])
    } else if len <= 12_480 {
        let l = len - 193;
        Ok(vec![((l >> 8) + 193) as u8, (l & 0xff) as u8])
    } else if len <= 918_744 {
        let l = len - 12_481;
        Ok(vec![
            (241 + (l >> 16)) as u8,
            ((l >> 8) & 0xff) as u8,
            (l & 0xff) as u8,
        ])
    } else {
        Err(EngineError::serialization(format!(
            "variable-length field of {} bytes exceeds 918744",
            len
        )))
    }
}

/// Native amount with the "positive" bit set
pub fn encode_drops(drops: u64) -> EngineResult<[u8; 8]> {
    if drops > MAX_DROPS {
        return Err(EngineError::serialization(format!(
            "{} drops exceeds the 10^17 maximum",
            drops
        )));
    }
    Ok((drops | AMOUNT_POSITIVE_BIT).to_be_bytes())
}

fn write_vl(out: &mut Vec<u8>, data: &[u8]) -> EngineResult<()> {
    out.extend_from_slice(&encode_vl_length(data.len())?);
    out.extend_from_slice(data);
    Ok(())
}

fn write_field(
    out: &mut Vec<u8>,
    field: XrpField,
    value: &XrpValue,
    signing_only: bool,
) -> EngineResult<()> {
    if field.type_code() != value.type_code() {
        return Err(EngineError::serialization(format!(
            "{:?} expects {:?}, got {:?}",
            field,
            field.type_code(),
            value.type_code()
        )));
    }

    out.extend_from_slice(&field_id(field.type_code() as u8, field.nth()));
    match value {
        XrpValue::UInt16(v) => out.extend_from_slice(&v.to_be_bytes()),
        XrpValue::UInt32(v) => out.extend_from_slice(&v.to_be_bytes()),
        XrpValue::Drops(v) => out.extend_from_slice(&encode_drops(*v)?),
        XrpValue::Blob(bytes) => write_vl(out, bytes)?,
        XrpValue::AccountId(account) => write_vl(out, account)?,
        XrpValue::Object(fields) => {
            write_fields(out, fields, signing_only)?;
            out.push(OBJECT_END_MARKER);
        }
        XrpValue::Array(items) => {
            // array elements keep their order; each is a wrapped object
            for (item_field, item_value) in items {
                write_field(out, *item_field, item_value, signing_only)?;
            }
            out.push(ARRAY_END_MARKER);
        }
    }
    Ok(())
}

fn write_fields(
    out: &mut Vec<u8>,
    fields: &[(XrpField, XrpValue)],
    signing_only: bool,
) -> EngineResult<()> {
    let mut sorted: Vec<&(XrpField, XrpValue)> = fields
        .iter()
        .filter(|(field, _)| !signing_only || field.is_signing_field())
        .collect();
    sorted.sort_by_key(|(field, _)| field.sort_key());

    for pair in sorted.windows(2) {
        if pair[0].0 == pair[1].0 {
            return Err(EngineError::serialization(format!(
                "duplicate field {:?}",
                pair[0].0
            )));
        }
    }
    for (field, value) in sorted {
        write_field(out, *field, value, signing_only)?;
    }
    Ok(())
}

/// A transaction as an unordered list of typed fields
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct XrpTransaction {
    pub fields: Vec<(XrpField, XrpValue)>,
}

impl XrpTransaction {
    pub fn with(mut self, field: XrpField, value: XrpValue) -> Self {
        self.set(field, value);
        self
    }

    /// Insert or replace a field
    pub fn set(&mut self, field: XrpField, value: XrpValue) {
        match self.fields.iter_mut().find(|(f, _)| *f == field) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((field, value)),
        }
    }

    pub fn get(&self, field: XrpField) -> Option<&XrpValue> {
        self.fields.iter().find(|(f, _)| *f == field).map(|(_, v)| v)
    }

    /// Canonical serialization of every field
    pub fn serialize(&self) -> EngineResult<Vec<u8>> {
        let mut out = Vec::new();
        write_fields(&mut out, &self.fields, false)?;
        Ok(out)
    }

    /// Network prefix followed by the signing fields
    pub fn signing_data(&self, test_network: bool) -> EngineResult<Vec<u8>> {
        let mut out = Vec::new();
        out.extend_from_slice(if test_network {
            &TEST_SIGNING_PREFIX
        } else {
            &SIGNING_PREFIX
        });
        write_fields(&mut out, &self.fields, true)?;
        Ok(out)
    }

    /// Uppercase hex transaction ID of the serialized transaction
    pub fn transaction_id(signed_blob: &[u8]) -> String {
        let mut data = Vec::with_capacity(signed_blob.len() + 4);
        data.extend_from_slice(&TRANSACTION_ID_PREFIX);
        data.extend_from_slice(signed_blob);
        hex::encode_upper(sha512_half(&data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_ids() {
        assert_eq!(field_id(1, 2), vec![0x12]);
        assert_eq!(field_id(2, 27), vec![0x20, 0x1b]);
        assert_eq!(field_id(16, 1), vec![0x01, 0x10]);
        assert_eq!(field_id(16, 17), vec![0x00, 0x10, 0x11]);
        assert_eq!(field_id(XrpField::Memos.type_code() as u8, XrpField::Memos.nth()), vec![0xf9]);
        assert_eq!(field_id(XrpField::Memo.type_code() as u8, XrpField::Memo.nth()), vec![0xea]);
        assert_eq!(field_id(XrpField::MemoType.type_code() as u8, XrpField::MemoType.nth()), vec![0x7c]);
        assert_eq!(field_id(XrpField::MemoData.type_code() as u8, XrpField::MemoData.nth()), vec![0x7d]);
    }

    #[test]
    fn test_vl_length_boundaries() {
        assert_eq!(encode_vl_length(0).unwrap(), vec![0]);
        assert_eq!(encode_vl_length(192).unwrap(), vec![192]);
        assert_eq!(encode_vl_length(193).unwrap(), vec![193, 0]);
        assert_eq!(encode_vl_length(12_480).unwrap(), vec![240, 255]);
        assert_eq!(encode_vl_length(12_481).unwrap(), vec![241, 0, 0]);
        assert_eq!(encode_vl_length(918_744).unwrap(), vec![254, 212, 23]);
        assert!(encode_vl_length(918_745).is_err());
    }

    #[test]
    fn test_drops() {
        assert_eq!(encode_drops(12).unwrap(), [0x40, 0, 0, 0, 0, 0, 0, 0x0c]);
        assert!(encode_drops(MAX_DROPS).is_ok());
        assert!(matches!(
            encode_drops(MAX_DROPS + 1),
            Err(EngineError::Serialization(_))
        ));
    }

    #[test]
    fn test_canonical_order_and_signing_prefix() {
        let tx = XrpTransaction::default()
            .with(XrpField::Fee, XrpValue::Drops(10))
            .with(XrpField::TransactionType, XrpValue::UInt16(TRANSACTION_TYPE_PAYMENT))
            .with(XrpField::TxnSignature, XrpValue::Blob(vec![0xaa]))
            .with(XrpField::Sequence, XrpValue::UInt32(1));

        let full = tx.serialize().unwrap();
        assert_eq!(full[0], 0x12);
        assert_eq!(&full[3..8], &[0x24, 0, 0, 0, 1]);
        assert!(full.ends_with(&[0x74, 0x01, 0xaa]));

        let signing = tx.signing_data(false).unwrap();
        assert_eq!(&signing[..4], &SIGNING_PREFIX);
        assert!(!signing.ends_with(&[0x74, 0x01, 0xaa]));

        let test = tx.signing_data(true).unwrap();
        assert_eq!(&test[..4], &TEST_SIGNING_PREFIX);
    }

    #[test]
    fn test_memos_markers() {
        let memo = XrpValue::Object(vec![
            (XrpField::MemoData, XrpValue::Blob(b"hi".to_vec())),
            (XrpField::MemoType, XrpValue::Blob(b"t".to_vec())),
        ]);
        let tx = XrpTransaction::default()
            .with(XrpField::Memos, XrpValue::Array(vec![(XrpField::Memo, memo)]));
        let bytes = tx.serialize().unwrap();
        assert_eq!(
            bytes,
            vec![0xf9, 0xea, 0x7c, 0x01, b't', 0x7d, 0x02, b'h', b'i', 0xe1, 0xf1]
        );
    }

    #[test]
    fn test_type_mismatch() {
        let tx = XrpTransaction::default().with(XrpField::Fee, XrpValue::UInt32(1));
        assert!(matches!(tx.serialize(), Err(EngineError::Serialization(_))));
    }
}
