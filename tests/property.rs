use chain_tx_engine::abi::{decode_uint, encode_uint};
use chain_tx_engine::address::ethereum::to_checksum_address;
use chain_tx_engine::builder::selection::{
    CoinSelector, FeeMode, SelectionInput, SelectionLimits, SelectionTarget,
};
use chain_tx_engine::crypto::{self, hash::bitcoin_message_hash, to_bitcoin_message_signature};
use chain_tx_engine::encoding::base58;
use chain_tx_engine::serializer::script::ScriptType;
use chain_tx_engine::serializer::xrp::encode_vl_length;
use chain_tx_engine::{Curve, RawSignature, U256};
use proptest::prelude::*;

fn any_secret_key() -> impl Strategy<Value = [u8; 32]> {
    prop::array::uniform32(any::<u8>()).prop_filter("valid secp256k1 scalar", |bytes| {
        bitcoin::secp256k1::SecretKey::from_slice(bytes).is_ok()
    })
}

fn decode_vl_length(prefix: &[u8]) -> usize {
    let b0 = prefix[0] as usize;
    match prefix.len() {
        1 => b0,
        2 => 193 + ((b0 - 193) << 8) + prefix[1] as usize,
        _ => 12_481 + ((b0 - 241) << 16) + ((prefix[1] as usize) << 8) + prefix[2] as usize,
    }
}

proptest! {
    #[test]
    fn base58_roundtrips(bytes in prop::collection::vec(any::<u8>(), 0..64), zeros in 0usize..4) {
        let mut data = vec![0u8; zeros];
        data.extend_from_slice(&bytes);

        let encoded = base58::encode(&data);
        prop_assert!(encoded.starts_with(&"1".repeat(zeros)));
        prop_assert_eq!(base58::decode(&encoded).unwrap(), data.clone());

        let checked = base58::encode_check(&data);
        prop_assert_eq!(base58::decode_check(&checked).unwrap(), data);
    }

    #[test]
    fn abi_uint_slots_are_one_word(word in prop::array::uniform32(any::<u8>())) {
        let value = U256::from_word(&word);
        let slot = encode_uint(value);
        prop_assert_eq!(slot.len(), 32);
        prop_assert_eq!(decode_uint(&slot).unwrap(), value);
    }

    #[test]
    fn checksum_addresses_roundtrip(bytes in prop::array::uniform20(any::<u8>())) {
        let checksummed = to_checksum_address(&bytes);
        prop_assert!(checksummed.starts_with("0x"));

        let tail = checksummed.trim_start_matches("0x");
        let lower_expected = hex::encode(bytes);
        prop_assert_eq!(tail.to_ascii_lowercase(), lower_expected.clone());

        let hash = crypto::keccak256(lower_expected.as_bytes());
        let mut expected = String::from("0x");
        for (i, ch) in lower_expected.chars().enumerate() {
            let byte = hash[i / 2];
            let nibble = if i % 2 == 0 { byte >> 4 } else { byte & 0x0f };
            if ch.is_ascii_digit() || nibble < 8 {
                expected.push(ch);
            } else {
                expected.push(ch.to_ascii_uppercase());
            }
        }
        prop_assert_eq!(checksummed, expected);
    }

    #[test]
    fn bitcoin_message_headers_stay_in_range(
        secret in any_secret_key(),
        message in prop::collection::vec(any::<u8>(), 0..80),
        segwit in any::<bool>(),
    ) {
        let public_key = crypto::public_key(&secret, Curve::Secp256k1).unwrap();
        let hash = bitcoin_message_hash(&message);
        let raw = crypto::sign(&hash, &secret, Curve::Secp256k1).unwrap();
        let compact = RawSignature::from_bytes(raw.compact().to_vec()).unwrap();

        let address = if segwit {
            "bc1qxzdqcmh6pknevm2ugtw94y50dwhsu3l0p5tg63"
        } else {
            "1JjXGY5KEcbT35uAo6P9A7DebBn4DXnjdQ"
        };
        let first = to_bitcoin_message_signature(&compact, &hash, &public_key, address).unwrap();
        let again = to_bitcoin_message_signature(&compact, &hash, &public_key, address).unwrap();
        prop_assert_eq!(first, again);

        let header = first[0];
        if segwit {
            prop_assert!((39..=42).contains(&header));
        } else {
            prop_assert!((31..=34).contains(&header));
        }
    }

    #[test]
    fn coin_selection_never_panics(
        amounts in prop::collection::vec(any::<u64>(), 0..8),
        target in any::<u64>(),
        rate in any::<u64>(),
        exact in any::<bool>(),
    ) {
        let unspents: Vec<SelectionInput> = amounts
            .iter()
            .enumerate()
            .map(|(position, amount)| SelectionInput {
                position,
                amount: *amount,
                script_type: ScriptType::P2wpkh,
            })
            .collect();
        let fee = if exact { FeeMode::Exactly(rate) } else { FeeMode::Calculate(rate) };
        let selector = CoinSelector::new(SelectionLimits { max_tries: 2_000, ..Default::default() });
        let result = selector.select(
            &unspents,
            SelectionTarget {
                amount: target,
                destination: ScriptType::P2wpkh,
                change: ScriptType::P2wpkh,
            },
            fee,
        );
        if let Ok(selection) = result {
            prop_assert!(selection.input_total().is_some());
            prop_assert!(selection.has_change_output == (selection.change > 0));
        }
    }

    #[test]
    fn vl_length_prefixes_decode(len in 0usize..=918_744) {
        let prefix = encode_vl_length(len).unwrap();
        let expected_width = if len <= 192 { 1 } else if len <= 12_480 { 2 } else { 3 };
        prop_assert_eq!(prefix.len(), expected_width);
        prop_assert_eq!(decode_vl_length(&prefix), len);
    }
}

#[test]
fn vl_length_rejects_oversized_fields() {
    assert!(encode_vl_length(918_745).is_err());
}
