use chain_tx_engine::address::UtxoNetwork;
use chain_tx_engine::eip712::{hash_typed_data, TypedData};
use chain_tx_engine::serializer::xrp::{SIGNING_PREFIX, TEST_SIGNING_PREFIX};
use chain_tx_engine::{
    AddressType, Amount, Chain, ChainState, Curve, EngineConfig, Fee, FeeParameters,
    PublicKeyMaterial, RawSignature, TransactionEngine, TransactionParams, TransactionRequest,
    TxOrdering, UnspentOutput, U256,
};
use rust_decimal::Decimal;
use std::str::FromStr;

const BTC_PUBLIC_KEY: &str = "046DB397495FA03FE263EE4021B77C49496E5C7DB8266E6E33A03D5B3A370C3D6D744A863B14DE2457D82BEE322416523E336530760C4533AEE980F4A4CDB9A98D";
const BTC_SEGWIT: &str = "bc1qxzdqcmh6pknevm2ugtw94y50dwhsu3l0p5tg63";
const BTC_DESTINATION: &str = "bc1q67dmfccnax59247kshfkxcq6qr53wmwqfa4s28cupktj2amf5jus2j6qvt";
const BTC_UTXO_SCRIPT: &str = "0014309a0c6efa0da7966d5c42dc5a928f6baf0e47ef";
const BTC_SIGNATURE_1: &str = "00325BF907137BB6ED0A84D78C12F9680DD57AE374F45D43CDC7068ABF56F5B93C08BC1F9CD1E91E7A496DA2ECD54597B11AE0DDA4F6672235853C0CEF6BF8B4";
const BTC_SIGNATURE_2: &str = "ED59AEECB1AC0BAF31B6D84BB51C060DBBC3E0321EEEE6FADEBF073099629A9A7247306451FD78488B1AAE38391DA6CAA72B52D2E6D9359F9C682EFCBF388B07";
const BTC_SIGNED: &str = "01000000000102DF05DDAF1B9E0D7A36672DA32986499F5EC8B3946429D16E1CD6736CF4A3FECF0100000000FAFFFFFFEF0788C82E89047D926062A41C8500C4FE896069E95C37251D6B8CEED67A908B0000000000FAFFFFFF02005A620200000000220020D79BB4E313E9A85557D685D363601A00E9176DC04F6B051F1C0D97257769A4B9AF04B90000000000160014309A0C6EFA0DA7966D5C42DC5A928F6BAF0E47EF02463043021F325BF907137BB6ED0A84D78C12F9680DD57AE374F45D43CDC7068ABF56F5B902203C08BC1F9CD1E91E7A496DA2ECD54597B11AE0DDA4F6672235853C0CEF6BF8B40121036DB397495FA03FE263EE4021B77C49496E5C7DB8266E6E33A03D5B3A370C3D6D02483045022100ED59AEECB1AC0BAF31B6D84BB51C060DBBC3E0321EEEE6FADEBF073099629A9A02207247306451FD78488B1AAE38391DA6CAA72B52D2E6D9359F9C682EFCBF388B070121036DB397495FA03FE263EE4021B77C49496E5C7DB8266E6E33A03D5B3A370C3D6D00000000";

const POLYGON_PUBLIC_KEY: &str = "043b08e56e38404199eb3320f32fdc7557029d4a4c39adae01cc47afd86cfa9a25fcbfaa2acda3ab33560a1d482a2088f3bb2c7b313fd11f50dd8fe508165d4ecf";
const POLYGON_WALLET: &str = "0x90e4d59c8583e37426b37d1d7394b6008a987c67";

const SECP_COMPRESSED: &str = "0241DCD64B5F4A039FC339A16300A833A883B218909F2EBCAF3906651C76842C45";
const ED_KEY: &str = "9FE5BB2CC7D83C1DA10845AFD8A34B141FD8FD72500B95B1547E12B9BB8AAC3D";

fn engine() -> TransactionEngine {
    TransactionEngine::new(EngineConfig::default()).expect("default config is valid")
}

fn key(hex_key: &str, curve: Curve) -> PublicKeyMaterial {
    PublicKeyMaterial::new(hex::decode(hex_key).expect("hex key"), curve)
}

fn signature(hex_sig: &str) -> RawSignature {
    RawSignature::from_bytes(hex::decode(hex_sig).expect("hex signature")).expect("64-byte signature")
}

fn btc_request(ordering: TxOrdering) -> TransactionRequest {
    TransactionRequest {
        amount: Amount::coin(Chain::Bitcoin, Decimal::from_str("0.4").unwrap()),
        fee: Fee {
            amount: Amount::from_minor_units(Chain::Bitcoin, 4641),
            parameters: FeeParameters::Utxo { sat_per_byte: 21 },
        },
        source_address: BTC_SEGWIT.to_string(),
        destination_address: BTC_DESTINATION.to_string(),
        change_address: None,
        params: TransactionParams::Utxo {
            sequence: Some(0xffff_fffa),
            ordering,
        },
    }
}

fn btc_state() -> ChainState {
    let script = hex::decode(BTC_UTXO_SCRIPT).unwrap();
    ChainState::Utxo {
        unspents: vec![
            UnspentOutput {
                txid: "cffea3f46c73d61c6ed1296494b3c85e9f498629a32d67367a0d9e1bafdd05df".to_string(),
                vout: 1,
                amount: 12_210_000,
                script: script.clone(),
            },
            UnspentOutput {
                txid: "8b907ad6ee8c6b1d25375ce9696089fec400851ca46260927d04892ec88807ef".to_string(),
                vout: 0,
                amount: 39_920_000,
                script,
            },
        ],
    }
}

fn payload_hex(payload: &chain_tx_engine::SigningPayload) -> Vec<String> {
    payload
        .entries
        .iter()
        .map(|entry| hex::encode_upper(&entry.data))
        .collect()
}

#[test]
fn bitcoin_addresses_from_uncompressed_key() {
    let engine = engine();
    let key = key(BTC_PUBLIC_KEY, Curve::Secp256k1);
    let segwit = engine
        .registry()
        .make_address(Chain::Bitcoin, &key, AddressType::Default)
        .unwrap();
    assert_eq!(segwit.value, BTC_SEGWIT);
    assert!(engine.registry().validate(Chain::Bitcoin, BTC_DESTINATION));
    assert!(!engine.registry().validate(Chain::Litecoin, BTC_DESTINATION));
}

#[test]
fn bitcoin_segwit_end_to_end() {
    let engine = engine();
    let key = key(BTC_PUBLIC_KEY, Curve::Secp256k1);
    let ready = engine
        .draft(Chain::Bitcoin, btc_request(TxOrdering::None), btc_state(), key)
        .unwrap()
        .prepare()
        .unwrap();

    assert_eq!(
        payload_hex(ready.payload()),
        vec![
            "8272779353EAD7848859916DFA4E6ED4DAA54989CA6258566D0FFEDEC2002400",
            "5624DB10BC172D5300C03EB50E3A1B2947CDCE4C89F483994DF07BB81EB97EA8",
        ]
    );

    let tx = ready
        .with_signatures(&[signature(BTC_SIGNATURE_1), signature(BTC_SIGNATURE_2)])
        .unwrap()
        .finalize()
        .unwrap()
        .into_transaction();

    assert_eq!(tx.to_hex().to_uppercase(), BTC_SIGNED);
    assert_eq!(tx.hash.map(|h| h.len()), Some(64));
}

#[test]
fn bitcoin_bip69_payload() {
    let engine = engine();
    let key = key(BTC_PUBLIC_KEY, Curve::Secp256k1);
    let ready = engine
        .draft(Chain::Bitcoin, btc_request(TxOrdering::Bip69), btc_state(), key)
        .unwrap()
        .prepare()
        .unwrap();

    assert_eq!(
        payload_hex(ready.payload()),
        vec![
            "524AA09FDD0F8B414E2C66C650C9853C020963D56B84CE3049FDDD56869E5EEA",
            "CA0F139AD25974812C294544229ECE7D3293B9E53680AC63B83B3BC1B2FC22BD",
        ]
    );
}

#[test]
fn bitcoin_signatures_must_match_payload() {
    let engine = engine();
    let key = key(BTC_PUBLIC_KEY, Curve::Secp256k1);
    let err = engine
        .draft(Chain::Bitcoin, btc_request(TxOrdering::None), btc_state(), key)
        .unwrap()
        .prepare()
        .unwrap()
        .with_signatures(&[signature(BTC_SIGNATURE_2), signature(BTC_SIGNATURE_1)])
        .err()
        .expect("swapped signatures are rejected");
    assert_eq!(err.stage(), Some(chain_tx_engine::BuildStage::Signed));
}

#[test]
fn polygon_eip1559_coin_transfer() {
    let engine = engine();
    let request = TransactionRequest {
        amount: Amount::coin(Chain::Polygon, Decimal::ONE),
        fee: Fee {
            amount: Amount::from_minor_units(Chain::Polygon, 0),
            parameters: FeeParameters::Eip1559 {
                gas_limit: 21000,
                max_fee_per_gas: U256::from_u64(4_478_253_867_089),
                priority_fee: U256::from_u64(31_900_000_000),
            },
        },
        source_address: POLYGON_WALLET.to_string(),
        destination_address: POLYGON_WALLET.to_string(),
        change_address: None,
        params: TransactionParams::None,
    };

    let ready = engine
        .draft(
            Chain::Polygon,
            request,
            ChainState::Evm { nonce: 196 },
            key(POLYGON_PUBLIC_KEY, Curve::Secp256k1),
        )
        .unwrap()
        .prepare()
        .unwrap();
    assert_eq!(
        hex::encode(&ready.payload().entries[0].data),
        "925f1debbb96941544aefe6a5532508e51f2b8ae1f3a911abfb24b83af610400"
    );

    let tx = ready
        .with_signatures(&[signature(
            "56DF71FF2A7FE93D2363056FE5FF32C51E5AC71733AF23A82F3974CB872537E95B60D6A0042CC34724DB84E949EEC8643761FE9027E9E7B1ED3DA23D8AB7C0A4",
        )])
        .unwrap()
        .finalize()
        .unwrap()
        .into_transaction();
    assert_eq!(
        tx.to_hex(),
        "02f877818981c485076d635f00860412acbb20518252089490e4d59c8583e37426b37d1d7394b6008a987c67880de0b6b3a764000080c080a056df71ff2a7fe93d2363056fe5ff32c51e5ac71733af23a82f3974cb872537e9a05b60d6a0042cc34724db84e949eec8643761fe9027e9e7b1ed3da23d8ab7c0a4"
    );
}

#[test]
fn ethereum_legacy_transfer() {
    let engine = engine();
    let request = TransactionRequest {
        amount: Amount::coin(Chain::Ethereum, Decimal::from_str("0.1").unwrap()),
        fee: Fee {
            amount: Amount::from_minor_units(Chain::Ethereum, 0),
            parameters: FeeParameters::EvmLegacy {
                gas_limit: 21000,
                gas_price: U256::from_u64(476_190_476_190),
            },
        },
        source_address: "0xb1123efF798183B7Cb32F62607D3D39E950d9cc3".to_string(),
        destination_address: "0x7655b9b19ffab8b897f836857dae22a1e7f8d735".to_string(),
        change_address: None,
        params: TransactionParams::Evm {
            nonce: Some(15),
            data: None,
        },
    };

    let tx = engine
        .draft(
            Chain::Ethereum,
            request,
            ChainState::Evm { nonce: 0 },
            key(
                "04EB30400CE9D1DEED12B84D4161A1FA922EF4185A155EF3EC208078B3807B126FA22C335081AAEBF161095C11C7D8BD550EF8882A3125B0EE9AE96DDDE1AE743F",
                Curve::Secp256k1,
            ),
        )
        .unwrap()
        .prepare()
        .unwrap()
        .with_signatures(&[signature(
            "B945398FB90158761F6D61789B594D042F0F490F9656FBFFAE8F18B49D5F30054F43EE43CCAB2703F0E2E4E61D99CF3D4A875CD759569787CF0AED02415434C6",
        )])
        .unwrap()
        .finalize()
        .unwrap()
        .into_transaction();

    assert!(tx.to_hex().starts_with("f86c0f856edf2a079e825208"));
    assert!(tx.to_hex().contains("25a0b945398fb90158761f6d61789b594d042f0f490f9656fbffae8f18b49d5f3005"));
}

#[test]
fn xrp_signing_prefix_per_network() {
    let engine = engine();
    let key = key(ED_KEY, Curve::Ed25519);
    for (chain, prefix) in [(Chain::Xrp, SIGNING_PREFIX), (Chain::XrpTestnet, TEST_SIGNING_PREFIX)] {
        let source = engine
            .registry()
            .make_address(chain, &key, AddressType::Default)
            .unwrap();
        let request = TransactionRequest {
            amount: Amount::coin(chain, Decimal::from_str("1.5").unwrap()),
            fee: Fee {
                amount: Amount::from_minor_units(chain, 10),
                parameters: FeeParameters::Fixed,
            },
            source_address: source.value.clone(),
            destination_address: "rJjXGYnKNcbTsnuwoaP9wfDebB8hDX8jdQ".to_string(),
            change_address: None,
            params: TransactionParams::None,
        };
        let ready = engine
            .draft(
                chain,
                request,
                ChainState::Xrp {
                    sequence: 1,
                    last_ledger_sequence: None,
                },
                key.clone(),
            )
            .unwrap()
            .prepare()
            .unwrap();
        assert_eq!(&ready.payload().entries[0].data[..4], &prefix[..]);
    }
}

#[test]
fn account_addresses_for_shared_keys() {
    let engine = engine();
    let registry = engine.registry();
    let secp = key(SECP_COMPRESSED, Curve::Secp256k1);
    let ed = key(ED_KEY, Curve::Ed25519);

    let cases = [
        (Chain::Ethereum, &secp, "0x6ECa00c52AFC728CDbF42E817d712e175bb23C7d"),
        (Chain::Polygon, &secp, "0x6ECa00c52AFC728CDbF42E817d712e175bb23C7d"),
        (Chain::Xrp, &secp, "rJjXGYnKNcbTsnuwoaP9wfDebB8hDX8jdQ"),
        (Chain::Xrp, &ed, "rPhmKhkYoMiqC2xqHYhtPLnicWQi85uDf2"),
        (Chain::Tezos, &ed, "tz1VS42nEFHoTayE44ZKANQWNhZ4QbWFV8qd"),
        (Chain::Tezos, &secp, "tz2SdMQ72FP39GB1Cwyvs2BPRRAMv9M6Pc6B"),
    ];
    for (chain, key, expected) in cases {
        let address = registry.make_address(chain, key, AddressType::Default).unwrap();
        assert_eq!(address.value, expected, "{}", chain);
        assert!(registry.validate(chain, expected));
    }

    let algorand = registry.make_address(Chain::Algorand, &ed, AddressType::Default).unwrap();
    assert!(registry.validate(Chain::Algorand, &algorand.value));
    assert!(registry.make_address(Chain::Algorand, &secp, AddressType::Default).is_err());
}

#[test]
fn eip712_mail_digest() {
    let json = r#"{
        "types": {
            "EIP712Domain": [
                {"name": "name", "type": "string"},
                {"name": "version", "type": "string"},
                {"name": "chainId", "type": "uint256"},
                {"name": "verifyingContract", "type": "address"}
            ],
            "Person": [
                {"name": "name", "type": "string"},
                {"name": "wallet", "type": "address"}
            ],
            "Mail": [
                {"name": "from", "type": "Person"},
                {"name": "to", "type": "Person"},
                {"name": "contents", "type": "string"}
            ]
        },
        "primaryType": "Mail",
        "domain": {
            "name": "Ether Mail",
            "version": "1",
            "chainId": 1,
            "verifyingContract": "0xCcCCccccCCCCcCCCCCCcCcCccCcCCCcCcccccccC"
        },
        "message": {
            "from": {"name": "Cow", "wallet": "0xCD2a3d9F938E13CD947Ec05AbC7FE734Df8DD826"},
            "to": {"name": "Bob", "wallet": "0xbBbBBBBbbBBBbbbBbbBbbbbBBbBbbbbBbBbbBBbB"},
            "contents": "Hello, Bob!"
        }
    }"#;
    let typed_data = TypedData::from_json(json).unwrap();
    assert_eq!(
        hex::encode(hash_typed_data(&typed_data).unwrap()),
        "be609aee343fb3c4b28e1df9e632fca64fcfaede20f02e86244efddf30957bd2"
    );
}

#[test]
fn custom_network_parameters() {
    let network = UtxoNetwork::litecoin();
    let engine = engine();
    let key = key(SECP_COMPRESSED, Curve::Secp256k1);
    let address = engine
        .registry()
        .make_address(Chain::Litecoin, &key, AddressType::Default)
        .unwrap();
    assert!(address.value.starts_with("ltc1"));
    assert!(network.decode(&address.value).is_ok());
}
