use anyhow::{Context, Result};
use chain_tx_engine::abi::erc20;
use chain_tx_engine::address::ethereum::parse_address;
use chain_tx_engine::eip712::{pre_image, TypedData};
use chain_tx_engine::encoding::{base58, hex as hexutil};
use chain_tx_engine::{
    estimate_fee, AddressType, Chain, Curve, EngineConfig, EngineError, ErrorCode, ErrorReport,
    FeeMarket, FeeTier, PublicKeyMaterial, U256,
};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde_json::json;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "CHAIN_TX_LOG";

#[derive(Parser, Debug)]
#[command(
    name = "chain-tx",
    version,
    about = "Address, calldata and fee tooling for the chain transaction engine"
)]
struct Cli {
    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Engine configuration file (JSON); built-in networks otherwise
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Derive an address from a hex public key
    Address {
        #[arg(long)]
        chain: Chain,
        /// Public key, hex with or without 0x
        #[arg(long)]
        public_key: String,
        /// Key curve; defaults to the chain's first supported curve
        #[arg(long)]
        curve: Option<Curve>,
        #[arg(long, value_enum, default_value_t = AddressKind::Default)]
        kind: AddressKind,
    },
    /// Check whether an address is valid for a chain
    Validate {
        #[arg(long)]
        chain: Chain,
        address: String,
    },
    /// Build ERC-20 calldata
    Erc20 {
        #[command(subcommand)]
        call: Erc20Call,
    },
    /// Hash an EIP-712 typed-data JSON document
    Eip712 { file: PathBuf },
    /// Base58 encode or decode
    Base58 {
        #[command(subcommand)]
        op: Base58Op,
    },
    /// Estimate a fee from a fee-market JSON snapshot
    Fee(FeeArgs),
}

#[derive(Subcommand, Debug)]
enum Erc20Call {
    Transfer {
        #[arg(long)]
        to: String,
        /// Amount in the token's smallest unit (decimal or 0x hex)
        #[arg(long)]
        amount: U256,
    },
    Approve {
        #[arg(long)]
        spender: String,
        #[arg(long)]
        amount: U256,
    },
    BalanceOf {
        #[arg(long)]
        owner: String,
    },
    Allowance {
        #[arg(long)]
        owner: String,
        #[arg(long)]
        spender: String,
    },
}

#[derive(Subcommand, Debug)]
enum Base58Op {
    /// Encode hex bytes
    Encode {
        hex: String,
        /// Append a double-SHA256 checksum
        #[arg(long)]
        check: bool,
    },
    /// Decode to hex bytes
    Decode {
        text: String,
        #[arg(long)]
        check: bool,
    },
}

#[derive(Args, Debug)]
struct FeeArgs {
    #[arg(long)]
    chain: Chain,
    /// Fee-market snapshot (JSON)
    #[arg(long, value_name = "FILE")]
    market: PathBuf,
    /// Fee tier; defaults to the configured tier
    #[arg(long)]
    tier: Option<FeeTier>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum AddressKind {
    Default,
    Legacy,
    Compat,
}

impl From<AddressKind> for AddressType {
    fn from(kind: AddressKind) -> Self {
        match kind {
            AddressKind::Default => AddressType::Default,
            AddressKind::Legacy => AddressType::Legacy,
            AddressKind::Compat => AddressType::Compat,
        }
    }
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let report = error_report(&err);
            match serde_json::to_string(&report) {
                Ok(json) => eprintln!("{}", json),
                Err(_) => eprintln!("{:#}", err),
            }
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn error_report(err: &anyhow::Error) -> ErrorReport {
    match err.downcast_ref::<EngineError>() {
        Some(engine) => engine.report(),
        None => ErrorReport {
            code: ErrorCode::InvalidRequest,
            message: format!("{:#}", err),
            stage: None,
        },
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<EngineConfig> {
    match path {
        Some(path) => Ok(EngineConfig::from_file(path)?),
        None => Ok(EngineConfig::default()),
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_ref())?;
    let json = cli.json;

    match cli.command {
        Command::Address {
            chain,
            public_key,
            curve,
            kind,
        } => {
            let curve = match curve {
                Some(curve) => curve,
                None => chain
                    .supported_curves()
                    .first()
                    .copied()
                    .ok_or_else(|| EngineError::invalid_request(format!("{} has no curves", chain)))?,
            };
            let key = PublicKeyMaterial::new(hexutil::decode(&public_key)?, curve);
            let registry = config.address_registry()?;
            let address = registry.make_address(chain, &key, kind.into())?;
            if json {
                println!("{}", serde_json::to_string_pretty(&address)?);
            } else {
                println!("{}", address.value);
            }
        }
        Command::Validate { chain, address } => {
            let valid = config.address_registry()?.validate(chain, &address);
            if json {
                println!(
                    "{}",
                    json!({ "chain": chain, "address": address, "valid": valid })
                );
            } else {
                println!("{}", if valid { "valid" } else { "invalid" });
            }
            if !valid {
                return Err(EngineError::invalid_address(format!(
                    "{} is not a valid {} address",
                    address, chain
                ))
                .into());
            }
        }
        Command::Erc20 { call } => {
            let data = match call {
                Erc20Call::Transfer { to, amount } => erc20::transfer(parse_address(&to)?, amount),
                Erc20Call::Approve { spender, amount } => {
                    erc20::approve(parse_address(&spender)?, amount)
                }
                Erc20Call::BalanceOf { owner } => erc20::balance_of(parse_address(&owner)?),
                Erc20Call::Allowance { owner, spender } => {
                    erc20::allowance(parse_address(&owner)?, parse_address(&spender)?)
                }
            }
            .map_err(EngineError::from)?;
            let data = hexutil::encode_prefixed(&data);
            if json {
                println!("{}", json!({ "data": data }));
            } else {
                println!("{}", data);
            }
        }
        Command::Eip712 { file } => {
            let text = std::fs::read_to_string(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            let typed_data = TypedData::from_json(&text).map_err(EngineError::from)?;
            let hashes = pre_image(&typed_data).map_err(EngineError::from)?;
            if json {
                println!(
                    "{}",
                    json!({
                        "domain_separator": hexutil::encode_prefixed(&hashes.domain_separator),
                        "struct_hash": hexutil::encode_prefixed(&hashes.struct_hash),
                        "digest": hexutil::encode_prefixed(&hashes.final_hash),
                    })
                );
            } else {
                println!("{}", hexutil::encode_prefixed(&hashes.final_hash));
            }
        }
        Command::Base58 { op } => {
            let output = match op {
                Base58Op::Encode { hex, check } => {
                    let bytes = hexutil::decode(&hex)?;
                    if check {
                        base58::encode_check(&bytes)
                    } else {
                        base58::encode(&bytes)
                    }
                }
                Base58Op::Decode { text, check } => {
                    let bytes = if check {
                        base58::decode_check(&text)?
                    } else {
                        base58::decode(&text)?
                    };
                    hexutil::encode(&bytes)
                }
            };
            if json {
                println!("{}", json!({ "result": output }));
            } else {
                println!("{}", output);
            }
        }
        Command::Fee(args) => {
            let text = std::fs::read_to_string(&args.market)
                .with_context(|| format!("reading {}", args.market.display()))?;
            let market: FeeMarket = serde_json::from_str(&text).map_err(EngineError::from)?;
            let tier = args.tier.unwrap_or(config.default_tier);
            let fee = estimate_fee(args.chain, &market, tier)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&fee)?);
            } else {
                println!("{} {} ({})", fee.amount.value, fee.amount.currency_symbol, tier);
            }
        }
    }
    Ok(())
}

