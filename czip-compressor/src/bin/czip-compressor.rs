//! czip-compressor command line.
//!
//! Compresses calldata into the decompressor contract's flag stream. The
//! heavier subcommands expect their wallet inputs pre-decoded: parsing
//! execute calldata back into a transaction tree is the wallet library's
//! job, so `encode_sequence_tx` takes a JSON document.

use std::fs;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use czip_asm::{flags_matching, AllowOpcodes, Method};
use czip_compressor::buffer::Indexes;
use czip_compressor::rpc::HttpProvider;
use czip_compressor::{bytes4, cache, contract, Buffer, Transaction};
use czip_types::Address;

#[derive(Parser)]
#[command(
    name = "czip-compressor",
    version,
    about = "Compress EVM calldata for the czip decompressor contract"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    opts: GlobalOpts,
}

#[derive(Args)]
struct GlobalOpts {
    /// Use the decompressor contract's storage index tables.
    #[arg(long, global = true)]
    use_storage: bool,

    /// JSON-RPC endpoint used to read the decompressor contract.
    #[arg(long, global = true)]
    provider: Option<String>,

    /// Address of the decompressor contract.
    #[arg(long, global = true)]
    contract: Option<String>,

    /// Directory holding the per-chain stored-index cache files.
    #[arg(long, global = true, default_value = "/tmp")]
    cache_dir: PathBuf,

    /// Comma-separated opcode name fragments to allow; all others are denied.
    #[arg(long, global = true, conflicts_with = "disallow_opcodes")]
    allow_opcodes: Option<String>,

    /// Comma-separated opcode name fragments to deny.
    #[arg(long, global = true)]
    disallow_opcodes: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Compress an arbitrary hex byte string.
    #[command(name = "encode_any")]
    EncodeAny {
        /// Payload, hex encoded.
        data: String,
    },

    /// Compress a single call: payload plus target address.
    #[command(name = "encode_call")]
    EncodeCall {
        /// Call payload, hex encoded.
        data: String,
        /// Call target address.
        to: String,
    },

    /// Compress a batch of calls given as address:data pairs.
    #[command(name = "encode_calls")]
    EncodeCalls {
        /// Calls as `<address-hex>:<data-hex>` pairs.
        calls: Vec<String>,
    },

    /// Compress a decoded wallet execute transaction from a JSON document.
    #[command(name = "encode_sequence_tx")]
    EncodeSequenceTx {
        /// Path of the decoded transaction JSON.
        tx: PathBuf,
        /// Wallet address; when given the stream executes instead of decoding.
        wallet: Option<String>,
    },

    /// Standalone composite encoders, mostly for decompressor testing.
    #[command(name = "extras")]
    Extras {
        /// One of: nested_n_words, dynamic_signature_part,
        /// branch_signature_part, nested_signature_part, chained_signature.
        kind: String,
        /// Input payload, hex encoded.
        data: String,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run() {
        eprintln!("Error: {err}");
        process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let allow = parse_allow_opcodes(&cli.opts)?;
    let indexes = Some(use_indexes(&cli.opts)?);
    let use_storage = cli.opts.use_storage;

    let buf = match &cli.command {
        Command::EncodeAny { data } => {
            let input = decode_hex(data)?;
            let mut buf = Buffer::new(Method::DecodeAny, indexes, allow, use_storage);
            buf.write_bytes(&input, true)?;
            buf
        }

        Command::EncodeCall { data, to } => {
            let data = decode_hex(data)?;
            let to: Address = parse_address(to)?;
            let mut buf = Buffer::new(Method::DecodeCall, indexes, allow, use_storage);
            buf.write_call(to.as_ref(), &data)?;
            buf
        }

        Command::EncodeCalls { calls } => {
            let mut tos = Vec::with_capacity(calls.len());
            let mut datas = Vec::with_capacity(calls.len());
            for pair in calls {
                let (to, data) = pair
                    .split_once(':')
                    .context("calls must be <address-hex>:<data-hex> pairs")?;
                tos.push(parse_address(to)?.as_ref().to_vec());
                datas.push(decode_hex(data)?);
            }

            let tos: Vec<&[u8]> = tos.iter().map(Vec::as_slice).collect();
            let datas: Vec<&[u8]> = datas.iter().map(Vec::as_slice).collect();

            let mut buf = Buffer::new(Method::DecodeNCalls, indexes, allow, use_storage);
            buf.write_calls(&tos, &datas)?;
            buf
        }

        Command::EncodeSequenceTx { tx, wallet } => {
            let raw = fs::read(tx).with_context(|| format!("reading {}", tx.display()))?;
            let tx: Transaction = serde_json::from_slice(&raw).context("parsing transaction")?;

            let (method, to) = match wallet {
                Some(wallet) => (Method::ExecuteSequenceTx, Some(parse_address(wallet)?)),
                None => (Method::DecodeSequenceTx, None),
            };

            let mut buf = Buffer::new(method, indexes, allow, use_storage);
            buf.write_sequence_execute(to.as_ref().map(|to| to.as_ref()), &tx)?;
            buf
        }

        Command::Extras { kind, data } => {
            let data = decode_hex(data)?;
            let mut buf = Buffer::new(Method::DecodeAny, indexes, allow, use_storage);
            encode_extras(&mut buf, kind, &data)?;
            buf
        }
    };

    println!("0x{}", hex::encode(buf.data()));
    Ok(())
}

fn encode_extras(buf: &mut Buffer, kind: &str, data: &[u8]) -> Result<()> {
    match kind {
        "nested_n_words" => {
            buf.write_n_words(data)?;
        }
        "dynamic_signature_part" => {
            // 20 bytes of address, one byte of weight, then the signature.
            if data.len() < 21 {
                bail!("dynamic signature part needs at least 21 bytes");
            }
            let (address, rest) = data.split_at(20);
            buf.write_sequence_dynamic_signature_part(address, u32::from(rest[0]), &rest[1..])?;
        }
        "branch_signature_part" => {
            buf.write_sequence_branch_signature_part(data)?;
        }
        "nested_signature_part" => {
            // One byte of weight, one of threshold, then the subtree.
            if data.len() < 2 {
                bail!("nested signature part needs at least 2 bytes");
            }
            buf.write_sequence_nested_signature_part(
                u32::from(data[0]),
                u32::from(data[1]),
                &data[2..],
            )?;
        }
        "chained_signature" => {
            buf.write_sequence_chained_signature(data)?;
        }
        other => bail!("unknown extra: {other}"),
    }

    Ok(())
}

/// Resolves the allow/deny name fragments to a concrete opcode policy.
fn parse_allow_opcodes(opts: &GlobalOpts) -> Result<Option<Arc<AllowOpcodes>>> {
    fn resolve(list: &str) -> Result<Vec<u8>> {
        let mut ops = Vec::new();
        for name in list.split(',').map(str::trim).filter(|name| !name.is_empty()) {
            let matched = flags_matching(name);
            if matched.is_empty() {
                bail!("no opcode matches {name:?}");
            }
            ops.extend(matched);
        }
        Ok(ops)
    }

    if let Some(list) = &opts.allow_opcodes {
        return Ok(Some(Arc::new(AllowOpcodes::allowing(resolve(list)?))));
    }

    if let Some(list) = &opts.disallow_opcodes {
        return Ok(Some(Arc::new(AllowOpcodes::denying(resolve(list)?))));
    }

    Ok(None)
}

/// Builds the stored-index tables: cached state plus whatever the contract
/// has appended since, fetched over RPC and re-cached.
fn use_indexes(opts: &GlobalOpts) -> Result<Arc<Indexes>> {
    let mut indexes = if opts.use_storage {
        let provider = HttpProvider::new(
            opts.provider
                .as_deref()
                .context("--use-storage requires --provider")?,
        );
        let contract_address: Address = parse_address(
            opts.contract
                .as_deref()
                .context("--use-storage requires --contract")?,
        )?;

        let chain_id = provider.chain_id()?;
        let path = cache::cache_path(&opts.cache_dir, chain_id);
        let mut indexes = cache::load_cached_indexes(&path)?;

        let (fresh_addresses, fresh_bytes32) = contract::load_state(
            &provider,
            &contract_address,
            cache::highest_index(&indexes.address_indexes),
            cache::highest_index(&indexes.bytes32_indexes),
        )?;

        tracing::info!(
            chain_id,
            addresses = fresh_addresses.len(),
            bytes32 = fresh_bytes32.len(),
            "fetched new stored indexes"
        );

        indexes.address_indexes.extend(fresh_addresses);
        indexes.bytes32_indexes.extend(fresh_bytes32);

        cache::save_cached_indexes(&path, &indexes)?;
        indexes
    } else {
        Indexes::default()
    };

    indexes.bytes4_indexes = bytes4::indexes();
    Ok(Arc::new(indexes))
}

fn decode_hex(text: &str) -> Result<Vec<u8>> {
    hex::decode(text.trim_start_matches("0x")).context("invalid hex input")
}

fn parse_address(text: &str) -> Result<Address> {
    text.parse()
        .with_context(|| format!("invalid address {text:?}"))
}
