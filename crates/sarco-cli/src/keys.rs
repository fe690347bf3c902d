//! # Keys Subcommand
//!
//! Generates Ed25519 key pairs for custodian identities and per-case
//! shards. Both are the same kind of key: the identity key signs consents
//! and determines the custodian's address, a shard key's public half is
//! committed to a case and its secret seed is what the custodian publishes.
//!
//! Keys are written as `{prefix}.key` (hex seed) and `{prefix}.pub` (hex
//! public key).

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Subcommand};

use sarco_crypto::{Ed25519KeyPair, ShardKey};

/// Arguments for the `sarco keys` subcommand.
#[derive(Args, Debug)]
pub struct KeysArgs {
    #[command(subcommand)]
    pub command: KeysCommand,
}

/// Key subcommands.
#[derive(Subcommand, Debug)]
pub enum KeysCommand {
    /// Generate a new Ed25519 key pair.
    Generate {
        /// Output directory for the key files.
        #[arg(long, short, default_value = ".")]
        output: PathBuf,
        /// Prefix for the key filenames.
        #[arg(long, default_value = "sarco")]
        prefix: String,
    },

    /// Print the account address of a public key.
    Address {
        /// Path to the public key file (hex-encoded 32-byte key).
        #[arg(value_name = "PUBKEY")]
        pubkey: PathBuf,
    },
}

/// Execute the keys subcommand.
pub fn run_keys(args: &KeysArgs) -> Result<u8> {
    match &args.command {
        KeysCommand::Generate { output, prefix } => cmd_generate(output, prefix),
        KeysCommand::Address { pubkey } => {
            let pk = crate::read_public_key(pubkey)?;
            println!("{}", pk.address());
            Ok(0)
        }
    }
}

fn cmd_generate(output_dir: &Path, prefix: &str) -> Result<u8> {
    let (key_path, pub_path) = write_key_pair(output_dir, prefix, &Ed25519KeyPair::generate())?;
    let kp = crate::read_key_pair(&key_path)?;

    println!("OK: generated Ed25519 key pair");
    println!("  Private key: {}", key_path.display());
    println!("  Public key:  {}", pub_path.display());
    println!("  Public key (hex): {}", kp.public_key());
    println!("  Address: {}", kp.address());
    Ok(0)
}

/// Write `{prefix}.key` and `{prefix}.pub` under `output_dir`.
pub fn write_key_pair(
    output_dir: &Path,
    prefix: &str,
    kp: &Ed25519KeyPair,
) -> Result<(PathBuf, PathBuf)> {
    std::fs::create_dir_all(output_dir).with_context(|| {
        format!("failed to create output directory: {}", output_dir.display())
    })?;

    let key_path = output_dir.join(format!("{prefix}.key"));
    let pub_path = output_dir.join(format!("{prefix}.pub"));

    std::fs::write(&key_path, ShardKey::from(kp).to_hex())
        .with_context(|| format!("failed to write private key: {}", key_path.display()))?;
    std::fs::write(&pub_path, kp.public_key().to_hex())
        .with_context(|| format!("failed to write public key: {}", pub_path.display()))?;
    Ok((key_path, pub_path))
}
