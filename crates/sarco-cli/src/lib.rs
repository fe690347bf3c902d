//! # sarco-cli — CLI Tool for the Sarcophagus Protocol
//!
//! ## Subcommands
//!
//! - `sarco keys` — Ed25519 key generation and address derivation.
//! - `sarco consent` — sign curse terms as a custodian.
//! - `sarco simulate` — replay a YAML scenario against an in-memory ledger.
//! - `sarco params` — print the effective configuration.
//!
//! ```bash
//! sarco keys generate --output keys --prefix alice
//! sarco keys generate --output keys --prefix alice-shard-1
//! sarco consent --key keys/alice.key --shard-pubkey keys/alice-shard-1.pub \
//!     --fee-rate 10 --max-rewrap-interval 2419200 \
//!     --max-resurrection-time 2026-01-01T00:00:00Z
//! sarco simulate scenario.yaml
//! ```

pub mod consent;
pub mod keys;
pub mod params;
pub mod simulate;

use std::path::Path;

use anyhow::{bail, Context, Result};
use sarco_crypto::{Ed25519KeyPair, Ed25519PublicKey};

/// Read a hex-encoded 32-byte secret seed.
pub fn read_key_pair(path: &Path) -> Result<Ed25519KeyPair> {
    if !path.exists() {
        bail!("private key file not found: {}", path.display());
    }
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read private key: {}", path.display()))?;
    let shard = sarco_crypto::ShardKey::from_hex(raw.trim())
        .map_err(|e| anyhow::anyhow!("invalid private key {}: {e}", path.display()))?;
    Ok(shard.key_pair())
}

/// Read a hex-encoded 32-byte public key.
pub fn read_public_key(path: &Path) -> Result<Ed25519PublicKey> {
    if !path.exists() {
        bail!("public key file not found: {}", path.display());
    }
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read public key: {}", path.display()))?;
    Ed25519PublicKey::from_hex(raw.trim())
        .map_err(|e| anyhow::anyhow!("invalid public key {}: {e}", path.display()))
}
