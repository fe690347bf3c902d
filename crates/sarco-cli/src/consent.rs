//! # Consent Subcommand
//!
//! Signs a custodian's agreement to curse terms and prints the
//! `CustodianConsent` JSON an embalmer includes in a create request.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use sarco_core::{Amount, Timestamp};
use sarco_crypto::{sign_consent, ConsentPayload};
use sarco_protocol::CustodianConsent;

/// Arguments for the `sarco consent` subcommand.
#[derive(Args, Debug)]
pub struct ConsentArgs {
    /// Custodian identity private key (hex-encoded seed).
    #[arg(long)]
    pub key: PathBuf,
    /// Public key of the shard generated for this case.
    #[arg(long)]
    pub shard_pubkey: PathBuf,
    /// Digging fee per second, in smallest token units.
    #[arg(long)]
    pub fee_rate: Amount,
    /// Longest accepted interval between now and resurrection, in seconds.
    #[arg(long)]
    pub max_rewrap_interval: u64,
    /// Latest accepted resurrection time (RFC 3339, UTC `Z`).
    #[arg(long)]
    pub max_resurrection_time: String,
    /// Negotiation time the consent is anchored to (default: now).
    #[arg(long)]
    pub creation_time: Option<String>,
}

/// Execute the consent subcommand.
pub fn run_consent(args: &ConsentArgs) -> Result<u8> {
    let consent = build_consent(args)?;
    println!("{}", serde_json::to_string_pretty(&consent)?);
    Ok(0)
}

/// Sign the consent described by `args`.
pub fn build_consent(args: &ConsentArgs) -> Result<CustodianConsent> {
    let identity = crate::read_key_pair(&args.key)?;
    let public_key = crate::read_public_key(&args.shard_pubkey)?;
    let maximum_resurrection_time = Timestamp::parse(&args.max_resurrection_time)
        .context("invalid --max-resurrection-time")?;
    let creation_time = match &args.creation_time {
        Some(raw) => Timestamp::parse(raw).context("invalid --creation-time")?,
        None => Timestamp::from_utc(chrono::Utc::now())?,
    };

    let payload = ConsentPayload {
        public_key,
        digging_fee_rate: args.fee_rate,
        maximum_rewrap_interval: args.max_rewrap_interval,
        maximum_resurrection_time,
        creation_time,
    };
    let signature = sign_consent(&identity, &payload)
        .map_err(|e| anyhow::anyhow!("failed to sign consent: {e}"))?;
    tracing::info!(custodian = %identity.address(), shard = %public_key, "signed consent");

    Ok(CustodianConsent {
        address: identity.address(),
        public_key,
        digging_fee_rate: args.fee_rate,
        signature,
    })
}
