//! # Case Registry
//!
//! Per-case records: who created the case, who receives it, which
//! custodians hold shards, the timing fields every guard reads, and the
//! status of the case and of each custodian's obligation.
//!
//! ## Status Machine
//!
//! ```text
//! Active ──┬── threshold shards published ──▶ Resurrected ──clean──▶ (cleaned flag)
//!          ├── too few unaccused custodians ─▶ Accused
//!          ├── embalmer buries ──────────────▶ Buried
//!          └── clean after grace period ─────▶ Cleaned
//! ```
//!
//! Only `Active` accepts rewrap, accuse and bury. No status returns to
//! `Active`. Cases are never removed.
//!
//! ## Dispositions
//!
//! Every (case, custodian) pair starts `Pending` and ends in exactly one
//! of `Published`, `Accused`, `Swept` or `Released`. Only pending pairs
//! hold locked bond and escrowed fees.

use std::collections::{BTreeMap, BTreeSet};

use sarco_core::amount::as_string;
use sarco_core::{Address, Amount, CaseId, Timestamp};
use sarco_crypto::{Ed25519PublicKey, ShardKey};
use serde::{Deserialize, Serialize};

// ── Status ─────────────────────────────────────────────────────────────

/// Lifecycle status of a case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CaseStatus {
    /// Bond locked, awaiting the resurrection window.
    Active,
    /// Threshold of shards published inside the window.
    Resurrected,
    /// Compromised by accusations before resurrection.
    Accused,
    /// Cancelled by the embalmer; never resurrects.
    Buried,
    /// Swept after the deadlines passed without resurrection.
    Cleaned,
}

impl CaseStatus {
    /// The canonical string name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Resurrected => "RESURRECTED",
            Self::Accused => "ACCUSED",
            Self::Buried => "BURIED",
            Self::Cleaned => "CLEANED",
        }
    }
}

impl std::fmt::Display for CaseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one custodian's obligation on one case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Disposition {
    /// Bond locked, shard not yet published.
    Pending,
    /// Shard published; bond unlocked and fee earned.
    Published,
    /// Shard leaked before resurrection; bond slashed.
    Accused,
    /// Failed to publish; bond slashed by a clean.
    Swept,
    /// Case ended early (buried or compromised); bond unlocked.
    Released,
}

impl Disposition {
    /// The canonical string name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Published => "PUBLISHED",
            Self::Accused => "ACCUSED",
            Self::Swept => "SWEPT",
            Self::Released => "RELEASED",
        }
    }
}

impl std::fmt::Display for Disposition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Records ────────────────────────────────────────────────────────────

/// Curse terms of one custodian on one case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CursedCustodian {
    /// The custodian's account.
    pub address: Address,
    /// Committed shard public key.
    pub public_key: Ed25519PublicKey,
    /// Digging fee per second.
    #[serde(with = "as_string")]
    pub digging_fee_rate: Amount,
    /// Bond locked against this case.
    #[serde(with = "as_string")]
    pub locked_bond: Amount,
    /// Digging fee prepaid by the embalmer and held until settlement:
    /// `fee_rate * (resurrection_time - previous_rewrap_time)`.
    #[serde(with = "as_string")]
    pub escrowed_fee: Amount,
    /// The shard, once published.
    pub published_shard: Option<ShardKey>,
    pub disposition: Disposition,
}

impl CursedCustodian {
    pub fn is_pending(&self) -> bool {
        self.disposition == Disposition::Pending
    }

    pub fn is_accused(&self) -> bool {
        self.disposition == Disposition::Accused
    }
}

/// A sarcophagus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Case {
    pub id: CaseId,
    pub name: String,
    pub embalmer: Address,
    pub recipient: Address,
    /// Creation time the custodians signed.
    pub creation_time: Timestamp,
    /// Time of creation or of the most recent rewrap.
    pub previous_rewrap_time: Timestamp,
    pub resurrection_time: Timestamp,
    /// Grace period in force when the case was created.
    pub grace_period: u64,
    /// Signed upper bound on `resurrection_time - now` at create and rewrap.
    pub maximum_rewrap_interval: u64,
    /// Signed upper bound on `resurrection_time`.
    pub maximum_resurrection_time: Timestamp,
    /// Shards required to reconstruct the secret.
    pub threshold: u8,
    pub transferable: bool,
    pub status: CaseStatus,
    pub cleaned: bool,
    /// Assigned custodians in the order the embalmer listed them.
    pub custodians: Vec<CursedCustodian>,
    pub published_count: usize,
}

impl Case {
    /// Resurrection time, or `None` once buried.
    pub fn effective_resurrection_time(&self) -> Option<Timestamp> {
        match self.status {
            CaseStatus::Buried => None,
            _ => Some(self.resurrection_time),
        }
    }

    /// Last instant at which a shard may be published.
    pub fn publish_deadline(&self) -> Timestamp {
        self.resurrection_time.saturating_add_secs(self.grace_period)
    }

    /// Last instant at which the embalmer may clean.
    pub fn embalmer_claim_deadline(&self, claim_window: u64) -> Timestamp {
        self.publish_deadline().saturating_add_secs(claim_window)
    }

    pub fn custodian(&self, address: Address) -> Option<&CursedCustodian> {
        self.custodians.iter().find(|c| c.address == address)
    }

    /// Position of the custodian who committed `public_key`.
    pub fn position_of_key(&self, public_key: &Ed25519PublicKey) -> Option<usize> {
        self.custodians.iter().position(|c| c.public_key == *public_key)
    }

    pub fn custodian_addresses(&self) -> Vec<Address> {
        self.custodians.iter().map(|c| c.address).collect()
    }

    pub fn pending_custodians(&self) -> impl Iterator<Item = &CursedCustodian> {
        self.custodians.iter().filter(|c| c.is_pending())
    }

    pub fn any_accused(&self) -> bool {
        self.custodians.iter().any(CursedCustodian::is_accused)
    }

    /// Custodians who were not accused (and could still count toward the
    /// threshold).
    pub fn unaccused_count(&self) -> usize {
        self.custodians.iter().filter(|c| !c.is_accused()).count()
    }
}

// ── Registry ───────────────────────────────────────────────────────────

/// All cases with lookup indices.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseRegistry {
    cases: BTreeMap<CaseId, Case>,
    by_embalmer: BTreeMap<Address, Vec<CaseId>>,
    by_recipient: BTreeMap<Address, Vec<CaseId>>,
    by_custodian: BTreeMap<Address, Vec<CaseId>>,
    used_public_keys: BTreeSet<Ed25519PublicKey>,
}

impl CaseRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: CaseId) -> bool {
        self.cases.contains_key(&id)
    }

    pub fn get(&self, id: CaseId) -> Option<&Case> {
        self.cases.get(&id)
    }

    /// Whether any case, ever, committed `public_key`.
    pub fn is_public_key_used(&self, public_key: &Ed25519PublicKey) -> bool {
        self.used_public_keys.contains(public_key)
    }

    pub fn cases_by_embalmer(&self, embalmer: Address) -> &[CaseId] {
        self.by_embalmer.get(&embalmer).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn cases_by_recipient(&self, recipient: Address) -> &[CaseId] {
        self.by_recipient.get(&recipient).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn cases_by_custodian(&self, custodian: Address) -> &[CaseId] {
        self.by_custodian.get(&custodian).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Case> {
        self.cases.values()
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }

    /// Insert or replace a case. A new case is indexed and its public keys
    /// are marked used.
    pub(crate) fn store(&mut self, case: Case) {
        if !self.cases.contains_key(&case.id) {
            self.by_embalmer.entry(case.embalmer).or_default().push(case.id);
            self.by_recipient.entry(case.recipient).or_default().push(case.id);
            for c in &case.custodians {
                self.by_custodian.entry(c.address).or_default().push(case.id);
                self.used_public_keys.insert(c.public_key);
            }
        }
        self.cases.insert(case.id, case);
    }
}
