//! # Protocol Events
//!
//! One event per committed transition, carrying the identifiers and the
//! resulting amounts an external indexer needs. Nothing in the protocol
//! reads them back. The facade appends them in commit order and emits each
//! through `tracing` at `info` level.

use sarco_core::amount::as_string;
use sarco_core::{Address, Amount, CaseId, Timestamp};
use sarco_crypto::ShardKey;
use serde::{Deserialize, Serialize};

use crate::params::ParameterName;

/// A committed state transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProtocolEvent {
    ProfileRegistered {
        custodian: Address,
        #[serde(with = "as_string")]
        initial_free_bond: Amount,
    },
    ProfileUpdated {
        custodian: Address,
        #[serde(with = "as_string")]
        additional_free_bond: Amount,
    },
    BondDeposited {
        custodian: Address,
        #[serde(with = "as_string")]
        amount: Amount,
        #[serde(with = "as_string")]
        free_bond: Amount,
    },
    BondWithdrawn {
        custodian: Address,
        #[serde(with = "as_string")]
        amount: Amount,
        #[serde(with = "as_string")]
        free_bond: Amount,
    },
    CaseCreated {
        case_id: CaseId,
        embalmer: Address,
        recipient: Address,
        resurrection_time: Timestamp,
        custodians: Vec<Address>,
        #[serde(with = "as_string")]
        digging_fees: Amount,
        #[serde(with = "as_string")]
        protocol_fee: Amount,
    },
    CaseRewrapped {
        case_id: CaseId,
        resurrection_time: Timestamp,
        #[serde(with = "as_string")]
        digging_fees: Amount,
        #[serde(with = "as_string")]
        protocol_fee: Amount,
    },
    ShardPublished {
        case_id: CaseId,
        custodian: Address,
        shard: ShardKey,
    },
    CaseResurrected {
        case_id: CaseId,
        published: usize,
    },
    CustodianAccused {
        case_id: CaseId,
        custodian: Address,
        payment_address: Address,
        #[serde(with = "as_string")]
        accuser_share: Amount,
        #[serde(with = "as_string")]
        embalmer_share: Amount,
    },
    CaseCompromised {
        case_id: CaseId,
    },
    CaseCleaned {
        case_id: CaseId,
        cleaner: Address,
        swept_custodians: Vec<Address>,
        #[serde(with = "as_string")]
        swept_amount: Amount,
    },
    CaseBuried {
        case_id: CaseId,
    },
    RewardWithdrawn {
        account: Address,
        #[serde(with = "as_string")]
        amount: Amount,
    },
    ProtocolFeesWithdrawn {
        admin: Address,
        #[serde(with = "as_string")]
        amount: Amount,
    },
    ParameterChanged {
        name: ParameterName,
        value: u64,
    },
    AdminTransferred {
        previous: Address,
        admin: Address,
    },
}

impl ProtocolEvent {
    /// The event's snake_case name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::ProfileRegistered { .. } => "profile_registered",
            Self::ProfileUpdated { .. } => "profile_updated",
            Self::BondDeposited { .. } => "bond_deposited",
            Self::BondWithdrawn { .. } => "bond_withdrawn",
            Self::CaseCreated { .. } => "case_created",
            Self::CaseRewrapped { .. } => "case_rewrapped",
            Self::ShardPublished { .. } => "shard_published",
            Self::CaseResurrected { .. } => "case_resurrected",
            Self::CustodianAccused { .. } => "custodian_accused",
            Self::CaseCompromised { .. } => "case_compromised",
            Self::CaseCleaned { .. } => "case_cleaned",
            Self::CaseBuried { .. } => "case_buried",
            Self::RewardWithdrawn { .. } => "reward_withdrawn",
            Self::ProtocolFeesWithdrawn { .. } => "protocol_fees_withdrawn",
            Self::ParameterChanged { .. } => "parameter_changed",
            Self::AdminTransferred { .. } => "admin_transferred",
        }
    }

    /// The case this event concerns, if any.
    pub fn case_id(&self) -> Option<CaseId> {
        match self {
            Self::CaseCreated { case_id, .. }
            | Self::CaseRewrapped { case_id, .. }
            | Self::ShardPublished { case_id, .. }
            | Self::CaseResurrected { case_id, .. }
            | Self::CustodianAccused { case_id, .. }
            | Self::CaseCompromised { case_id }
            | Self::CaseCleaned { case_id, .. }
            | Self::CaseBuried { case_id } => Some(*case_id),
            _ => None,
        }
    }

    /// Emit through `tracing`.
    pub(crate) fn trace(&self) {
        let payload = serde_json::to_string(self).unwrap_or_default();
        match self.case_id() {
            Some(case_id) => {
                tracing::info!(event = self.name(), case = %case_id, %payload, "protocol event")
            }
            None => tracing::info!(event = self.name(), %payload, "protocol event"),
        }
    }
}
