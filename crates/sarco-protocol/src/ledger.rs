//! # Ledger Aggregate
//!
//! The single owner of protocol state: parameters, bond accounts, custodian
//! profiles, cases and fee balances. There is no global storage; every
//! operation receives the ledger by reference and lifecycle transitions are
//! staged against `&Ledger` and committed onto `&mut Ledger` in one step.
//!
//! All maps are ordered, so the serialized ledger is deterministic and
//! [`Ledger::state_digest`] identifies a state exactly.

use std::collections::BTreeMap;

use sarco_core::{sha256_digest, Address, Amount, CanonicalBytes, CanonicalizationError, CaseId, ContentDigest};
use serde::{Deserialize, Serialize};

use crate::bond::BondLedger;
use crate::case::{Case, CaseRegistry};
use crate::error::{AuditError, ProtocolError};
use crate::fees::FeeAccounting;
use crate::params::GlobalParameters;
use crate::profile::ProfileRegistry;

/// All protocol state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ledger {
    pub(crate) params: GlobalParameters,
    pub(crate) bonds: BondLedger,
    pub(crate) profiles: ProfileRegistry,
    pub(crate) cases: CaseRegistry,
    pub(crate) fees: FeeAccounting,
}

impl Ledger {
    /// An empty ledger governed by `params`.
    pub fn new(params: GlobalParameters) -> Self {
        Self {
            params,
            bonds: BondLedger::new(),
            profiles: ProfileRegistry::new(),
            cases: CaseRegistry::new(),
            fees: FeeAccounting::new(),
        }
    }

    pub fn params(&self) -> &GlobalParameters {
        &self.params
    }

    pub fn bonds(&self) -> &BondLedger {
        &self.bonds
    }

    pub fn profiles(&self) -> &ProfileRegistry {
        &self.profiles
    }

    pub fn cases(&self) -> &CaseRegistry {
        &self.cases
    }

    pub fn fees(&self) -> &FeeAccounting {
        &self.fees
    }

    /// Look up a case.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::CaseNotFound`] if no case has this id.
    pub fn case(&self, case_id: CaseId) -> Result<&Case, ProtocolError> {
        self.cases.get(case_id).ok_or(ProtocolError::CaseNotFound(case_id))
    }

    /// Check that every custodian's cursed bond equals the sum of their
    /// locked bond over pending (case, custodian) pairs.
    pub fn audit_bond_conservation(&self) -> Result<(), AuditError> {
        let mut locked: BTreeMap<Address, Amount> = BTreeMap::new();
        for case in self.cases.iter() {
            for c in case.pending_custodians() {
                let sum = locked.entry(c.address).or_insert(0);
                *sum = sum
                    .checked_add(c.locked_bond)
                    .ok_or(AuditError::Overflow("locked bond"))?;
            }
        }
        for (custodian, account) in self.bonds.accounts() {
            let expected = locked.remove(custodian).unwrap_or(0);
            if account.cursed_bond != expected {
                return Err(AuditError::BondMismatch {
                    custodian: *custodian,
                    cursed_bond: account.cursed_bond,
                    locked: expected,
                });
            }
        }
        // Locks recorded for custodians with no bond account at all.
        if let Some((custodian, amount)) = locked.into_iter().find(|(_, amount)| *amount > 0) {
            return Err(AuditError::BondMismatch {
                custodian,
                cursed_bond: 0,
                locked: amount,
            });
        }
        Ok(())
    }

    /// Everything the vault owes: Σ free + Σ cursed + Σ rewards + fee pool
    /// + Σ escrowed fees of pending custodians.
    pub fn liabilities(&self) -> Result<Amount, AuditError> {
        let bonds = self.bonds.total_held().ok_or(AuditError::Overflow("bond accounts"))?;
        let rewards = self.fees.total_rewards().ok_or(AuditError::Overflow("rewards"))?;
        let escrow = self
            .cases
            .iter()
            .flat_map(|case| case.pending_custodians())
            .try_fold(0u128, |acc, c| acc.checked_add(c.escrowed_fee))
            .ok_or(AuditError::Overflow("escrowed fees"))?;
        [rewards, self.fees.protocol_fee_pool(), escrow]
            .into_iter()
            .try_fold(bonds, |acc, v| acc.checked_add(v))
            .ok_or(AuditError::Overflow("liabilities"))
    }

    /// SHA-256 over the canonical serialization of the whole ledger.
    pub fn state_digest(&self) -> Result<ContentDigest, CanonicalizationError> {
        Ok(sha256_digest(&CanonicalBytes::new(self)?))
    }
}
