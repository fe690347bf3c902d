//! # Bond Ledger
//!
//! Per-custodian collateral accounting. Each custodian has one
//! [`BondAccount`] split into `free_bond` (withdrawable) and `cursed_bond`
//! (locked against open cases).
//!
//! ## Conservation Invariant
//!
//! `cursed_bond(c)` equals the sum of `locked_bond` over every
//! (case, custodian) pair for `c` that is still pending. Free bond only
//! falls through an explicit lock or withdrawal and only rises through a
//! deposit or unlock. Slashed bond leaves the account entirely; the caller
//! credits it to a claimant in the same step.
//!
//! Balances are unsigned, so non-negativity holds by construction; every
//! operation that would underflow is rejected with a named error instead.
//!
//! All arithmetic lives on [`BondAccount`]. Callers mutate a copy and store
//! it back into the [`BondLedger`] only once the whole step has succeeded.

use std::collections::BTreeMap;

use sarco_core::amount::as_string;
use sarco_core::{Address, Amount, BASIS_POINTS_DENOMINATOR};
use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;

/// Bond that must be locked for `interval` seconds of digging at
/// `fee_rate`: `fee_rate * interval * percentage / 10_000`, floored.
///
/// # Errors
///
/// Returns [`ProtocolError::AmountOverflow`] if the product overflows.
pub fn cursed_bond_amount(
    fee_rate: Amount,
    interval: u64,
    cursed_bond_percentage: u32,
) -> Result<Amount, ProtocolError> {
    fee_rate
        .checked_mul(u128::from(interval))
        .and_then(|fee| fee.checked_mul(u128::from(cursed_bond_percentage)))
        .map(|scaled| scaled / BASIS_POINTS_DENOMINATOR)
        .ok_or(ProtocolError::AmountOverflow("cursed bond"))
}

/// One custodian's collateral.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BondAccount {
    /// Collateral available to lock or withdraw.
    #[serde(with = "as_string")]
    pub free_bond: Amount,
    /// Collateral locked against open cases.
    #[serde(with = "as_string")]
    pub cursed_bond: Amount,
}

impl BondAccount {
    /// `free + amount`.
    pub fn deposit(&mut self, amount: Amount) -> Result<(), ProtocolError> {
        self.free_bond = self
            .free_bond
            .checked_add(amount)
            .ok_or(ProtocolError::AmountOverflow("free bond"))?;
        Ok(())
    }

    /// `free - amount`.
    pub fn withdraw(&mut self, custodian: Address, amount: Amount) -> Result<(), ProtocolError> {
        self.free_bond = self.debit_free(custodian, amount)?;
        Ok(())
    }

    /// Move `amount` from free to cursed.
    pub fn lock(&mut self, custodian: Address, amount: Amount) -> Result<(), ProtocolError> {
        let free = self.debit_free(custodian, amount)?;
        let cursed = self
            .cursed_bond
            .checked_add(amount)
            .ok_or(ProtocolError::AmountOverflow("cursed bond"))?;
        self.free_bond = free;
        self.cursed_bond = cursed;
        Ok(())
    }

    /// Move `amount` from cursed back to free.
    pub fn unlock(&mut self, custodian: Address, amount: Amount) -> Result<(), ProtocolError> {
        let cursed = self.debit_cursed(custodian, amount)?;
        let free = self
            .free_bond
            .checked_add(amount)
            .ok_or(ProtocolError::AmountOverflow("free bond"))?;
        self.free_bond = free;
        self.cursed_bond = cursed;
        Ok(())
    }

    /// Forfeit `amount` of cursed bond.
    pub fn slash(&mut self, custodian: Address, amount: Amount) -> Result<(), ProtocolError> {
        self.cursed_bond = self.debit_cursed(custodian, amount)?;
        Ok(())
    }

    /// `free + cursed`.
    pub fn total(&self) -> Option<Amount> {
        self.free_bond.checked_add(self.cursed_bond)
    }

    fn debit_free(&self, custodian: Address, amount: Amount) -> Result<Amount, ProtocolError> {
        self.free_bond
            .checked_sub(amount)
            .ok_or(ProtocolError::InsufficientFreeBond {
                custodian,
                requested: amount,
                available: self.free_bond,
            })
    }

    fn debit_cursed(&self, custodian: Address, amount: Amount) -> Result<Amount, ProtocolError> {
        self.cursed_bond
            .checked_sub(amount)
            .ok_or(ProtocolError::InsufficientCursedBond {
                custodian,
                requested: amount,
                available: self.cursed_bond,
            })
    }
}

/// All custodian bond accounts. Written only with whole accounts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BondLedger {
    accounts: BTreeMap<Address, BondAccount>,
}

impl BondLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// The account for `custodian` (zeroed if never funded).
    pub fn account(&self, custodian: Address) -> BondAccount {
        self.accounts.get(&custodian).copied().unwrap_or_default()
    }

    pub fn free_bond(&self, custodian: Address) -> Amount {
        self.account(custodian).free_bond
    }

    pub fn cursed_bond(&self, custodian: Address) -> Amount {
        self.account(custodian).cursed_bond
    }

    /// Overwrite an account with a value computed elsewhere.
    pub(crate) fn put(&mut self, custodian: Address, account: BondAccount) {
        self.accounts.insert(custodian, account);
    }

    /// All funded accounts in address order.
    pub fn accounts(&self) -> impl Iterator<Item = (&Address, &BondAccount)> {
        self.accounts.iter()
    }

    /// Σ free + Σ cursed over all accounts.
    pub fn total_held(&self) -> Option<Amount> {
        self.accounts
            .values()
            .try_fold(0u128, |acc, a| a.total().and_then(|t| acc.checked_add(t)))
    }
}
