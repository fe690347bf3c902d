//! # Fee Accounting
//!
//! Two kinds of internal balance, both backed by tokens held in the
//! protocol vault:
//!
//! - the **protocol fee pool**, funded by the protocol fee charged on
//!   digging fees and by administrator cleans, withdrawable only by the
//!   administrator;
//! - **reward balances**, one per address, funded by earned digging fees
//!   and by the embalmer and accuser shares of settlements.
//!
//! ## Withdrawal Rule
//!
//! A withdrawal zeroes the internal balance first ([`FeeAccounting::take_reward`],
//! [`FeeAccounting::take_protocol_fees`]) and only then pays out. If the
//! payout fails, the caller puts the exact amount back with the matching
//! `restore_*` call and surfaces the failure.

use std::collections::BTreeMap;

use sarco_core::amount::{as_string, map_as_string};
use sarco_core::{Address, Amount};
use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;

/// Protocol fee pool and per-address reward balances.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeAccounting {
    #[serde(with = "as_string")]
    protocol_fee_pool: Amount,
    #[serde(with = "map_as_string")]
    rewards: BTreeMap<Address, Amount>,
}

impl FeeAccounting {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn protocol_fee_pool(&self) -> Amount {
        self.protocol_fee_pool
    }

    /// Claimable reward balance of `account`.
    pub fn reward_of(&self, account: Address) -> Amount {
        self.rewards.get(&account).copied().unwrap_or(0)
    }

    /// All non-zero reward balances.
    pub fn rewards(&self) -> impl Iterator<Item = (&Address, &Amount)> {
        self.rewards.iter().filter(|(_, v)| **v > 0)
    }

    /// Σ rewards.
    pub fn total_rewards(&self) -> Option<Amount> {
        self.rewards.values().try_fold(0u128, |acc, v| acc.checked_add(*v))
    }

    /// Zero `account`'s reward balance and return what it held.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::NothingToWithdraw`] if the balance is zero.
    pub fn take_reward(&mut self, account: Address) -> Result<Amount, ProtocolError> {
        match self.rewards.remove(&account) {
            Some(amount) if amount > 0 => Ok(amount),
            _ => Err(ProtocolError::NothingToWithdraw(account)),
        }
    }

    /// Undo a [`take_reward`](Self::take_reward) whose payout failed.
    pub fn restore_reward(&mut self, account: Address, amount: Amount) {
        self.set_reward(account, amount);
    }

    /// Zero the protocol fee pool and return what it held.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::NothingToWithdraw`] (naming `admin`) if the pool is
    /// empty.
    pub fn take_protocol_fees(&mut self, admin: Address) -> Result<Amount, ProtocolError> {
        if self.protocol_fee_pool == 0 {
            return Err(ProtocolError::NothingToWithdraw(admin));
        }
        Ok(std::mem::take(&mut self.protocol_fee_pool))
    }

    /// Undo a [`take_protocol_fees`](Self::take_protocol_fees) whose payout failed.
    pub fn restore_protocol_fees(&mut self, amount: Amount) {
        self.protocol_fee_pool = amount;
    }

    /// Overwrite a reward balance with a value staged elsewhere.
    pub(crate) fn set_reward(&mut self, account: Address, amount: Amount) {
        if amount == 0 {
            self.rewards.remove(&account);
        } else {
            self.rewards.insert(account, amount);
        }
    }

    /// Overwrite the pool with a value staged elsewhere.
    pub(crate) fn set_pool(&mut self, amount: Amount) {
        self.protocol_fee_pool = amount;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(b: u8) -> Address {
        Address::from_bytes([b; 20])
    }

    #[test]
    fn test_take_zeroes_then_restore() {
        let mut fees = FeeAccounting::new();
        fees.set_reward(addr(1), 42);
        assert_eq!(fees.take_reward(addr(1)).unwrap(), 42);
        assert_eq!(fees.reward_of(addr(1)), 0);
        assert!(matches!(fees.take_reward(addr(1)), Err(ProtocolError::NothingToWithdraw(_))));

        fees.restore_reward(addr(1), 42);
        assert_eq!(fees.reward_of(addr(1)), 42);
    }

    #[test]
    fn test_pool() {
        let mut fees = FeeAccounting::new();
        assert!(fees.take_protocol_fees(addr(9)).is_err());
        fees.set_pool(15);
        assert_eq!(fees.take_protocol_fees(addr(9)).unwrap(), 15);
        assert_eq!(fees.protocol_fee_pool(), 0);
        fees.restore_protocol_fees(15);
        assert_eq!(fees.protocol_fee_pool(), 15);
    }

    #[test]
    fn test_zero_reward_is_not_listed() {
        let mut fees = FeeAccounting::new();
        fees.set_reward(addr(1), 3);
        fees.set_reward(addr(2), 4);
        assert_eq!(fees.total_rewards(), Some(7));
        fees.set_reward(addr(2), 0);
        assert_eq!(fees.rewards().count(), 1);
        assert!(matches!(fees.take_reward(addr(2)), Err(ProtocolError::NothingToWithdraw(_))));

        fees.set_reward(addr(3), u128::MAX);
        assert_eq!(fees.total_rewards(), None);
    }

    #[test]
    fn test_serializes_amounts_as_strings() {
        let mut fees = FeeAccounting::new();
        fees.set_reward(addr(1), 7);
        let json = serde_json::to_value(&fees).unwrap();
        assert_eq!(json["protocol_fee_pool"], "0");
        assert_eq!(json["rewards"][addr(1).to_hex()], "7");
    }
}
