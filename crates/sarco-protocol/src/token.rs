//! # Token Ledger Collaborator
//!
//! The protocol moves collateral and fees through an external fungible
//! token. [`TokenLedger`] is the primitive it consumes: balances,
//! allowances and two kinds of transfer. Every call reports failure before
//! the protocol commits anything that depends on it.
//!
//! [`InMemoryToken`] is a complete in-process implementation used by tests
//! and the CLI scenario runner. It can freeze accounts to exercise failed
//! payouts.

use std::collections::{BTreeMap, BTreeSet};

use sarco_core::{Address, Amount};

use crate::error::TokenError;

/// A fungible token ledger.
pub trait TokenLedger {
    /// Current balance of `account`.
    fn balance_of(&self, account: Address) -> Result<Amount, TokenError>;

    /// How much `spender` may still pull from `owner`.
    fn allowance(&self, owner: Address, spender: Address) -> Result<Amount, TokenError>;

    /// Let `spender` pull up to `amount` from `owner` (replaces any prior
    /// allowance).
    fn approve(&mut self, owner: Address, spender: Address, amount: Amount) -> Result<(), TokenError>;

    /// Move `amount` from `from` to `to` on `from`'s authority.
    fn transfer(&mut self, from: Address, to: Address, amount: Amount) -> Result<(), TokenError>;

    /// Move `amount` from `from` to `to` on `spender`'s allowance.
    fn transfer_from(
        &mut self,
        spender: Address,
        from: Address,
        to: Address,
        amount: Amount,
    ) -> Result<(), TokenError>;
}

/// In-memory token ledger.
#[derive(Debug, Clone, Default)]
pub struct InMemoryToken {
    balances: BTreeMap<Address, Amount>,
    allowances: BTreeMap<(Address, Address), Amount>,
    frozen: BTreeSet<Address>,
}

impl InMemoryToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create `amount` new tokens in `to`.
    pub fn mint(&mut self, to: Address, amount: Amount) -> Result<(), TokenError> {
        let balance = self.balances.entry(to).or_insert(0);
        *balance = balance.checked_add(amount).ok_or(TokenError::Overflow(to))?;
        Ok(())
    }

    /// Block every transfer to or from `account`.
    pub fn freeze(&mut self, account: Address) {
        self.frozen.insert(account);
    }

    pub fn unfreeze(&mut self, account: Address) {
        self.frozen.remove(&account);
    }

    /// Sum of all balances.
    pub fn total_supply(&self) -> Option<Amount> {
        self.balances.values().try_fold(0u128, |acc, b| acc.checked_add(*b))
    }

    fn move_balance(&mut self, from: Address, to: Address, amount: Amount) -> Result<(), TokenError> {
        for account in [from, to] {
            if self.frozen.contains(&account) {
                return Err(TokenError::AccountFrozen(account));
            }
        }
        let available = self.balances.get(&from).copied().unwrap_or(0);
        if amount > available {
            return Err(TokenError::InsufficientBalance {
                account: from,
                requested: amount,
                available,
            });
        }
        if from == to {
            return Ok(());
        }
        let credited = self
            .balances
            .get(&to)
            .copied()
            .unwrap_or(0)
            .checked_add(amount)
            .ok_or(TokenError::Overflow(to))?;
        self.balances.insert(from, available - amount);
        self.balances.insert(to, credited);
        Ok(())
    }
}

impl TokenLedger for InMemoryToken {
    fn balance_of(&self, account: Address) -> Result<Amount, TokenError> {
        Ok(self.balances.get(&account).copied().unwrap_or(0))
    }

    fn allowance(&self, owner: Address, spender: Address) -> Result<Amount, TokenError> {
        Ok(self.allowances.get(&(owner, spender)).copied().unwrap_or(0))
    }

    fn approve(&mut self, owner: Address, spender: Address, amount: Amount) -> Result<(), TokenError> {
        self.allowances.insert((owner, spender), amount);
        Ok(())
    }

    fn transfer(&mut self, from: Address, to: Address, amount: Amount) -> Result<(), TokenError> {
        self.move_balance(from, to, amount)
    }

    fn transfer_from(
        &mut self,
        spender: Address,
        from: Address,
        to: Address,
        amount: Amount,
    ) -> Result<(), TokenError> {
        let available = self.allowance(from, spender)?;
        if amount > available {
            return Err(TokenError::InsufficientAllowance {
                owner: from,
                spender,
                requested: amount,
                available,
            });
        }
        self.move_balance(from, to, amount)?;
        self.allowances.insert((from, spender), available - amount);
        Ok(())
    }
}
