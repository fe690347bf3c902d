//! # Protocol Facade
//!
//! [`Protocol`] owns the [`Ledger`] and composes it with its collaborators:
//! the token ledger, the clock and the consent verifier. It is the only
//! public way to change protocol state.
//!
//! ## Operation Shape
//!
//! Every mutating method takes `&mut self`, samples the clock once, runs
//! all guards, performs at most one token movement and then commits. A
//! method that returns `Err` has changed nothing:
//!
//! - **Pulls** (registration bond, deposits, embalmer fee payments) run
//!   after the guards and before any ledger write.
//! - **Payouts** (bond and reward withdrawals) zero the internal balance,
//!   transfer from the vault, and restore the balance if the transfer
//!   fails.
//!
//! Committed events are appended to an in-memory log and traced at `info`.
//! Rejections are traced at `debug` with the error kind.

use std::sync::Arc;

use sarco_core::{Address, Amount, CaseId, Clock, Timestamp};
use sarco_crypto::{AccusationProof, ConsentVerifier, Ed25519ConsentVerifier, ShardKey};

use crate::bond::BondAccount;
use crate::case::{Case, CursedCustodian};
use crate::config::ProtocolConfig;
use crate::error::{AuditError, ProtocolError};
use crate::events::ProtocolEvent;
use crate::ledger::Ledger;
use crate::lifecycle::{self, CreateCaseRequest, Transition};
use crate::params::{GlobalParameters, ParameterName};
use crate::profile::{CustodianProfile, CustodianStats, ProfileMetadata};
use crate::token::TokenLedger;

/// The protocol, bound to a token ledger.
pub struct Protocol<T: TokenLedger> {
    ledger: Ledger,
    token: T,
    vault: Address,
    clock: Arc<dyn Clock>,
    verifier: Box<dyn ConsentVerifier>,
    events: Vec<ProtocolEvent>,
}

impl<T: TokenLedger> std::fmt::Debug for Protocol<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Protocol")
            .field("vault", &self.vault)
            .field("cases", &self.ledger.cases.len())
            .field("events", &self.events.len())
            .finish_non_exhaustive()
    }
}

fn rejected(operation: &'static str) -> impl FnOnce(ProtocolError) -> ProtocolError {
    move |e| {
        tracing::debug!(operation, kind = %e.kind(), error = %e, "rejected");
        e
    }
}

impl<T: TokenLedger> Protocol<T> {
    /// A fresh deployment verifying consents with Ed25519.
    pub fn new(config: &ProtocolConfig, token: T, clock: Arc<dyn Clock>) -> Self {
        Self {
            ledger: Ledger::new(GlobalParameters::new(config.admin, config.parameters)),
            token,
            vault: config.vault,
            clock,
            verifier: Box::new(Ed25519ConsentVerifier),
            events: Vec::new(),
        }
    }

    /// Replace the consent verifier.
    pub fn with_verifier(mut self, verifier: impl ConsentVerifier + 'static) -> Self {
        self.verifier = Box::new(verifier);
        self
    }

    fn now(&self) -> Timestamp {
        self.clock.now()
    }

    fn emit(&mut self, event: ProtocolEvent) {
        event.trace();
        self.events.push(event);
    }

    /// Pull `amount` from `from` into the vault on the vault's allowance.
    fn pull(&mut self, from: Address, amount: Amount) -> Result<(), ProtocolError> {
        if amount == 0 {
            return Ok(());
        }
        self.token.transfer_from(self.vault, from, self.vault, amount)?;
        Ok(())
    }

    fn apply(&mut self, transition: Transition) -> Result<CaseId, ProtocolError> {
        if let Some(payment) = transition.payment() {
            self.pull(payment.from, payment.amount)?;
        }
        let case_id = transition.case_id();
        for event in transition.commit(&mut self.ledger) {
            self.emit(event);
        }
        Ok(case_id)
    }

    // ── Profiles and Bond ──────────────────────────────────────────────

    /// Register `caller` as a custodian, optionally depositing bond.
    pub fn register_custodian(
        &mut self,
        caller: Address,
        metadata: ProfileMetadata,
        initial_free_bond: Amount,
    ) -> Result<(), ProtocolError> {
        self.try_register(caller, metadata, initial_free_bond)
            .map_err(rejected("register_custodian"))
    }

    fn try_register(
        &mut self,
        caller: Address,
        metadata: ProfileMetadata,
        initial_free_bond: Amount,
    ) -> Result<(), ProtocolError> {
        let now = self.now();
        self.ledger.profiles.ensure_unregistered(caller)?;
        let mut account = self.ledger.bonds.account(caller);
        account.deposit(initial_free_bond)?;

        self.pull(caller, initial_free_bond)?;
        self.ledger.profiles.register(caller, metadata, now)?;
        self.ledger.bonds.put(caller, account);
        self.emit(ProtocolEvent::ProfileRegistered {
            custodian: caller,
            initial_free_bond,
        });
        Ok(())
    }

    /// Replace `caller`'s profile metadata, optionally adding bond.
    pub fn update_custodian(
        &mut self,
        caller: Address,
        metadata: ProfileMetadata,
        additional_free_bond: Amount,
    ) -> Result<(), ProtocolError> {
        self.try_update(caller, metadata, additional_free_bond)
            .map_err(rejected("update_custodian"))
    }

    fn try_update(
        &mut self,
        caller: Address,
        metadata: ProfileMetadata,
        additional_free_bond: Amount,
    ) -> Result<(), ProtocolError> {
        let now = self.now();
        self.ledger.profiles.ensure_registered(caller)?;
        let mut account = self.ledger.bonds.account(caller);
        account.deposit(additional_free_bond)?;

        self.pull(caller, additional_free_bond)?;
        self.ledger.profiles.update(caller, metadata, now)?;
        self.ledger.bonds.put(caller, account);
        self.emit(ProtocolEvent::ProfileUpdated {
            custodian: caller,
            additional_free_bond,
        });
        Ok(())
    }

    /// Add free bond for a registered custodian.
    pub fn deposit_bond(&mut self, caller: Address, amount: Amount) -> Result<(), ProtocolError> {
        self.try_deposit(caller, amount).map_err(rejected("deposit_bond"))
    }

    fn try_deposit(&mut self, caller: Address, amount: Amount) -> Result<(), ProtocolError> {
        self.ledger.profiles.ensure_registered(caller)?;
        let mut account = self.ledger.bonds.account(caller);
        account.deposit(amount)?;

        self.pull(caller, amount)?;
        self.ledger.bonds.put(caller, account);
        self.emit(ProtocolEvent::BondDeposited {
            custodian: caller,
            amount,
            free_bond: account.free_bond,
        });
        Ok(())
    }

    /// Withdraw free bond to the custodian's token balance.
    pub fn withdraw_bond(&mut self, caller: Address, amount: Amount) -> Result<(), ProtocolError> {
        self.try_withdraw_bond(caller, amount).map_err(rejected("withdraw_bond"))
    }

    fn try_withdraw_bond(&mut self, caller: Address, amount: Amount) -> Result<(), ProtocolError> {
        self.ledger.profiles.ensure_registered(caller)?;
        let before = self.ledger.bonds.account(caller);
        let mut after = before;
        after.withdraw(caller, amount)?;

        self.ledger.bonds.put(caller, after);
        if let Err(e) = self.token.transfer(self.vault, caller, amount) {
            self.ledger.bonds.put(caller, before);
            return Err(e.into());
        }
        self.emit(ProtocolEvent::BondWithdrawn {
            custodian: caller,
            amount,
            free_bond: after.free_bond,
        });
        Ok(())
    }

    // ── Case Lifecycle ─────────────────────────────────────────────────

    /// Create a case on behalf of `caller` (the embalmer), who pays the
    /// digging fees and protocol fee.
    pub fn create_case(
        &mut self,
        caller: Address,
        request: CreateCaseRequest,
    ) -> Result<CaseId, ProtocolError> {
        let now = self.now();
        lifecycle::create(&self.ledger, self.verifier.as_ref(), caller, request, now)
            .and_then(|t| self.apply(t))
            .map_err(rejected("create_case"))
    }

    /// Move a case's resurrection time later.
    pub fn rewrap(
        &mut self,
        caller: Address,
        case_id: CaseId,
        new_resurrection_time: Timestamp,
    ) -> Result<(), ProtocolError> {
        let now = self.now();
        lifecycle::rewrap(&self.ledger, caller, case_id, new_resurrection_time, now)
            .and_then(|t| self.apply(t))
            .map(drop)
            .map_err(rejected("rewrap"))
    }

    /// Publish `caller`'s shard for a case.
    pub fn publish_shard(
        &mut self,
        caller: Address,
        case_id: CaseId,
        shard: ShardKey,
    ) -> Result<(), ProtocolError> {
        let now = self.now();
        lifecycle::publish_shard(&self.ledger, caller, case_id, shard, now)
            .and_then(|t| self.apply(t))
            .map(drop)
            .map_err(rejected("publish_shard"))
    }

    /// Prove that shards leaked before resurrection. Anyone may accuse;
    /// the accuser's share goes to `payment_address`.
    pub fn accuse(
        &mut self,
        case_id: CaseId,
        proofs: &[AccusationProof],
        payment_address: Address,
    ) -> Result<(), ProtocolError> {
        let now = self.now();
        lifecycle::accuse(&self.ledger, case_id, proofs, payment_address, now)
            .and_then(|t| self.apply(t))
            .map(drop)
            .map_err(rejected("accuse"))
    }

    /// Sweep the custodians who failed to publish.
    pub fn clean(&mut self, caller: Address, case_id: CaseId) -> Result<(), ProtocolError> {
        let now = self.now();
        lifecycle::clean(&self.ledger, caller, case_id, now)
            .and_then(|t| self.apply(t))
            .map(drop)
            .map_err(rejected("clean"))
    }

    /// Cancel a case before resurrection.
    pub fn bury(&mut self, caller: Address, case_id: CaseId) -> Result<(), ProtocolError> {
        let now = self.now();
        lifecycle::bury(&self.ledger, caller, case_id, now)
            .and_then(|t| self.apply(t))
            .map(drop)
            .map_err(rejected("bury"))
    }

    // ── Withdrawals ────────────────────────────────────────────────────

    /// Pay `caller`'s whole reward balance out of the vault.
    pub fn withdraw_reward(&mut self, caller: Address) -> Result<Amount, ProtocolError> {
        self.try_withdraw_reward(caller).map_err(rejected("withdraw_reward"))
    }

    fn try_withdraw_reward(&mut self, caller: Address) -> Result<Amount, ProtocolError> {
        let amount = self.ledger.fees.take_reward(caller)?;
        if let Err(e) = self.token.transfer(self.vault, caller, amount) {
            self.ledger.fees.restore_reward(caller, amount);
            return Err(e.into());
        }
        self.emit(ProtocolEvent::RewardWithdrawn {
            account: caller,
            amount,
        });
        Ok(amount)
    }

    /// Pay the protocol fee pool to the administrator.
    pub fn withdraw_protocol_fees(&mut self, caller: Address) -> Result<Amount, ProtocolError> {
        self.try_withdraw_protocol_fees(caller)
            .map_err(rejected("withdraw_protocol_fees"))
    }

    fn try_withdraw_protocol_fees(&mut self, caller: Address) -> Result<Amount, ProtocolError> {
        self.ledger.params.ensure_admin(caller)?;
        let amount = self.ledger.fees.take_protocol_fees(caller)?;
        if let Err(e) = self.token.transfer(self.vault, caller, amount) {
            self.ledger.fees.restore_protocol_fees(amount);
            return Err(e.into());
        }
        self.emit(ProtocolEvent::ProtocolFeesWithdrawn {
            admin: caller,
            amount,
        });
        Ok(amount)
    }

    // ── Administration ─────────────────────────────────────────────────

    /// Change one parameter. Administrator only.
    pub fn set_parameter(
        &mut self,
        caller: Address,
        name: ParameterName,
        value: u64,
    ) -> Result<(), ProtocolError> {
        self.ledger
            .params
            .set(caller, name, value)
            .map_err(rejected("set_parameter"))?;
        self.emit(ProtocolEvent::ParameterChanged { name, value });
        Ok(())
    }

    pub fn set_protocol_fee_base_percentage(&mut self, caller: Address, bps: u32) -> Result<(), ProtocolError> {
        self.set_parameter(caller, ParameterName::ProtocolFeeBasePercentage, u64::from(bps))
    }

    pub fn set_cursed_bond_percentage(&mut self, caller: Address, bps: u32) -> Result<(), ProtocolError> {
        self.set_parameter(caller, ParameterName::CursedBondPercentage, u64::from(bps))
    }

    /// Applies to cases created afterwards.
    pub fn set_grace_period(&mut self, caller: Address, secs: u64) -> Result<(), ProtocolError> {
        self.set_parameter(caller, ParameterName::GracePeriod, secs)
    }

    pub fn set_embalmer_claim_window(&mut self, caller: Address, secs: u64) -> Result<(), ProtocolError> {
        self.set_parameter(caller, ParameterName::EmbalmerClaimWindow, secs)
    }

    pub fn set_expiration_threshold(&mut self, caller: Address, secs: u64) -> Result<(), ProtocolError> {
        self.set_parameter(caller, ParameterName::ExpirationThreshold, secs)
    }

    /// Hand the administrator role to `new_admin`.
    pub fn transfer_admin(&mut self, caller: Address, new_admin: Address) -> Result<(), ProtocolError> {
        self.ledger
            .params
            .transfer_admin(caller, new_admin)
            .map_err(rejected("transfer_admin"))?;
        self.emit(ProtocolEvent::AdminTransferred {
            previous: caller,
            admin: new_admin,
        });
        Ok(())
    }

    // ── Queries ────────────────────────────────────────────────────────

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn params(&self) -> &GlobalParameters {
        &self.ledger.params
    }

    pub fn vault(&self) -> Address {
        self.vault
    }

    pub fn token(&self) -> &T {
        &self.token
    }

    /// Mutable access to the token ledger, for funding accounts and setting
    /// allowances outside the protocol.
    pub fn token_mut(&mut self) -> &mut T {
        &mut self.token
    }

    pub fn case(&self, case_id: CaseId) -> Result<&Case, ProtocolError> {
        self.ledger.case(case_id)
    }

    /// Curse terms of `custodian` on `case_id`.
    pub fn cursed_custodian(
        &self,
        case_id: CaseId,
        custodian: Address,
    ) -> Result<&CursedCustodian, ProtocolError> {
        self.ledger
            .case(case_id)?
            .custodian(custodian)
            .ok_or(ProtocolError::NotAssignedCustodian {
                case_id,
                caller: custodian,
            })
    }

    pub fn cases_by_embalmer(&self, embalmer: Address) -> &[CaseId] {
        self.ledger.cases.cases_by_embalmer(embalmer)
    }

    pub fn cases_by_recipient(&self, recipient: Address) -> &[CaseId] {
        self.ledger.cases.cases_by_recipient(recipient)
    }

    pub fn cases_by_custodian(&self, custodian: Address) -> &[CaseId] {
        self.ledger.cases.cases_by_custodian(custodian)
    }

    pub fn profile(&self, custodian: Address) -> Option<&CustodianProfile> {
        self.ledger.profiles.profile(custodian)
    }

    pub fn profile_addresses(&self) -> &[Address] {
        self.ledger.profiles.profile_addresses()
    }

    pub fn stats(&self, custodian: Address) -> CustodianStats {
        self.ledger.profiles.stats(custodian)
    }

    pub fn bond_account(&self, custodian: Address) -> BondAccount {
        self.ledger.bonds.account(custodian)
    }

    pub fn free_bond(&self, custodian: Address) -> Amount {
        self.ledger.bonds.free_bond(custodian)
    }

    pub fn cursed_bond(&self, custodian: Address) -> Amount {
        self.ledger.bonds.cursed_bond(custodian)
    }

    pub fn reward_of(&self, account: Address) -> Amount {
        self.ledger.fees.reward_of(account)
    }

    pub fn protocol_fee_pool(&self) -> Amount {
        self.ledger.fees.protocol_fee_pool()
    }

    /// Every committed event, oldest first.
    pub fn events(&self) -> &[ProtocolEvent] {
        &self.events
    }

    /// Take the event log, leaving it empty.
    pub fn drain_events(&mut self) -> Vec<ProtocolEvent> {
        std::mem::take(&mut self.events)
    }

    /// Check bond conservation and that the vault holds exactly what the
    /// ledger owes.
    pub fn audit_solvency(&self) -> Result<(), AuditError> {
        self.ledger.audit_bond_conservation()?;
        let balance = self.token.balance_of(self.vault)?;
        let liabilities = self.ledger.liabilities()?;
        if balance != liabilities {
            return Err(AuditError::SolvencyMismatch {
                vault: self.vault,
                balance,
                liabilities,
            });
        }
        Ok(())
    }
}
