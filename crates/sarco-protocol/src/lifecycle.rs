//! # Case Lifecycle State Machine
//!
//! Create, rewrap, publish, accuse, clean and bury. Each transition is
//! computed in two phases:
//!
//! 1. **Stage.** Read `&Ledger`, run every guard in order, and compute the
//!    post-state: a modified copy of the case, the resulting bond accounts
//!    and reward balances, statistics and events. Any failure returns a
//!    named error and nothing has been touched.
//! 2. **Commit.** [`Transition::commit`] writes the staged values onto
//!    `&mut Ledger`. Committing cannot fail.
//!
//! Between the two phases the facade performs the operation's single token
//! movement (the embalmer's fee payment on create and rewrap). If that
//! fails the transition is dropped.
//!
//! ## Fee Model
//!
//! Digging fees are prepaid. Each pending custodian escrows
//! `fee_rate * (resurrection_time - previous_rewrap_time)`. On publication
//! the whole escrow becomes the custodian's reward. On rewrap, the part
//! earned since the previous rewrap is paid out and the embalmer tops the
//! escrow up to cover the new interval. When a case ends early (bury or
//! compromise), the earned part goes to the custodian and the rest back to
//! the embalmer. A protocol fee of `protocol_fee_base_percentage` basis
//! points on every digging fee payment goes to the protocol pool.

use std::collections::{BTreeMap, BTreeSet};

use sarco_core::amount::as_string;
use sarco_core::{Address, Amount, CaseId, CryptoError, Timestamp};
use sarco_crypto::{AccusationProof, ConsentPayload, ConsentSignature, ConsentVerifier, Ed25519PublicKey, ShardKey};
use serde::{Deserialize, Serialize};

use crate::bond::{cursed_bond_amount, BondAccount};
use crate::case::{Case, CaseStatus, CursedCustodian, Disposition};
use crate::error::ProtocolError;
use crate::events::ProtocolEvent;
use crate::ledger::Ledger;

// ── Requests ───────────────────────────────────────────────────────────

/// One custodian's signed agreement to a case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustodianConsent {
    /// The custodian's account.
    pub address: Address,
    /// Shard public key generated for this case.
    pub public_key: Ed25519PublicKey,
    /// Agreed digging fee per second.
    #[serde(with = "as_string")]
    pub digging_fee_rate: Amount,
    /// Signature over the consent payload.
    pub signature: ConsentSignature,
}

/// Everything an embalmer supplies to create a case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateCaseRequest {
    pub case_id: CaseId,
    pub name: String,
    pub recipient: Address,
    pub resurrection_time: Timestamp,
    pub threshold: u8,
    #[serde(default)]
    pub transferable: bool,
    /// When the curse terms were negotiated (signed by every custodian).
    pub creation_time: Timestamp,
    /// Signed by every custodian.
    pub maximum_rewrap_interval: u64,
    /// Signed by every custodian.
    pub maximum_resurrection_time: Timestamp,
    pub custodians: Vec<CustodianConsent>,
}

impl CreateCaseRequest {
    /// The payload `custodian` must have signed.
    pub fn consent_payload(&self, custodian: &CustodianConsent) -> ConsentPayload {
        ConsentPayload {
            public_key: custodian.public_key,
            digging_fee_rate: custodian.digging_fee_rate,
            maximum_rewrap_interval: self.maximum_rewrap_interval,
            maximum_resurrection_time: self.maximum_resurrection_time,
            creation_time: self.creation_time,
        }
    }
}

// ── Staging ────────────────────────────────────────────────────────────

/// A token pull the facade must perform before committing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Payment {
    pub from: Address,
    pub amount: Amount,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tally {
    Success,
    Accusal,
    Cleanup,
}

/// Post-state values computed against a ledger snapshot.
#[derive(Debug, Default)]
struct StagedBalances {
    bonds: BTreeMap<Address, BondAccount>,
    rewards: BTreeMap<Address, Amount>,
    pool: Option<Amount>,
}

/// Bond and reward arithmetic against a read-only ledger. The first touch
/// of an account copies its current value; every later change applies to
/// the copy.
struct Stager<'a> {
    ledger: &'a Ledger,
    staged: StagedBalances,
}

impl<'a> Stager<'a> {
    fn new(ledger: &'a Ledger) -> Self {
        Self {
            ledger,
            staged: StagedBalances::default(),
        }
    }

    fn bond(&mut self, custodian: Address) -> &mut BondAccount {
        let ledger = self.ledger;
        self.staged
            .bonds
            .entry(custodian)
            .or_insert_with(|| ledger.bonds.account(custodian))
    }

    fn lock(&mut self, custodian: Address, amount: Amount) -> Result<(), ProtocolError> {
        self.bond(custodian).lock(custodian, amount)
    }

    fn unlock(&mut self, custodian: Address, amount: Amount) -> Result<(), ProtocolError> {
        self.bond(custodian).unlock(custodian, amount)
    }

    fn slash(&mut self, custodian: Address, amount: Amount) -> Result<(), ProtocolError> {
        self.bond(custodian).slash(custodian, amount)
    }

    fn credit(&mut self, account: Address, amount: Amount) -> Result<(), ProtocolError> {
        let ledger = self.ledger;
        let balance = self
            .staged
            .rewards
            .entry(account)
            .or_insert_with(|| ledger.fees.reward_of(account));
        *balance = balance
            .checked_add(amount)
            .ok_or(ProtocolError::AmountOverflow("reward balance"))?;
        Ok(())
    }

    fn credit_pool(&mut self, amount: Amount) -> Result<(), ProtocolError> {
        let current = self
            .staged
            .pool
            .unwrap_or_else(|| self.ledger.fees.protocol_fee_pool());
        self.staged.pool = Some(
            current
                .checked_add(amount)
                .ok_or(ProtocolError::AmountOverflow("protocol fee pool"))?,
        );
        Ok(())
    }

    /// Unlock every pending custodian's bond, pay them the fee earned since
    /// the previous rewrap and refund the rest of their escrow to the
    /// embalmer.
    fn release_pending(&mut self, case: &mut Case, now: Timestamp) -> Result<(), ProtocolError> {
        let elapsed = u128::from(now.secs_since(case.previous_rewrap_time).unwrap_or(0));
        let embalmer = case.embalmer;
        for c in case.custodians.iter_mut().filter(|c| c.is_pending()) {
            let earned = c
                .digging_fee_rate
                .checked_mul(elapsed)
                .ok_or(ProtocolError::AmountOverflow("earned digging fee"))?
                .min(c.escrowed_fee);
            self.unlock(c.address, c.locked_bond)?;
            self.credit(c.address, earned)?;
            self.credit(embalmer, c.escrowed_fee - earned)?;
            c.disposition = Disposition::Released;
        }
        Ok(())
    }

    fn finish(self) -> StagedBalances {
        self.staged
    }
}

/// A fully validated transition, ready to commit.
#[derive(Debug)]
pub(crate) struct Transition {
    case: Case,
    balances: StagedBalances,
    tallies: Vec<(Address, Tally)>,
    events: Vec<ProtocolEvent>,
    payment: Option<Payment>,
}

impl Transition {
    pub(crate) fn case_id(&self) -> CaseId {
        self.case.id
    }

    /// The embalmer payment this transition depends on.
    pub(crate) fn payment(&self) -> Option<Payment> {
        self.payment
    }

    /// Write the staged state. Returns the events to publish.
    pub(crate) fn commit(self, ledger: &mut Ledger) -> Vec<ProtocolEvent> {
        for (custodian, account) in self.balances.bonds {
            ledger.bonds.put(custodian, account);
        }
        for (account, amount) in self.balances.rewards {
            ledger.fees.set_reward(account, amount);
        }
        if let Some(pool) = self.balances.pool {
            ledger.fees.set_pool(pool);
        }
        for (custodian, tally) in self.tallies {
            match tally {
                Tally::Success => ledger.profiles.record_success(custodian),
                Tally::Accusal => ledger.profiles.record_accusal(custodian),
                Tally::Cleanup => ledger.profiles.record_cleanup(custodian),
            }
        }
        ledger.cases.store(self.case);
        self.events
    }
}

// ── Guards ─────────────────────────────────────────────────────────────

fn fee_for(rate: Amount, secs: u64) -> Result<Amount, ProtocolError> {
    rate.checked_mul(u128::from(secs))
        .ok_or(ProtocolError::AmountOverflow("digging fee"))
}

fn checked_sum(a: Amount, b: Amount, what: &'static str) -> Result<Amount, ProtocolError> {
    a.checked_add(b).ok_or(ProtocolError::AmountOverflow(what))
}

/// Resurrection time bounds every custodian signed.
fn check_signed_bounds(
    resurrection_time: Timestamp,
    now: Timestamp,
    maximum_rewrap_interval: u64,
    maximum_resurrection_time: Timestamp,
) -> Result<(), ProtocolError> {
    let interval = resurrection_time.secs_since(now).unwrap_or(0);
    if interval > maximum_rewrap_interval {
        return Err(ProtocolError::ResurrectionTimeExceedsMaxRewrapInterval {
            resurrection_time,
            maximum_rewrap_interval,
            now,
        });
    }
    if resurrection_time > maximum_resurrection_time {
        return Err(ProtocolError::ResurrectionTimePastMaxResurrectionTime {
            resurrection_time,
            maximum_resurrection_time,
        });
    }
    Ok(())
}

/// Rewrap and bury need a live, uncompromised, unburied case.
fn ensure_active(case: &Case) -> Result<(), ProtocolError> {
    match case.status {
        CaseStatus::Active => Ok(()),
        CaseStatus::Accused => Err(ProtocolError::SarcophagusCompromised(case.id)),
        CaseStatus::Buried => Err(ProtocolError::SarcophagusInactive(case.id)),
        status => Err(ProtocolError::CaseNotActive {
            case_id: case.id,
            status,
        }),
    }
}

fn ensure_not_compromised_or_buried(case: &Case) -> Result<(), ProtocolError> {
    match case.status {
        CaseStatus::Accused => Err(ProtocolError::SarcophagusCompromised(case.id)),
        CaseStatus::Buried => Err(ProtocolError::SarcophagusInactive(case.id)),
        _ => Ok(()),
    }
}

fn ensure_embalmer(case: &Case, caller: Address) -> Result<(), ProtocolError> {
    if caller == case.embalmer {
        Ok(())
    } else {
        Err(ProtocolError::NotEmbalmer {
            case_id: case.id,
            caller,
        })
    }
}

fn ensure_pending(case: &Case, custodian: &CursedCustodian) -> Result<(), ProtocolError> {
    let case_id = case.id;
    let address = custodian.address;
    match custodian.disposition {
        Disposition::Pending => Ok(()),
        Disposition::Accused => Err(ProtocolError::AlreadyAccused {
            case_id,
            custodian: address,
        }),
        Disposition::Published => Err(ProtocolError::AlreadyPublished {
            case_id,
            custodian: address,
        }),
        disposition => Err(ProtocolError::CustodianAlreadySettled {
            case_id,
            custodian: address,
            disposition,
        }),
    }
}

// ── Transitions ────────────────────────────────────────────────────────

/// Stage a new case.
pub(crate) fn create(
    ledger: &Ledger,
    verifier: &dyn ConsentVerifier,
    embalmer: Address,
    request: CreateCaseRequest,
    now: Timestamp,
) -> Result<Transition, ProtocolError> {
    let params = &ledger.params;
    let case_id = request.case_id;

    if ledger.cases.contains(case_id) {
        return Err(ProtocolError::CaseAlreadyExists(case_id));
    }
    if request.custodians.is_empty() {
        return Err(ProtocolError::NoCustodiansProvided);
    }
    if request.threshold == 0 {
        return Err(ProtocolError::ThresholdCannotBeZero);
    }
    if usize::from(request.threshold) > request.custodians.len() {
        return Err(ProtocolError::ThresholdExceedsCustodianCount {
            threshold: request.threshold,
            custodians: request.custodians.len(),
        });
    }

    let mut addresses = BTreeSet::new();
    for c in &request.custodians {
        if !addresses.insert(c.address) {
            return Err(ProtocolError::DuplicateCustodian(c.address));
        }
    }
    let mut keys = BTreeSet::new();
    for c in &request.custodians {
        if !keys.insert(c.public_key) || ledger.cases.is_public_key_used(&c.public_key) {
            return Err(ProtocolError::DuplicatePublicKey(c.public_key));
        }
    }
    for c in &request.custodians {
        if !ledger.profiles.is_registered(c.address) {
            return Err(ProtocolError::ProfileDoesNotExist(c.address));
        }
    }

    if request.creation_time.saturating_add_secs(params.expiration_threshold()) < now {
        return Err(ProtocolError::ParametersExpired {
            creation_time: request.creation_time,
            now,
        });
    }
    if request.resurrection_time <= now {
        return Err(ProtocolError::ResurrectionTimeInPast {
            resurrection_time: request.resurrection_time,
            now,
        });
    }
    check_signed_bounds(
        request.resurrection_time,
        now,
        request.maximum_rewrap_interval,
        request.maximum_resurrection_time,
    )?;

    for c in &request.custodians {
        let payload = request.consent_payload(c);
        match verifier.recover_signer(&payload, &c.signature) {
            Ok(signer) if signer == c.address => {}
            Ok(signer) => {
                return Err(ProtocolError::InvalidSignature {
                    custodian: c.address,
                    reason: format!("signature recovers to {signer}"),
                })
            }
            Err(CryptoError::Canonicalization(e)) => return Err(CryptoError::Canonicalization(e).into()),
            Err(e) => {
                return Err(ProtocolError::InvalidSignature {
                    custodian: c.address,
                    reason: e.to_string(),
                })
            }
        }
    }

    let interval = request.resurrection_time.secs_since(now).unwrap_or(0);
    let mut stager = Stager::new(ledger);
    let mut digging_fees: Amount = 0;
    let mut custodians = Vec::with_capacity(request.custodians.len());
    for c in &request.custodians {
        let escrowed_fee = fee_for(c.digging_fee_rate, interval)?;
        let locked_bond = cursed_bond_amount(c.digging_fee_rate, interval, params.cursed_bond_percentage())?;
        stager.lock(c.address, locked_bond)?;
        digging_fees = checked_sum(digging_fees, escrowed_fee, "digging fees")?;
        custodians.push(CursedCustodian {
            address: c.address,
            public_key: c.public_key,
            digging_fee_rate: c.digging_fee_rate,
            locked_bond,
            escrowed_fee,
            published_shard: None,
            disposition: Disposition::Pending,
        });
    }
    let protocol_fee = params.protocol_fee(digging_fees)?;
    stager.credit_pool(protocol_fee)?;
    let total = checked_sum(digging_fees, protocol_fee, "embalmer payment")?;

    let case = Case {
        id: case_id,
        name: request.name,
        embalmer,
        recipient: request.recipient,
        creation_time: request.creation_time,
        previous_rewrap_time: now,
        resurrection_time: request.resurrection_time,
        grace_period: params.grace_period(),
        maximum_rewrap_interval: request.maximum_rewrap_interval,
        maximum_resurrection_time: request.maximum_resurrection_time,
        threshold: request.threshold,
        transferable: request.transferable,
        status: CaseStatus::Active,
        cleaned: false,
        custodians,
        published_count: 0,
    };
    let event = ProtocolEvent::CaseCreated {
        case_id,
        embalmer,
        recipient: case.recipient,
        resurrection_time: case.resurrection_time,
        custodians: case.custodian_addresses(),
        digging_fees,
        protocol_fee,
    };

    Ok(Transition {
        case,
        balances: stager.finish(),
        tallies: Vec::new(),
        events: vec![event],
        payment: (total > 0).then_some(Payment {
            from: embalmer,
            amount: total,
        }),
    })
}

/// Stage a rewrap: extend the resurrection time, settle the fee earned so
/// far and re-size every pending custodian's lock and escrow.
pub(crate) fn rewrap(
    ledger: &Ledger,
    caller: Address,
    case_id: CaseId,
    new_resurrection_time: Timestamp,
    now: Timestamp,
) -> Result<Transition, ProtocolError> {
    let case = ledger.case(case_id)?;
    ensure_embalmer(case, caller)?;
    ensure_active(case)?;
    if now >= case.resurrection_time {
        return Err(ProtocolError::ResurrectionTimeInPast {
            resurrection_time: case.resurrection_time,
            now,
        });
    }
    if new_resurrection_time <= case.resurrection_time {
        return Err(ProtocolError::NewResurrectionTimeNotAfterCurrent {
            requested: new_resurrection_time,
            current: case.resurrection_time,
        });
    }
    check_signed_bounds(
        new_resurrection_time,
        now,
        case.maximum_rewrap_interval,
        case.maximum_resurrection_time,
    )?;

    let percentage = ledger.params.cursed_bond_percentage();
    let elapsed = now.secs_since(case.previous_rewrap_time).unwrap_or(0);
    let interval = new_resurrection_time.secs_since(now).unwrap_or(0);

    let mut next = case.clone();
    let mut stager = Stager::new(ledger);
    let mut digging_fees: Amount = 0;
    for c in next.custodians.iter_mut().filter(|c| c.is_pending()) {
        let earned = fee_for(c.digging_fee_rate, elapsed)?.min(c.escrowed_fee);
        stager.credit(c.address, earned)?;

        let remaining = c.escrowed_fee - earned;
        let escrowed_fee = fee_for(c.digging_fee_rate, interval)?;
        let top_up = escrowed_fee.saturating_sub(remaining);

        let locked_bond = cursed_bond_amount(c.digging_fee_rate, interval, percentage)?;
        if locked_bond >= c.locked_bond {
            stager.lock(c.address, locked_bond - c.locked_bond)?;
        } else {
            stager.unlock(c.address, c.locked_bond - locked_bond)?;
        }

        c.locked_bond = locked_bond;
        c.escrowed_fee = escrowed_fee;
        digging_fees = checked_sum(digging_fees, top_up, "digging fees")?;
    }
    let protocol_fee = ledger.params.protocol_fee(digging_fees)?;
    stager.credit_pool(protocol_fee)?;
    let total = checked_sum(digging_fees, protocol_fee, "embalmer payment")?;

    next.previous_rewrap_time = now;
    next.resurrection_time = new_resurrection_time;

    Ok(Transition {
        case: next,
        balances: stager.finish(),
        tallies: Vec::new(),
        events: vec![ProtocolEvent::CaseRewrapped {
            case_id,
            resurrection_time: new_resurrection_time,
            digging_fees,
            protocol_fee,
        }],
        payment: (total > 0).then_some(Payment {
            from: case.embalmer,
            amount: total,
        }),
    })
}

/// Stage a shard publication by `caller`.
pub(crate) fn publish_shard(
    ledger: &Ledger,
    caller: Address,
    case_id: CaseId,
    shard: ShardKey,
    now: Timestamp,
) -> Result<Transition, ProtocolError> {
    let case = ledger.case(case_id)?;
    ensure_not_compromised_or_buried(case)?;
    if case.cleaned {
        return Err(ProtocolError::AlreadyCleaned(case_id));
    }
    if now < case.resurrection_time {
        return Err(ProtocolError::TooEarlyForPublish {
            case_id,
            opens_at: case.resurrection_time,
        });
    }
    if now > case.publish_deadline() {
        return Err(ProtocolError::TooLateForPublish {
            case_id,
            closed_at: case.publish_deadline(),
        });
    }
    let index = case
        .custodians
        .iter()
        .position(|c| c.address == caller)
        .ok_or(ProtocolError::NotAssignedCustodian { case_id, caller })?;
    let custodian = &case.custodians[index];
    ensure_pending(case, custodian)?;
    shard
        .verify_against(&custodian.public_key)
        .map_err(|_| ProtocolError::ShardDoesNotMatchPublicKey {
            case_id,
            custodian: caller,
        })?;

    let mut stager = Stager::new(ledger);
    stager.unlock(caller, custodian.locked_bond)?;
    stager.credit(caller, custodian.escrowed_fee)?;

    let mut next = case.clone();
    let mut events = vec![ProtocolEvent::ShardPublished {
        case_id,
        custodian: caller,
        shard: shard.clone(),
    }];
    next.custodians[index].published_shard = Some(shard);
    next.custodians[index].disposition = Disposition::Published;
    next.published_count += 1;
    if next.status == CaseStatus::Active && next.published_count >= usize::from(next.threshold) {
        next.status = CaseStatus::Resurrected;
        events.push(ProtocolEvent::CaseResurrected {
            case_id,
            published: next.published_count,
        });
    }

    Ok(Transition {
        case: next,
        balances: stager.finish(),
        tallies: vec![(caller, Tally::Success)],
        events,
        payment: None,
    })
}

/// Stage an accusation against the custodians whose shard keys signed
/// `proofs`.
pub(crate) fn accuse(
    ledger: &Ledger,
    case_id: CaseId,
    proofs: &[AccusationProof],
    payment_address: Address,
    now: Timestamp,
) -> Result<Transition, ProtocolError> {
    let case = ledger.case(case_id)?;
    if proofs.is_empty() {
        return Err(ProtocolError::NoAccusationProofs);
    }
    ensure_not_compromised_or_buried(case)?;
    if now >= case.resurrection_time {
        return Err(ProtocolError::TooLateToAccuse {
            case_id,
            closed_at: case.resurrection_time,
        });
    }
    ensure_active(case)?;

    let mut accused = Vec::with_capacity(proofs.len());
    for proof in proofs {
        let index = case.position_of_key(&proof.public_key).ok_or(
            ProtocolError::AccusedPublicKeyNotAssigned {
                case_id,
                public_key: proof.public_key,
            },
        )?;
        match proof.verify(case_id, payment_address) {
            Ok(()) => {}
            Err(CryptoError::Canonicalization(e)) => return Err(CryptoError::Canonicalization(e).into()),
            Err(e) => {
                return Err(ProtocolError::InvalidAccusalSignature {
                    public_key: proof.public_key,
                    reason: e.to_string(),
                })
            }
        }
        let custodian = &case.custodians[index];
        if accused.contains(&index) {
            return Err(ProtocolError::AlreadyAccused {
                case_id,
                custodian: custodian.address,
            });
        }
        ensure_pending(case, custodian)?;
        accused.push(index);
    }

    let mut next = case.clone();
    let mut stager = Stager::new(ledger);
    let mut tallies = Vec::with_capacity(accused.len());
    let mut events = Vec::with_capacity(accused.len() + 1);
    for index in accused {
        let c = &mut next.custodians[index];
        let accuser_share = c.locked_bond / 2;
        let embalmer_share = checked_sum(c.locked_bond - accuser_share, c.escrowed_fee, "embalmer share")?;
        stager.slash(c.address, c.locked_bond)?;
        stager.credit(payment_address, accuser_share)?;
        stager.credit(next.embalmer, embalmer_share)?;
        c.disposition = Disposition::Accused;
        tallies.push((c.address, Tally::Accusal));
        events.push(ProtocolEvent::CustodianAccused {
            case_id,
            custodian: c.address,
            payment_address,
            accuser_share,
            embalmer_share,
        });
    }

    if next.unaccused_count() < usize::from(next.threshold) {
        stager.release_pending(&mut next, now)?;
        next.status = CaseStatus::Accused;
        events.push(ProtocolEvent::CaseCompromised { case_id });
    }

    Ok(Transition {
        case: next,
        balances: stager.finish(),
        tallies,
        events,
        payment: None,
    })
}

/// Stage a clean: sweep the bond and escrow of every custodian who never
/// published.
pub(crate) fn clean(
    ledger: &Ledger,
    caller: Address,
    case_id: CaseId,
    now: Timestamp,
) -> Result<Transition, ProtocolError> {
    let case = ledger.case(case_id)?;
    ensure_not_compromised_or_buried(case)?;
    if case.cleaned {
        return Err(ProtocolError::AlreadyCleaned(case_id));
    }
    let publish_deadline = case.publish_deadline();
    if now <= publish_deadline {
        return Err(ProtocolError::TooEarlyForClean {
            case_id,
            opens_after: publish_deadline,
        });
    }

    let claim_deadline = case.embalmer_claim_deadline(ledger.params.embalmer_claim_window());
    let within_claim_window = now <= claim_deadline;
    let is_admin = ledger.params.is_admin(caller);
    let to_pool = if caller == case.embalmer && within_claim_window {
        false
    } else if caller == case.embalmer && !is_admin {
        return Err(ProtocolError::EmbalmerClaimWindowPassed {
            case_id,
            closed_at: claim_deadline,
        });
    } else if is_admin && within_claim_window {
        return Err(ProtocolError::TooEarlyForAdminClean {
            case_id,
            opens_after: claim_deadline,
        });
    } else if is_admin {
        true
    } else {
        return Err(ProtocolError::NotEmbalmerOrAdmin { case_id, caller });
    };

    let mut next = case.clone();
    let mut stager = Stager::new(ledger);
    let mut swept_amount: Amount = 0;
    let mut swept_custodians = Vec::new();
    let mut tallies = Vec::new();
    for c in next.custodians.iter_mut().filter(|c| c.is_pending()) {
        stager.slash(c.address, c.locked_bond)?;
        swept_amount = checked_sum(swept_amount, c.locked_bond, "swept amount")?;
        swept_amount = checked_sum(swept_amount, c.escrowed_fee, "swept amount")?;
        c.disposition = Disposition::Swept;
        swept_custodians.push(c.address);
        tallies.push((c.address, Tally::Cleanup));
    }
    if to_pool {
        stager.credit_pool(swept_amount)?;
    } else {
        stager.credit(next.embalmer, swept_amount)?;
    }

    next.cleaned = true;
    if next.status == CaseStatus::Active {
        next.status = CaseStatus::Cleaned;
    }

    Ok(Transition {
        case: next,
        balances: stager.finish(),
        tallies,
        events: vec![ProtocolEvent::CaseCleaned {
            case_id,
            cleaner: caller,
            swept_custodians,
            swept_amount,
        }],
        payment: None,
    })
}

/// Stage a burial: release every custodian without penalty and retire the
/// case.
pub(crate) fn bury(
    ledger: &Ledger,
    caller: Address,
    case_id: CaseId,
    now: Timestamp,
) -> Result<Transition, ProtocolError> {
    let case = ledger.case(case_id)?;
    ensure_embalmer(case, caller)?;
    if case.status == CaseStatus::Accused || case.any_accused() {
        return Err(ProtocolError::SarcophagusCompromised(case_id));
    }
    ensure_active(case)?;
    if now >= case.resurrection_time {
        return Err(ProtocolError::ResurrectionTimeInPast {
            resurrection_time: case.resurrection_time,
            now,
        });
    }

    let mut next = case.clone();
    let mut stager = Stager::new(ledger);
    stager.release_pending(&mut next, now)?;
    next.status = CaseStatus::Buried;

    Ok(Transition {
        case: next,
        balances: stager.finish(),
        tallies: Vec::new(),
        events: vec![ProtocolEvent::CaseBuried { case_id }],
        payment: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{GlobalParameters, ParameterSettings};
    use crate::profile::ProfileMetadata;
    use sarco_crypto::{sign_consent, Ed25519ConsentVerifier, Ed25519KeyPair};

    const T0: u64 = 1_700_000_000;
    const WEEK: u64 = 604_800;

    struct Custodian {
        identity: Ed25519KeyPair,
        shard: Ed25519KeyPair,
    }

    impl Custodian {
        fn new(seed: u8) -> Self {
            Self {
                identity: Ed25519KeyPair::from_seed(&[seed; 32]),
                shard: Ed25519KeyPair::from_seed(&[seed.wrapping_add(100); 32]),
            }
        }

        fn address(&self) -> Address {
            self.identity.address()
        }

        fn shard_key(&self) -> ShardKey {
            ShardKey::from(&self.shard)
        }
    }

    fn embalmer() -> Address {
        Address::from_bytes([0xe0; 20])
    }

    fn admin() -> Address {
        Address::from_bytes([0xad; 20])
    }

    fn ts(secs: u64) -> Timestamp {
        Timestamp::from_epoch_secs(secs)
    }

    fn setup(n: u8, bond: Amount) -> (Ledger, Vec<Custodian>) {
        let mut ledger = Ledger::new(GlobalParameters::new(admin(), ParameterSettings::default()));
        let custodians: Vec<Custodian> = (1..=n).map(Custodian::new).collect();
        for c in &custodians {
            ledger
                .profiles
                .register(
                    c.address(),
                    ProfileMetadata {
                        peer_id: format!("peer-{}", c.address()),
                        minimum_digging_fee_rate: 1,
                        maximum_rewrap_interval: 4 * WEEK,
                        maximum_resurrection_time: ts(T0 + 52 * WEEK),
                    },
                    ts(T0),
                )
                .unwrap();
            ledger.bonds.put(
                c.address(),
                BondAccount {
                    free_bond: bond,
                    cursed_bond: 0,
                },
            );
        }
        (ledger, custodians)
    }

    fn request(custodians: &[Custodian], threshold: u8, resurrection: u64) -> CreateCaseRequest {
        request_with(custodians, threshold, resurrection, T0 + 52 * WEEK)
    }

    /// Consents signed over an explicit maximum resurrection time.
    fn request_with(
        custodians: &[Custodian],
        threshold: u8,
        resurrection: u64,
        maximum_resurrection: u64,
    ) -> CreateCaseRequest {
        let mut req = CreateCaseRequest {
            case_id: CaseId::new(),
            name: "will".to_string(),
            recipient: Address::from_bytes([0xf0; 20]),
            resurrection_time: ts(resurrection),
            threshold,
            transferable: false,
            creation_time: ts(T0),
            maximum_rewrap_interval: 4 * WEEK,
            maximum_resurrection_time: ts(maximum_resurrection),
            custodians: Vec::new(),
        };
        for c in custodians {
            let consent = CustodianConsent {
                address: c.address(),
                public_key: c.shard.public_key(),
                digging_fee_rate: 10,
                signature: sign_consent(
                    &c.identity,
                    &ConsentPayload {
                        public_key: c.shard.public_key(),
                        digging_fee_rate: 10,
                        maximum_rewrap_interval: req.maximum_rewrap_interval,
                        maximum_resurrection_time: req.maximum_resurrection_time,
                        creation_time: req.creation_time,
                    },
                )
                .unwrap(),
            };
            req.custodians.push(consent);
        }
        req
    }

    fn created(ledger: &mut Ledger, custodians: &[Custodian], threshold: u8) -> CaseId {
        let req = request(custodians, threshold, T0 + WEEK);
        let id = req.case_id;
        let t = create(ledger, &Ed25519ConsentVerifier, embalmer(), req, ts(T0)).unwrap();
        t.commit(ledger);
        id
    }

    #[test]
    fn test_create_locks_and_prices() {
        let (ledger, custodians) = setup(5, 10_000_000);
        let req = request(&custodians, 3, T0 + WEEK);
        let t = create(&ledger, &Ed25519ConsentVerifier, embalmer(), req, ts(T0)).unwrap();
        let payment = t.payment().unwrap();
        assert_eq!(payment.from, embalmer());
        // 5 * 10 * 604800 digging fees plus 1% protocol fee.
        assert_eq!(payment.amount, 30_240_000 + 302_400);

        let mut ledger = ledger;
        t.commit(&mut ledger);
        for c in &custodians {
            assert_eq!(ledger.bonds.cursed_bond(c.address()), 6_048_000);
            assert_eq!(ledger.bonds.free_bond(c.address()), 10_000_000 - 6_048_000);
        }
        assert_eq!(ledger.fees.protocol_fee_pool(), 302_400);
        ledger.audit_bond_conservation().unwrap();
    }

    #[test]
    fn test_create_guard_order() {
        let (ledger, custodians) = setup(3, 10_000_000);
        let v = Ed25519ConsentVerifier;

        let mut req = request(&custodians, 0, T0 + WEEK);
        req.custodians.clear();
        assert!(matches!(
            create(&ledger, &v, embalmer(), req, ts(T0)),
            Err(ProtocolError::NoCustodiansProvided)
        ));

        let req = request(&custodians, 0, T0 + WEEK);
        assert!(matches!(
            create(&ledger, &v, embalmer(), req, ts(T0)),
            Err(ProtocolError::ThresholdCannotBeZero)
        ));

        let req = request(&custodians, 4, T0 + WEEK);
        assert!(matches!(
            create(&ledger, &v, embalmer(), req, ts(T0)),
            Err(ProtocolError::ThresholdExceedsCustodianCount { threshold: 4, custodians: 3 })
        ));

        let mut req = request(&custodians, 2, T0 + WEEK);
        let dup = req.custodians[0].clone();
        req.custodians.push(dup);
        assert!(matches!(
            create(&ledger, &v, embalmer(), req, ts(T0)),
            Err(ProtocolError::DuplicateCustodian(_))
        ));

        let mut req = request(&custodians, 2, T0 + WEEK);
        req.custodians[1].public_key = req.custodians[0].public_key;
        assert!(matches!(
            create(&ledger, &v, embalmer(), req, ts(T0)),
            Err(ProtocolError::DuplicatePublicKey(_))
        ));
    }

    #[test]
    fn test_create_timing_guards() {
        let (ledger, custodians) = setup(1, 100_000_000);
        let v = Ed25519ConsentVerifier;

        let req = request(&custodians, 1, T0 + WEEK);
        assert!(matches!(
            create(&ledger, &v, embalmer(), req, ts(T0 + 3_601)),
            Err(ProtocolError::ParametersExpired { .. })
        ));

        let req = request(&custodians, 1, T0);
        assert!(matches!(
            create(&ledger, &v, embalmer(), req, ts(T0)),
            Err(ProtocolError::ResurrectionTimeInPast { .. })
        ));

        let req = request(&custodians, 1, T0 + 4 * WEEK + 1);
        assert!(matches!(
            create(&ledger, &v, embalmer(), req, ts(T0)),
            Err(ProtocolError::ResurrectionTimeExceedsMaxRewrapInterval { .. })
        ));
    }

    #[test]
    fn test_create_past_signed_maximum_resurrection_time() {
        let (ledger, custodians) = setup(2, 100_000_000);
        let req = request_with(&custodians, 1, T0 + WEEK, T0 + WEEK - 1);
        assert!(matches!(
            create(&ledger, &Ed25519ConsentVerifier, embalmer(), req, ts(T0)),
            Err(ProtocolError::ResurrectionTimePastMaxResurrectionTime {
                resurrection_time,
                maximum_resurrection_time,
            }) if resurrection_time == ts(T0 + WEEK) && maximum_resurrection_time == ts(T0 + WEEK - 1)
        ));

        // The signed maximum itself is allowed.
        let req = request_with(&custodians, 1, T0 + WEEK, T0 + WEEK);
        assert!(create(&ledger, &Ed25519ConsentVerifier, embalmer(), req, ts(T0)).is_ok());
    }

    #[test]
    fn test_create_rejects_existing_case_id() {
        let (mut ledger, custodians) = setup(2, 100_000_000);
        let id = created(&mut ledger, &custodians[..1], 1);
        let before = ledger.state_digest().unwrap();

        let mut req = request(&custodians[1..], 1, T0 + WEEK);
        req.case_id = id;
        assert!(matches!(
            create(&ledger, &Ed25519ConsentVerifier, embalmer(), req, ts(T0)),
            Err(ProtocolError::CaseAlreadyExists(x)) if x == id
        ));
        assert_eq!(ledger.state_digest().unwrap(), before);
    }

    #[test]
    fn test_create_rejects_consent_from_other_identity() {
        let (ledger, custodians) = setup(2, 10_000_000);
        let mut req = request(&custodians, 1, T0 + WEEK);
        req.custodians[0].signature = req.custodians[1].signature;
        let err = create(&ledger, &Ed25519ConsentVerifier, embalmer(), req, ts(T0)).unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidSignature { custodian, .. } if custodian == custodians[0].address()));
    }

    #[test]
    fn test_create_rejects_altered_fee_rate() {
        let (ledger, custodians) = setup(1, 10_000_000);
        let mut req = request(&custodians, 1, T0 + WEEK);
        req.custodians[0].digging_fee_rate = 11;
        assert!(matches!(
            create(&ledger, &Ed25519ConsentVerifier, embalmer(), req, ts(T0)),
            Err(ProtocolError::InvalidSignature { .. })
        ));
    }

    #[test]
    fn test_create_insufficient_bond() {
        let (ledger, custodians) = setup(2, 6_047_999);
        let req = request(&custodians, 1, T0 + WEEK);
        assert!(matches!(
            create(&ledger, &Ed25519ConsentVerifier, embalmer(), req, ts(T0)),
            Err(ProtocolError::InsufficientFreeBond { requested: 6_048_000, .. })
        ));
    }

    #[test]
    fn test_public_key_cannot_be_reused_across_cases() {
        let (mut ledger, custodians) = setup(1, 100_000_000);
        let first = request(&custodians, 1, T0 + WEEK);
        let mut second = first.clone();
        second.case_id = CaseId::new();
        create(&ledger, &Ed25519ConsentVerifier, embalmer(), first, ts(T0))
            .unwrap()
            .commit(&mut ledger);
        assert!(matches!(
            create(&ledger, &Ed25519ConsentVerifier, embalmer(), second, ts(T0)),
            Err(ProtocolError::DuplicatePublicKey(_))
        ));
    }

    #[test]
    fn test_publish_window_and_resurrection() {
        let (mut ledger, custodians) = setup(3, 10_000_000);
        let id = created(&mut ledger, &custodians, 2);
        let res = T0 + WEEK;

        let c0 = &custodians[0];
        assert!(matches!(
            publish_shard(&ledger, c0.address(), id, c0.shard_key(), ts(res - 1)),
            Err(ProtocolError::TooEarlyForPublish { .. })
        ));
        publish_shard(&ledger, c0.address(), id, c0.shard_key(), ts(res + 1))
            .unwrap()
            .commit(&mut ledger);
        assert_eq!(ledger.bonds.cursed_bond(c0.address()), 0);
        assert_eq!(ledger.fees.reward_of(c0.address()), 6_048_000);
        assert_eq!(ledger.case(id).unwrap().status, CaseStatus::Active);

        assert!(matches!(
            publish_shard(&ledger, c0.address(), id, c0.shard_key(), ts(res + 2)),
            Err(ProtocolError::AlreadyPublished { .. })
        ));

        let c1 = &custodians[1];
        let events = publish_shard(&ledger, c1.address(), id, c1.shard_key(), ts(res + 2))
            .unwrap()
            .commit(&mut ledger);
        assert_eq!(events.len(), 2);
        assert_eq!(ledger.case(id).unwrap().status, CaseStatus::Resurrected);

        // The third custodian may still publish inside the grace period.
        let c2 = &custodians[2];
        publish_shard(&ledger, c2.address(), id, c2.shard_key(), ts(res + 3))
            .unwrap()
            .commit(&mut ledger);
        assert_eq!(ledger.case(id).unwrap().published_count, 3);
        assert_eq!(ledger.profiles.stats(c2.address()).successes, 1);
        ledger.audit_bond_conservation().unwrap();
    }

    #[test]
    fn test_publish_rejects_wrong_shard_and_stranger() {
        let (mut ledger, custodians) = setup(2, 10_000_000);
        let id = created(&mut ledger, &custodians, 1);
        let at = ts(T0 + WEEK);
        assert!(matches!(
            publish_shard(&ledger, custodians[0].address(), id, custodians[1].shard_key(), at),
            Err(ProtocolError::ShardDoesNotMatchPublicKey { .. })
        ));
        let stranger = Address::from_bytes([0x55; 20]);
        assert!(matches!(
            publish_shard(&ledger, stranger, id, custodians[0].shard_key(), at),
            Err(ProtocolError::NotAssignedCustodian { .. })
        ));
        assert!(matches!(
            publish_shard(&ledger, custodians[0].address(), id, custodians[0].shard_key(), ts(T0 + WEEK + 86_401)),
            Err(ProtocolError::TooLateForPublish { .. })
        ));
    }

    #[test]
    fn test_rewrap_settles_earned_fee_and_tops_up() {
        let (mut ledger, custodians) = setup(2, 100_000_000);
        let id = created(&mut ledger, &custodians, 1);

        let now = T0 + 1_000;
        let new_res = T0 + 2 * WEEK;
        let t = rewrap(&ledger, embalmer(), id, ts(new_res), ts(now)).unwrap();
        // Each custodian: 10 * (new_res - old_res) = 10 * WEEK; two custodians plus 1%.
        let fees = 2 * 10 * u128::from(WEEK);
        assert_eq!(t.payment().unwrap().amount, fees + fees / 100);
        t.commit(&mut ledger);

        let case = ledger.case(id).unwrap();
        assert_eq!(case.previous_rewrap_time, ts(now));
        assert_eq!(case.resurrection_time, ts(new_res));
        for c in &custodians {
            assert_eq!(ledger.fees.reward_of(c.address()), 10_000);
            let expected_lock = 10 * u128::from(new_res - now);
            assert_eq!(ledger.bonds.cursed_bond(c.address()), expected_lock);
            assert_eq!(case.custodian(c.address()).unwrap().escrowed_fee, expected_lock);
        }
        ledger.audit_bond_conservation().unwrap();
    }

    #[test]
    fn test_rewrap_guards() {
        let (mut ledger, custodians) = setup(1, 100_000_000);
        let id = created(&mut ledger, &custodians, 1);
        let res = T0 + WEEK;
        assert!(matches!(
            rewrap(&ledger, custodians[0].address(), id, ts(res + 1), ts(T0)),
            Err(ProtocolError::NotEmbalmer { .. })
        ));
        assert!(matches!(
            rewrap(&ledger, embalmer(), id, ts(res), ts(T0)),
            Err(ProtocolError::NewResurrectionTimeNotAfterCurrent { .. })
        ));
        assert!(matches!(
            rewrap(&ledger, embalmer(), id, ts(res + 10), ts(res)),
            Err(ProtocolError::ResurrectionTimeInPast { .. })
        ));
        assert!(matches!(
            rewrap(&ledger, embalmer(), id, ts(T0 + 4 * WEEK + 1), ts(T0)),
            Err(ProtocolError::ResurrectionTimeExceedsMaxRewrapInterval { .. })
        ));
    }

    #[test]
    fn test_rewrap_bounded_by_signed_maximum_resurrection_time() {
        let (mut ledger, custodians) = setup(1, 100_000_000);
        let req = request_with(&custodians, 1, T0 + WEEK, T0 + 2 * WEEK);
        let id = req.case_id;
        create(&ledger, &Ed25519ConsentVerifier, embalmer(), req, ts(T0))
            .unwrap()
            .commit(&mut ledger);

        assert!(matches!(
            rewrap(&ledger, embalmer(), id, ts(T0 + 2 * WEEK + 1), ts(T0 + 10)),
            Err(ProtocolError::ResurrectionTimePastMaxResurrectionTime { maximum_resurrection_time, .. })
                if maximum_resurrection_time == ts(T0 + 2 * WEEK)
        ));
        assert!(rewrap(&ledger, embalmer(), id, ts(T0 + 2 * WEEK), ts(T0 + 10)).is_ok());
    }

    #[test]
    fn test_rewrap_and_bury_refused_once_resurrected() {
        let (mut ledger, custodians) = setup(2, 100_000_000);
        let id = created(&mut ledger, &custodians, 1);
        let res = T0 + WEEK;
        let c0 = &custodians[0];
        publish_shard(&ledger, c0.address(), id, c0.shard_key(), ts(res + 1))
            .unwrap()
            .commit(&mut ledger);
        assert_eq!(ledger.case(id).unwrap().status, CaseStatus::Resurrected);

        assert!(matches!(
            rewrap(&ledger, embalmer(), id, ts(res + WEEK), ts(res + 2)),
            Err(ProtocolError::CaseNotActive { status: CaseStatus::Resurrected, .. })
        ));
        assert!(matches!(
            bury(&ledger, embalmer(), id, ts(res + 2)),
            Err(ProtocolError::CaseNotActive { status: CaseStatus::Resurrected, .. })
        ));
    }

    #[test]
    fn test_rewrap_and_bury_refused_once_cleaned() {
        let (mut ledger, custodians) = setup(2, 100_000_000);
        let id = created(&mut ledger, &custodians, 2);
        let claim_deadline = T0 + WEEK + 86_400 + WEEK;
        clean(&ledger, admin(), id, ts(claim_deadline + 1))
            .unwrap()
            .commit(&mut ledger);

        assert!(matches!(
            rewrap(&ledger, embalmer(), id, ts(claim_deadline + WEEK), ts(claim_deadline + 2)),
            Err(ProtocolError::CaseNotActive { status: CaseStatus::Cleaned, .. })
        ));
        assert!(matches!(
            bury(&ledger, embalmer(), id, ts(claim_deadline + 2)),
            Err(ProtocolError::CaseNotActive { status: CaseStatus::Cleaned, .. })
        ));
    }

    #[test]
    fn test_accuse_splits_bond_and_compromises() {
        let (mut ledger, custodians) = setup(3, 10_000_000);
        let id = created(&mut ledger, &custodians, 3);
        let payee = Address::from_bytes([0x77; 20]);
        let proof = AccusationProof::sign(&custodians[0].shard_key(), id, payee).unwrap();

        let events = accuse(&ledger, id, &[proof], payee, ts(T0 + 100))
            .unwrap()
            .commit(&mut ledger);
        assert!(events
            .iter()
            .any(|e| matches!(e, ProtocolEvent::CaseCompromised { .. })));

        let case = ledger.case(id).unwrap();
        assert_eq!(case.status, CaseStatus::Accused);
        assert_eq!(ledger.fees.reward_of(payee), 3_024_000);
        assert_eq!(ledger.bonds.account(custodians[0].address()).total(), Some(10_000_000 - 6_048_000));
        // Remaining custodians are released with 100s of fee earned.
        for c in &custodians[1..] {
            assert_eq!(case.custodian(c.address()).unwrap().disposition, Disposition::Released);
            assert_eq!(ledger.bonds.free_bond(c.address()), 10_000_000);
            assert_eq!(ledger.fees.reward_of(c.address()), 1_000);
        }
        // Embalmer: half the slashed bond, the accused escrow, and two refunds.
        let expected = 3_024_000 + 6_048_000 + 2 * (6_048_000 - 1_000);
        assert_eq!(ledger.fees.reward_of(embalmer()), expected);
        ledger.audit_bond_conservation().unwrap();
    }

    #[test]
    fn test_accuse_guards() {
        let (mut ledger, custodians) = setup(3, 10_000_000);
        let id = created(&mut ledger, &custodians, 1);
        let payee = Address::from_bytes([0x77; 20]);
        let proof = AccusationProof::sign(&custodians[0].shard_key(), id, payee).unwrap();

        assert!(matches!(
            accuse(&ledger, id, &[], payee, ts(T0)),
            Err(ProtocolError::NoAccusationProofs)
        ));
        assert!(matches!(
            accuse(&ledger, id, &[proof], payee, ts(T0 + WEEK)),
            Err(ProtocolError::TooLateToAccuse { .. })
        ));
        assert!(matches!(
            accuse(&ledger, id, &[proof, proof], payee, ts(T0)),
            Err(ProtocolError::AlreadyAccused { .. })
        ));
        assert!(matches!(
            accuse(&ledger, id, &[proof], Address::from_bytes([0x78; 20]), ts(T0)),
            Err(ProtocolError::InvalidAccusalSignature { .. })
        ));
        let outsider = ShardKey::from_bytes([0x42; 32]);
        let foreign = AccusationProof::sign(&outsider, id, payee).unwrap();
        assert!(matches!(
            accuse(&ledger, id, &[foreign], payee, ts(T0)),
            Err(ProtocolError::AccusedPublicKeyNotAssigned { .. })
        ));

        accuse(&ledger, id, &[proof], payee, ts(T0)).unwrap().commit(&mut ledger);
        assert_eq!(ledger.case(id).unwrap().status, CaseStatus::Active);
        assert!(matches!(
            accuse(&ledger, id, &[proof], payee, ts(T0 + 1)),
            Err(ProtocolError::AlreadyAccused { .. })
        ));
    }

    #[test]
    fn test_clean_windows() {
        let (mut ledger, custodians) = setup(2, 10_000_000);
        let id = created(&mut ledger, &custodians, 2);
        let publish_deadline = T0 + WEEK + 86_400;
        let claim_deadline = publish_deadline + WEEK;

        assert!(matches!(
            clean(&ledger, embalmer(), id, ts(publish_deadline)),
            Err(ProtocolError::TooEarlyForClean { .. })
        ));
        assert!(matches!(
            clean(&ledger, admin(), id, ts(claim_deadline)),
            Err(ProtocolError::TooEarlyForAdminClean { .. })
        ));
        assert!(matches!(
            clean(&ledger, embalmer(), id, ts(claim_deadline + 1)),
            Err(ProtocolError::EmbalmerClaimWindowPassed { .. })
        ));
        assert!(matches!(
            clean(&ledger, custodians[0].address(), id, ts(claim_deadline + 1)),
            Err(ProtocolError::NotEmbalmerOrAdmin { .. })
        ));

        clean(&ledger, admin(), id, ts(claim_deadline + 1))
            .unwrap()
            .commit(&mut ledger);
        assert_eq!(ledger.fees.protocol_fee_pool(), 120_960 + 2 * 2 * 6_048_000);
        assert_eq!(ledger.case(id).unwrap().status, CaseStatus::Cleaned);
        assert!(matches!(
            clean(&ledger, admin(), id, ts(claim_deadline + 2)),
            Err(ProtocolError::AlreadyCleaned(_))
        ));
    }

    #[test]
    fn test_bury_releases_without_penalty() {
        let (mut ledger, custodians) = setup(2, 10_000_000);
        let id = created(&mut ledger, &custodians, 1);
        bury(&ledger, embalmer(), id, ts(T0)).unwrap().commit(&mut ledger);

        let case = ledger.case(id).unwrap();
        assert_eq!(case.status, CaseStatus::Buried);
        assert_eq!(case.effective_resurrection_time(), None);
        for c in &custodians {
            assert_eq!(ledger.bonds.free_bond(c.address()), 10_000_000);
            assert_eq!(ledger.bonds.cursed_bond(c.address()), 0);
        }
        assert_eq!(ledger.fees.reward_of(embalmer()), 2 * 6_048_000);
        assert!(matches!(
            publish_shard(&ledger, custodians[0].address(), id, custodians[0].shard_key(), ts(T0 + WEEK)),
            Err(ProtocolError::SarcophagusInactive(_))
        ));
        assert!(matches!(
            rewrap(&ledger, embalmer(), id, ts(T0 + 2 * WEEK), ts(T0 + 1)),
            Err(ProtocolError::SarcophagusInactive(_))
        ));
    }

    #[test]
    fn test_bury_refused_after_any_accusation() {
        let (mut ledger, custodians) = setup(3, 10_000_000);
        let id = created(&mut ledger, &custodians, 1);
        let payee = Address::from_bytes([0x77; 20]);
        let proof = AccusationProof::sign(&custodians[2].shard_key(), id, payee).unwrap();
        accuse(&ledger, id, &[proof], payee, ts(T0)).unwrap().commit(&mut ledger);
        assert!(matches!(
            bury(&ledger, embalmer(), id, ts(T0 + 1)),
            Err(ProtocolError::SarcophagusCompromised(_))
        ));
    }
}
