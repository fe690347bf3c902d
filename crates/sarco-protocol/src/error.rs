//! # Protocol Error Types
//!
//! Every rejected operation surfaces exactly one named variant of
//! [`ProtocolError`], detected before any state is touched. Callers branch
//! on the variant (or on its coarse [`ErrorKind`]) to tell "too early"
//! apart from "already done" apart from "not authorized".
//!
//! Collaborator failures keep their own enums: [`TokenError`] for the
//! token ledger and [`CryptoError`] for signature plumbing are wrapped via
//! `#[from]`. [`AuditError`] reports a broken conservation invariant and is
//! never produced by a well-formed operation.

use sarco_core::{Address, Amount, CaseId, CryptoError, Timestamp};
use sarco_crypto::Ed25519PublicKey;
use thiserror::Error;

use crate::case::{CaseStatus, Disposition};

/// Coarse classification of a [`ProtocolError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed or out-of-range input.
    Validation,
    /// Wrong caller for the operation.
    Authorization,
    /// A time window guard failed.
    Timing,
    /// Operation not valid for the current case or custodian status.
    StateConflict,
    /// A bond or reward balance cannot cover the request.
    InsufficientFunds,
    /// Consent, accusation or shard verification failed.
    Signature,
    /// Checked arithmetic overflowed.
    Arithmetic,
    /// A collaborator (token ledger, canonicalizer) failed.
    External,
}

impl ErrorKind {
    /// The canonical string name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Authorization => "authorization",
            Self::Timing => "timing",
            Self::StateConflict => "state_conflict",
            Self::InsufficientFunds => "insufficient_funds",
            Self::Signature => "signature",
            Self::Arithmetic => "arithmetic",
            Self::External => "external",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors from the fungible token collaborator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// The source account holds less than the transfer amount.
    #[error("account {account} holds {available}, cannot transfer {requested}")]
    InsufficientBalance {
        /// The debited account.
        account: Address,
        /// Requested amount.
        requested: Amount,
        /// Current balance.
        available: Amount,
    },

    /// The spender's allowance over the owner's balance is too small.
    #[error("{spender} may spend {available} of {owner}'s balance, cannot pull {requested}")]
    InsufficientAllowance {
        /// The account whose tokens are pulled.
        owner: Address,
        /// The account pulling them.
        spender: Address,
        /// Requested amount.
        requested: Amount,
        /// Current allowance.
        available: Amount,
    },

    /// The account has been frozen and cannot send or receive.
    #[error("account {0} is frozen")]
    AccountFrozen(Address),

    /// A balance would exceed the representable range.
    #[error("token balance overflow for {0}")]
    Overflow(Address),
}

/// Conservation audit failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuditError {
    /// A custodian's cursed bond differs from the sum of their live locks.
    #[error("custodian {custodian} has cursed bond {cursed_bond} but {locked} is locked across open cases")]
    BondMismatch {
        /// The custodian.
        custodian: Address,
        /// Recorded cursed bond.
        cursed_bond: Amount,
        /// Sum of locked amounts over pending (case, custodian) pairs.
        locked: Amount,
    },

    /// The vault balance differs from what the ledger owes.
    #[error("vault {vault} holds {balance} but the ledger accounts for {liabilities}")]
    SolvencyMismatch {
        /// The vault address.
        vault: Address,
        /// Token balance of the vault.
        balance: Amount,
        /// Σ free + Σ cursed + Σ rewards + pool + Σ escrowed fees.
        liabilities: Amount,
    },

    /// Summing balances overflowed.
    #[error("overflow while summing {0}")]
    Overflow(&'static str),

    /// The vault balance could not be read.
    #[error("token ledger error during audit: {0}")]
    Token(#[from] TokenError),
}

/// Errors arising from protocol operations.
#[derive(Error, Debug)]
pub enum ProtocolError {
    // ── Validation ──────────────────────────────────────────────────────
    /// A case must name at least one custodian.
    #[error("no custodians provided")]
    NoCustodiansProvided,

    /// Threshold of zero would make the secret public.
    #[error("threshold cannot be zero")]
    ThresholdCannotBeZero,

    /// Threshold exceeds the number of assigned custodians.
    #[error("threshold {threshold} exceeds custodian count {custodians}")]
    ThresholdExceedsCustodianCount {
        /// Requested threshold.
        threshold: u8,
        /// Number of custodians supplied.
        custodians: usize,
    },

    /// A custodian address appears more than once in a request.
    #[error("custodian {0} listed more than once")]
    DuplicateCustodian(Address),

    /// A shard public key repeats in the request or was used by a prior case.
    #[error("public key {0} has already been used")]
    DuplicatePublicKey(Ed25519PublicKey),

    /// An accusation carried no proofs.
    #[error("no accusation proofs provided")]
    NoAccusationProofs,

    // ── Existence ───────────────────────────────────────────────────────
    /// The address already has a custodian profile.
    #[error("custodian profile {0} already exists")]
    ProfileAlreadyExists(Address),

    /// The caller has no custodian profile to update or fund.
    #[error("custodian profile {0} not found")]
    ProfileNotFound(Address),

    /// A custodian named in a case request is not registered.
    #[error("custodian {0} has no registered profile")]
    ProfileDoesNotExist(Address),

    /// A case with this identifier already exists.
    #[error("{0} already exists")]
    CaseAlreadyExists(CaseId),

    /// No case with this identifier exists.
    #[error("{0} not found")]
    CaseNotFound(CaseId),

    // ── Authorization ───────────────────────────────────────────────────
    /// Only the case's embalmer may perform this operation.
    #[error("{caller} is not the embalmer of {case_id}")]
    NotEmbalmer {
        /// The case.
        case_id: CaseId,
        /// The rejected caller.
        caller: Address,
    },

    /// The caller is not among the case's custodians.
    #[error("{caller} is not a custodian of {case_id}")]
    NotAssignedCustodian {
        /// The case.
        case_id: CaseId,
        /// The rejected caller.
        caller: Address,
    },

    /// Only the embalmer or the administrator may clean a case.
    #[error("{caller} is neither the embalmer of {case_id} nor the administrator")]
    NotEmbalmerOrAdmin {
        /// The case.
        case_id: CaseId,
        /// The rejected caller.
        caller: Address,
    },

    /// Only the administrator may perform this operation.
    #[error("{0} is not the administrator")]
    CallerIsNotAdmin(Address),

    // ── Timing ──────────────────────────────────────────────────────────
    /// The signed curse parameters are older than the expiration threshold.
    #[error("curse parameters created at {creation_time} expired before {now}")]
    ParametersExpired {
        /// Signed creation time.
        creation_time: Timestamp,
        /// Current time.
        now: Timestamp,
    },

    /// The resurrection time is not in the future.
    #[error("resurrection time {resurrection_time} is not after {now}")]
    ResurrectionTimeInPast {
        /// Resurrection time in force or requested.
        resurrection_time: Timestamp,
        /// Current time.
        now: Timestamp,
    },

    /// The interval until resurrection exceeds what the custodians signed.
    #[error("resurrection time {resurrection_time} is more than {maximum_rewrap_interval}s after {now}")]
    ResurrectionTimeExceedsMaxRewrapInterval {
        /// Requested resurrection time.
        resurrection_time: Timestamp,
        /// Signed maximum interval in seconds.
        maximum_rewrap_interval: u64,
        /// Current time.
        now: Timestamp,
    },

    /// The resurrection time is later than what the custodians signed.
    #[error("resurrection time {resurrection_time} is after the maximum {maximum_resurrection_time}")]
    ResurrectionTimePastMaxResurrectionTime {
        /// Requested resurrection time.
        resurrection_time: Timestamp,
        /// Signed maximum resurrection time.
        maximum_resurrection_time: Timestamp,
    },

    /// A rewrap must move the resurrection time forward.
    #[error("new resurrection time {requested} is not after the current {current}")]
    NewResurrectionTimeNotAfterCurrent {
        /// Requested resurrection time.
        requested: Timestamp,
        /// Resurrection time in force.
        current: Timestamp,
    },

    /// Publication window has not opened.
    #[error("publication for {case_id} opens at {opens_at}")]
    TooEarlyForPublish {
        /// The case.
        case_id: CaseId,
        /// The resurrection time.
        opens_at: Timestamp,
    },

    /// Publication window has closed.
    #[error("publication for {case_id} closed at {closed_at}")]
    TooLateForPublish {
        /// The case.
        case_id: CaseId,
        /// Resurrection time plus grace period.
        closed_at: Timestamp,
    },

    /// Accusations are only accepted before the resurrection time.
    #[error("accusations for {case_id} closed at {closed_at}")]
    TooLateToAccuse {
        /// The case.
        case_id: CaseId,
        /// The resurrection time.
        closed_at: Timestamp,
    },

    /// Cleaning opens only once the grace period has passed.
    #[error("{case_id} cannot be cleaned until after {opens_after}")]
    TooEarlyForClean {
        /// The case.
        case_id: CaseId,
        /// Resurrection time plus grace period.
        opens_after: Timestamp,
    },

    /// The embalmer's exclusive claim window has passed.
    #[error("embalmer claim window for {case_id} closed at {closed_at}")]
    EmbalmerClaimWindowPassed {
        /// The case.
        case_id: CaseId,
        /// End of the embalmer claim window.
        closed_at: Timestamp,
    },

    /// The administrator must wait for the embalmer claim window to pass.
    #[error("administrator may clean {case_id} only after {opens_after}")]
    TooEarlyForAdminClean {
        /// The case.
        case_id: CaseId,
        /// End of the embalmer claim window.
        opens_after: Timestamp,
    },

    // ── State conflict ──────────────────────────────────────────────────
    /// The case was compromised by an accusation.
    #[error("{0} has been compromised")]
    SarcophagusCompromised(CaseId),

    /// The case was buried.
    #[error("{0} is inactive")]
    SarcophagusInactive(CaseId),

    /// The operation requires an active case.
    #[error("{case_id} is {status}, not active")]
    CaseNotActive {
        /// The case.
        case_id: CaseId,
        /// Current status.
        status: CaseStatus,
    },

    /// The case was already cleaned.
    #[error("{0} has already been cleaned")]
    AlreadyCleaned(CaseId),

    /// The custodian already published their shard.
    #[error("{custodian} already published for {case_id}")]
    AlreadyPublished {
        /// The case.
        case_id: CaseId,
        /// The custodian.
        custodian: Address,
    },

    /// The custodian was already accused.
    #[error("{custodian} has already been accused on {case_id}")]
    AlreadyAccused {
        /// The case.
        case_id: CaseId,
        /// The custodian.
        custodian: Address,
    },

    /// The custodian's obligation on this case is already settled.
    #[error("{custodian} is already {disposition} on {case_id}")]
    CustodianAlreadySettled {
        /// The case.
        case_id: CaseId,
        /// The custodian.
        custodian: Address,
        /// Final disposition.
        disposition: Disposition,
    },

    /// An accusation names a public key no custodian of the case committed.
    #[error("public key {public_key} is not assigned on {case_id}")]
    AccusedPublicKeyNotAssigned {
        /// The case.
        case_id: CaseId,
        /// The unknown key.
        public_key: Ed25519PublicKey,
    },

    // ── Insufficient funds ──────────────────────────────────────────────
    /// Free bond cannot cover a lock or withdrawal.
    #[error("custodian {custodian} has {available} free bond, {requested} required")]
    InsufficientFreeBond {
        /// The custodian.
        custodian: Address,
        /// Requested amount.
        requested: Amount,
        /// Current free bond.
        available: Amount,
    },

    /// Cursed bond cannot cover an unlock or slash.
    #[error("custodian {custodian} has {available} cursed bond, {requested} required")]
    InsufficientCursedBond {
        /// The custodian.
        custodian: Address,
        /// Requested amount.
        requested: Amount,
        /// Current cursed bond.
        available: Amount,
    },

    /// The reward balance or fee pool is empty.
    #[error("nothing to withdraw for {0}")]
    NothingToWithdraw(Address),

    // ── Signature ───────────────────────────────────────────────────────
    /// A consent signature does not recover to the named custodian.
    #[error("consent signature for custodian {custodian} is invalid: {reason}")]
    InvalidSignature {
        /// The custodian named in the request.
        custodian: Address,
        /// What went wrong.
        reason: String,
    },

    /// An accusation proof does not verify under its public key.
    #[error("accusation signature for {public_key} is invalid: {reason}")]
    InvalidAccusalSignature {
        /// The accused shard public key.
        public_key: Ed25519PublicKey,
        /// What went wrong.
        reason: String,
    },

    /// A published shard does not derive the committed public key.
    #[error("shard published by {custodian} on {case_id} does not match the committed public key")]
    ShardDoesNotMatchPublicKey {
        /// The case.
        case_id: CaseId,
        /// The publishing custodian.
        custodian: Address,
    },

    // ── Arithmetic ──────────────────────────────────────────────────────
    /// Checked amount arithmetic overflowed.
    #[error("amount overflow computing {0}")]
    AmountOverflow(&'static str),

    // ── External ────────────────────────────────────────────────────────
    /// The token ledger refused a transfer.
    #[error("token transfer failed: {0}")]
    Token(#[from] TokenError),

    /// A signed payload could not be prepared for verification.
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),
}

impl ProtocolError {
    /// Coarse classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NoCustodiansProvided
            | Self::ThresholdCannotBeZero
            | Self::ThresholdExceedsCustodianCount { .. }
            | Self::DuplicateCustodian(_)
            | Self::DuplicatePublicKey(_)
            | Self::NoAccusationProofs
            | Self::ProfileDoesNotExist(_)
            | Self::CaseNotFound(_)
            | Self::ProfileNotFound(_) => ErrorKind::Validation,

            Self::NotEmbalmer { .. }
            | Self::NotAssignedCustodian { .. }
            | Self::NotEmbalmerOrAdmin { .. }
            | Self::CallerIsNotAdmin(_) => ErrorKind::Authorization,

            Self::ParametersExpired { .. }
            | Self::ResurrectionTimeInPast { .. }
            | Self::ResurrectionTimeExceedsMaxRewrapInterval { .. }
            | Self::ResurrectionTimePastMaxResurrectionTime { .. }
            | Self::NewResurrectionTimeNotAfterCurrent { .. }
            | Self::TooEarlyForPublish { .. }
            | Self::TooLateForPublish { .. }
            | Self::TooLateToAccuse { .. }
            | Self::TooEarlyForClean { .. }
            | Self::EmbalmerClaimWindowPassed { .. }
            | Self::TooEarlyForAdminClean { .. } => ErrorKind::Timing,

            Self::ProfileAlreadyExists(_)
            | Self::CaseAlreadyExists(_)
            | Self::SarcophagusCompromised(_)
            | Self::SarcophagusInactive(_)
            | Self::CaseNotActive { .. }
            | Self::AlreadyCleaned(_)
            | Self::AlreadyPublished { .. }
            | Self::AlreadyAccused { .. }
            | Self::CustodianAlreadySettled { .. }
            | Self::AccusedPublicKeyNotAssigned { .. } => ErrorKind::StateConflict,

            Self::InsufficientFreeBond { .. }
            | Self::InsufficientCursedBond { .. }
            | Self::NothingToWithdraw(_) => ErrorKind::InsufficientFunds,

            Self::InvalidSignature { .. }
            | Self::InvalidAccusalSignature { .. }
            | Self::ShardDoesNotMatchPublicKey { .. } => ErrorKind::Signature,

            Self::AmountOverflow(_) => ErrorKind::Arithmetic,

            Self::Token(_) | Self::Crypto(_) => ErrorKind::External,
        }
    }
}
