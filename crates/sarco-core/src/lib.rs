//! # sarco-core — Foundational Types for the Sarcophagus Protocol
//!
//! This crate is the leaf of the workspace DAG. It defines the primitive
//! types every other crate speaks in:
//!
//! 1. **Newtype identifiers.** `Address` (20-byte account id) and `CaseId`
//!    (creator-chosen UUID). No bare strings or byte arrays for identities.
//!
//! 2. **Epoch-second time.** `Timestamp` is integer seconds since the Unix
//!    epoch. Every timing guard in the lifecycle is integer arithmetic on
//!    `Timestamp`. The `Clock` trait is the only way the protocol learns
//!    the current time.
//!
//! 3. **Checked amounts.** `Amount` is `u128` smallest token units. Basis
//!    point math goes through [`amount::apply_basis_points`], which never
//!    wraps.
//!
//! 4. **`CanonicalBytes` newtype.** Everything that is signed (consent
//!    payloads, accusation messages) is canonicalized through
//!    `CanonicalBytes::new()` first.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `sarco-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod amount;
pub mod canonical;
pub mod digest;
pub mod error;
pub mod identity;
pub mod temporal;

pub use amount::{apply_basis_points, Amount, BASIS_POINTS_DENOMINATOR};
pub use canonical::CanonicalBytes;
pub use digest::{sha256_digest, ContentDigest};
pub use error::{CanonicalizationError, CryptoError, SarcoError};
pub use identity::{Address, CaseId};
pub use temporal::{Clock, ManualClock, SystemClock, Timestamp};
