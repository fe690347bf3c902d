//! # sarco-protocol — Bonded Custodial Key Release
//!
//! The ledger and state machine of the Sarcophagus protocol. An embalmer
//! creates a case and prepays digging fees. A threshold set of custodians,
//! each holding one key shard for the recipient, stakes bond against the
//! case. A custodian who publishes their shard inside
//! `[resurrection_time, resurrection_time + grace_period]` gets the bond
//! back plus the fee. One who does not is slashed.
//!
//! ## Layout
//!
//! - [`bond`]: free and cursed bond per custodian.
//! - [`profile`]: custodian directory and track record.
//! - [`case`]: case records, statuses and lookup indices.
//! - [`lifecycle`]: create, rewrap, publish, accuse, clean, bury.
//! - [`fees`]: protocol fee pool and claimable rewards.
//! - [`params`]: administrator-guarded parameters.
//! - [`ledger`]: the aggregate owning all of the above.
//! - [`protocol`]: the facade binding the ledger to a [`TokenLedger`],
//!   a [`Clock`](sarco_core::Clock) and a consent verifier.
//!
//! ## Invariants
//!
//! After every committed operation:
//!
//! - each custodian's cursed bond equals the bond locked for them across
//!   pending cases ([`Ledger::audit_bond_conservation`]);
//! - the vault's token balance equals free bond, cursed bond, rewards, the
//!   protocol fee pool and escrowed fees combined
//!   ([`Protocol::audit_solvency`]);
//! - a case is `Resurrected` exactly when its published count reached the
//!   threshold.
//!
//! A rejected operation changes nothing.

pub mod bond;
pub mod case;
pub mod config;
pub mod error;
pub mod events;
pub mod fees;
pub mod ledger;
pub mod lifecycle;
pub mod params;
pub mod profile;
pub mod protocol;
pub mod token;

pub use bond::{cursed_bond_amount, BondAccount, BondLedger};
pub use case::{Case, CaseRegistry, CaseStatus, CursedCustodian, Disposition};
pub use config::{ConfigError, ProtocolConfig};
pub use error::{AuditError, ErrorKind, ProtocolError, TokenError};
pub use events::ProtocolEvent;
pub use fees::FeeAccounting;
pub use ledger::Ledger;
pub use lifecycle::{CreateCaseRequest, CustodianConsent};
pub use params::{GlobalParameters, ParameterName, ParameterSettings};
pub use profile::{CustodianProfile, CustodianStats, ProfileMetadata, ProfileRegistry};
pub use protocol::Protocol;
pub use token::{InMemoryToken, TokenLedger};
