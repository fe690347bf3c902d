//! # sarco-crypto — Cryptographic Primitives
//!
//! - **Ed25519** ([`ed25519`]): key pairs, public keys and signatures with
//!   hex serde. Signing input is always `&CanonicalBytes`.
//! - **Consent** ([`consent`]): the payload a custodian signs to agree to
//!   curse terms, and the [`ConsentVerifier`] seam the protocol uses to
//!   recover the signing custodian's address.
//! - **Shards** ([`shard`]): the per-case secret a custodian publishes at
//!   resurrection, its verification against the committed public key, and
//!   accusation proofs made with a leaked shard.
//!
//! ## Crate Policy
//!
//! - Depends only on `sarco-core` internally.
//! - Tests use real Ed25519; nothing is mocked.

pub mod consent;
pub mod ed25519;
pub mod shard;

pub use consent::{sign_consent, ConsentPayload, ConsentSignature, ConsentVerifier, Ed25519ConsentVerifier};
pub use ed25519::{Ed25519KeyPair, Ed25519PublicKey, Ed25519Signature};
pub use shard::{AccusationMessage, AccusationProof, ShardKey};
