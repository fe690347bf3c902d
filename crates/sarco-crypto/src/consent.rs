//! # Custodian Consent Signatures
//!
//! Before an embalmer can curse a custodian, the custodian signs a
//! [`ConsentPayload`] with their identity key. The payload binds the shard
//! public key the custodian generated for this case, the digging fee rate,
//! and the timing terms the case will be created with. The protocol
//! verifies the signature through the [`ConsentVerifier`] seam and compares
//! the recovered address to the custodian the embalmer named.
//!
//! Ed25519 signatures do not support key recovery, so a
//! [`ConsentSignature`] carries the signer's identity public key next to
//! the signature. "Recovery" is: verify the signature under that key, then
//! derive the key's address.

use sarco_core::amount::as_string;
use sarco_core::{Address, Amount, CanonicalBytes, CryptoError, Timestamp};
use serde::{Deserialize, Serialize};

use crate::ed25519::{verify, Ed25519KeyPair, Ed25519PublicKey, Ed25519Signature};

/// The terms a custodian consents to for one case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsentPayload {
    /// Shard public key committed for this case.
    pub public_key: Ed25519PublicKey,
    /// Digging fee per second of cursed time.
    #[serde(with = "as_string")]
    pub digging_fee_rate: Amount,
    /// Longest interval (seconds) between now and resurrection the
    /// custodian accepts on creation or rewrap.
    pub maximum_rewrap_interval: u64,
    /// Latest resurrection time the custodian accepts, ever.
    pub maximum_resurrection_time: Timestamp,
    /// When the embalmer negotiated these terms. Signatures expire after
    /// the protocol's expiration threshold.
    pub creation_time: Timestamp,
}

impl ConsentPayload {
    /// Canonical bytes that are signed.
    pub fn canonical_bytes(&self) -> Result<CanonicalBytes, CryptoError> {
        Ok(CanonicalBytes::new(self)?)
    }
}

/// A consent signature plus the identity key that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsentSignature {
    /// The custodian's identity public key.
    pub signer_key: Ed25519PublicKey,
    /// Signature over the canonical consent payload.
    pub signature: Ed25519Signature,
}

/// Sign a consent payload with a custodian identity key.
pub fn sign_consent(
    identity: &Ed25519KeyPair,
    payload: &ConsentPayload,
) -> Result<ConsentSignature, CryptoError> {
    let canonical = payload.canonical_bytes()?;
    Ok(ConsentSignature {
        signer_key: identity.public_key(),
        signature: identity.sign(&canonical),
    })
}

/// Recovers the address that signed a consent payload.
///
/// This is the seam between the lifecycle and signature cryptography. The
/// lifecycle only needs "which address signed this", never the scheme.
pub trait ConsentVerifier: Send + Sync {
    /// Return the signing address, or fail if the signature does not verify.
    fn recover_signer(
        &self,
        payload: &ConsentPayload,
        signature: &ConsentSignature,
    ) -> Result<Address, CryptoError>;
}

/// Ed25519 implementation of [`ConsentVerifier`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Ed25519ConsentVerifier;

impl ConsentVerifier for Ed25519ConsentVerifier {
    fn recover_signer(
        &self,
        payload: &ConsentPayload,
        signature: &ConsentSignature,
    ) -> Result<Address, CryptoError> {
        let canonical = payload.canonical_bytes()?;
        verify(&canonical, &signature.signature, &signature.signer_key)?;
        Ok(signature.signer_key.address())
    }
}
