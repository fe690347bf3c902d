//! # Shards and Accusation Proofs
//!
//! Each assigned custodian holds one Ed25519 *shard key* per case. Its
//! public key is committed at creation; the 32-byte secret seed is the
//! value published at resurrection. Publication is checked by re-deriving
//! the public key from the seed and comparing it with the commitment.
//!
//! Anyone who learns a shard before resurrection can prove the leak by
//! signing an [`AccusationMessage`] (the case id and the address that
//! should receive the accuser's share) with it.

use sarco_core::{Address, CanonicalBytes, CaseId, CryptoError};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::ed25519::{hex_to_array, to_hex, verify, Ed25519KeyPair, Ed25519PublicKey, Ed25519Signature};

/// A published shard: the secret seed of a case shard key.
#[derive(Clone, PartialEq, Eq)]
pub struct ShardKey([u8; 32]);

impl ShardKey {
    /// Wrap a 32-byte seed.
    pub fn from_bytes(seed: [u8; 32]) -> Self {
        Self(seed)
    }

    /// Raw seed bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Parse from 64 hex characters.
    pub fn from_hex(hex: &str) -> Result<Self, CryptoError> {
        hex_to_array::<32>(hex).map(Self).map_err(CryptoError::KeyError)
    }

    /// Lowercase hex rendering.
    pub fn to_hex(&self) -> String {
        to_hex(&self.0)
    }

    /// The key pair this seed generates.
    pub fn key_pair(&self) -> Ed25519KeyPair {
        Ed25519KeyPair::from_seed(&self.0)
    }

    /// The public key this seed generates.
    pub fn public_key(&self) -> Ed25519PublicKey {
        self.key_pair().public_key()
    }

    /// Check that this shard is the secret half of `committed`.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::VerificationFailed`] on mismatch.
    pub fn verify_against(&self, committed: &Ed25519PublicKey) -> Result<(), CryptoError> {
        if self.public_key() == *committed {
            Ok(())
        } else {
            Err(CryptoError::VerificationFailed(format!(
                "shard derives public key {} but {} was committed",
                self.public_key(),
                committed
            )))
        }
    }
}

impl From<&Ed25519KeyPair> for ShardKey {
    fn from(kp: &Ed25519KeyPair) -> Self {
        Self(kp.seed())
    }
}

impl Serialize for ShardKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ShardKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let hex = String::deserialize(deserializer)?;
        Self::from_hex(&hex).map_err(serde::de::Error::custom)
    }
}

impl std::fmt::Debug for ShardKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ShardKey(<{} bytes>)", self.0.len())
    }
}

/// The message a leaked shard signs to prove the leak.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccusationMessage {
    /// The case whose shard leaked.
    pub case_id: CaseId,
    /// Where the accuser's share of the slashed bond goes.
    pub payment_address: Address,
}

/// Proof that the holder of a shard key signed an accusation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccusationProof {
    /// The committed shard public key being accused.
    pub public_key: Ed25519PublicKey,
    /// Signature over the canonical [`AccusationMessage`].
    pub signature: Ed25519Signature,
}

impl AccusationProof {
    /// Produce a proof with a leaked shard.
    pub fn sign(
        shard: &ShardKey,
        case_id: CaseId,
        payment_address: Address,
    ) -> Result<Self, CryptoError> {
        let message = CanonicalBytes::new(&AccusationMessage {
            case_id,
            payment_address,
        })?;
        let kp = shard.key_pair();
        Ok(Self {
            public_key: kp.public_key(),
            signature: kp.sign(&message),
        })
    }

    /// Check the proof for a specific case and payment address.
    pub fn verify(&self, case_id: CaseId, payment_address: Address) -> Result<(), CryptoError> {
        let message = CanonicalBytes::new(&AccusationMessage {
            case_id,
            payment_address,
        })?;
        verify(&message, &self.signature, &self.public_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shard_matches_its_public_key() {
        let kp = Ed25519KeyPair::from_seed(&[9u8; 32]);
        let shard = ShardKey::from(&kp);
        shard.verify_against(&kp.public_key()).unwrap();
    }

    #[test]
    fn test_wrong_shard_rejected() {
        let committed = Ed25519KeyPair::from_seed(&[9u8; 32]).public_key();
        let other = ShardKey::from_bytes([10u8; 32]);
        assert!(other.verify_against(&committed).is_err());
    }

    #[test]
    fn test_accusation_binds_case_and_payee() {
        let shard = ShardKey::from_bytes([11u8; 32]);
        let case_id = CaseId::new();
        let payee = Address::from_bytes([2; 20]);
        let proof = AccusationProof::sign(&shard, case_id, payee).unwrap();
        assert_eq!(proof.public_key, shard.public_key());
        proof.verify(case_id, payee).unwrap();
        assert!(proof.verify(CaseId::new(), payee).is_err());
        assert!(proof.verify(case_id, Address::from_bytes([3; 20])).is_err());
    }

    #[test]
    fn test_shard_serde_hex() {
        let shard = ShardKey::from_bytes([0xcd; 32]);
        let json = serde_json::to_string(&shard).unwrap();
        assert_eq!(json, format!("\"{}\"", "cd".repeat(32)));
        let back: ShardKey = serde_json::from_str(&json).unwrap();
        assert_eq!(back, shard);
        assert_eq!(format!("{shard:?}"), "ShardKey(<32 bytes>)");
    }
}
