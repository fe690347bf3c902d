//! # Custodian Profile Registry
//!
//! The directory of custodians (archaeologists) an embalmer can choose
//! from. A profile advertises how to reach the custodian and the terms they
//! accept. Registration is permanent; only the owning custodian can change
//! their profile.
//!
//! Advertised terms are informational. What binds a custodian to a case is
//! the consent signature over the actual fee rate and timing values, not
//! the profile.

use std::collections::BTreeMap;

use sarco_core::amount::as_string;
use sarco_core::{Address, Amount, Timestamp};
use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;

/// Terms and contact details a custodian publishes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileMetadata {
    /// Contact or peer identifier for off-chain negotiation.
    pub peer_id: String,
    /// Lowest digging fee per second the custodian accepts.
    #[serde(with = "as_string")]
    pub minimum_digging_fee_rate: Amount,
    /// Longest interval until resurrection the custodian accepts.
    pub maximum_rewrap_interval: u64,
    /// Latest resurrection time the custodian accepts.
    pub maximum_resurrection_time: Timestamp,
}

/// A registered custodian.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustodianProfile {
    pub metadata: ProfileMetadata,
    pub registered_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Track record of one custodian across all cases.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustodianStats {
    /// Shards published in time.
    pub successes: u64,
    /// Times accused of leaking a shard.
    pub accusals: u64,
    /// Times swept by a clean for not publishing.
    pub cleanups: u64,
}

/// All custodian profiles and their statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileRegistry {
    profiles: BTreeMap<Address, CustodianProfile>,
    registration_order: Vec<Address>,
    stats: BTreeMap<Address, CustodianStats>,
}

impl ProfileRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new profile.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::ProfileAlreadyExists`] if `custodian` is registered.
    pub fn register(
        &mut self,
        custodian: Address,
        metadata: ProfileMetadata,
        now: Timestamp,
    ) -> Result<(), ProtocolError> {
        self.ensure_unregistered(custodian)?;
        self.profiles.insert(
            custodian,
            CustodianProfile {
                metadata,
                registered_at: now,
                updated_at: now,
            },
        );
        self.registration_order.push(custodian);
        Ok(())
    }

    /// Overwrite the metadata of an existing profile.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::ProfileNotFound`] if `custodian` is not registered.
    pub fn update(
        &mut self,
        custodian: Address,
        metadata: ProfileMetadata,
        now: Timestamp,
    ) -> Result<(), ProtocolError> {
        let profile = self
            .profiles
            .get_mut(&custodian)
            .ok_or(ProtocolError::ProfileNotFound(custodian))?;
        profile.metadata = metadata;
        profile.updated_at = now;
        Ok(())
    }

    pub fn ensure_unregistered(&self, custodian: Address) -> Result<(), ProtocolError> {
        if self.is_registered(custodian) {
            Err(ProtocolError::ProfileAlreadyExists(custodian))
        } else {
            Ok(())
        }
    }

    pub fn ensure_registered(&self, custodian: Address) -> Result<(), ProtocolError> {
        if self.is_registered(custodian) {
            Ok(())
        } else {
            Err(ProtocolError::ProfileNotFound(custodian))
        }
    }

    pub fn is_registered(&self, custodian: Address) -> bool {
        self.profiles.contains_key(&custodian)
    }

    pub fn profile(&self, custodian: Address) -> Option<&CustodianProfile> {
        self.profiles.get(&custodian)
    }

    /// Registered custodians in registration order.
    pub fn profile_addresses(&self) -> &[Address] {
        &self.registration_order
    }

    pub fn stats(&self, custodian: Address) -> CustodianStats {
        self.stats.get(&custodian).copied().unwrap_or_default()
    }

    pub(crate) fn record_success(&mut self, custodian: Address) {
        let s = self.stats.entry(custodian).or_default();
        s.successes = s.successes.saturating_add(1);
    }

    pub(crate) fn record_accusal(&mut self, custodian: Address) {
        let s = self.stats.entry(custodian).or_default();
        s.accusals = s.accusals.saturating_add(1);
    }

    pub(crate) fn record_cleanup(&mut self, custodian: Address) {
        let s = self.stats.entry(custodian).or_default();
        s.cleanups = s.cleanups.saturating_add(1);
    }
}
