//! # Global Parameters
//!
//! The thin administrative surface every lifecycle transition reads:
//! fee and bond percentages (basis points) and the three protocol time
//! windows. Setters are guarded by a single administrator check.
//!
//! The grace period is snapshotted into each case at creation, so changing
//! it never moves the publication window of an existing case. The other
//! values are read live.

use sarco_core::{Address, Amount};
use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;

/// Default protocol fee: 1% of digging fees.
pub const DEFAULT_PROTOCOL_FEE_BASE_PERCENTAGE: u32 = 100;
/// Default cursed bond: 100% of the digging fee due.
pub const DEFAULT_CURSED_BOND_PERCENTAGE: u32 = 10_000;
/// Default grace period: one day.
pub const DEFAULT_GRACE_PERIOD: u64 = 86_400;
/// Default embalmer claim window: one week.
pub const DEFAULT_EMBALMER_CLAIM_WINDOW: u64 = 604_800;
/// Default consent expiration threshold: one hour.
pub const DEFAULT_EXPIRATION_THRESHOLD: u64 = 3_600;

/// The tunable values, without the administrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParameterSettings {
    /// Share of digging fees charged as protocol fee, in basis points.
    pub protocol_fee_base_percentage: u32,
    /// Locked bond as a share of digging fee due, in basis points.
    pub cursed_bond_percentage: u32,
    /// Seconds after resurrection during which shards may be published.
    pub grace_period: u64,
    /// Seconds after the grace period reserved for the embalmer to clean.
    pub embalmer_claim_window: u64,
    /// Seconds a signed consent remains usable after its creation time.
    pub expiration_threshold: u64,
}

impl Default for ParameterSettings {
    fn default() -> Self {
        Self {
            protocol_fee_base_percentage: DEFAULT_PROTOCOL_FEE_BASE_PERCENTAGE,
            cursed_bond_percentage: DEFAULT_CURSED_BOND_PERCENTAGE,
            grace_period: DEFAULT_GRACE_PERIOD,
            embalmer_claim_window: DEFAULT_EMBALMER_CLAIM_WINDOW,
            expiration_threshold: DEFAULT_EXPIRATION_THRESHOLD,
        }
    }
}

/// Which parameter a setter changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterName {
    ProtocolFeeBasePercentage,
    CursedBondPercentage,
    GracePeriod,
    EmbalmerClaimWindow,
    ExpirationThreshold,
}

impl ParameterName {
    /// The canonical string name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ProtocolFeeBasePercentage => "protocol_fee_base_percentage",
            Self::CursedBondPercentage => "cursed_bond_percentage",
            Self::GracePeriod => "grace_period",
            Self::EmbalmerClaimWindow => "embalmer_claim_window",
            Self::ExpirationThreshold => "expiration_threshold",
        }
    }
}

impl std::fmt::Display for ParameterName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Protocol-wide parameters and the administrator allowed to change them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalParameters {
    settings: ParameterSettings,
    admin: Address,
}

impl GlobalParameters {
    /// Create parameters owned by `admin`.
    pub fn new(admin: Address, settings: ParameterSettings) -> Self {
        Self { settings, admin }
    }

    /// All tunable values.
    pub fn settings(&self) -> ParameterSettings {
        self.settings
    }

    pub fn admin(&self) -> Address {
        self.admin
    }

    pub fn is_admin(&self, caller: Address) -> bool {
        caller == self.admin
    }

    pub fn protocol_fee_base_percentage(&self) -> u32 {
        self.settings.protocol_fee_base_percentage
    }

    pub fn cursed_bond_percentage(&self) -> u32 {
        self.settings.cursed_bond_percentage
    }

    pub fn grace_period(&self) -> u64 {
        self.settings.grace_period
    }

    pub fn embalmer_claim_window(&self) -> u64 {
        self.settings.embalmer_claim_window
    }

    pub fn expiration_threshold(&self) -> u64 {
        self.settings.expiration_threshold
    }

    /// Protocol fee owed on `digging_fees`.
    pub fn protocol_fee(&self, digging_fees: Amount) -> Result<Amount, ProtocolError> {
        sarco_core::apply_basis_points(digging_fees, self.settings.protocol_fee_base_percentage)
            .ok_or(ProtocolError::AmountOverflow("protocol fee"))
    }

    /// Set one numeric parameter.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::CallerIsNotAdmin`] for anyone but the
    /// administrator.
    pub fn set(
        &mut self,
        caller: Address,
        name: ParameterName,
        value: u64,
    ) -> Result<(), ProtocolError> {
        self.ensure_admin(caller)?;
        let as_bps = || u32::try_from(value).map_err(|_| ProtocolError::AmountOverflow("basis points"));
        match name {
            ParameterName::ProtocolFeeBasePercentage => {
                self.settings.protocol_fee_base_percentage = as_bps()?
            }
            ParameterName::CursedBondPercentage => self.settings.cursed_bond_percentage = as_bps()?,
            ParameterName::GracePeriod => self.settings.grace_period = value,
            ParameterName::EmbalmerClaimWindow => self.settings.embalmer_claim_window = value,
            ParameterName::ExpirationThreshold => self.settings.expiration_threshold = value,
        }
        Ok(())
    }

    /// Hand the administrator role to `new_admin`.
    pub fn transfer_admin(&mut self, caller: Address, new_admin: Address) -> Result<(), ProtocolError> {
        self.ensure_admin(caller)?;
        self.admin = new_admin;
        Ok(())
    }

    /// Fail unless `caller` is the administrator.
    pub fn ensure_admin(&self, caller: Address) -> Result<(), ProtocolError> {
        if self.is_admin(caller) {
            Ok(())
        } else {
            Err(ProtocolError::CallerIsNotAdmin(caller))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn admin() -> Address {
        Address::from_bytes([0xad; 20])
    }

    #[test]
    fn test_defaults() {
        let p = GlobalParameters::new(admin(), ParameterSettings::default());
        assert_eq!(p.protocol_fee_base_percentage(), 100);
        assert_eq!(p.cursed_bond_percentage(), 10_000);
        assert_eq!(p.grace_period(), 86_400);
        assert_eq!(p.embalmer_claim_window(), 604_800);
        assert_eq!(p.expiration_threshold(), 3_600);
    }

    #[test]
    fn test_non_admin_cannot_set() {
        let mut p = GlobalParameters::new(admin(), ParameterSettings::default());
        let outsider = Address::from_bytes([1; 20]);
        let err = p.set(outsider, ParameterName::GracePeriod, 1).unwrap_err();
        assert!(matches!(err, ProtocolError::CallerIsNotAdmin(a) if a == outsider));
        assert_eq!(p.grace_period(), 86_400);
    }

    #[test]
    fn test_admin_sets_and_transfers() {
        let mut p = GlobalParameters::new(admin(), ParameterSettings::default());
        p.set(admin(), ParameterName::CursedBondPercentage, 15_000).unwrap();
        assert_eq!(p.cursed_bond_percentage(), 15_000);

        let next = Address::from_bytes([2; 20]);
        p.transfer_admin(admin(), next).unwrap();
        assert!(p.set(admin(), ParameterName::GracePeriod, 10).is_err());
        p.set(next, ParameterName::GracePeriod, 10).unwrap();
        assert_eq!(p.grace_period(), 10);
    }

    #[test]
    fn test_basis_points_must_fit_u32() {
        let mut p = GlobalParameters::new(admin(), ParameterSettings::default());
        let err = p
            .set(admin(), ParameterName::ProtocolFeeBasePercentage, u64::from(u32::MAX) + 1)
            .unwrap_err();
        assert!(matches!(err, ProtocolError::AmountOverflow(_)));
    }

    #[test]
    fn test_protocol_fee_floors() {
        let p = GlobalParameters::new(admin(), ParameterSettings::default());
        assert_eq!(p.protocol_fee(30_240_000).unwrap(), 302_400);
        assert_eq!(p.protocol_fee(99).unwrap(), 0);
    }

    #[test]
    fn test_partial_settings_yaml_uses_defaults() {
        let s: ParameterSettings = serde_yaml::from_str("grace_period: 60\n").unwrap();
        assert_eq!(s.grace_period, 60);
        assert_eq!(s.cursed_bond_percentage, DEFAULT_CURSED_BOND_PERCENTAGE);
    }
}
