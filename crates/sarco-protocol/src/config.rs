//! Protocol deployment configuration.
//!
//! Names the administrator and the vault account that holds every token
//! the protocol controls, and seeds the tunable parameters. Load from
//! environment variables, from a YAML file, or construct directly for
//! tests.

use std::path::{Path, PathBuf};

use sarco_core::Address;
use serde::{Deserialize, Serialize};

use crate::params::ParameterSettings;

/// Configuration for one protocol deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolConfig {
    /// Account allowed to change parameters and withdraw protocol fees.
    pub admin: Address,
    /// Account holding all bonded, escrowed and claimable tokens.
    pub vault: Address,
    /// Initial parameter values.
    #[serde(default)]
    pub parameters: ParameterSettings,
}

impl ProtocolConfig {
    /// Default parameters for `admin` and `vault`.
    pub fn new(admin: Address, vault: Address) -> Self {
        Self {
            admin,
            vault,
            parameters: ParameterSettings::default(),
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `SARCO_ADMIN_ADDRESS` (required, 40 hex chars)
    /// - `SARCO_VAULT_ADDRESS` (required, 40 hex chars)
    /// - `SARCO_PROTOCOL_FEE_BPS` (default: 100)
    /// - `SARCO_CURSED_BOND_BPS` (default: 10000)
    /// - `SARCO_GRACE_PERIOD_SECS` (default: 86400)
    /// - `SARCO_EMBALMER_CLAIM_WINDOW_SECS` (default: 604800)
    /// - `SARCO_EXPIRATION_THRESHOLD_SECS` (default: 3600)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Same as [`from_env`](Self::from_env) but reads variables through
    /// `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = ParameterSettings::default();
        Ok(Self {
            admin: required_address(&lookup, "SARCO_ADMIN_ADDRESS")?,
            vault: required_address(&lookup, "SARCO_VAULT_ADDRESS")?,
            parameters: ParameterSettings {
                protocol_fee_base_percentage: parsed_or(
                    &lookup,
                    "SARCO_PROTOCOL_FEE_BPS",
                    defaults.protocol_fee_base_percentage,
                )?,
                cursed_bond_percentage: parsed_or(
                    &lookup,
                    "SARCO_CURSED_BOND_BPS",
                    defaults.cursed_bond_percentage,
                )?,
                grace_period: parsed_or(&lookup, "SARCO_GRACE_PERIOD_SECS", defaults.grace_period)?,
                embalmer_claim_window: parsed_or(
                    &lookup,
                    "SARCO_EMBALMER_CLAIM_WINDOW_SECS",
                    defaults.embalmer_claim_window,
                )?,
                expiration_threshold: parsed_or(
                    &lookup,
                    "SARCO_EXPIRATION_THRESHOLD_SECS",
                    defaults.expiration_threshold,
                )?,
            },
        })
    }

    /// Parse a YAML document. Omitted parameters take their defaults.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Read and parse a YAML file.
    pub fn from_yaml_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&raw)
    }
}

fn required_address(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Address, ConfigError> {
    let raw = lookup(var).ok_or(ConfigError::MissingVar(var))?;
    raw.trim().parse().map_err(|e: sarco_core::SarcoError| ConfigError::InvalidValue {
        var,
        reason: e.to_string(),
    })
}

fn parsed_or<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(var) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            var,
            reason: e.to_string(),
        }),
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    MissingVar(&'static str),
    #[error("invalid value for {var}: {reason}")]
    InvalidValue { var: &'static str, reason: String },
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid YAML configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    const ADMIN: &str = "adadadadadadadadadadadadadadadadadadadad";
    const VAULT: &str = "0101010101010101010101010101010101010101";

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn from_lookup_applies_defaults() {
        let cfg = ProtocolConfig::from_lookup(lookup(&[
            ("SARCO_ADMIN_ADDRESS", ADMIN),
            ("SARCO_VAULT_ADDRESS", VAULT),
        ]))
        .unwrap();
        assert_eq!(cfg.admin, Address::from_bytes([0xad; 20]));
        assert_eq!(cfg.vault, Address::from_bytes([0x01; 20]));
        assert_eq!(cfg.parameters, ParameterSettings::default());
    }

    #[test]
    fn from_lookup_reads_overrides() {
        let cfg = ProtocolConfig::from_lookup(lookup(&[
            ("SARCO_ADMIN_ADDRESS", ADMIN),
            ("SARCO_VAULT_ADDRESS", VAULT),
            ("SARCO_PROTOCOL_FEE_BPS", "250"),
            ("SARCO_GRACE_PERIOD_SECS", " 3600 "),
        ]))
        .unwrap();
        assert_eq!(cfg.parameters.protocol_fee_base_percentage, 250);
        assert_eq!(cfg.parameters.grace_period, 3_600);
    }

    #[test]
    fn from_lookup_requires_admin() {
        let err = ProtocolConfig::from_lookup(lookup(&[("SARCO_VAULT_ADDRESS", VAULT)])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingVar("SARCO_ADMIN_ADDRESS")));
    }

    #[test]
    fn from_lookup_rejects_bad_numbers() {
        let err = ProtocolConfig::from_lookup(lookup(&[
            ("SARCO_ADMIN_ADDRESS", ADMIN),
            ("SARCO_VAULT_ADDRESS", VAULT),
            ("SARCO_CURSED_BOND_BPS", "-1"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { var: "SARCO_CURSED_BOND_BPS", .. }));
    }

    #[test]
    fn from_lookup_rejects_bad_address() {
        let err = ProtocolConfig::from_lookup(lookup(&[
            ("SARCO_ADMIN_ADDRESS", "not-hex"),
            ("SARCO_VAULT_ADDRESS", VAULT),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { var: "SARCO_ADMIN_ADDRESS", .. }));
    }

    #[test]
    fn yaml_file_round_trip() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "admin: \"{ADMIN}\"\nvault: \"{VAULT}\"\nparameters:\n  grace_period: 60\n"
        )
        .unwrap();
        let cfg = ProtocolConfig::from_yaml_file(file.path()).unwrap();
        assert_eq!(cfg.parameters.grace_period, 60);
        assert_eq!(cfg.parameters.embalmer_claim_window, 604_800);
    }

    #[test]
    fn yaml_file_missing() {
        let err = ProtocolConfig::from_yaml_file(Path::new("/nonexistent/sarco.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
