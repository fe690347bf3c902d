//! # Token Amounts
//!
//! Amounts are unsigned 128-bit integers in the token's smallest unit.
//! Percentages are expressed in basis points over
//! [`BASIS_POINTS_DENOMINATOR`] (10 000 = 100%).
//!
//! All helpers here are checked: overflow yields `None` and the caller
//! maps it to a named error. Nothing in the protocol wraps silently.

/// A token amount in smallest units.
pub type Amount = u128;

/// Denominator for every percentage parameter (basis points).
pub const BASIS_POINTS_DENOMINATOR: u128 = 10_000;

/// Compute `amount * bps / 10_000` with integer (floor) division.
///
/// Returns `None` on multiplication overflow.
pub fn apply_basis_points(amount: Amount, bps: u32) -> Option<Amount> {
    amount
        .checked_mul(u128::from(bps))
        .map(|scaled| scaled / BASIS_POINTS_DENOMINATOR)
}

/// Serde adapter rendering an [`Amount`] as a decimal string.
///
/// JSON numbers cannot carry the full `u128` range portably, and the
/// canonicalizer rejects anything that is not an integer or string, so
/// signed payloads carry amounts as strings.
pub mod as_string {
    use serde::{Deserialize, Deserializer, Serializer};

    use super::Amount;

    pub fn serialize<S: Serializer>(value: &Amount, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Amount, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse::<Amount>().map_err(serde::de::Error::custom)
    }
}

/// Serde adapter for maps whose values are [`Amount`]s, rendering each
/// value as a decimal string.
pub mod map_as_string {
    use std::collections::BTreeMap;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use super::Amount;

    pub fn serialize<K, S>(map: &BTreeMap<K, Amount>, serializer: S) -> Result<S::Ok, S::Error>
    where
        K: Serialize + Ord,
        S: Serializer,
    {
        let rendered: BTreeMap<&K, String> = map.iter().map(|(k, v)| (k, v.to_string())).collect();
        rendered.serialize(serializer)
    }

    pub fn deserialize<'de, K, D>(deserializer: D) -> Result<BTreeMap<K, Amount>, D::Error>
    where
        K: Deserialize<'de> + Ord,
        D: Deserializer<'de>,
    {
        let raw = BTreeMap::<K, String>::deserialize(deserializer)?;
        raw.into_iter()
            .map(|(k, v)| {
                v.parse::<Amount>()
                    .map(|amount| (k, amount))
                    .map_err(serde::de::Error::custom)
            })
            .collect()
    }
}
