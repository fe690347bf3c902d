//! # Temporal Types — Epoch-Second Timestamps and Clocks
//!
//! Every lifecycle guard (resurrection window, grace period, claim window,
//! parameter expiration) is integer arithmetic on [`Timestamp`], which is
//! whole seconds since the Unix epoch. Sub-second precision does not exist
//! in the protocol.
//!
//! ## Clock Discipline
//!
//! The protocol never reads the system time directly. It asks a [`Clock`]
//! exactly once per operation. [`SystemClock`] is the production source;
//! [`ManualClock`] is a settable source for tests and scenario replay.
//! Clocks must be monotonically non-decreasing; `ManualClock::set` refuses
//! to move backwards.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SarcoError;

/// Whole seconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Create a timestamp from epoch seconds.
    pub const fn from_epoch_secs(secs: u64) -> Self {
        Self(secs)
    }

    /// Create a timestamp from a `chrono::DateTime<Utc>`, truncating
    /// sub-seconds.
    ///
    /// # Errors
    ///
    /// Returns [`SarcoError::InvalidTimestamp`] for instants before the
    /// Unix epoch.
    pub fn from_utc(dt: DateTime<Utc>) -> Result<Self, SarcoError> {
        u64::try_from(dt.timestamp())
            .map(Self)
            .map_err(|_| SarcoError::InvalidTimestamp(format!("{dt} precedes the Unix epoch")))
    }

    /// Parse an RFC 3339 timestamp. Only the `Z` suffix is accepted.
    pub fn parse(s: &str) -> Result<Self, SarcoError> {
        if !s.ends_with('Z') {
            return Err(SarcoError::InvalidTimestamp(format!(
                "timestamp must use Z suffix (UTC only), got: {s:?}"
            )));
        }
        let dt = DateTime::parse_from_rfc3339(s)
            .map_err(|e| SarcoError::InvalidTimestamp(format!("{s:?}: {e}")))?;
        Self::from_utc(dt.with_timezone(&Utc))
    }

    /// Epoch seconds.
    pub const fn epoch_secs(&self) -> u64 {
        self.0
    }

    /// `self + secs`, or `None` on overflow.
    pub fn checked_add_secs(&self, secs: u64) -> Option<Self> {
        self.0.checked_add(secs).map(Self)
    }

    /// `self + secs`, clamped at the largest representable instant.
    pub fn saturating_add_secs(&self, secs: u64) -> Self {
        Self(self.0.saturating_add(secs))
    }

    /// Seconds elapsed from `earlier` to `self`, or `None` if `earlier` is
    /// after `self`.
    pub fn secs_since(&self, earlier: Timestamp) -> Option<u64> {
        self.0.checked_sub(earlier.0)
    }

    /// Render as ISO 8601 with Z suffix (e.g., `2026-01-15T12:00:00Z`).
    pub fn to_iso8601(&self) -> String {
        match i64::try_from(self.0).ok().and_then(|s| DateTime::from_timestamp(s, 0)) {
            Some(dt) => dt.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
            None => format!("@{}", self.0),
        }
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_iso8601())
    }
}

/// A source of the current time.
pub trait Clock: Send + Sync {
    /// The current time. Must never decrease across calls.
    fn now(&self) -> Timestamp;
}

/// Wall-clock time from the operating system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        let secs = Utc::now().timestamp();
        Timestamp(u64::try_from(secs).unwrap_or_default())
    }
}

/// A manually driven clock.
///
/// Shared between the protocol facade and the test or scenario driving it
/// (wrap in `Arc`). Time only moves forward.
#[derive(Debug, Default)]
pub struct ManualClock {
    secs: AtomicU64,
}

impl ManualClock {
    /// Create a clock reading `start`.
    pub fn new(start: Timestamp) -> Self {
        Self {
            secs: AtomicU64::new(start.0),
        }
    }

    /// Move the clock to `to`.
    ///
    /// # Errors
    ///
    /// Returns [`SarcoError::InvalidTimestamp`] if `to` is earlier than the
    /// current reading.
    pub fn set(&self, to: Timestamp) -> Result<(), SarcoError> {
        let current = self.secs.load(Ordering::SeqCst);
        if to.0 < current {
            return Err(SarcoError::InvalidTimestamp(format!(
                "clock cannot move backwards from {current} to {}",
                to.0
            )));
        }
        self.secs.store(to.0, Ordering::SeqCst);
        Ok(())
    }

    /// Advance the clock by `secs` seconds (saturating).
    pub fn advance(&self, secs: u64) {
        let current = self.secs.load(Ordering::SeqCst);
        self.secs.store(current.saturating_add(secs), Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        Timestamp(self.secs.load(Ordering::SeqCst))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_iso8601_rendering() {
        let dt = Utc.with_ymd_and_hms(2026, 1, 15, 12, 0, 0).unwrap();
        let ts = Timestamp::from_utc(dt).unwrap();
        assert_eq!(ts.to_iso8601(), "2026-01-15T12:00:00Z");
        assert_eq!(format!("{ts}"), "2026-01-15T12:00:00Z");
    }

    #[test]
    fn test_parse_requires_z() {
        assert!(Timestamp::parse("2026-01-15T12:00:00Z").is_ok());
        assert!(Timestamp::parse("2026-01-15T12:00:00+00:00").is_err());
        assert!(Timestamp::parse("yesterday").is_err());
    }

    #[test]
    fn test_pre_epoch_rejected() {
        let dt = Utc.with_ymd_and_hms(1969, 12, 31, 23, 59, 59).unwrap();
        assert!(Timestamp::from_utc(dt).is_err());
    }

    #[test]
    fn test_arithmetic() {
        let t = Timestamp::from_epoch_secs(1_000);
        assert_eq!(t.checked_add_secs(500), Some(Timestamp::from_epoch_secs(1_500)));
        assert_eq!(Timestamp::from_epoch_secs(u64::MAX).checked_add_secs(1), None);
        assert_eq!(
            Timestamp::from_epoch_secs(u64::MAX - 1).saturating_add_secs(5).epoch_secs(),
            u64::MAX
        );
        assert_eq!(Timestamp::from_epoch_secs(1_500).secs_since(t), Some(500));
        assert_eq!(t.secs_since(Timestamp::from_epoch_secs(1_500)), None);
    }

    #[test]
    fn test_manual_clock_moves_forward_only() {
        let clock = ManualClock::new(Timestamp::from_epoch_secs(100));
        clock.advance(50);
        assert_eq!(clock.now().epoch_secs(), 150);
        clock.set(Timestamp::from_epoch_secs(200)).unwrap();
        assert_eq!(clock.now().epoch_secs(), 200);
        assert!(clock.set(Timestamp::from_epoch_secs(199)).is_err());
        assert_eq!(clock.now().epoch_secs(), 200);
    }

    #[test]
    fn test_system_clock_is_after_2020() {
        assert!(SystemClock.now().epoch_secs() > 1_577_836_800);
    }

    #[test]
    fn test_serde_is_plain_integer() {
        let ts = Timestamp::from_epoch_secs(42);
        assert_eq!(serde_json::to_string(&ts).unwrap(), "42");
    }
}
