//! # Error Types
//!
//! Leaf error types shared across the workspace. All use `thiserror`.
//! Protocol-level failures live in `sarco-protocol::error`; these are the
//! primitive failures it wraps.

use thiserror::Error;

/// Errors constructing or parsing core primitives.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SarcoError {
    /// An address string was not 40 hex characters with optional `0x`.
    #[error("invalid address {input:?}: {reason}")]
    InvalidAddress {
        /// The rejected input.
        input: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A case identifier was not a valid UUID.
    #[error("invalid case id {0:?}")]
    InvalidCaseId(String),

    /// A timestamp could not be parsed or is out of range.
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),
}

/// Error during canonical serialization.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// Float values are not permitted in canonical representations.
    #[error("float values are not permitted in canonical representations; use string or integer: {0}")]
    FloatRejected(f64),

    /// JSON serialization failed.
    #[error("serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}

/// Error in cryptographic operations.
#[derive(Error, Debug)]
pub enum CryptoError {
    /// Signature verification failed.
    #[error("signature verification failed: {0}")]
    VerificationFailed(String),

    /// Key parsing failed.
    #[error("key error: {0}")]
    KeyError(String),

    /// The signed payload could not be canonicalized.
    #[error("payload canonicalization failed: {0}")]
    Canonicalization(#[from] CanonicalizationError),
}
