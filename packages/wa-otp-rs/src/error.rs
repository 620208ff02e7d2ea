//! Structured error types for the send path.
//!
//! `SendError` provides pattern-matchable errors instead of generic
//! `anyhow::Error`.
//!
//! # The Error Boundary Rule
//!
//! > **No `anyhow::Error` crosses the public surface unwrapped.**
//!
//! - `anyhow` is the collaborator transport (ergonomic for [`crate::ChannelAdapter`]
//!   implementations)
//! - a backend failure reaches callers only wrapped in [`SendError::Delivery`]
//!
//! Validation errors are never retried by this crate; timeout and delivery
//! errors are surfaced once per call and retry policy belongs to the caller.

use thiserror::Error;

/// Everything that can go wrong between a `send_verification_code` call and
/// the message leaving the channel.
#[derive(Debug, Error)]
pub enum SendError {
    /// The OTP is not exactly the configured number of ASCII digits.
    #[error("OTP must be exactly {expected} digits, received {received:?}")]
    InvalidOtpFormat { expected: usize, received: String },

    /// The recipient phone number is too short after stripping non-digits.
    #[error(
        "invalid recipient {input:?}: {digits} digit(s) after normalization, \
         need at least {min}",
        min = crate::recipient::MIN_RECIPIENT_DIGITS
    )]
    InvalidRecipient { input: String, digits: usize },

    /// The channel did not become ready within the timeout during startup.
    #[error("channel did not become ready within {timeout_ms}ms of initialization")]
    InitTimeout { timeout_ms: u64 },

    /// The channel was not ready within the timeout at send time.
    #[error("channel not ready within {timeout_ms}ms")]
    ReadyTimeout { timeout_ms: u64 },

    /// The backend rejected or failed the send.
    #[error("message delivery failed")]
    Delivery {
        #[source]
        source: anyhow::Error,
    },

    /// The sender was destroyed; no further sends are possible.
    #[error("sender has been destroyed")]
    SenderDestroyed,

    /// The configuration was rejected at construction.
    #[error("invalid sender configuration: {reason}")]
    InvalidConfig { reason: String },
}
