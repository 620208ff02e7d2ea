//! # wa-otp
//!
//! A dispatch layer that sends one-time passcodes over a single long-lived,
//! session-based messaging channel, protecting that channel from concurrent
//! overload and transient disconnects.
//!
//! ## Architecture
//!
//! ```text
//! caller ──► OtpSender::send_verification_code
//!                │
//!                ├─ validate OTP digits / normalize recipient
//!                │
//!                ├─ one-time init ──► ChannelAdapter::initialize
//!                │                         │
//!                ▼                         ▼ lifecycle events
//!          ReadinessGate ◄──── event pump (ready / disconnected)
//!                │
//!                ▼
//!          DispatchQueue (≤ send_concurrency in flight, FIFO)
//!                │
//!                ▼
//!          ChannelAdapter::send_message
//! ```
//!
//! ## Key Invariants
//!
//! 1. **One connection, one initialize** - `ChannelAdapter::initialize` is
//!    called at most once per sender, no matter how many callers race.
//! 2. **Readiness gates every send** - callers block (with a timeout) until
//!    the channel reports ready; a disconnect re-arms the gate so later
//!    callers wait for the *next* ready.
//! 3. **Bounded in-flight sends** - at most `send_concurrency` sends run
//!    against the channel at once; admission is FIFO.
//! 4. **Failures are isolated** - one failed send never cancels siblings or
//!    shrinks the concurrency budget.
//! 5. **No secrets in logs** - recipient identifiers may be logged, OTP
//!    digits and rendered message bodies never are.
//!
//! ## Example
//!
//! ```ignore
//! use wa_otp::{OtpSender, SenderConfig};
//!
//! let sender = OtpSender::new(SenderConfig::default(), channel)?;
//! sender.init().await?; // optional warm-up; sends lazily init too
//! sender.send_verification_code("1234", "+31612345678").await?;
//! sender.destroy().await?;
//! ```

// Core modules
mod channel;
mod config;
mod error;
mod gate;
mod queue;
mod recipient;
mod sender;

// Testing utilities (feature-gated, also used by this crate's own tests)
#[cfg(any(test, feature = "testing"))]
pub mod testing;

// Stress tests (test-only)
#[cfg(test)]
mod stress_tests;

// Re-export the channel seam
pub use channel::{ChannelAdapter, ChannelEvent};

// Re-export configuration
pub use config::SenderConfig;

// Re-export error types
pub use error::SendError;

// Re-export core components (usable standalone, normally owned by OtpSender)
pub use gate::ReadinessGate;
pub use queue::DispatchQueue;

// Re-export the normalizer
pub use recipient::{normalize_recipient, CHANNEL_ID_SUFFIX, MIN_RECIPIENT_DIGITS};

// Re-export the orchestrator (primary entry point)
pub use sender::OtpSender;

// Re-export commonly used external types
pub use async_trait::async_trait;
