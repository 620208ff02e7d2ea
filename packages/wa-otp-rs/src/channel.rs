//! The seam between the dispatch core and the messaging backend.
//!
//! The core never speaks the messaging protocol itself. It requires exactly
//! three operations from the backend (initialize, send, destroy) plus a
//! lifecycle event stream, and this trait is that contract. Production code
//! implements it over the real channel client; tests implement it with
//! [`crate::testing::MockChannel`].

use async_trait::async_trait;
use tokio::sync::broadcast;

/// Lifecycle events emitted by a channel backend.
///
/// Delivery is at-least-once: a backend may emit `Ready` repeatedly without
/// an interleaving `Disconnected`, and consumers must treat that as a no-op.
/// The core reacts only to `Ready` and `Disconnected`; the remaining events
/// are forwarded to logging so an operator can follow authentication and
/// first-time pairing.
#[derive(Debug, Clone)]
pub enum ChannelEvent {
    /// First-time login requires pairing; the payload is backend-specific
    /// (e.g. a QR string). Rendering it is not the core's job.
    PairingRequired { payload: String },
    /// Session credentials were accepted.
    Authenticated,
    /// The connection is usable; sends may proceed.
    Ready,
    /// Authentication failed; the connection will not become ready without
    /// operator intervention.
    AuthFailure { reason: String },
    /// The connection dropped. The backend keeps reconnecting on its own and
    /// will emit `Ready` again if it succeeds.
    Disconnected { reason: String },
}

/// One long-lived connection to the messaging backend.
///
/// Implementations own the connection exclusively. Lifecycle mutation
/// (initialize, destroy) is driven solely through [`crate::OtpSender`];
/// concurrent callers never touch these directly.
#[async_trait]
pub trait ChannelAdapter: Send + Sync + 'static {
    /// Subscribe to lifecycle events.
    ///
    /// Must be called before [`initialize`](Self::initialize) to observe the
    /// first `Ready`. Slow subscribers may lag and miss events.
    fn subscribe(&self) -> broadcast::Receiver<ChannelEvent>;

    /// Begin connecting and authenticating.
    ///
    /// Completion is observable only through the event stream, never through
    /// a return value.
    async fn initialize(&self);

    /// Send a text message to a channel-native recipient identifier.
    ///
    /// Fails if the connection is not usable or the backend rejects the
    /// message.
    async fn send_message(&self, recipient_id: &str, text: &str) -> anyhow::Result<()>;

    /// Release the connection.
    async fn destroy(&self) -> anyhow::Result<()>;
}
