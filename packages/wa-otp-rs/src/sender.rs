//! The OTP sender: public surface and lifecycle orchestration.
//!
//! One `OtpSender` owns one channel connection, one readiness gate, and one
//! dispatch queue; nothing is shared across instances. The sender is the
//! only code allowed to mutate the channel's lifecycle (initialize,
//! destroy) - concurrent callers go through its single init path and single
//! destroy path.
//!
//! Lifecycle per instance:
//!
//! ```text
//! Uninitialized ──first init()/send──► Initializing ──ready event──► Ready
//!                                            ▲                        │
//!                                            └──── disconnected ◄─────┘
//!                                       (oscillates until destroy())
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::sync::OnceCell;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::channel::{ChannelAdapter, ChannelEvent};
use crate::config::SenderConfig;
use crate::error::SendError;
use crate::gate::ReadinessGate;
use crate::queue::DispatchQueue;
use crate::recipient::normalize_recipient;

/// Substitute every `{otp}` occurrence in `template` with the literal code.
pub(crate) fn render_message(template: &str, otp: &str) -> String {
    template.replace("{otp}", otp)
}

/// Sends one-time passcodes over a single shared channel connection,
/// gated on readiness and capped to a bounded number of in-flight sends.
pub struct OtpSender<C: ChannelAdapter> {
    config: SenderConfig,
    channel: Arc<C>,
    gate: Arc<ReadinessGate>,
    queue: DispatchQueue,
    /// Memoizes the one-time initialize trigger. Only the triggering is
    /// cached; readiness is re-awaited on every init/send, so a failed init
    /// can be retried once the channel's own reconnect logic lands.
    init_trigger: OnceCell<()>,
    destroyed: AtomicBool,
    event_pump: Mutex<Option<JoinHandle<()>>>,
}

impl<C: ChannelAdapter> OtpSender<C> {
    /// Create a sender around a channel adapter.
    ///
    /// Validates the configuration; nothing is connected yet. The channel is
    /// initialized lazily on the first [`init`](Self::init) or
    /// [`send_verification_code`](Self::send_verification_code).
    pub fn new(config: SenderConfig, channel: C) -> Result<Self, SendError> {
        config.validate()?;
        Ok(Self {
            queue: DispatchQueue::new(config.send_concurrency),
            config,
            channel: Arc::new(channel),
            gate: Arc::new(ReadinessGate::new()),
            init_trigger: OnceCell::new(),
            destroyed: AtomicBool::new(false),
            event_pump: Mutex::new(None),
        })
    }

    /// The configuration this sender was built with.
    pub fn config(&self) -> &SenderConfig {
        &self.config
    }

    /// The channel adapter this sender drives.
    pub fn channel(&self) -> &C {
        &self.channel
    }

    /// Initialize the channel and wait for it to become ready.
    ///
    /// Idempotent: concurrent and repeated calls trigger exactly one
    /// `ChannelAdapter::initialize`. Fails with [`SendError::InitTimeout`]
    /// if readiness is not reached within `ready_timeout_ms`; the failure is
    /// not cached, so calling again re-waits on readiness.
    pub async fn init(&self) -> Result<(), SendError> {
        if self.destroyed.load(Ordering::Acquire) {
            return Err(SendError::SenderDestroyed);
        }
        self.ensure_initialized().await;
        self.gate
            .wait_until_ready(self.ready_timeout())
            .await
            .map_err(|_| SendError::InitTimeout {
                timeout_ms: self.config.ready_timeout_ms,
            })
    }

    /// Send a verification code to a phone number (E.164 recommended).
    ///
    /// Validates the OTP and recipient, lazily initializes the channel,
    /// waits for readiness, renders the template, and submits the send
    /// through the dispatch queue. Exactly one `send_message` reaches the
    /// channel per successful call. The core never retries; retry policy
    /// belongs to the caller.
    pub async fn send_verification_code(
        &self,
        otp: &str,
        recipient: &str,
    ) -> Result<(), SendError> {
        if self.destroyed.load(Ordering::Acquire) {
            return Err(SendError::SenderDestroyed);
        }
        self.validate_otp(otp)?;
        let to = normalize_recipient(recipient)?;

        self.ensure_initialized().await;
        self.gate.wait_until_ready(self.ready_timeout()).await?;

        let message = render_message(&self.config.message_template, otp);

        self.queue
            .enqueue(async {
                info!(recipient = %to, "sending verification code");
                let result = self.channel.send_message(&to, &message).await;
                match &result {
                    Ok(()) => info!(recipient = %to, "verification code sent"),
                    Err(error) => {
                        warn!(recipient = %to, %error, "verification code send failed");
                    }
                }
                result
            })
            .await
            .map_err(|source| SendError::Delivery { source })
    }

    /// Graceful shutdown: drain in-flight sends, then tear down the channel.
    ///
    /// Idempotent; only the first call tears anything down. After this
    /// resolves, further sends fail with [`SendError::SenderDestroyed`].
    pub async fn destroy(&self) -> anyhow::Result<()> {
        if self.destroyed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.queue.drain().await;
        self.channel.destroy().await?;
        let pump = match self.event_pump.lock() {
            Ok(mut slot) => slot.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(pump) = pump {
            pump.abort();
        }
        info!("sender destroyed");
        Ok(())
    }

    fn validate_otp(&self, otp: &str) -> Result<(), SendError> {
        let expected = self.config.allowed_otp_length;
        if otp.chars().count() != expected || !otp.chars().all(|c| c.is_ascii_digit()) {
            return Err(SendError::InvalidOtpFormat {
                expected,
                received: otp.to_string(),
            });
        }
        Ok(())
    }

    fn ready_timeout(&self) -> Duration {
        Duration::from_millis(self.config.ready_timeout_ms)
    }

    /// Trigger channel initialization exactly once per sender lifetime.
    ///
    /// The event subscription and pump are wired before `initialize` so the
    /// very first `ready` cannot be missed.
    async fn ensure_initialized(&self) {
        self.init_trigger
            .get_or_init(|| async {
                let events = self.channel.subscribe();
                let pump = tokio::spawn(run_event_pump(events, self.gate.clone()));
                match self.event_pump.lock() {
                    Ok(mut slot) => *slot = Some(pump),
                    Err(poisoned) => *poisoned.into_inner() = Some(pump),
                }
                info!("initializing channel");
                self.channel.initialize().await;
            })
            .await;
    }
}

/// Consume channel lifecycle events for the lifetime of the sender.
///
/// `Ready`/`Disconnected` drive the gate; everything else is informational.
/// Business logic stays out of here.
async fn run_event_pump(mut events: broadcast::Receiver<ChannelEvent>, gate: Arc<ReadinessGate>) {
    loop {
        match events.recv().await {
            Ok(ChannelEvent::Ready) => {
                gate.mark_ready();
                info!("channel ready");
            }
            Ok(ChannelEvent::Disconnected { reason }) => {
                gate.reset_not_ready();
                warn!(%reason, "channel disconnected; sends wait for the next ready");
            }
            Ok(ChannelEvent::Authenticated) => info!("channel authenticated"),
            Ok(ChannelEvent::AuthFailure { reason }) => {
                warn!(%reason, "channel authentication failed");
            }
            Ok(ChannelEvent::PairingRequired { .. }) => {
                info!("pairing required; complete pairing on the linked device");
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "lagged behind channel lifecycle events");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
