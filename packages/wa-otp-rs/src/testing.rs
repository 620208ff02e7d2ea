//! Testing utilities: an instrumented in-memory channel adapter.
//!
//! Available to downstream crates with the `testing` feature:
//!
//! ```toml
//! [dev-dependencies]
//! wa-otp = { version = "0.1", features = ["testing"] }
//! ```
//!
//! `MockChannel` records every delivered message, counts lifecycle calls,
//! and tracks how many sends ran concurrently, which is what most of this
//! crate's own properties are asserted against.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::channel::{ChannelAdapter, ChannelEvent};

const EVENT_CAPACITY: usize = 64;

/// In-memory [`ChannelAdapter`] with observation hooks.
pub struct MockChannel {
    events: broadcast::Sender<ChannelEvent>,
    /// `(recipient_id, text)` pairs, recorded when a send *completes*.
    sent: Mutex<Vec<(String, String)>>,
    /// Interleaving of completed sends and teardown, for ordering asserts.
    timeline: Mutex<Vec<String>>,
    initialize_calls: AtomicUsize,
    destroy_calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    ready_on_initialize: bool,
    fail_sends: AtomicBool,
    send_delay: Option<Duration>,
}

impl MockChannel {
    fn new(ready_on_initialize: bool) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            events,
            sent: Mutex::new(Vec::new()),
            timeline: Mutex::new(Vec::new()),
            initialize_calls: AtomicUsize::new(0),
            destroy_calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            ready_on_initialize,
            fail_sends: AtomicBool::new(false),
            send_delay: None,
        }
    }

    /// A channel that emits `Ready` as soon as it is initialized.
    pub fn auto_ready() -> Self {
        Self::new(true)
    }

    /// A channel whose lifecycle events are driven entirely by the test via
    /// [`emit_ready`](Self::emit_ready) and friends.
    pub fn manual() -> Self {
        Self::new(false)
    }

    /// Every send sleeps this long before completing.
    pub fn with_send_delay(mut self, delay: Duration) -> Self {
        self.send_delay = Some(delay);
        self
    }

    /// Every send fails after the usual bookkeeping.
    pub fn failing_sends(self) -> Self {
        self.fail_sends.store(true, Ordering::Release);
        self
    }

    /// Flip send failure on or off mid-test.
    pub fn set_fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::Release);
    }

    pub fn emit(&self, event: ChannelEvent) {
        // No subscribers yet is fine; the event is simply unobserved.
        let _ = self.events.send(event);
    }

    pub fn emit_ready(&self) {
        self.emit(ChannelEvent::Ready);
    }

    pub fn emit_disconnected(&self, reason: &str) {
        self.emit(ChannelEvent::Disconnected {
            reason: reason.to_string(),
        });
    }

    /// Completed sends, in completion order.
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().expect("sent lock").clone()
    }

    /// Completed sends and teardown, in the order they happened.
    pub fn timeline(&self) -> Vec<String> {
        self.timeline.lock().expect("timeline lock").clone()
    }

    pub fn initialize_calls(&self) -> usize {
        self.initialize_calls.load(Ordering::Acquire)
    }

    pub fn destroy_calls(&self) -> usize {
        self.destroy_calls.load(Ordering::Acquire)
    }

    /// Highest number of sends observed running concurrently.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::Acquire)
    }
}

#[async_trait]
impl ChannelAdapter for MockChannel {
    fn subscribe(&self) -> broadcast::Receiver<ChannelEvent> {
        self.events.subscribe()
    }

    async fn initialize(&self) {
        self.initialize_calls.fetch_add(1, Ordering::AcqRel);
        if self.ready_on_initialize {
            self.emit(ChannelEvent::Authenticated);
            self.emit_ready();
        }
    }

    async fn send_message(&self, recipient_id: &str, text: &str) -> anyhow::Result<()> {
        let now = self.in_flight.fetch_add(1, Ordering::AcqRel) + 1;
        self.max_in_flight.fetch_max(now, Ordering::AcqRel);

        if let Some(delay) = self.send_delay {
            tokio::time::sleep(delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::AcqRel);

        if self.fail_sends.load(Ordering::Acquire) {
            anyhow::bail!("mock send failure for {recipient_id}");
        }

        self.sent
            .lock()
            .expect("sent lock")
            .push((recipient_id.to_string(), text.to_string()));
        self.timeline
            .lock()
            .expect("timeline lock")
            .push(format!("send:{recipient_id}"));
        Ok(())
    }

    async fn destroy(&self) -> anyhow::Result<()> {
        self.destroy_calls.fetch_add(1, Ordering::AcqRel);
        self.timeline
            .lock()
            .expect("timeline lock")
            .push("destroy".to_string());
        Ok(())
    }
}
