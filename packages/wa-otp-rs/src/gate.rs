//! Readiness gate: callers block here until the channel is usable.
//!
//! Built on a `tokio::sync::watch` channel holding a single `bool`. The
//! watch channel carries an internal version counter, which makes it a
//! generation-aware gate:
//!
//! - `mark_ready` releases every waiter of the current generation in one
//!   atomic notification; no waiter is starved relative to another.
//! - `reset_not_ready` starts a new generation; callers arriving afterwards
//!   block until the *next* ready.
//! - a waiter that times out simply drops its receiver, leaving no stale
//!   notification that could incorrectly satisfy a later wait.
//!
//! The gate never touches the underlying channel; it only records what the
//! channel's lifecycle events say.

use std::time::Duration;

use tokio::sync::watch;

use crate::error::SendError;

/// Tracks whether the channel is currently usable and lets any number of
/// concurrent callers wait (with a timeout) for it to become so.
#[derive(Debug)]
pub struct ReadinessGate {
    ready: watch::Sender<bool>,
}

impl ReadinessGate {
    /// Create a gate in the not-ready state.
    pub fn new() -> Self {
        let (ready, _) = watch::channel(false);
        Self { ready }
    }

    /// Snapshot of the current state. For logging and diagnostics only;
    /// waiting callers must use [`wait_until_ready`](Self::wait_until_ready).
    pub fn is_ready(&self) -> bool {
        *self.ready.borrow()
    }

    /// Record that the channel became usable, releasing all current waiters.
    ///
    /// Idempotent: a repeated `ready` with no interleaving reset is a no-op.
    pub fn mark_ready(&self) {
        self.ready.send_replace(true);
    }

    /// Record a disconnect. Callers arriving after this point block until
    /// the next [`mark_ready`](Self::mark_ready); waiters already released
    /// are unaffected.
    pub fn reset_not_ready(&self) {
        self.ready.send_replace(false);
    }

    /// Wait until the channel is usable or `timeout` elapses.
    ///
    /// Resolves immediately if the gate is already ready. On timeout the
    /// waiting caller is abandoned but nothing else happens: the channel's
    /// own connection attempt continues and may still become ready later.
    pub async fn wait_until_ready(&self, timeout: Duration) -> Result<(), SendError> {
        let mut rx = self.ready.subscribe();
        let timeout_ms = timeout.as_millis() as u64;
        let result = match tokio::time::timeout(timeout, rx.wait_for(|ready| *ready)).await {
            Ok(Ok(_)) => Ok(()),
            // The sender half lives inside `self`, so a closed channel can
            // only mean the gate is gone; treat it like never becoming ready.
            Ok(Err(_)) => Err(SendError::ReadyTimeout { timeout_ms }),
            Err(_) => Err(SendError::ReadyTimeout { timeout_ms }),
        };
        result
    }
}

impl Default for ReadinessGate {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn wait_resolves_when_already_ready() {
        let gate = ReadinessGate::new();
        gate.mark_ready();
        gate.wait_until_ready(Duration::from_millis(10))
            .await
            .expect("gate is ready");
    }

    #[tokio::test(start_paused = true)]
    async fn wait_times_out_when_never_ready() {
        let gate = ReadinessGate::new();
        let err = gate
            .wait_until_ready(Duration::from_millis(500))
            .await
            .expect_err("gate never becomes ready");
        assert!(matches!(err, SendError::ReadyTimeout { timeout_ms: 500 }));
    }

    #[tokio::test(start_paused = true)]
    async fn timed_out_wait_leaves_no_stale_notification() {
        let gate = ReadinessGate::new();
        gate.wait_until_ready(Duration::from_millis(100))
            .await
            .expect_err("first wait times out");

        // A later wait must still block until a real ready arrives.
        let second = gate.wait_until_ready(Duration::from_millis(100));
        tokio::pin!(second);
        assert!(
            futures::poll!(second.as_mut()).is_pending(),
            "second wait must not resolve from the abandoned first wait"
        );

        gate.mark_ready();
        second.await.expect("resolves after the real ready");
    }

    #[tokio::test]
    async fn all_waiters_release_on_one_ready() {
        let gate = std::sync::Arc::new(ReadinessGate::new());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let gate = gate.clone();
            handles.push(tokio::spawn(async move {
                gate.wait_until_ready(Duration::from_secs(5)).await
            }));
        }
        // Let every waiter register before the notification fires.
        tokio::task::yield_now().await;
        gate.mark_ready();
        for handle in handles {
            handle.await.expect("waiter task").expect("waiter released");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn reset_rearms_the_gate() {
        let gate = ReadinessGate::new();
        gate.mark_ready();
        gate.wait_until_ready(Duration::from_millis(10))
            .await
            .expect("ready before reset");

        gate.reset_not_ready();
        assert!(!gate.is_ready());
        gate.wait_until_ready(Duration::from_millis(10))
            .await
            .expect_err("blocked again after reset");

        gate.mark_ready();
        gate.wait_until_ready(Duration::from_millis(10))
            .await
            .expect("ready again after the next ready event");
    }

    #[tokio::test]
    async fn repeated_ready_without_reset_is_a_noop() {
        let gate = ReadinessGate::new();
        gate.mark_ready();
        gate.mark_ready();
        assert!(gate.is_ready());
        gate.wait_until_ready(Duration::from_millis(10))
            .await
            .expect("still ready");
    }
}
