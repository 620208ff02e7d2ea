//! Bounded-concurrency dispatch queue.
//!
//! The channel session gets unstable when many sends hit it at once, so this
//! queue is the sole admission-control mechanism in front of it: at most
//! `send_concurrency` tasks run concurrently, waiting tasks are admitted in
//! FIFO arrival order, and one task failing never disturbs its siblings.
//!
//! A task counts as in flight from the moment [`DispatchQueue::enqueue`] is
//! entered (queued or running) until its future settles, so
//! [`DispatchQueue::drain`] covers both the backlog and the running set.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{Notify, Semaphore};

/// Shared inflight accounting: pending + running task count plus a notifier
/// for drain waiters when the count hits zero.
#[derive(Debug, Default)]
struct Inflight {
    count: AtomicUsize,
    idle: Notify,
}

/// RAII guard that decrements the inflight count when a task settles.
///
/// Dropping on completion, failure, or cancellation alike keeps the count
/// honest even if a caller abandons its enqueue future mid-wait.
struct InflightGuard {
    inflight: Arc<Inflight>,
}

impl Drop for InflightGuard {
    fn drop(&mut self) {
        let prev = self.inflight.count.fetch_sub(1, Ordering::AcqRel);
        if prev == 1 {
            self.inflight.idle.notify_waiters();
        }
    }
}

/// Caps how many send operations run concurrently against the channel.
#[derive(Debug)]
pub struct DispatchQueue {
    slots: Arc<Semaphore>,
    inflight: Arc<Inflight>,
}

impl DispatchQueue {
    /// Create a queue admitting at most `concurrency` tasks at once.
    pub fn new(concurrency: usize) -> Self {
        Self {
            slots: Arc::new(Semaphore::new(concurrency)),
            inflight: Arc::new(Inflight::default()),
        }
    }

    /// Run `task` once an execution slot is free.
    ///
    /// Admission is FIFO relative to other callers already waiting (the
    /// semaphore queues waiters fairly). The task's output, success or
    /// failure, is delivered only to this caller; a failure releases the
    /// slot like any other completion.
    pub async fn enqueue<F, T>(&self, task: F) -> T
    where
        F: std::future::Future<Output = T>,
    {
        self.inflight.count.fetch_add(1, Ordering::AcqRel);
        let _guard = InflightGuard {
            inflight: self.inflight.clone(),
        };
        let _permit = self
            .slots
            .acquire()
            .await
            .expect("dispatch queue semaphore is never closed");
        task.await
    }

    /// Wait until all queued and in-flight tasks have settled.
    ///
    /// Does not block new enqueues; a well-behaved shutdown stops issuing
    /// sends before draining.
    pub async fn drain(&self) {
        loop {
            // Register for notification BEFORE checking the count: Notify is
            // edge-triggered and the last task may settle between the check
            // and the await otherwise.
            let idle = self.inflight.idle.notified();
            if self.inflight.count.load(Ordering::Acquire) == 0 {
                return;
            }
            idle.await;
        }
    }

    /// Pending + running task count (diagnostics).
    pub fn inflight_count(&self) -> usize {
        self.inflight.count.load(Ordering::Acquire)
    }
}
