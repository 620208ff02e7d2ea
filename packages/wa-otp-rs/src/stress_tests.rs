//! Stress tests designed to break the dispatch layer.
//!
//! These exercise the concurrency properties: single initialization under
//! racing callers, the in-flight cap, disconnect/re-ready suspension, and
//! failure isolation between sibling sends.

#[cfg(test)]
mod stress_tests {
    use std::sync::Arc;
    use std::time::Duration;

    use futures::future::join_all;

    use crate::config::SenderConfig;
    use crate::error::SendError;
    use crate::sender::OtpSender;
    use crate::testing::MockChannel;

    // ==========================================================================
    // TEST: N concurrent init() calls trigger exactly one initialize()
    // ==========================================================================

    #[tokio::test]
    async fn concurrent_init_initializes_once() {
        let sender = Arc::new(
            OtpSender::new(SenderConfig::default(), MockChannel::auto_ready())
                .expect("valid config"),
        );

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let sender = sender.clone();
                tokio::spawn(async move { sender.init().await })
            })
            .collect();

        for result in join_all(handles).await {
            result.expect("init task").expect("init succeeds");
        }

        assert_eq!(
            sender.channel().initialize_calls(),
            1,
            "racing init() calls must share one initialization"
        );
    }

    // ==========================================================================
    // TEST: in-flight sends never exceed send_concurrency
    // ==========================================================================
    //
    // 10 concurrent callers against a budget of 2; the mock records the
    // maximum number of sends it ever saw running at once.

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn inflight_sends_never_exceed_the_budget() {
        let config = SenderConfig {
            send_concurrency: 2,
            ..SenderConfig::default()
        };
        let channel = MockChannel::auto_ready().with_send_delay(Duration::from_millis(20));
        let sender = Arc::new(OtpSender::new(config, channel).expect("valid config"));

        let handles: Vec<_> = (0..10)
            .map(|i| {
                let sender = sender.clone();
                tokio::spawn(async move {
                    let recipient = format!("+3161234567{i}");
                    sender.send_verification_code("1234", &recipient).await
                })
            })
            .collect();

        for result in join_all(handles).await {
            result.expect("send task").expect("send succeeds");
        }

        let channel = sender.channel();
        assert_eq!(channel.sent().len(), 10, "every send completed");
        assert!(
            channel.max_in_flight() <= 2,
            "observed {} concurrent sends against a budget of 2",
            channel.max_in_flight()
        );
    }

    // ==========================================================================
    // TEST: a send issued between disconnect and the next ready suspends
    // ==========================================================================

    #[tokio::test]
    async fn send_after_disconnect_waits_for_the_next_ready() {
        let sender = Arc::new(
            OtpSender::new(SenderConfig::default(), MockChannel::auto_ready())
                .expect("valid config"),
        );

        // First send establishes the session and releases the initial gate.
        sender
            .send_verification_code("1234", "+31612345678")
            .await
            .expect("first send succeeds");

        sender.channel().emit_disconnected("network hiccup");
        // Let the event pump process the disconnect before the next send.
        tokio::time::sleep(Duration::from_millis(20)).await;

        let blocked = {
            let sender = sender.clone();
            tokio::spawn(async move {
                sender.send_verification_code("5678", "+31612345678").await
            })
        };

        // The send must be parked at the gate, not delivered.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(
            sender.channel().sent().len(),
            1,
            "send went through while disconnected"
        );
        assert!(!blocked.is_finished());

        sender.channel().emit_ready();
        blocked
            .await
            .expect("send task")
            .expect("send proceeds after the new ready");
        assert_eq!(sender.channel().sent().len(), 2);
    }

    // ==========================================================================
    // TEST: one failing send does not disturb its siblings
    // ==========================================================================

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn failing_send_leaves_siblings_unharmed() {
        let config = SenderConfig {
            send_concurrency: 2,
            ..SenderConfig::default()
        };
        let channel = MockChannel::auto_ready().with_send_delay(Duration::from_millis(10));
        let sender = Arc::new(OtpSender::new(config, channel).expect("valid config"));

        // Warm up so the failure window only covers one deliberate victim.
        sender
            .send_verification_code("1234", "+31612345678")
            .await
            .expect("warm-up send");

        sender.channel().set_fail_sends(true);
        let failed = sender
            .send_verification_code("1234", "+31612345670")
            .await
            .expect_err("forced failure");
        assert!(matches!(failed, SendError::Delivery { .. }));
        sender.channel().set_fail_sends(false);

        // The budget and queue survived: a burst still goes through.
        let handles: Vec<_> = (0..6)
            .map(|i| {
                let sender = sender.clone();
                tokio::spawn(async move {
                    let recipient = format!("+3161234560{i}");
                    sender.send_verification_code("1234", &recipient).await
                })
            })
            .collect();
        for result in join_all(handles).await {
            result.expect("send task").expect("send succeeds after a failure");
        }
        assert_eq!(sender.channel().sent().len(), 7);
    }
}
