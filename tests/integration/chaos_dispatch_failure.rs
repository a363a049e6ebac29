//! Dispatch-failure chaos tests.
//!
//! A recipient whose receiver endpoint dies is demoted to offline at the
//! failed delivery's acceptance instant, so the very message that failed is
//! still replayable when the member reconnects within the window.

use coordinator::membership::MemberStatus;
use gc_test_utils::{ControlProbe, MockReceiver, settle, spawn_coordinator};
use tokio::time::{Duration, timeout};

#[tokio::test]
async fn dead_receiver_is_demoted_and_recovers_the_message_on_reconnect() {
    let harness = spawn_coordinator(60).await;
    let probe = ControlProbe::new(harness.addr);

    let recv_a = MockReceiver::start().await;
    let recv_b = MockReceiver::start().await;
    probe.register("A", recv_a.port()).await;
    probe.register("B", recv_b.port()).await;

    // B's receiver process dies without a disconnect request.
    recv_b.kill().await;

    probe.msend("A", "m").await;
    recv_a.wait_for(1).await;

    // The coordinator noticed the failure: B is offline, stamped with the
    // acceptance instant of "m".
    let accepted_at = timeout(Duration::from_secs(2), async {
        loop {
            {
                let group = harness.group.lock().await;
                if let Some(record) = group.members.get("B") {
                    if record.status == MemberStatus::Offline {
                        let entry = &group.log.entries()[0];
                        assert_eq!(record.last_offline_at, Some(entry.accepted_at));
                        return entry.accepted_at;
                    }
                }
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("B was never demoted");
    assert!(accepted_at > 0.0);

    // B restarts and reconnects within the window: "m" arrives via replay.
    let recv_b2 = MockReceiver::start().await;
    probe.reconnect("B", recv_b2.port()).await;
    recv_b2.wait_for(1).await;
    assert_eq!(
        recv_b2.messages().await,
        vec![("A".to_owned(), "m".to_owned())]
    );

    harness.stop().await;
}

#[tokio::test]
async fn failure_to_one_recipient_does_not_abort_the_others() {
    let harness = spawn_coordinator(60).await;
    let probe = ControlProbe::new(harness.addr);

    let recv_a = MockReceiver::start().await;
    let recv_b = MockReceiver::start().await;
    let recv_c = MockReceiver::start().await;
    probe.register("A", recv_a.port()).await;
    probe.register("B", recv_b.port()).await;
    probe.register("C", recv_c.port()).await;

    // B sorts between A and C, so its failure happens mid-fan-out.
    recv_b.kill().await;

    probe.msend("A", "m").await;

    recv_a.wait_for(1).await;
    recv_c.wait_for(1).await;
    assert_eq!(
        recv_c.messages().await,
        vec![("A".to_owned(), "m".to_owned())]
    );

    harness.stop().await;
}

#[tokio::test]
async fn delivery_is_attempted_exactly_once_per_multicast() {
    let harness = spawn_coordinator(60).await;
    let probe = ControlProbe::new(harness.addr);

    let recv_a = MockReceiver::start().await;
    probe.register("A", recv_a.port()).await;

    probe.msend("A", "once").await;
    recv_a.wait_for(1).await;
    settle().await;

    // No duplicate connection ever shows up for the same multicast.
    assert_eq!(recv_a.received().await.len(), 1);

    harness.stop().await;
}
