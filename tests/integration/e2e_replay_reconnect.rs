//! End-to-end replay-on-reconnect tests.
//!
//! - A member that disconnects and returns within the window receives the
//!   messages it missed, in acceptance order.
//! - Downtime beyond the window forfeits messages sent early in it.
//! - Deregistering forfeits history entirely: a fresh registration starts
//!   with an empty slate.

use gc_protocol::Delivery;
use gc_test_utils::{ControlProbe, MockReceiver, settle, spawn_coordinator};
use tokio::time::Duration;

#[tokio::test]
async fn reconnect_within_window_replays_missed_messages_in_order() {
    let harness = spawn_coordinator(60).await;
    let probe = ControlProbe::new(harness.addr);

    let recv_a = MockReceiver::start().await;
    let recv_b = MockReceiver::start().await;
    probe.register("A", recv_a.port()).await;
    probe.register("B", recv_b.port()).await;

    probe.disconnect("B").await;
    probe.msend("A", "x").await;
    settle().await;
    probe.msend("A", "y").await;
    settle().await;

    // Reconnect on a fresh endpoint, as a restarted process would.
    let recv_b2 = MockReceiver::start().await;
    probe.reconnect("B", recv_b2.port()).await;

    let replayed = recv_b2.wait_for(2).await;
    assert_eq!(
        recv_b2.messages().await,
        vec![
            ("A".to_owned(), "x".to_owned()),
            ("A".to_owned(), "y".to_owned()),
        ]
    );

    // Replayed payloads carry the original acceptance stamps, in order.
    let stamps: Vec<f64> = replayed
        .iter()
        .map(|d| match d {
            Delivery::Multicast { timestamp, .. } => *timestamp,
        })
        .collect();
    assert!(stamps[0] < stamps[1]);

    // The old endpoint saw nothing after the disconnect.
    assert!(recv_b.received().await.is_empty());

    harness.stop().await;
}

#[tokio::test]
async fn messages_older_than_the_window_are_expected_loss() {
    // W = 1s so the test can outwait it.
    let harness = spawn_coordinator(1).await;
    let probe = ControlProbe::new(harness.addr);

    let recv_a = MockReceiver::start().await;
    let recv_b = MockReceiver::start().await;
    probe.register("A", recv_a.port()).await;
    probe.register("B", recv_b.port()).await;

    probe.disconnect("B").await;
    probe.msend("A", "x").await;
    recv_a.wait_for(1).await;

    tokio::time::sleep(Duration::from_millis(1500)).await;

    let recv_b2 = MockReceiver::start().await;
    probe.reconnect("B", recv_b2.port()).await;
    settle().await;

    assert!(recv_b2.received().await.is_empty());

    // B is online again: the next multicast arrives live.
    probe.msend("A", "fresh").await;
    recv_b2.wait_for(1).await;
    assert_eq!(
        recv_b2.messages().await,
        vec![("A".to_owned(), "fresh".to_owned())]
    );

    harness.stop().await;
}

#[tokio::test]
async fn deregister_forfeits_history() {
    let harness = spawn_coordinator(60).await;
    let probe = ControlProbe::new(harness.addr);

    let recv_a = MockReceiver::start().await;
    let recv_b = MockReceiver::start().await;
    probe.register("A", recv_a.port()).await;
    probe.register("B", recv_b.port()).await;

    probe.deregister("B").await;
    settle().await;
    probe.msend("A", "m").await;
    recv_a.wait_for(1).await;

    // Fresh registration: no record of the downtime, so no replay.
    let recv_b2 = MockReceiver::start().await;
    probe.register("B", recv_b2.port()).await;
    settle().await;
    assert!(recv_b2.received().await.is_empty());

    // Live delivery resumes from here.
    probe.msend("A", "after-rejoin").await;
    recv_b2.wait_for(1).await;
    assert_eq!(
        recv_b2.messages().await,
        vec![("A".to_owned(), "after-rejoin".to_owned())]
    );

    harness.stop().await;
}

#[tokio::test]
async fn first_register_receives_no_history() {
    let harness = spawn_coordinator(60).await;
    let probe = ControlProbe::new(harness.addr);

    let recv_a = MockReceiver::start().await;
    probe.register("A", recv_a.port()).await;
    probe.msend("A", "before-b-existed").await;
    recv_a.wait_for(1).await;

    let recv_b = MockReceiver::start().await;
    probe.register("B", recv_b.port()).await;
    settle().await;

    assert!(recv_b.received().await.is_empty());

    harness.stop().await;
}
