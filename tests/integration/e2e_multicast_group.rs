//! End-to-end multicast tests.
//!
//! - Basic multicast reaches every online member, sender included.
//! - Alternating senders produce the same acceptance order at every
//!   recipient.
//!
//! Each test runs a real coordinator on an ephemeral port and mock
//! participant receivers collecting deliveries over real sockets.

use gc_protocol::Delivery;
use gc_test_utils::{ControlProbe, MockReceiver, settle, spawn_coordinator};

#[tokio::test]
async fn multicast_reaches_all_online_members_including_the_sender() {
    let harness = spawn_coordinator(60).await;
    let probe = ControlProbe::new(harness.addr);

    let recv_a = MockReceiver::start().await;
    let recv_b = MockReceiver::start().await;
    probe.register("A", recv_a.port()).await;
    probe.register("B", recv_b.port()).await;

    probe.msend("A", "hello").await;

    let at_b = recv_b.wait_for(1).await;
    match &at_b[0] {
        Delivery::Multicast {
            sender_id,
            message,
            timestamp,
        } => {
            assert_eq!(sender_id, "A");
            assert_eq!(message, "hello");
            assert!(*timestamp > 0.0);
        }
    }

    // Self-delivery: the sender gets its own message too.
    let at_a = recv_a.wait_for(1).await;
    assert_eq!(at_a.len(), 1);
    assert_eq!(at_a, at_b);

    harness.stop().await;
}

#[tokio::test]
async fn offline_member_gets_nothing_live() {
    let harness = spawn_coordinator(60).await;
    let probe = ControlProbe::new(harness.addr);

    let recv_a = MockReceiver::start().await;
    let recv_b = MockReceiver::start().await;
    probe.register("A", recv_a.port()).await;
    probe.register("B", recv_b.port()).await;
    probe.disconnect("B").await;

    probe.msend("A", "while-you-were-out").await;

    recv_a.wait_for(1).await;
    settle().await;
    assert!(recv_b.received().await.is_empty());

    harness.stop().await;
}

#[tokio::test]
async fn alternating_senders_arrive_in_acceptance_order_everywhere() {
    let harness = spawn_coordinator(60).await;
    let probe = ControlProbe::new(harness.addr);

    let recv_a = MockReceiver::start().await;
    let recv_b = MockReceiver::start().await;
    probe.register("A", recv_a.port()).await;
    probe.register("B", recv_b.port()).await;

    // The ack precedes the fan-out, so give each dispatch a moment to land
    // before accepting the next multicast.
    for (sender, message) in [("A", "a1"), ("B", "b1"), ("A", "a2"), ("B", "b2")] {
        probe.msend(sender, message).await;
        settle().await;
    }

    let expected = vec![
        ("A".to_owned(), "a1".to_owned()),
        ("B".to_owned(), "b1".to_owned()),
        ("A".to_owned(), "a2".to_owned()),
        ("B".to_owned(), "b2".to_owned()),
    ];
    recv_a.wait_for(4).await;
    recv_b.wait_for(4).await;
    assert_eq!(recv_a.messages().await, expected);
    assert_eq!(recv_b.messages().await, expected);

    harness.stop().await;
}
