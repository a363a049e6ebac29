//! Control-protocol contract tests.
//!
//! - Malformed frames close without ack and mutate nothing.
//! - The ack is a receipt: state-illegal requests are acked but not applied.
//! - The participant's control client honors both behaviors.

use gc_protocol::{ControlReply, Request};
use gc_test_utils::{ControlProbe, MockReceiver, settle, spawn_coordinator};

#[tokio::test]
async fn malformed_frames_get_no_ack_and_no_state() {
    let harness = spawn_coordinator(60).await;
    let probe = ControlProbe::new(harness.addr);

    assert!(probe.send_raw(b"definitely not json").await.is_empty());
    assert!(probe.send_raw(br#"{"command": "msend"}"#).await.is_empty());
    assert!(
        probe
            .send_raw(br#"{"command": "shout", "participant_id": "A"}"#)
            .await
            .is_empty()
    );

    let group = harness.group.lock().await;
    assert!(group.members.is_empty());
    assert!(group.log.is_empty());
    drop(group);

    harness.stop().await;
}

#[tokio::test]
async fn state_illegal_requests_are_acked_receipts_without_effect() {
    let harness = spawn_coordinator(60).await;
    let probe = ControlProbe::new(harness.addr);

    let recv_a = MockReceiver::start().await;
    probe.register("A", recv_a.port()).await;

    // Duplicate register: acked, but the original endpoint survives.
    let reply = probe
        .send_raw(
            &serde_json::to_vec(&Request::Register {
                participant_id: "A".to_owned(),
                ip: "127.0.0.1".to_owned(),
                port: 1,
            })
            .unwrap(),
        )
        .await;
    let reply: ControlReply = serde_json::from_slice(&reply).unwrap();
    assert!(reply.is_ack());

    // Reconnect while online and msend from an unknown id: same contract.
    probe.reconnect("A", 1).await;
    probe.msend("ghost", "boo").await;
    settle().await;

    let group = harness.group.lock().await;
    assert_eq!(group.members.len(), 1);
    assert_eq!(
        group.members.get("A").unwrap().addr,
        format!("127.0.0.1:{}", recv_a.port()).parse().unwrap()
    );
    // The ghost's multicast was never appended.
    assert!(group.log.is_empty());
    drop(group);

    // A is untouched and still receives normally.
    probe.msend("A", "still-works").await;
    recv_a.wait_for(1).await;

    harness.stop().await;
}

#[tokio::test]
async fn participant_control_client_round_trips_against_a_real_coordinator() {
    let harness = spawn_coordinator(60).await;
    let client = participant::control::ControlClient::new(harness.addr);

    client
        .send(&Request::Register {
            participant_id: "A".to_owned(),
            ip: "127.0.0.1".to_owned(),
            port: 1,
        })
        .await
        .expect("register should be acked");

    harness.stop().await;
}
