use chrono::Utc;
use tandem_core::{RoomPatch, RoomRecord, SdpKind, SignalMessage};
use tandem_session::{BroadcastChannel, MemoryBroadcast, RoomMember, RoomStore};

use crate::integration::{ROOM, create_store, init_tracing, room_id, spawn_signaling};
use crate::utils::{
    LinkCall, MockTransport, candidate, count_kind, drain_signals, offer, settle, wait_until,
};

fn sharing_record() -> RoomRecord {
    let mut record = RoomRecord::default();
    record.apply(&RoomPatch::new().start_sharing(Utc::now()));
    record
}

#[tokio::test(start_paused = true)]
async fn test_viewer_negotiates_and_tears_down() {
    init_tracing();

    let store = create_store(sharing_record());
    let channel = MemoryBroadcast::new();
    let transport = MockTransport::new();
    let mut host_rx = channel.subscribe(&room_id(), &"host".into());
    let viewer = spawn_signaling(&store, &channel, &transport, RoomMember::viewer(ROOM, "v1"), None);
    settle().await;

    // Already sharing on join: ask for the stream straight away.
    assert_eq!(
        drain_signals(&mut host_rx),
        vec![SignalMessage::RequestStream {
            sender_id: "v1".into()
        }]
    );
    assert!(viewer.status().connecting);

    channel.publish(&room_id(), offer("host", "v1")).await.unwrap();
    channel.publish(&room_id(), offer("host", "v2")).await.unwrap();
    channel
        .publish(&room_id(), candidate("host", "v1", "remote-1"))
        .await
        .unwrap();
    settle().await;

    assert_eq!(transport.link_count(), 1, "Offer for v2 is not ours");
    let link = transport.links_to("host").remove(0);
    assert_eq!(
        link.calls(),
        vec![
            LinkCall::SetRemote(SdpKind::Offer),
            LinkCall::CreateAnswer,
            LinkCall::SetLocal(SdpKind::Answer),
            LinkCall::AddCandidate("remote-1".into()),
        ]
    );

    let sent = drain_signals(&mut host_rx);
    assert!(matches!(
        &sent[..],
        [SignalMessage::Answer { sender_id, target_id, .. }]
            if sender_id.as_str() == "v1" && target_id.as_str() == "host"
    ));

    link.emit_candidate("local-1").await;
    link.emit_track().await;
    settle().await;

    assert_eq!(
        drain_signals(&mut host_rx),
        vec![SignalMessage::Candidate {
            sender_id: "v1".into(),
            target_id: "host".into(),
            candidate: "local-1".into(),
        }]
    );
    assert!(viewer.status().receiving);
    assert!(!viewer.status().connecting);

    store
        .update(&room_id(), RoomPatch::new().stop_sharing())
        .await
        .unwrap();
    assert!(wait_until(|| !viewer.status().sharing, 1000).await);
    assert!(link.is_closed());
    assert!(!viewer.status().receiving);
    assert_eq!(viewer.status().notice, None);

    channel.publish(&room_id(), offer("host", "v1")).await.unwrap();
    settle().await;
    assert_eq!(transport.link_count(), 1, "No answers once sharing ended");
    assert_eq!(count_kind(&drain_signals(&mut host_rx), "answer"), 0);
}

#[tokio::test(start_paused = true)]
async fn test_candidate_without_link_is_dropped() {
    init_tracing();

    let store = create_store(RoomRecord::default());
    let channel = MemoryBroadcast::new();
    let transport = MockTransport::new();
    let mut host_rx = channel.subscribe(&room_id(), &"host".into());
    let viewer = spawn_signaling(&store, &channel, &transport, RoomMember::viewer(ROOM, "v1"), None);
    settle().await;
    assert!(drain_signals(&mut host_rx).is_empty(), "Nothing shared yet");

    channel
        .publish(&room_id(), candidate("host", "v1", "early"))
        .await
        .unwrap();
    settle().await;
    assert_eq!(transport.link_count(), 0);

    // Still responsive: the share starting triggers a request.
    store
        .update(&room_id(), RoomPatch::new().start_sharing(Utc::now()))
        .await
        .unwrap();
    assert!(wait_until(|| viewer.status().sharing, 1000).await);
    settle().await;
    assert_eq!(count_kind(&drain_signals(&mut host_rx), "request_stream"), 1);
}
