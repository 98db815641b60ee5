use tandem_core::{RoomRecord, SdpKind};
use tandem_session::{BroadcastChannel, MemoryBroadcast, RoomMember, TransportState};

use crate::integration::{ROOM, create_store, init_tracing, room_id, spawn_signaling};
use crate::utils::{
    LinkCall, MockCapture, MockTransport, answer, count_kind, drain_signals, request_stream,
    settle, wait_until,
};

#[tokio::test(start_paused = true)]
async fn test_duplicate_requests_single_link() {
    init_tracing();

    let store = create_store(RoomRecord::default());
    let channel = MemoryBroadcast::new();
    let transport = MockTransport::new();
    let mut v1_rx = channel.subscribe(&room_id(), &"v1".into());
    let host = spawn_signaling(
        &store,
        &channel,
        &transport,
        RoomMember::host(ROOM, "host"),
        Some(MockCapture::available()),
    );

    host.start_sharing().await.expect("Coordinator stopped");
    assert!(wait_until(|| host.status().sharing, 1000).await);

    // Requests while the first offer is outstanding reuse the link.
    for _ in 0..3 {
        channel
            .publish(&room_id(), request_stream("v1"))
            .await
            .expect("Publish failed");
    }
    settle().await;

    assert_eq!(transport.link_count(), 1);
    assert_eq!(count_kind(&drain_signals(&mut v1_rx), "offer"), 1);

    channel
        .publish(&room_id(), answer("v1", "host"))
        .await
        .expect("Publish failed");
    settle().await;

    let link = transport.links_to("v1").remove(0);
    link.emit_state(TransportState::Connected).await;
    settle().await;

    // Connected: further requests are redundant.
    for _ in 0..2 {
        channel
            .publish(&room_id(), request_stream("v1"))
            .await
            .expect("Publish failed");
    }
    settle().await;

    assert_eq!(transport.link_count(), 1);
    assert!(drain_signals(&mut v1_rx).is_empty());
    assert_eq!(
        link.calls(),
        vec![
            LinkCall::AttachStream("mock-capture-0".into()),
            LinkCall::CreateOffer,
            LinkCall::SetLocal(SdpKind::Offer),
            LinkCall::SetRemote(SdpKind::Answer),
        ]
    );
}
