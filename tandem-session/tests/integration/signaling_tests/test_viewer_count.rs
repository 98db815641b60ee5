use tandem_core::RoomRecord;
use tandem_session::{
    BroadcastChannel, MemoryBroadcast, MemoryRoomStore, RoomMember, ShareHandle, TransportState,
};

use crate::integration::{ROOM, create_store, init_tracing, room_id, spawn_signaling};
use crate::utils::{
    MockCapture, MockLinkHandle, MockTransport, answer, request_stream, settle, wait_until,
};

async fn start_host(
    store: &MemoryRoomStore,
    channel: &MemoryBroadcast,
    transport: &MockTransport,
) -> ShareHandle {
    let host = spawn_signaling(
        store,
        channel,
        transport,
        RoomMember::host(ROOM, "host"),
        Some(MockCapture::available()),
    );
    host.start_sharing().await.expect("Coordinator stopped");
    assert!(wait_until(|| host.status().sharing, 1000).await);
    host
}

async fn negotiate(
    channel: &MemoryBroadcast,
    transport: &MockTransport,
    viewer: &str,
) -> MockLinkHandle {
    channel
        .publish(&room_id(), request_stream(viewer))
        .await
        .expect("Publish failed");
    channel
        .publish(&room_id(), answer(viewer, "host"))
        .await
        .expect("Publish failed");
    settle().await;

    transport
        .links_to(viewer)
        .pop()
        .expect("Host opened no link")
}

#[tokio::test(start_paused = true)]
async fn test_connected_counts_exactly_once() {
    init_tracing();

    let store = create_store(RoomRecord::default());
    let channel = MemoryBroadcast::new();
    let transport = MockTransport::new();
    let host = start_host(&store, &channel, &transport).await;

    let v1 = negotiate(&channel, &transport, "v1").await;
    let v2 = negotiate(&channel, &transport, "v2").await;

    for _ in 0..3 {
        v1.emit_state(TransportState::Connected).await;
    }
    v2.emit_state(TransportState::Connected).await;

    assert!(wait_until(|| host.status().viewer_count == 2, 1000).await);
    settle().await;
    assert_eq!(host.status().viewer_count, 2);
}

#[tokio::test(start_paused = true)]
async fn test_failure_decrements_exactly_once() {
    init_tracing();

    let store = create_store(RoomRecord::default());
    let channel = MemoryBroadcast::new();
    let transport = MockTransport::new();
    let host = start_host(&store, &channel, &transport).await;

    let v1 = negotiate(&channel, &transport, "v1").await;
    let v2 = negotiate(&channel, &transport, "v2").await;
    v1.emit_state(TransportState::Connected).await;
    v2.emit_state(TransportState::Connected).await;
    assert!(wait_until(|| host.status().viewer_count == 2, 1000).await);

    v1.emit_state(TransportState::Failed).await;
    v1.emit_state(TransportState::Closed).await;
    v1.emit_state(TransportState::Failed).await;
    settle().await;

    assert_eq!(host.status().viewer_count, 1);
    assert!(v1.is_closed(), "Failed links are closed");
    assert!(!v2.is_closed());

    // The failed viewer may ask again and gets a fresh link.
    let v1_again = negotiate(&channel, &transport, "v1").await;
    assert_ne!(v1_again.link_id, v1.link_id);
    assert_eq!(transport.links_to("v1").len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_unconnected_failure_never_goes_negative() {
    init_tracing();

    let store = create_store(RoomRecord::default());
    let channel = MemoryBroadcast::new();
    let transport = MockTransport::new();
    let host = start_host(&store, &channel, &transport).await;

    let v1 = negotiate(&channel, &transport, "v1").await;
    v1.emit_state(TransportState::Failed).await;
    settle().await;

    assert_eq!(host.status().viewer_count, 0);
    assert!(v1.is_closed());
}
