use std::time::Duration;

use tandem_core::RoomRecord;
use tandem_session::{MemoryBroadcast, RoomMember, RoomStore};

use crate::integration::{ROOM, create_store, init_tracing, room_id, spawn_signaling};
use crate::utils::{MockCapture, MockTransport, wait_until};

#[tokio::test(start_paused = true)]
async fn test_share_clock_reports_only_while_sharing() {
    init_tracing();

    let store = create_store(RoomRecord::default());
    let mut notices = store.subscribe(&room_id()).expect("Subscribe failed");
    let host = spawn_signaling(
        &store,
        &MemoryBroadcast::new(),
        &MockTransport::new(),
        RoomMember::host(ROOM, "host"),
        Some(MockCapture::available()),
    );

    tokio::time::sleep(Duration::from_secs(7)).await;
    assert!(notices.try_recv().is_err(), "No clock before sharing");

    host.start_sharing().await.expect("Coordinator stopped");
    assert!(wait_until(|| host.status().sharing, 1000).await);
    let started = notices.try_recv().expect("Start was not written");
    assert!(started.is_sharing_screen);

    tokio::time::sleep(Duration::from_millis(3_100)).await;
    let tick = notices.try_recv().expect("No share clock report");
    assert!(tick.is_sharing_screen);

    host.stop_sharing().await.expect("Coordinator stopped");
    assert!(wait_until(|| !host.status().sharing, 1000).await);
    let stopped = notices.try_recv().expect("Stop was not written");
    assert!(!stopped.is_sharing_screen);

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert!(notices.try_recv().is_err(), "Clock stops with the share");
}
