use std::time::Duration;

use tandem_session::{RoomMember, RoomStore, SimulatedPlayer};

use crate::integration::{create_store, init_tracing, playing_record, room_id, spawn_sync};

#[tokio::test(start_paused = true)]
async fn test_heartbeat_only_while_playing() {
    init_tracing();

    let store = create_store(playing_record(0, false));
    let mut notices = store.subscribe(&room_id()).expect("Subscribe failed");
    let host = spawn_sync(&store, RoomMember::host("room", "host"), SimulatedPlayer::new());

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert!(notices.try_recv().is_err(), "Paused host must not write");

    host.toggle_play().await.expect("Toggle failed");
    tokio::time::sleep(Duration::from_millis(10)).await;
    let toggled = notices.try_recv().expect("Toggle was not written");
    assert!(toggled.is_playing);
    assert_eq!(toggled.position, 0);

    tokio::time::sleep(Duration::from_millis(3_000)).await;
    let beat = notices.try_recv().expect("No heartbeat after 3s");
    assert!((3..=4).contains(&beat.position), "position {}", beat.position);

    tokio::time::sleep(Duration::from_millis(3_000)).await;
    let beat = notices.try_recv().expect("No second heartbeat");
    assert!((6..=7).contains(&beat.position), "position {}", beat.position);

    host.toggle_play().await.expect("Toggle failed");
    tokio::time::sleep(Duration::from_millis(10)).await;
    let paused = notices.try_recv().expect("Pause was not written");
    assert!(!paused.is_playing);

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert!(notices.try_recv().is_err(), "Heartbeat must stop while paused");
}
