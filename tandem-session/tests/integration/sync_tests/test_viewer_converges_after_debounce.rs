use std::time::Duration;

use tandem_core::RoomPatch;
use tandem_session::{Player, RoomMember, RoomStore, SimulatedPlayer};

use crate::integration::{create_store, init_tracing, playing_record, room_id, spawn_sync};

#[tokio::test(start_paused = true)]
async fn test_viewer_converges_after_debounce() {
    init_tracing();

    let store = create_store(playing_record(100, false));
    let player = SimulatedPlayer::new();
    let viewer = spawn_sync(&store, RoomMember::viewer("room", "v1"), player.clone());

    // Initial state lands after the settle delay.
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(player.current_position(), 100);
    assert!(!player.is_playing());

    store
        .update(&room_id(), RoomPatch::new().position(120).playing(true))
        .await
        .expect("Update failed");

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(player.seeks(), vec![100], "Still inside the debounce window");

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(player.seeks(), vec![100, 120]);
    assert!(player.is_playing());
    assert!(viewer.status().syncing);

    tokio::time::sleep(Duration::from_millis(600)).await;
    assert!(!viewer.status().syncing, "Indicator clears on its own");
    assert!(player.current_position() >= 120);
}
