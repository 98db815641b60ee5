use std::time::Duration;

use tandem_core::RoomPatch;
use tandem_session::{Player, RoomMember, RoomStore, SimulatedPlayer};

use crate::integration::{create_store, init_tracing, playing_record, room_id, spawn_sync};

#[tokio::test(start_paused = true)]
async fn test_notice_burst_applies_last() {
    init_tracing();

    let store = create_store(playing_record(10, false));
    let player = SimulatedPlayer::new();
    let _viewer = spawn_sync(&store, RoomMember::viewer("room", "v1"), player.clone());
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(player.seeks(), vec![10]);

    store
        .update(&room_id(), RoomPatch::new().position(50).playing(true))
        .await
        .expect("Update failed");
    tokio::time::sleep(Duration::from_millis(100)).await;
    store
        .update(&room_id(), RoomPatch::new().position(80).playing(false))
        .await
        .expect("Update failed");

    tokio::time::sleep(Duration::from_millis(500)).await;

    assert_eq!(player.seeks(), vec![10, 80], "Position 50 must never be applied");
    assert!(!player.is_playing());
    assert_eq!(player.current_position(), 80);
}
