use std::time::Duration;

use tandem_session::{Player, RoomMember, SimulatedPlayer};

use crate::integration::{VIDEO, create_store, init_tracing, playing_record, spawn_sync};

#[tokio::test(start_paused = true)]
async fn test_initial_state_waits_for_player() {
    init_tracing();

    let store = create_store(playing_record(42, true));
    let player = SimulatedPlayer::new().with_manual_ready();
    let viewer = spawn_sync(&store, RoomMember::viewer("room", "v1"), player.clone());

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(player.media().map(|m| m.url().to_owned()), Some(VIDEO.to_owned()));
    assert!(player.seeks().is_empty(), "Player is not ready yet");

    player.mark_ready();
    viewer.player_ready().await.expect("Engine stopped");

    tokio::time::sleep(Duration::from_millis(400)).await;
    assert!(player.seeks().is_empty(), "Settle delay not over");

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(player.seeks(), vec![42]);
    assert!(player.is_playing());
    assert!(!viewer.status().syncing, "Initial state is not a correction");
}

#[tokio::test(start_paused = true)]
async fn test_viewer_without_media_ignores_notices() {
    init_tracing();

    let store = create_store(Default::default());
    let player = SimulatedPlayer::new();
    let viewer = spawn_sync(&store, RoomMember::viewer("room", "v1"), player.clone());

    tokio::time::sleep(Duration::from_secs(15)).await;

    assert!(player.media().is_none());
    assert!(player.seeks().is_empty());
    assert_eq!(viewer.status().last_correction, None);
}
