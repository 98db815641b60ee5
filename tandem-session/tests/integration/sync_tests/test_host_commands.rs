use std::time::Duration;

use tandem_core::RoomRecord;
use tandem_session::{Player, RoomMember, RoomStore, SessionError, SimulatedPlayer};

use crate::integration::{
    OTHER_VIDEO, create_store, init_tracing, playing_record, room_id, spawn_sync,
};

#[tokio::test(start_paused = true)]
async fn test_host_seek_clamps_at_zero() {
    init_tracing();

    let store = create_store(playing_record(10, false));
    let player = SimulatedPlayer::new();
    let host = spawn_sync(&store, RoomMember::host("room", "host"), player.clone());
    tokio::time::sleep(Duration::from_secs(1)).await;

    host.seek_by(-30).await.expect("Seek failed");
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(store.fetch(&room_id()).await.unwrap().position, 0);

    host.seek_by(45).await.expect("Seek failed");
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(store.fetch(&room_id()).await.unwrap().position, 45);
    assert_eq!(player.current_position(), 45);
}

#[tokio::test(start_paused = true)]
async fn test_host_seek_far_past_end_saturates() {
    init_tracing();

    let store = create_store(playing_record(10, false));
    let player = SimulatedPlayer::new();
    let host = spawn_sync(&store, RoomMember::host("room", "host"), player.clone());
    tokio::time::sleep(Duration::from_secs(1)).await;

    host.seek_by(i64::MAX).await.expect("Seek failed");
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert_eq!(store.fetch(&room_id()).await.unwrap().position, i64::MAX as u64);
    assert_eq!(player.current_position(), u64::MAX / 1000);

    host.seek_by(-5).await.expect("Engine stopped after a huge seek");
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(!host.status().syncing);
}

#[tokio::test(start_paused = true)]
async fn test_load_media_reaches_viewers() {
    init_tracing();

    let store = create_store(RoomRecord::default());
    let host = spawn_sync(&store, RoomMember::host("room", "host"), SimulatedPlayer::new());
    let viewer_player = SimulatedPlayer::new();
    let _viewer = spawn_sync(&store, RoomMember::viewer("room", "v1"), viewer_player.clone());

    let invalid = host.load_media("https://example.com/clip.mp4").await;
    assert!(matches!(invalid, Err(SessionError::InvalidMedia(_))));

    host.load_media(OTHER_VIDEO).await.expect("Load failed");
    tokio::time::sleep(Duration::from_secs(1)).await;

    let record = store.fetch(&room_id()).await.unwrap();
    assert_eq!(record.media_reference, OTHER_VIDEO);
    assert_eq!(record.position, 0);
    assert!(!record.is_playing);

    let loaded = viewer_player.media().expect("Viewer did not load media");
    assert_eq!(loaded.video_id(), "9bZkp7q19f0");
    assert_eq!(host.status().media.map(|m| m.url().to_owned()), Some(OTHER_VIDEO.to_owned()));
}

#[tokio::test(start_paused = true)]
async fn test_viewer_cannot_drive_playback() {
    init_tracing();

    let store = create_store(playing_record(5, false));
    let viewer = spawn_sync(&store, RoomMember::viewer("room", "v1"), SimulatedPlayer::new());
    tokio::time::sleep(Duration::from_secs(1)).await;

    viewer.toggle_play().await.expect("Engine stopped");
    viewer.seek_by(60).await.expect("Engine stopped");
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(store.fetch(&room_id()).await.unwrap(), playing_record(5, false));

    viewer.leave().await.expect("Engine stopped");
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(matches!(viewer.toggle_play().await, Err(SessionError::EngineStopped)));
}
