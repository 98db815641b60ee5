pub mod sync_tests;

use std::sync::Arc;
use tracing::Level;

use tandem_core::{RoomId, RoomRecord};
use tandem_session::{
    MediaTransport, MemoryBroadcast, MemoryRoomStore, PlaybackSyncEngine, RoomMember, ShareHandle,
    SignalingConfig, SignalingCoordinator, SimulatedPlayer, SyncConfig, SyncHandle,
};

use crate::utils::{MockCapture, MockTransport};

pub const ROOM: &str = "room";
pub const VIDEO: &str = "https://www.youtube.com/watch?v=dQw4w9WgXcQ";
pub const OTHER_VIDEO: &str = "https://youtu.be/9bZkp7q19f0";

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_test_writer()
        .try_init();
}

pub fn room_id() -> RoomId {
    RoomId::from(ROOM)
}

/// A store holding one room with `record`.
pub fn create_store(record: RoomRecord) -> MemoryRoomStore {
    let store = MemoryRoomStore::new();
    store.create_room(room_id(), record);
    store
}

pub fn playing_record(position: u64, is_playing: bool) -> RoomRecord {
    RoomRecord {
        media_reference: VIDEO.to_owned(),
        position,
        is_playing,
        ..Default::default()
    }
}

pub fn spawn_sync(
    store: &MemoryRoomStore,
    member: RoomMember,
    player: SimulatedPlayer,
) -> SyncHandle {
    PlaybackSyncEngine::spawn(
        member,
        Arc::new(store.clone()),
        player,
        SyncConfig::default(),
    )
    .expect("Failed to start sync engine")
}

pub fn spawn_signaling(
    store: &MemoryRoomStore,
    channel: &MemoryBroadcast,
    transport: &MockTransport,
    member: RoomMember,
    capture: Option<MockCapture>,
) -> ShareHandle {
    let transport: Arc<dyn MediaTransport> = Arc::new(transport.clone());
    let (coordinator, handle) = SignalingCoordinator::new(
        member,
        Arc::new(store.clone()),
        Arc::new(channel.clone()),
        transport,
        SignalingConfig::default(),
    )
    .expect("Failed to start signaling");

    let coordinator = match capture {
        Some(capture) => coordinator.with_capture(Arc::new(capture)),
        None => coordinator,
    };
    tokio::spawn(coordinator.run());
    handle
}
