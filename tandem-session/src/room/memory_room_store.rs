use crate::error::{Result, SessionError};
use crate::room::RoomStore;
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tandem_core::{RoomId, RoomPatch, RoomRecord};
use tokio::sync::broadcast;
use tracing::{debug, info};

const NOTICE_CAPACITY: usize = 64;

struct RoomSlot {
    record: RoomRecord,
    notices: broadcast::Sender<RoomRecord>,
}

struct MemoryStoreInner {
    rooms: DashMap<RoomId, RoomSlot>,
    muted: AtomicBool,
}

/// In-process [`RoomStore`]. Clones share the same rooms.
#[derive(Clone)]
pub struct MemoryRoomStore {
    inner: Arc<MemoryStoreInner>,
}

impl MemoryRoomStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MemoryStoreInner {
                rooms: DashMap::new(),
                muted: AtomicBool::new(false),
            }),
        }
    }

    /// Create a room holding `record`, replacing any previous one.
    pub fn create_room(&self, room_id: RoomId, record: RoomRecord) {
        info!("Creating room record: {}", room_id);
        let (notices, _) = broadcast::channel(NOTICE_CAPACITY);
        self.inner
            .rooms
            .insert(room_id, RoomSlot { record, notices });
    }

    /// Create an empty room unless it already exists. Returns true if created.
    pub fn ensure_room(&self, room_id: &RoomId) -> bool {
        if self.inner.rooms.contains_key(room_id) {
            return false;
        }
        self.create_room(room_id.clone(), RoomRecord::default());
        true
    }

    pub fn contains(&self, room_id: &RoomId) -> bool {
        self.inner.rooms.contains_key(room_id)
    }

    /// Drop change notifications while muted; writes still land.
    pub fn set_notifications_muted(&self, muted: bool) {
        self.inner.muted.store(muted, Ordering::SeqCst);
    }
}

impl Default for MemoryRoomStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RoomStore for MemoryRoomStore {
    async fn fetch(&self, room_id: &RoomId) -> Result<RoomRecord> {
        self.inner
            .rooms
            .get(room_id)
            .map(|slot| slot.record.clone())
            .ok_or_else(|| SessionError::RoomNotFound(room_id.clone()))
    }

    async fn update(&self, room_id: &RoomId, patch: RoomPatch) -> Result<RoomRecord> {
        let mut slot = self
            .inner
            .rooms
            .get_mut(room_id)
            .ok_or_else(|| SessionError::RoomNotFound(room_id.clone()))?;

        slot.record.apply(&patch);
        let record = slot.record.clone();

        if self.inner.muted.load(Ordering::SeqCst) {
            debug!("Change notice for {} dropped (muted)", room_id);
        } else {
            // No subscribers is fine: notices are best-effort.
            let _ = slot.notices.send(record.clone());
        }

        Ok(record)
    }

    fn subscribe(&self, room_id: &RoomId) -> Result<broadcast::Receiver<RoomRecord>> {
        self.inner
            .rooms
            .get(room_id)
            .map(|slot| slot.notices.subscribe())
            .ok_or_else(|| SessionError::RoomNotFound(room_id.clone()))
    }
}
