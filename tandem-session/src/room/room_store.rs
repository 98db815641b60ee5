use crate::error::Result;
use async_trait::async_trait;
use tandem_core::{RoomId, RoomPatch, RoomRecord};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tracing::warn;

/// Access to the persisted room record.
///
/// Writes are last-write-wins with no merge. Change notifications carry the
/// full new record and may be dropped, so callers must not rely on them alone.
#[async_trait]
pub trait RoomStore: Send + Sync {
    /// Read the current record.
    async fn fetch(&self, room_id: &RoomId) -> Result<RoomRecord>;

    /// Update the fields set in `patch` and return the resulting record.
    async fn update(&self, room_id: &RoomId, patch: RoomPatch) -> Result<RoomRecord>;

    /// Subscribe to change notifications for one room.
    fn subscribe(&self, room_id: &RoomId) -> Result<broadcast::Receiver<RoomRecord>>;
}

/// Next change notice, skipping over lag. Once the store drops the channel
/// the slot is cleared and this never resolves again, leaving periodic
/// fetches as the only source of truth.
pub(crate) async fn next_notice(notices: &mut Option<broadcast::Receiver<RoomRecord>>) -> RoomRecord {
    loop {
        let Some(rx) = notices else {
            return std::future::pending().await;
        };

        match rx.recv().await {
            Ok(record) => return record,
            Err(RecvError::Lagged(missed)) => {
                warn!("Missed {} change notices", missed);
            }
            Err(RecvError::Closed) => {
                warn!("Change notices closed");
                *notices = None;
            }
        }
    }
}
