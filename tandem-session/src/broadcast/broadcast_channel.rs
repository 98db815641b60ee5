use crate::error::Result;
use async_trait::async_trait;
use tandem_core::{ParticipantId, RoomId, SignalMessage};
use tokio::sync::mpsc;

/// Room-scoped fan-out of signaling messages.
///
/// Delivery is at-most-once and best-effort. Messages from one sender arrive
/// in send order; nothing is promised across senders. A subscriber never
/// receives its own messages.
#[async_trait]
pub trait BroadcastChannel: Send + Sync {
    fn subscribe(
        &self,
        room_id: &RoomId,
        participant: &ParticipantId,
    ) -> mpsc::UnboundedReceiver<SignalMessage>;

    async fn publish(&self, room_id: &RoomId, message: SignalMessage) -> Result<()>;

    fn unsubscribe(&self, room_id: &RoomId, participant: &ParticipantId);
}
