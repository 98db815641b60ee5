use crate::broadcast::BroadcastChannel;
use crate::error::{Result, SessionError};
use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;
use tandem_core::{ParticipantId, RoomId, SignalMessage};
use tokio::sync::mpsc;
use tracing::{debug, warn};

type Subscribers = HashMap<ParticipantId, mpsc::UnboundedSender<SignalMessage>>;

/// In-process [`BroadcastChannel`]. Clones share the same rooms.
#[derive(Clone, Default)]
pub struct MemoryBroadcast {
    rooms: Arc<DashMap<RoomId, Subscribers>>,
}

impl MemoryBroadcast {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscriber_count(&self, room_id: &RoomId) -> usize {
        self.rooms.get(room_id).map_or(0, |subs| subs.len())
    }
}

#[async_trait]
impl BroadcastChannel for MemoryBroadcast {
    fn subscribe(
        &self,
        room_id: &RoomId,
        participant: &ParticipantId,
    ) -> mpsc::UnboundedReceiver<SignalMessage> {
        let (tx, rx) = mpsc::unbounded_channel();
        let replaced = self
            .rooms
            .entry(room_id.clone())
            .or_default()
            .insert(participant.clone(), tx);

        if replaced.is_some() {
            debug!("Replaced subscription of {} in room {}", participant, room_id);
        }
        rx
    }

    async fn publish(&self, room_id: &RoomId, message: SignalMessage) -> Result<()> {
        let sender = message.sender().clone();

        // Collect first so no map guard is held while sending.
        let targets: Vec<(ParticipantId, mpsc::UnboundedSender<SignalMessage>)> =
            match self.rooms.get(room_id) {
                Some(subs) => subs
                    .iter()
                    .filter(|(id, _)| **id != sender)
                    .map(|(id, tx)| (id.clone(), tx.clone()))
                    .collect(),
                None => {
                    return Err(SessionError::Delivery(format!(
                        "room {} has no subscribers",
                        room_id
                    )));
                }
            };

        if targets.is_empty() {
            debug!("No one else in room {} to receive {}", room_id, message.kind());
            return Ok(());
        }

        let mut stale = Vec::new();
        for (id, tx) in targets {
            if tx.send(message.clone()).is_err() {
                warn!("Dropping {} for departed subscriber {}", message.kind(), id);
                stale.push(id);
            }
        }

        if !stale.is_empty() {
            if let Some(mut subs) = self.rooms.get_mut(room_id) {
                for id in stale {
                    subs.remove(&id);
                }
            }
        }

        Ok(())
    }

    fn unsubscribe(&self, room_id: &RoomId, participant: &ParticipantId) {
        let now_empty = match self.rooms.get_mut(room_id) {
            Some(mut subs) => {
                subs.remove(participant);
                subs.is_empty()
            }
            None => false,
        };

        if now_empty {
            self.rooms.remove_if(room_id, |_, subs| subs.is_empty());
        }
    }
}
