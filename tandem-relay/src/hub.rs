use crate::error::{RelayError, Result};
use crate::frame::{ClientFrame, ServerFrame};
use dashmap::DashMap;
use std::sync::Arc;
use tandem_core::{ParticipantId, RoomId, RoomRecord, SignalMessage};
use tandem_session::{BroadcastChannel, MemoryBroadcast, MemoryRoomStore, RoomStore};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

struct HubInner {
    store: MemoryRoomStore,
    channel: MemoryBroadcast,
    hosts: DashMap<RoomId, ParticipantId>,
}

/// Room records and signaling fan-out for every connected participant.
#[derive(Clone)]
pub struct RelayHub {
    inner: Arc<HubInner>,
}

/// A participant's live attachment to a room.
pub struct Membership {
    pub is_host: bool,
    pub record: RoomRecord,
    pub signals: mpsc::UnboundedReceiver<SignalMessage>,
    pub notices: broadcast::Receiver<RoomRecord>,
}

impl RelayHub {
    pub fn new() -> Self {
        Self::with_store(MemoryRoomStore::new())
    }

    pub fn with_store(store: MemoryRoomStore) -> Self {
        Self {
            inner: Arc::new(HubInner {
                store,
                channel: MemoryBroadcast::new(),
                hosts: DashMap::new(),
            }),
        }
    }

    /// Attach `participant` to `room_id`. The first to arrive in a room
    /// without a host becomes its host.
    pub async fn join(&self, room_id: &RoomId, participant: &ParticipantId) -> Result<Membership> {
        if self.inner.store.ensure_room(room_id) {
            info!("Opened room {}", room_id);
        }

        let is_host = *self
            .inner
            .hosts
            .entry(room_id.clone())
            .or_insert_with(|| participant.clone())
            == *participant;

        let notices = self.inner.store.subscribe(room_id)?;
        let signals = self.inner.channel.subscribe(room_id, participant);
        let record = self.inner.store.fetch(room_id).await?;

        info!(
            "{} joined room {} as {}",
            participant,
            room_id,
            if is_host { "host" } else { "viewer" }
        );

        Ok(Membership {
            is_host,
            record,
            signals,
            notices,
        })
    }

    pub fn host_of(&self, room_id: &RoomId) -> Option<ParticipantId> {
        self.inner.hosts.get(room_id).map(|h| h.clone())
    }

    /// Apply one client frame. Returns the direct reply, if the frame has one.
    pub async fn handle_frame(
        &self,
        room_id: &RoomId,
        participant: &ParticipantId,
        frame: ClientFrame,
    ) -> Result<Option<ServerFrame>> {
        match frame {
            ClientFrame::Publish(message) => {
                if message.sender() != participant {
                    return Err(RelayError::SenderMismatch {
                        participant: participant.clone(),
                        claimed: message.sender().clone(),
                    });
                }
                if !message.is_well_formed() {
                    return Err(RelayError::Malformed(message.kind()));
                }

                debug!("{} published {} in room {}", participant, message.kind(), room_id);
                self.inner.channel.publish(room_id, message).await?;
                Ok(None)
            }

            ClientFrame::FetchRecord => {
                let record = self.inner.store.fetch(room_id).await?;
                Ok(Some(ServerFrame::Record(record)))
            }

            ClientFrame::UpdateRecord(patch) => {
                if self.host_of(room_id).as_ref() != Some(participant) {
                    return Err(RelayError::NotHost(participant.clone()));
                }
                self.inner.store.update(room_id, patch).await?;
                Ok(None)
            }
        }
    }

    pub fn leave(&self, room_id: &RoomId, participant: &ParticipantId) {
        self.inner.channel.unsubscribe(room_id, participant);

        if self.inner.channel.subscriber_count(room_id) == 0 {
            if self.inner.hosts.remove(room_id).is_some() {
                info!("Room {} is empty; host seat released", room_id);
            }
        } else if self.host_of(room_id).as_ref() == Some(participant) {
            warn!("Host {} left room {}", participant, room_id);
        }
    }
}

impl Default for RelayHub {
    fn default() -> Self {
        Self::new()
    }
}
