use tandem_core::{ParticipantId, Role, RoomId};

/// Who a participant engine acts for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomMember {
    pub room_id: RoomId,
    pub participant_id: ParticipantId,
    pub role: Role,
}

impl RoomMember {
    pub fn host(room_id: impl Into<RoomId>, participant_id: impl Into<ParticipantId>) -> Self {
        Self {
            room_id: room_id.into(),
            participant_id: participant_id.into(),
            role: Role::Host,
        }
    }

    pub fn viewer(room_id: impl Into<RoomId>, participant_id: impl Into<ParticipantId>) -> Self {
        Self {
            room_id: room_id.into(),
            participant_id: participant_id.into(),
            role: Role::Viewer,
        }
    }

    pub fn is_host(&self) -> bool {
        self.role.is_host()
    }
}
