use serde::{Deserialize, Serialize};
use tandem_core::{ParticipantId, RoomPatch, RoomRecord, SignalMessage};

/// What a participant sends over its socket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", content = "d", rename_all = "snake_case")]
pub enum ClientFrame {
    Publish(SignalMessage),
    FetchRecord,
    UpdateRecord(RoomPatch),
}

/// What the relay sends back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", content = "d", rename_all = "snake_case")]
pub enum ServerFrame {
    Welcome {
        participant_id: ParticipantId,
        is_host: bool,
        record: RoomRecord,
    },
    Signal(SignalMessage),
    /// Reply to `FetchRecord`.
    Record(RoomRecord),
    RecordChanged(RoomRecord),
    Error {
        message: String,
    },
}
