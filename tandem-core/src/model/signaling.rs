use crate::model::participant::ParticipantId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IceServerConfig {
    pub urls: Vec<String>,
    pub username: Option<String>,
    pub credential: Option<String>,
}

/// Screen-share control messages carried over the room's broadcast channel.
///
/// Everything except `RequestStream` is addressed to one participant and must
/// be ignored by the rest of the room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", content = "d", rename_all = "snake_case")]
pub enum SignalMessage {
    RequestStream {
        sender_id: ParticipantId,
    },
    Offer {
        sender_id: ParticipantId,
        target_id: ParticipantId,
        sdp: String,
    },
    Answer {
        sender_id: ParticipantId,
        target_id: ParticipantId,
        sdp: String,
    },
    Candidate {
        sender_id: ParticipantId,
        target_id: ParticipantId,
        candidate: String,
    },
}

impl SignalMessage {
    pub fn sender(&self) -> &ParticipantId {
        match self {
            SignalMessage::RequestStream { sender_id }
            | SignalMessage::Offer { sender_id, .. }
            | SignalMessage::Answer { sender_id, .. }
            | SignalMessage::Candidate { sender_id, .. } => sender_id,
        }
    }

    pub fn target(&self) -> Option<&ParticipantId> {
        match self {
            SignalMessage::RequestStream { .. } => None,
            SignalMessage::Offer { target_id, .. }
            | SignalMessage::Answer { target_id, .. }
            | SignalMessage::Candidate { target_id, .. } => Some(target_id),
        }
    }

    /// True when `me` should act on this message: it was sent by someone
    /// else and is either unaddressed or addressed to `me`.
    pub fn is_for(&self, me: &ParticipantId) -> bool {
        self.sender() != me && self.target().is_none_or(|target| target == me)
    }

    /// Rejects payloads that deserialized but carry nothing usable.
    pub fn is_well_formed(&self) -> bool {
        if self.sender().as_str().is_empty() {
            return false;
        }
        match self {
            SignalMessage::RequestStream { .. } => true,
            SignalMessage::Offer { target_id, sdp, .. }
            | SignalMessage::Answer { target_id, sdp, .. } => {
                !target_id.as_str().is_empty() && !sdp.is_empty()
            }
            SignalMessage::Candidate {
                target_id,
                candidate,
                ..
            } => !target_id.as_str().is_empty() && !candidate.is_empty(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            SignalMessage::RequestStream { .. } => "request_stream",
            SignalMessage::Offer { .. } => "offer",
            SignalMessage::Answer { .. } => "answer",
            SignalMessage::Candidate { .. } => "candidate",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SdpKind {
    Offer,
    Answer,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDescription {
    pub kind: SdpKind,
    pub sdp: String,
}

impl SessionDescription {
    pub fn offer(sdp: impl Into<String>) -> Self {
        Self {
            kind: SdpKind::Offer,
            sdp: sdp.into(),
        }
    }

    pub fn answer(sdp: impl Into<String>) -> Self {
        Self {
            kind: SdpKind::Answer,
            sdp: sdp.into(),
        }
    }
}
