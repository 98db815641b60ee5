use tandem_core::{MediaReferenceError, ParticipantId, RoomId};
use thiserror::Error;

/// Failures surfaced by the session layer.
///
/// None of these are fatal: the engines log them and fall back to teardown or
/// to the next reconciliation tick.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("room {0} not found")]
    RoomNotFound(RoomId),

    #[error("room store error: {0}")]
    Store(String),

    #[error("broadcast delivery failed: {0}")]
    Delivery(String),

    #[error("negotiation with {peer} failed: {reason}")]
    Negotiation { peer: ParticipantId, reason: String },

    #[error("transport error: {0}")]
    Transport(#[from] webrtc::Error),

    #[error("capture source unavailable: {0}")]
    Capture(String),

    #[error(transparent)]
    InvalidMedia(#[from] MediaReferenceError),

    #[error("only the host can {0}")]
    NotHost(&'static str),

    #[error("engine has stopped")]
    EngineStopped,

    #[error("malformed payload: {0}")]
    Json(#[from] serde_json::Error),
}

impl SessionError {
    pub fn negotiation(peer: &ParticipantId, reason: impl ToString) -> Self {
        SessionError::Negotiation {
            peer: peer.clone(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SessionError>;
