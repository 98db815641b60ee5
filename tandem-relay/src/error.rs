use tandem_core::ParticipantId;
use tandem_session::SessionError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("{0} is not the host of this room")]
    NotHost(ParticipantId),

    #[error("{participant} cannot publish as {claimed}")]
    SenderMismatch {
        participant: ParticipantId,
        claimed: ParticipantId,
    },

    #[error("malformed {0} message")]
    Malformed(&'static str),

    #[error("invalid frame: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, RelayError>;
