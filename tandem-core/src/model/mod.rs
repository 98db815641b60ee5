mod media;
mod participant;
mod room;
mod signaling;

pub use media::{MediaReference, MediaReferenceError};
pub use participant::{ParticipantId, Role};
pub use room::{RoomId, RoomPatch, RoomRecord};
pub use signaling::{IceServerConfig, SdpKind, SessionDescription, SignalMessage};
