pub use tandem_core::{ParticipantId, RoomId};

pub mod model {
    pub use tandem_core::model::*;
}

pub mod session {
    pub use tandem_session::*;
}

#[cfg(feature = "relay")]
pub mod relay {
    pub use tandem_relay::*;
}
