use std::fmt;
use tandem_core::ParticipantId;

/// Identifies one link instance. A replaced link gets a new id, so events
/// still in flight from its predecessor can be told apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LinkId(pub u64);

impl fmt::Display for LinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "link#{}", self.0)
    }
}

/// Connectivity as reported by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    New,
    Connecting,
    Connected,
    Disconnected,
    Failed,
    Closed,
}

/// Events a transport pushes back into the owning coordinator's loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    StateChanged {
        peer_id: ParticipantId,
        link_id: LinkId,
        state: TransportState,
    },

    /// A local candidate that must be sent to the counterpart.
    CandidateGenerated {
        peer_id: ParticipantId,
        link_id: LinkId,
        candidate: String,
    },

    /// Remote media started arriving.
    TrackArrived {
        peer_id: ParticipantId,
        link_id: LinkId,
        track_id: String,
    },
}

impl TransportEvent {
    pub fn peer_id(&self) -> &ParticipantId {
        match self {
            TransportEvent::StateChanged { peer_id, .. }
            | TransportEvent::CandidateGenerated { peer_id, .. }
            | TransportEvent::TrackArrived { peer_id, .. } => peer_id,
        }
    }

    pub fn link_id(&self) -> LinkId {
        match self {
            TransportEvent::StateChanged { link_id, .. }
            | TransportEvent::CandidateGenerated { link_id, .. }
            | TransportEvent::TrackArrived { link_id, .. } => *link_id,
        }
    }
}
