use crate::transport::{LinkId, TransportLink};
use tandem_core::ParticipantId;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkRole {
    /// The host side; makes the offer.
    Initiator,
    /// The viewer side; answers.
    Responder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    New,
    Negotiating,
    Connecting,
    Connected,
    Failed,
    Closed,
}

impl LinkState {
    pub fn is_terminal(self) -> bool {
        matches!(self, LinkState::Failed | LinkState::Closed)
    }

    /// Connecting or Connected: a new request for this peer is redundant.
    pub fn is_active(self) -> bool {
        matches!(self, LinkState::Connecting | LinkState::Connected)
    }
}

/// Inputs to the link state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkEvent {
    NegotiationStarted,
    LocalDescriptionSet,
    RemoteDescriptionSet,
    TransportConnected,
    TransportFailed,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: LinkState,
    pub to: LinkState,
    /// Change to the host's viewer count caused by this step: +1, -1 or 0.
    pub viewer_delta: i32,
}

/// Pure negotiation/connection state of one link.
///
/// An initiator link is counted as a viewer the first time it connects and
/// uncounted the first time it leaves that state for Failed or Closed. Both
/// terminal states absorb every later event except Failed -> Closed.
#[derive(Debug, Clone)]
pub struct LinkMachine {
    role: LinkRole,
    state: LinkState,
    local_set: bool,
    remote_set: bool,
    counted_as_viewer: bool,
}

impl LinkMachine {
    pub fn new(role: LinkRole) -> Self {
        Self {
            role,
            state: LinkState::New,
            local_set: false,
            remote_set: false,
            counted_as_viewer: false,
        }
    }

    pub fn role(&self) -> LinkRole {
        self.role
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn counted_as_viewer(&self) -> bool {
        self.counted_as_viewer
    }

    /// Feed one event. Returns the transition it caused, if any.
    pub fn apply(&mut self, event: LinkEvent) -> Option<Transition> {
        let from = self.state;
        if from == LinkState::Closed {
            return None;
        }
        if from == LinkState::Failed && event != LinkEvent::Closed {
            return None;
        }

        let mut viewer_delta = 0;
        let to = match event {
            LinkEvent::NegotiationStarted => match from {
                LinkState::New => LinkState::Negotiating,
                _ => return None,
            },

            LinkEvent::LocalDescriptionSet | LinkEvent::RemoteDescriptionSet => {
                if event == LinkEvent::LocalDescriptionSet {
                    self.local_set = true;
                } else {
                    self.remote_set = true;
                }

                match from {
                    LinkState::New | LinkState::Negotiating
                        if self.local_set && self.remote_set =>
                    {
                        LinkState::Connecting
                    }
                    LinkState::New => LinkState::Negotiating,
                    _ => return None,
                }
            }

            LinkEvent::TransportConnected => {
                if from == LinkState::Connected {
                    return None;
                }
                if self.role == LinkRole::Initiator && !self.counted_as_viewer {
                    self.counted_as_viewer = true;
                    viewer_delta = 1;
                }
                LinkState::Connected
            }

            LinkEvent::TransportFailed | LinkEvent::Closed => {
                if !from.is_terminal() && self.counted_as_viewer {
                    viewer_delta = -1;
                }
                if event == LinkEvent::Closed {
                    LinkState::Closed
                } else {
                    LinkState::Failed
                }
            }
        };

        self.state = to;
        Some(Transition {
            from,
            to,
            viewer_delta,
        })
    }
}

/// A link to one remote participant: the state machine plus the transport
/// it drives.
pub struct PeerLink {
    peer_id: ParticipantId,
    link_id: LinkId,
    machine: LinkMachine,
    transport: Box<dyn TransportLink>,
}

impl PeerLink {
    pub fn new(
        peer_id: ParticipantId,
        link_id: LinkId,
        role: LinkRole,
        transport: Box<dyn TransportLink>,
    ) -> Self {
        Self {
            peer_id,
            link_id,
            machine: LinkMachine::new(role),
            transport,
        }
    }

    pub fn peer_id(&self) -> &ParticipantId {
        &self.peer_id
    }

    pub fn link_id(&self) -> LinkId {
        self.link_id
    }

    pub fn role(&self) -> LinkRole {
        self.machine.role()
    }

    pub fn state(&self) -> LinkState {
        self.machine.state()
    }

    pub fn counted_as_viewer(&self) -> bool {
        self.machine.counted_as_viewer()
    }

    pub fn transport(&self) -> &dyn TransportLink {
        self.transport.as_ref()
    }

    pub fn apply(&mut self, event: LinkEvent) -> Option<Transition> {
        let transition = self.machine.apply(event);
        if let Some(t) = transition {
            debug!(
                "{} to {}: {:?} -> {:?} on {:?}",
                self.link_id, self.peer_id, t.from, t.to, event
            );
        }
        transition
    }
}
