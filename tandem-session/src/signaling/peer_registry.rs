use crate::signaling::{LinkEvent, PeerLink, Transition};
use crate::transport::LinkId;
use std::collections::HashMap;
use tandem_core::ParticipantId;
use tracing::warn;

/// The links one coordinator owns, at most one per remote participant.
#[derive(Default)]
pub struct PeerConnectionRegistry {
    links: HashMap<ParticipantId, PeerLink>,
}

impl PeerConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, peer_id: &ParticipantId) -> Option<&PeerLink> {
        self.links.get(peer_id)
    }

    pub fn get_mut(&mut self, peer_id: &ParticipantId) -> Option<&mut PeerLink> {
        self.links.get_mut(peer_id)
    }

    /// The link for `peer_id` only if it is still the instance `link_id`
    /// refers to.
    pub fn current_mut(&mut self, peer_id: &ParticipantId, link_id: LinkId) -> Option<&mut PeerLink> {
        self.links
            .get_mut(peer_id)
            .filter(|link| link.link_id() == link_id)
    }

    /// Store `link`, returning whatever it displaced. The caller owns
    /// closing a displaced link.
    pub fn insert(&mut self, link: PeerLink) -> Option<PeerLink> {
        self.links.insert(link.peer_id().clone(), link)
    }

    /// Close the link's transport, then forget it. Returns the final state
    /// transition, which carries any viewer count change.
    pub async fn remove_and_close(&mut self, peer_id: &ParticipantId) -> Option<Transition> {
        let link = self.links.get(peer_id)?;
        if let Err(e) = link.transport().close().await {
            warn!("Closing {} to {} failed: {}", link.link_id(), peer_id, e);
        }

        let mut link = self.links.remove(peer_id)?;
        link.apply(LinkEvent::Closed)
    }

    pub async fn close_all(&mut self) -> Vec<Transition> {
        let peers: Vec<ParticipantId> = self.links.keys().cloned().collect();
        let mut transitions = Vec::with_capacity(peers.len());
        for peer_id in peers {
            if let Some(t) = self.remove_and_close(&peer_id).await {
                transitions.push(t);
            }
        }
        transitions
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}
