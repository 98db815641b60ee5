use crate::error::Result;
use crate::transport::{CaptureStream, LinkId, TransportEvent};
use async_trait::async_trait;
use tandem_core::{ParticipantId, SessionDescription};
use tokio::sync::mpsc;

/// Creates point-to-point media links.
#[async_trait]
pub trait MediaTransport: Send + Sync {
    /// Open a link to `peer_id`. State changes, local candidates and remote
    /// tracks are reported on `events`, tagged with `link_id`.
    async fn create_link(
        &self,
        peer_id: &ParticipantId,
        link_id: LinkId,
        events: mpsc::Sender<TransportEvent>,
    ) -> Result<Box<dyn TransportLink>>;
}

/// One direct media connection.
#[async_trait]
pub trait TransportLink: Send + Sync {
    async fn attach_local_stream(&self, stream: &CaptureStream) -> Result<()>;

    async fn create_offer(&self) -> Result<SessionDescription>;

    async fn create_answer(&self) -> Result<SessionDescription>;

    async fn set_local_description(&self, description: SessionDescription) -> Result<()>;

    async fn set_remote_description(&self, description: SessionDescription) -> Result<()>;

    async fn add_remote_candidate(&self, candidate: String) -> Result<()>;

    /// True when no offer/answer exchange is in progress.
    fn is_stable(&self) -> bool;

    async fn close(&self) -> Result<()>;
}
