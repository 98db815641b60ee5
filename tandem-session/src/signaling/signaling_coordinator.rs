use crate::broadcast::BroadcastChannel;
use crate::config::SignalingConfig;
use crate::error::{Result, SessionError};
use crate::room::{RoomMember, RoomStore, next_notice};
use crate::signaling::{
    LinkEvent, LinkRole, LinkState, PeerConnectionRegistry, PeerLink, ShareCommand, ShareNotice,
    ShareStatus, Transition,
};
use crate::transport::{
    CaptureSource, CaptureStream, LinkId, MediaTransport, TransportEvent, TransportState,
};
use chrono::{DateTime, Utc};
use std::future;
use std::sync::Arc;
use tandem_core::{ParticipantId, RoomPatch, RoomRecord, SessionDescription, SignalMessage};
use tokio::sync::{broadcast, mpsc, watch};
use tokio::time::{Instant, Interval, MissedTickBehavior, interval_at};
use tracing::{debug, error, info, warn};

/// Cheap clonable control surface of a running coordinator.
#[derive(Debug, Clone)]
pub struct ShareHandle {
    commands: mpsc::Sender<ShareCommand>,
    status: watch::Receiver<ShareStatus>,
}

impl ShareHandle {
    pub async fn start_sharing(&self) -> Result<()> {
        self.send(ShareCommand::Start).await
    }

    pub async fn stop_sharing(&self) -> Result<()> {
        self.send(ShareCommand::Stop).await
    }

    pub async fn leave(&self) -> Result<()> {
        self.send(ShareCommand::Leave).await
    }

    pub fn status(&self) -> ShareStatus {
        self.status.borrow().clone()
    }

    pub fn watch_status(&self) -> watch::Receiver<ShareStatus> {
        self.status.clone()
    }

    async fn send(&self, command: ShareCommand) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| SessionError::EngineStopped)
    }
}

/// Runs the screen-share protocol for one participant.
///
/// The host answers `RequestStream` with an offer over a fresh initiator
/// link, viewers answer offers, and both sides trade candidates. Sharing
/// ending, a lost capture or leaving tears every link down.
pub struct SignalingCoordinator {
    member: RoomMember,
    config: SignalingConfig,
    store: Arc<dyn RoomStore>,
    channel: Arc<dyn BroadcastChannel>,
    transport: Arc<dyn MediaTransport>,
    capture: Option<Arc<dyn CaptureSource>>,
    registry: PeerConnectionRegistry,
    commands: mpsc::Receiver<ShareCommand>,
    signals: mpsc::UnboundedReceiver<SignalMessage>,
    notices: Option<broadcast::Receiver<RoomRecord>>,
    transport_tx: mpsc::Sender<TransportEvent>,
    transport_rx: mpsc::Receiver<TransportEvent>,
    share_clock: Interval,
    local_stream: Option<CaptureStream>,
    share_started_at: Option<DateTime<Utc>>,
    sharing_active: bool,
    viewer_count: u32,
    next_link: u64,
    status: watch::Sender<ShareStatus>,
}

impl SignalingCoordinator {
    pub fn new(
        member: RoomMember,
        store: Arc<dyn RoomStore>,
        channel: Arc<dyn BroadcastChannel>,
        transport: Arc<dyn MediaTransport>,
        config: SignalingConfig,
    ) -> Result<(Self, ShareHandle)> {
        let notices = store.subscribe(&member.room_id)?;
        let signals = channel.subscribe(&member.room_id, &member.participant_id);
        let (command_tx, command_rx) = mpsc::channel(32);
        let (transport_tx, transport_rx) = mpsc::channel(config.transport_event_buffer);
        let (status_tx, status_rx) = watch::channel(ShareStatus::default());

        let mut share_clock = interval_at(
            Instant::now() + config.share_clock_interval,
            config.share_clock_interval,
        );
        share_clock.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let coordinator = Self {
            member,
            config,
            store,
            channel,
            transport,
            capture: None,
            registry: PeerConnectionRegistry::new(),
            commands: command_rx,
            signals,
            notices: Some(notices),
            transport_tx,
            transport_rx,
            share_clock,
            local_stream: None,
            share_started_at: None,
            sharing_active: false,
            viewer_count: 0,
            next_link: 0,
            status: status_tx,
        };

        let handle = ShareHandle {
            commands: command_tx,
            status: status_rx,
        };

        Ok((coordinator, handle))
    }

    /// The host's capture source. Without one, starting to share fails.
    pub fn with_capture(mut self, capture: Arc<dyn CaptureSource>) -> Self {
        self.capture = Some(capture);
        self
    }

    pub async fn run(mut self) {
        info!(
            "Signaling started for {} {} in room {}",
            self.member.role, self.member.participant_id, self.member.room_id
        );

        self.join().await;

        loop {
            let clock_on = self.member.is_host() && self.local_stream.is_some();
            let capture = self.local_stream.clone();

            tokio::select! {
                cmd = self.commands.recv() => {
                    match cmd {
                        Some(ShareCommand::Leave) | None => break,
                        Some(c) => self.handle_command(c).await,
                    }
                }

                msg = self.signals.recv() => {
                    match msg {
                        Some(m) => self.handle_signal(m).await,
                        None => {
                            warn!("Broadcast subscription for {} closed", self.member.participant_id);
                            break;
                        }
                    }
                }

                record = next_notice(&mut self.notices) => {
                    self.handle_record(record).await;
                }

                Some(evt) = self.transport_rx.recv() => {
                    self.handle_transport_event(evt).await;
                }

                _ = self.share_clock.tick(), if clock_on => {
                    self.report_share_clock().await;
                }

                _ = capture_ended(capture) => {
                    warn!("Capture ended for {}; stopping share", self.member.participant_id);
                    self.stop_sharing().await;
                }
            }
        }

        self.leave().await;
        info!(
            "Signaling for {} left room {}",
            self.member.participant_id, self.member.room_id
        );
    }

    async fn join(&mut self) {
        let record = match self.store.fetch(&self.member.room_id).await {
            Ok(record) => record,
            Err(e) => {
                warn!("Initial fetch for room {} failed: {}", self.member.room_id, e);
                return;
            }
        };

        if !record.is_sharing_screen {
            return;
        }

        if self.member.is_host() {
            // Nobody is capturing any more; clear the stale flag.
            info!("Clearing stale share in room {}", self.member.room_id);
            self.write(RoomPatch::new().stop_sharing()).await;
            return;
        }

        self.sharing_active = true;
        self.set_status(|s| {
            s.sharing = true;
            s.elapsed_seconds = record.share_elapsed(Utc::now()).unwrap_or(0);
        });
        self.request_stream().await;
    }

    async fn leave(&mut self) {
        if self.local_stream.is_some() {
            self.stop_sharing().await;
        } else {
            self.close_all_links().await;
        }
        self.channel
            .unsubscribe(&self.member.room_id, &self.member.participant_id);
    }

    async fn handle_command(&mut self, cmd: ShareCommand) {
        match cmd {
            ShareCommand::Start => self.start_sharing().await,
            ShareCommand::Stop => {
                if !self.member.is_host() {
                    warn!("{}", SessionError::NotHost("stop sharing"));
                    return;
                }
                self.stop_sharing().await;
            }
            ShareCommand::Leave => {}
        }
    }

    async fn start_sharing(&mut self) {
        if !self.member.is_host() {
            warn!("{}", SessionError::NotHost("share the screen"));
            return;
        }
        if self.local_stream.is_some() {
            debug!("Already sharing in room {}", self.member.room_id);
            return;
        }

        let acquired = match &self.capture {
            Some(source) => source.acquire().await,
            None => Err(SessionError::Capture("no capture source configured".into())),
        };
        let stream = match acquired {
            Ok(stream) => stream,
            Err(e) => {
                error!("Cannot start sharing: {}", e);
                self.set_status(|s| s.notice = Some(ShareNotice::CaptureUnavailable));
                return;
            }
        };

        let now = Utc::now();
        info!("Host started sharing {} in room {}", stream.id(), self.member.room_id);
        self.local_stream = Some(stream);
        self.share_started_at = Some(now);
        self.sharing_active = true;
        self.share_clock
            .reset_at(Instant::now() + self.config.share_clock_interval);
        self.set_status(|s| {
            s.sharing = true;
            s.elapsed_seconds = 0;
            s.notice = None;
        });

        self.write(RoomPatch::new().start_sharing(now)).await;
    }

    async fn stop_sharing(&mut self) {
        let Some(stream) = self.local_stream.take() else {
            return;
        };

        info!("Host stopped sharing in room {}", self.member.room_id);
        stream.stop();
        self.share_started_at = None;
        self.sharing_active = false;
        self.close_all_links().await;
        self.set_status(|s| {
            s.sharing = false;
            s.elapsed_seconds = 0;
        });

        self.write(RoomPatch::new().stop_sharing()).await;
    }

    async fn handle_record(&mut self, record: RoomRecord) {
        // The host is the only writer of the share flag; its own echoes can
        // lag behind its commands, so the capture alone decides.
        if self.member.is_host() {
            return;
        }

        let was_sharing = self.sharing_active;
        self.sharing_active = record.is_sharing_screen;

        if record.is_sharing_screen {
            let elapsed = record.share_elapsed(Utc::now()).unwrap_or(0);
            self.set_status(|s| {
                s.sharing = true;
                s.elapsed_seconds = elapsed;
            });
        }

        match (was_sharing, record.is_sharing_screen) {
            (false, true) => self.request_stream().await,
            (true, false) => {
                debug!("Sharing ended in room {}", self.member.room_id);
                self.close_all_links().await;
                self.set_status(|s| {
                    s.sharing = false;
                    s.connecting = false;
                    s.receiving = false;
                    s.elapsed_seconds = 0;
                });
            }
            _ => {}
        }
    }

    async fn request_stream(&mut self) {
        info!("{} requesting the shared screen", self.member.participant_id);
        self.set_status(|s| {
            s.connecting = true;
            s.notice = None;
        });
        self.publish(SignalMessage::RequestStream {
            sender_id: self.member.participant_id.clone(),
        })
        .await;
    }

    async fn handle_signal(&mut self, msg: SignalMessage) {
        if !msg.is_well_formed() {
            warn!("Dropping malformed {} from {}", msg.kind(), msg.sender());
            return;
        }
        if !msg.is_for(&self.member.participant_id) {
            return;
        }

        let is_host = self.member.is_host();
        match msg {
            SignalMessage::RequestStream { sender_id } if is_host => {
                self.handle_stream_request(sender_id).await;
            }
            SignalMessage::Offer { sender_id, sdp, .. } if !is_host => {
                self.handle_offer(sender_id, sdp).await;
            }
            SignalMessage::Answer { sender_id, sdp, .. } if is_host => {
                self.handle_answer(sender_id, sdp).await;
            }
            SignalMessage::Candidate {
                sender_id,
                candidate,
                ..
            } => {
                self.handle_candidate(sender_id, candidate).await;
            }
            other => {
                debug!(
                    "{} ignoring {} from {}",
                    self.member.role,
                    other.kind(),
                    other.sender()
                );
            }
        }
    }

    async fn handle_stream_request(&mut self, viewer: ParticipantId) {
        let Some(stream) = self.local_stream.clone() else {
            debug!("No active capture; ignoring request from {}", viewer);
            return;
        };

        if let Some(link) = self.registry.get(&viewer) {
            if link.state().is_active() {
                debug!("{} already has an active link; ignoring request", viewer);
                return;
            }
            if link.state().is_terminal() {
                self.drop_link(&viewer).await;
            }
        }

        if self.registry.get(&viewer).is_none() {
            if let Err(e) = self.open_link(&viewer, LinkRole::Initiator, Some(&stream)).await {
                error!("Cannot open link to {}: {}", viewer, e);
                return;
            }
        }

        let Some(link) = self.registry.get(&viewer) else {
            return;
        };
        if !link.transport().is_stable() {
            debug!("Negotiation with {} already in flight", viewer);
            return;
        }

        if let Err(e) = self.send_offer(&viewer).await {
            error!("{}", e);
            self.drop_link(&viewer).await;
            self.set_status(|s| s.notice = Some(ShareNotice::NegotiationFailed));
        }
    }

    async fn send_offer(&mut self, viewer: &ParticipantId) -> Result<()> {
        let Some(link) = self.registry.get_mut(viewer) else {
            return Ok(());
        };

        let offer = link
            .transport()
            .create_offer()
            .await
            .map_err(|e| SessionError::negotiation(viewer, e))?;
        link.transport()
            .set_local_description(offer.clone())
            .await
            .map_err(|e| SessionError::negotiation(viewer, e))?;
        link.apply(LinkEvent::LocalDescriptionSet);

        debug!("Sending offer to {}", viewer);
        self.publish(SignalMessage::Offer {
            sender_id: self.member.participant_id.clone(),
            target_id: viewer.clone(),
            sdp: offer.sdp,
        })
        .await;
        Ok(())
    }

    async fn handle_offer(&mut self, host: ParticipantId, sdp: String) {
        if !self.sharing_active {
            debug!("Ignoring offer from {}: sharing is not active", host);
            return;
        }

        if let Some(link) = self.registry.get(&host) {
            if link.state() == LinkState::Connected {
                debug!("Already connected to {}; ignoring offer", host);
                return;
            }
            self.drop_link(&host).await;
        }

        if let Err(e) = self.answer_offer(&host, sdp).await {
            error!("{}", e);
            self.drop_link(&host).await;
            self.set_status(|s| {
                s.connecting = false;
                s.notice = Some(ShareNotice::NegotiationFailed);
            });
        }
    }

    async fn answer_offer(&mut self, host: &ParticipantId, sdp: String) -> Result<()> {
        self.open_link(host, LinkRole::Responder, None).await?;
        let Some(link) = self.registry.get_mut(host) else {
            return Ok(());
        };

        link.transport()
            .set_remote_description(SessionDescription::offer(sdp))
            .await
            .map_err(|e| SessionError::negotiation(host, e))?;
        link.apply(LinkEvent::RemoteDescriptionSet);

        let answer = link
            .transport()
            .create_answer()
            .await
            .map_err(|e| SessionError::negotiation(host, e))?;
        link.transport()
            .set_local_description(answer.clone())
            .await
            .map_err(|e| SessionError::negotiation(host, e))?;
        link.apply(LinkEvent::LocalDescriptionSet);

        debug!("Sending answer to {}", host);
        self.publish(SignalMessage::Answer {
            sender_id: self.member.participant_id.clone(),
            target_id: host.clone(),
            sdp: answer.sdp,
        })
        .await;
        Ok(())
    }

    async fn handle_answer(&mut self, viewer: ParticipantId, sdp: String) {
        let Some(link) = self.registry.get_mut(&viewer) else {
            debug!("Answer from {} has no link", viewer);
            return;
        };

        match link
            .transport()
            .set_remote_description(SessionDescription::answer(sdp))
            .await
        {
            Ok(()) => {
                link.apply(LinkEvent::RemoteDescriptionSet);
            }
            Err(e) => {
                error!("{}", SessionError::negotiation(&viewer, e));
                self.drop_link(&viewer).await;
            }
        }
    }

    async fn handle_candidate(&mut self, peer: ParticipantId, candidate: String) {
        let Some(link) = self.registry.get(&peer) else {
            debug!("Dropping candidate from {}: no link", peer);
            return;
        };

        if let Err(e) = link.transport().add_remote_candidate(candidate).await {
            warn!("Failed to add candidate from {}: {}", peer, e);
        }
    }

    async fn handle_transport_event(&mut self, event: TransportEvent) {
        let peer_id = event.peer_id().clone();
        let link_id = event.link_id();
        let Some(link) = self.registry.current_mut(&peer_id, link_id) else {
            debug!("Ignoring event from stale {} to {}", link_id, peer_id);
            return;
        };

        match event {
            TransportEvent::CandidateGenerated { candidate, .. } => {
                self.publish(SignalMessage::Candidate {
                    sender_id: self.member.participant_id.clone(),
                    target_id: peer_id,
                    candidate,
                })
                .await;
            }

            TransportEvent::TrackArrived { track_id, .. } => {
                info!("Receiving track {} from {}", track_id, peer_id);
                self.set_status(|s| {
                    s.connecting = false;
                    s.receiving = true;
                });
            }

            TransportEvent::StateChanged { state, .. } => {
                let link_event = match state {
                    TransportState::Connected => LinkEvent::TransportConnected,
                    TransportState::Failed => LinkEvent::TransportFailed,
                    TransportState::Closed => LinkEvent::Closed,
                    other => {
                        debug!("{} to {} reports {:?}", link_id, peer_id, other);
                        return;
                    }
                };

                let transition = link.apply(link_event);
                self.count_viewers(transition);

                match transition.map(|t| t.to) {
                    Some(LinkState::Connected) => {
                        info!("Connected to {}", peer_id);
                        self.set_status(|s| s.connecting = false);
                    }
                    Some(to @ (LinkState::Failed | LinkState::Closed)) => {
                        warn!("Link to {} went down ({:?})", peer_id, to);
                        self.drop_link(&peer_id).await;
                        if !self.member.is_host() {
                            let failed = to == LinkState::Failed;
                            self.set_status(|s| {
                                s.connecting = false;
                                s.receiving = false;
                                if failed {
                                    s.notice = Some(ShareNotice::ConnectionFailed);
                                }
                            });
                        }
                    }
                    _ => {}
                }
            }
        }
    }

    async fn open_link(
        &mut self,
        peer_id: &ParticipantId,
        role: LinkRole,
        stream: Option<&CaptureStream>,
    ) -> Result<()> {
        self.next_link += 1;
        let link_id = LinkId(self.next_link);

        let transport = self
            .transport
            .create_link(peer_id, link_id, self.transport_tx.clone())
            .await?;

        if let Some(stream) = stream {
            if let Err(e) = transport.attach_local_stream(stream).await {
                let _ = transport.close().await;
                return Err(e);
            }
        }

        let mut link = PeerLink::new(peer_id.clone(), link_id, role, transport);
        link.apply(LinkEvent::NegotiationStarted);
        debug!("Opened {} to {} as {:?}", link_id, peer_id, role);

        if let Some(mut displaced) = self.registry.insert(link) {
            let _ = displaced.transport().close().await;
            let transition = displaced.apply(LinkEvent::Closed);
            self.count_viewers(transition);
        }
        Ok(())
    }

    async fn drop_link(&mut self, peer_id: &ParticipantId) {
        let transition = self.registry.remove_and_close(peer_id).await;
        self.count_viewers(transition);
    }

    async fn close_all_links(&mut self) {
        for transition in self.registry.close_all().await {
            self.count_viewers(Some(transition));
        }
        self.set_status(|s| {
            s.connecting = false;
            s.receiving = false;
        });
    }

    fn count_viewers(&mut self, transition: Option<Transition>) {
        let Some(delta) = transition.map(|t| t.viewer_delta).filter(|d| *d != 0) else {
            return;
        };

        self.viewer_count = self.viewer_count.saturating_add_signed(delta);
        let count = self.viewer_count;
        info!("Room {} viewer count: {}", self.member.room_id, count);
        self.set_status(|s| s.viewer_count = count);
    }

    async fn report_share_clock(&mut self) {
        let Some(started) = self.share_started_at else {
            return;
        };
        let elapsed = (Utc::now() - started).num_seconds().max(0) as u64;
        self.set_status(|s| s.elapsed_seconds = elapsed);
        self.write(RoomPatch::new().share_elapsed(elapsed)).await;
    }

    async fn publish(&self, message: SignalMessage) {
        if let Err(e) = self.channel.publish(&self.member.room_id, message).await {
            warn!("Publish to room {} failed: {}", self.member.room_id, e);
        }
    }

    async fn write(&self, patch: RoomPatch) {
        if let Err(e) = self.store.update(&self.member.room_id, patch).await {
            error!("Failed to update room {}: {}", self.member.room_id, e);
        }
    }

    fn set_status(&self, update: impl FnOnce(&mut ShareStatus)) {
        self.status.send_modify(update);
    }
}

async fn capture_ended(stream: Option<CaptureStream>) {
    match stream {
        Some(stream) => stream.ended().await,
        None => future::pending().await,
    }
}
