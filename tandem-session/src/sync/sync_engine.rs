use crate::config::SyncConfig;
use crate::error::{Result, SessionError};
use crate::player::Player;
use crate::room::{RoomMember, RoomStore, next_notice};
use crate::sync::{Correction, Debouncer, PlayStateChange, SyncCommand, reconcile};
use std::future;
use std::sync::Arc;
use std::time::Duration;
use tandem_core::{MediaReference, RoomPatch, RoomRecord};
use tokio::sync::{broadcast, mpsc, watch};
use tokio::time::{Instant, Interval, MissedTickBehavior, interval_at, sleep_until};
use tracing::{debug, error, info, warn};

/// What a participant's UI needs to render the playback session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncStatus {
    pub media: Option<MediaReference>,
    pub is_playing: bool,
    /// A correction seek was applied recently.
    pub syncing: bool,
    pub last_correction: Option<Correction>,
}

/// Cheap clonable control surface of a running engine.
#[derive(Debug, Clone)]
pub struct SyncHandle {
    commands: mpsc::Sender<SyncCommand>,
    status: watch::Receiver<SyncStatus>,
}

impl SyncHandle {
    pub async fn toggle_play(&self) -> Result<()> {
        self.send(SyncCommand::TogglePlay).await
    }

    pub async fn seek_by(&self, offset: i64) -> Result<()> {
        self.send(SyncCommand::Seek(offset)).await
    }

    /// Validate `url` and ask the engine to load it for the whole room.
    pub async fn load_media(&self, url: &str) -> Result<()> {
        let media = MediaReference::parse(url)?;
        self.send(SyncCommand::LoadMedia(media)).await
    }

    pub async fn player_ready(&self) -> Result<()> {
        self.send(SyncCommand::PlayerReady).await
    }

    pub async fn leave(&self) -> Result<()> {
        self.send(SyncCommand::Leave).await
    }

    pub fn status(&self) -> SyncStatus {
        self.status.borrow().clone()
    }

    pub fn watch_status(&self) -> watch::Receiver<SyncStatus> {
        self.status.clone()
    }

    async fn send(&self, command: SyncCommand) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| SessionError::EngineStopped)
    }
}

/// Keeps one participant's player aligned with the room record.
///
/// A host publishes: toggles, seeks and media changes are written at once and
/// a heartbeat republishes the position while playing. A viewer follows:
/// change notices are debounced and reconciled with the event threshold, and
/// a periodic re-fetch with the looser threshold recovers lost notices.
pub struct PlaybackSyncEngine<P: Player> {
    member: RoomMember,
    config: SyncConfig,
    store: Arc<dyn RoomStore>,
    player: P,
    media: Option<MediaReference>,
    commands: mpsc::Receiver<SyncCommand>,
    notices: Option<broadcast::Receiver<RoomRecord>>,
    status: watch::Sender<SyncStatus>,
    debouncer: Debouncer<RoomRecord>,
    heartbeat: Interval,
    periodic: Interval,
    syncing_until: Option<Instant>,
    pending_initial: Option<RoomRecord>,
    settle_at: Option<Instant>,
}

impl<P: Player + 'static> PlaybackSyncEngine<P> {
    pub fn new(
        member: RoomMember,
        store: Arc<dyn RoomStore>,
        player: P,
        config: SyncConfig,
    ) -> Result<(Self, SyncHandle)> {
        let notices = store.subscribe(&member.room_id)?;
        let (command_tx, command_rx) = mpsc::channel(32);
        let (status_tx, status_rx) = watch::channel(SyncStatus::default());

        let engine = Self {
            debouncer: Debouncer::new(config.debounce),
            heartbeat: quiet_interval(config.heartbeat_interval),
            periodic: quiet_interval(config.periodic_interval),
            member,
            config,
            store,
            player,
            media: None,
            commands: command_rx,
            notices: Some(notices),
            status: status_tx,
            syncing_until: None,
            pending_initial: None,
            settle_at: None,
        };

        let handle = SyncHandle {
            commands: command_tx,
            status: status_rx,
        };

        Ok((engine, handle))
    }

    pub fn spawn(
        member: RoomMember,
        store: Arc<dyn RoomStore>,
        player: P,
        config: SyncConfig,
    ) -> Result<SyncHandle> {
        let (engine, handle) = Self::new(member, store, player, config)?;
        tokio::spawn(engine.run());
        Ok(handle)
    }

    pub async fn run(mut self) {
        info!(
            "Sync engine started for {} {} in room {}",
            self.member.role, self.member.participant_id, self.member.room_id
        );

        self.join().await;

        loop {
            let heartbeat_on = self.heartbeat_active();
            let periodic_on = self.periodic_active();

            tokio::select! {
                cmd = self.commands.recv() => {
                    match cmd {
                        Some(SyncCommand::Leave) | None => break,
                        Some(c) => self.handle_command(c).await,
                    }
                }

                record = next_notice(&mut self.notices) => {
                    self.handle_notice(record);
                }

                record = self.debouncer.ready() => {
                    let threshold = self.config.event_drift_threshold;
                    let indicator = self.config.event_sync_indicator;
                    self.apply_record(&record, threshold, indicator);
                }

                _ = self.heartbeat.tick(), if heartbeat_on => {
                    self.send_heartbeat().await;
                }

                _ = self.periodic.tick(), if periodic_on => {
                    self.periodic_check().await;
                }

                _ = deadline(self.syncing_until) => {
                    self.syncing_until = None;
                    self.publish_status(|s| s.syncing = false);
                }

                _ = deadline(self.settle_at) => {
                    self.settle_at = None;
                    self.apply_initial_state();
                }
            }
        }

        info!(
            "Sync engine for {} left room {}",
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

        if record.has_media() {
            self.switch_media(record);
        }
    }

    async fn handle_command(&mut self, cmd: SyncCommand) {
        match cmd {
            SyncCommand::TogglePlay => {
                if !self.check_host("toggle playback") || !self.check_media() {
                    return;
                }

                let position = self.player.current_position();
                let playing = !self.player.is_playing();
                if playing {
                    self.player.play();
                    self.heartbeat.reset();
                } else {
                    self.player.pause();
                }
                self.publish_status(|s| s.is_playing = playing);

                info!("Host set playing={} at {}s", playing, position);
                self.write(RoomPatch::new().playing(playing).position(position))
                    .await;
            }

            SyncCommand::Seek(offset) => {
                if !self.check_host("seek") || !self.check_media() {
                    return;
                }

                let current = self.player.current_position() as i64;
                let target = current.saturating_add(offset).max(0) as u64;
                self.player.seek(target);

                debug!("Host seek {:+}s to {}s", offset, target);
                self.write(RoomPatch::new().position(target)).await;
            }

            SyncCommand::LoadMedia(media) => {
                if !self.check_host("load media") {
                    return;
                }

                info!("Host loading {}", media);
                self.player.load(&media);
                self.media = Some(media.clone());
                self.pending_initial = None;
                self.settle_at = None;
                self.publish_status(|s| {
                    s.media = Some(media.clone());
                    s.is_playing = false;
                });

                self.write(RoomPatch::new().media(media.url()).position(0).playing(false))
                    .await;
            }

            SyncCommand::PlayerReady => {
                if self.pending_initial.is_some() {
                    self.settle_at = Some(Instant::now() + self.config.settle_delay);
                }
            }

            SyncCommand::Leave => {}
        }
    }

    fn handle_notice(&mut self, record: RoomRecord) {
        if self.is_new_media(&record) {
            self.switch_media(record);
            return;
        }

        if self.member.is_host() || self.media.is_none() {
            return;
        }

        // Still settling on join: keep the freshest state for that instead.
        if let Some(pending) = self.pending_initial.as_mut() {
            *pending = record;
            return;
        }

        self.debouncer.push(record);
    }

    fn is_new_media(&self, record: &RoomRecord) -> bool {
        record.has_media()
            && self
                .media
                .as_ref()
                .is_none_or(|m| m.url() != record.media_reference)
    }

    /// Load the record's media and queue its state for once the player
    /// has settled.
    fn switch_media(&mut self, record: RoomRecord) {
        let media = match MediaReference::parse(&record.media_reference) {
            Ok(media) => media,
            Err(e) => {
                warn!("Ignoring unusable media in room {}: {}", self.member.room_id, e);
                return;
            }
        };

        info!("{} loading {}", self.member.participant_id, media);
        self.player.load(&media);
        self.media = Some(media.clone());
        self.debouncer.cancel();
        self.periodic.reset();
        self.pending_initial = Some(record);
        self.settle_at = self
            .player
            .is_ready()
            .then(|| Instant::now() + self.config.settle_delay);

        self.publish_status(|s| {
            s.media = Some(media.clone());
            s.is_playing = false;
        });
    }

    fn apply_initial_state(&mut self) {
        let Some(record) = self.pending_initial.take() else {
            return;
        };
        if !self.player.is_ready() {
            self.pending_initial = Some(record);
            return;
        }

        debug!(
            "{} applying initial state {}s playing={}",
            self.member.participant_id, record.position, record.is_playing
        );
        if let Some(correction) = reconcile(self.player.snapshot(), &record, 0) {
            self.apply_correction(correction, None);
        }
    }

    fn apply_record(&mut self, record: &RoomRecord, threshold: u64, indicator: Duration) {
        if self.media.is_none() {
            return;
        }
        if !self.player.is_ready() {
            self.pending_initial = Some(record.clone());
            return;
        }

        if let Some(correction) = reconcile(self.player.snapshot(), record, threshold) {
            debug!(
                "{} correcting {:?} (local {}s, room {}s)",
                self.member.participant_id,
                correction,
                self.player.current_position(),
                record.position
            );
            self.apply_correction(correction, Some(indicator));
        }
    }

    fn apply_correction(&mut self, correction: Correction, indicator: Option<Duration>) {
        if let Some(position) = correction.seek_to {
            self.player.seek(position);
            if let Some(indicator) = indicator {
                self.syncing_until = Some(Instant::now() + indicator);
            }
        }

        match correction.play_state {
            Some(PlayStateChange::Play) => self.player.play(),
            Some(PlayStateChange::Pause) => self.player.pause(),
            None => {}
        }

        let syncing = self.syncing_until.is_some();
        let playing = self.player.is_playing();
        self.publish_status(|s| {
            s.syncing = syncing;
            s.is_playing = playing;
            s.last_correction = Some(correction);
        });
    }

    async fn send_heartbeat(&mut self) {
        let position = self.player.current_position();
        debug!("Heartbeat {}s for room {}", position, self.member.room_id);
        self.write(RoomPatch::new().position(position)).await;
    }

    async fn periodic_check(&mut self) {
        if self.syncing_until.is_some() {
            debug!("Skipping periodic check while syncing");
            return;
        }

        let record = match self.store.fetch(&self.member.room_id).await {
            Ok(record) => record,
            Err(e) => {
                warn!("Periodic fetch for room {} failed: {}", self.member.room_id, e);
                return;
            }
        };

        if self.is_new_media(&record) {
            self.switch_media(record);
            return;
        }
        if self.pending_initial.is_some() {
            return;
        }

        let threshold = self.config.periodic_drift_threshold;
        let indicator = self.config.periodic_sync_indicator;
        self.apply_record(&record, threshold, indicator);
    }

    async fn write(&self, patch: RoomPatch) {
        if let Err(e) = self.store.update(&self.member.room_id, patch).await {
            error!("Failed to update room {}: {}", self.member.room_id, e);
        }
    }

    fn check_host(&self, action: &'static str) -> bool {
        if self.member.is_host() {
            return true;
        }
        warn!(
            "{} ignored: {}",
            self.member.participant_id,
            SessionError::NotHost(action)
        );
        false
    }

    fn check_media(&self) -> bool {
        if self.media.is_some() {
            return true;
        }
        warn!("No media loaded in room {}", self.member.room_id);
        false
    }

    fn heartbeat_active(&self) -> bool {
        self.member.is_host() && self.media.is_some() && self.player.is_playing()
    }

    fn periodic_active(&self) -> bool {
        !self.member.is_host() && self.media.is_some()
    }

    fn publish_status(&self, update: impl FnOnce(&mut SyncStatus)) {
        self.status.send_modify(update);
    }
}

/// An interval whose first tick is one full period away.
fn quiet_interval(period: Duration) -> Interval {
    let mut interval = interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

async fn deadline(at: Option<Instant>) {
    match at {
        Some(at) => sleep_until(at).await,
        None => future::pending().await,
    }
}
