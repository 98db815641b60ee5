use anyhow::{Context, Result};
use colored::*;
use std::sync::Arc;
use std::time::Duration;
use tandem_core::{RoomId, RoomRecord};
use tandem_session::{
    BroadcastChannel, MediaTransport, MemoryBroadcast, MemoryRoomStore, PlaybackSyncEngine,
    Player, RoomMember, RoomStore, SessionConfig, ShareHandle, SignalingCoordinator,
    SimulatedPlayer, SyncConfig, SyncHandle, SyntheticCapture, WebRtcTransport,
};
use tokio::time::{Instant, sleep_until};
use tracing::info;

const VIDEO: &str = "https://www.youtube.com/watch?v=dQw4w9WgXcQ";
const SEEK_OFFSET: i64 = 30;

pub struct Options {
    pub viewers: usize,
    pub seconds: u64,
    pub drop_notifications: bool,
    pub share: bool,
    pub config: SessionConfig,
}

enum Step {
    Load,
    TogglePlay,
    Seek(i64),
}

struct Participant {
    name: String,
    player: SimulatedPlayer,
    sync: SyncHandle,
    share: Option<ShareHandle>,
}

/// Host actions keyed by the second they happen at.
fn script(seconds: u64) -> Vec<(u64, Step)> {
    vec![
        (1, Step::Load),
        (2, Step::TogglePlay),
        ((seconds / 2).max(3), Step::Seek(SEEK_OFFSET)),
        (seconds.saturating_sub(3).max(4), Step::TogglePlay),
    ]
}

/// Viewers run deliberately fast or slow so there is drift to correct.
fn viewer_rate(index: usize) -> f64 {
    let skew = 0.15 * (index / 2 + 1) as f64;
    let rate = if index % 2 == 0 { 1.0 + skew } else { 1.0 - skew };
    rate.max(0.25)
}

pub async fn run(options: Options) -> Result<()> {
    let room_id = RoomId::from("simulation");
    let store = MemoryRoomStore::new();
    store.create_room(room_id.clone(), RoomRecord::default());
    store.set_notifications_muted(options.drop_notifications);

    let channel = MemoryBroadcast::new();
    let transport: Option<Arc<dyn MediaTransport>> = if options.share {
        let transport = WebRtcTransport::new(options.config.transport.clone())
            .context("Failed to set up WebRTC")?;
        Some(Arc::new(transport))
    } else {
        None
    };

    let host = join(
        RoomMember::host(room_id.clone(), "host"),
        SimulatedPlayer::new(),
        &store,
        &channel,
        transport.as_ref(),
        &options.config,
    )?;

    let mut viewers = Vec::with_capacity(options.viewers);
    for index in 0..options.viewers {
        let member = RoomMember::viewer(room_id.clone(), format!("viewer-{}", index + 1));
        let player = SimulatedPlayer::new().with_rate(viewer_rate(index));
        viewers.push(join(
            member,
            player,
            &store,
            &channel,
            transport.as_ref(),
            &options.config,
        )?);
    }

    println!(
        "{} {} viewer(s) for {}s{}",
        "Simulating".green().bold(),
        options.viewers,
        options.seconds,
        if options.drop_notifications {
            ", change notices dropped".yellow().to_string()
        } else {
            String::new()
        }
    );

    if let Some(share) = &host.share {
        share.start_sharing().await?;
    }

    let steps = script(options.seconds);
    let start = Instant::now();

    for second in 1..=options.seconds {
        sleep_until(start + Duration::from_secs(second)).await;

        for (_, step) in steps.iter().filter(|(at, _)| *at == second) {
            match step {
                Step::Load => {
                    println!("{}", format!("host loads {}", VIDEO).cyan());
                    host.sync.load_media(VIDEO).await?;
                }
                Step::TogglePlay => {
                    println!("{}", "host toggles playback".cyan());
                    host.sync.toggle_play().await?;
                }
                Step::Seek(offset) => {
                    println!("{}", format!("host seeks {:+}s", offset).cyan());
                    host.sync.seek_by(*offset).await?;
                }
            }
        }

        report(second, &host, &viewers, &options.config.sync);
    }

    if let Some(share) = &host.share {
        let status = share.status();
        println!(
            "{} {} of {} viewer(s) connected, sharing for {}s",
            "Screen share:".magenta().bold(),
            status.viewer_count,
            options.viewers,
            status.elapsed_seconds
        );
        for viewer in &viewers {
            if let Some(share) = &viewer.share {
                let receiving = share.status().receiving;
                println!(
                    "  {} {}",
                    viewer.name,
                    if receiving { "receiving".green() } else { "not receiving".red() }
                );
            }
        }
    }

    for participant in viewers.iter().chain(std::iter::once(&host)) {
        participant.sync.leave().await?;
        if let Some(share) = &participant.share {
            share.leave().await?;
        }
    }

    // Let the coordinators write their final state.
    tokio::time::sleep(Duration::from_millis(200)).await;
    let record = store.fetch(&room_id).await?;
    info!("Final record: {:?}", record);

    Ok(())
}

fn join(
    member: RoomMember,
    player: SimulatedPlayer,
    store: &MemoryRoomStore,
    channel: &MemoryBroadcast,
    transport: Option<&Arc<dyn MediaTransport>>,
    config: &SessionConfig,
) -> Result<Participant> {
    let name = member.participant_id.to_string();
    let store: Arc<dyn RoomStore> = Arc::new(store.clone());

    let sync = PlaybackSyncEngine::spawn(
        member.clone(),
        Arc::clone(&store),
        player.clone(),
        config.sync.clone(),
    )
    .with_context(|| format!("Failed to start sync for {}", name))?;

    let share = match transport {
        Some(transport) => {
            let channel: Arc<dyn BroadcastChannel> = Arc::new(channel.clone());
            let is_host = member.is_host();
            let (coordinator, handle) = SignalingCoordinator::new(
                member,
                store,
                channel,
                Arc::clone(transport),
                config.signaling.clone(),
            )
            .with_context(|| format!("Failed to start signaling for {}", name))?;

            let coordinator = if is_host {
                coordinator.with_capture(Arc::new(SyntheticCapture::default()))
            } else {
                coordinator
            };
            tokio::spawn(coordinator.run());
            Some(handle)
        }
        None => None,
    };

    Ok(Participant {
        name,
        player,
        sync,
        share,
    })
}

fn report(second: u64, host: &Participant, viewers: &[Participant], config: &SyncConfig) {
    let host_position = host.player.current_position();
    let state = if host.player.is_playing() { "playing" } else { "paused" };

    let columns: Vec<String> = viewers
        .iter()
        .map(|viewer| {
            let drift = viewer.player.current_position() as i64 - host_position as i64;
            let text = format!("{:+}s", drift);
            let text = text.as_str();
            let text = if drift.unsigned_abs() <= config.event_drift_threshold {
                text.green()
            } else if drift.unsigned_abs() <= config.periodic_drift_threshold {
                text.yellow()
            } else {
                text.red()
            };
            let marker = if viewer.sync.status().syncing { "*" } else { " " };
            format!("{} {}{}", viewer.name, text, marker)
        })
        .collect();

    println!(
        "{:>4}s  host {:>4}s {:<7} | {}",
        second,
        host_position,
        state,
        columns.join("  ")
    );
}
