use tandem_core::MediaReference;

/// Requests sent to a running [`crate::PlaybackSyncEngine`].
#[derive(Debug, Clone)]
pub enum SyncCommand {
    /// Host: flip play/pause and publish the new state.
    TogglePlay,
    /// Host: move by a signed number of seconds, clamped at zero.
    Seek(i64),
    /// Host: switch the room to new media from the start, paused.
    LoadMedia(MediaReference),
    /// The local player finished loading and accepts commands.
    PlayerReady,
    Leave,
}
