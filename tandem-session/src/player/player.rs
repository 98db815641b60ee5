use tandem_core::MediaReference;

/// Local playback state as the reconciler sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LocalPlayback {
    pub position: u64,
    pub is_playing: bool,
}

/// The participant's local media player.
///
/// Calls are synchronous and cheap; the engine owns its player and drives it
/// from a single task.
pub trait Player: Send + Sync {
    fn load(&mut self, media: &MediaReference);

    /// True once loaded media can accept seek/play commands.
    fn is_ready(&self) -> bool;

    /// Whole seconds into the current media.
    fn current_position(&self) -> u64;

    fn is_playing(&self) -> bool;

    fn seek(&mut self, seconds: u64);

    fn play(&mut self);

    fn pause(&mut self);

    fn snapshot(&self) -> LocalPlayback {
        LocalPlayback {
            position: self.current_position(),
            is_playing: self.is_playing(),
        }
    }
}
