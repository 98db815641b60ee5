use crate::player::Player;
use std::sync::{Arc, Mutex, MutexGuard};
use tandem_core::MediaReference;
use tokio::time::Instant;

#[derive(Debug)]
struct PlayerState {
    media: Option<MediaReference>,
    ready: bool,
    ready_on_load: bool,
    /// Position at `resumed_at`, in milliseconds.
    anchor_ms: u64,
    resumed_at: Option<Instant>,
    rate: f64,
    seeks: Vec<u64>,
}

impl PlayerState {
    fn position_ms(&self) -> u64 {
        let elapsed = self
            .resumed_at
            .map(|at| (at.elapsed().as_millis() as f64 * self.rate) as u64)
            .unwrap_or(0);
        self.anchor_ms.saturating_add(elapsed)
    }
}

/// A headless player that advances with the tokio clock.
///
/// Clones observe and drive the same player, so a test or a demo can keep a
/// handle while an engine owns another. Paused-time tests see the position
/// move only when the runtime clock does.
#[derive(Debug, Clone)]
pub struct SimulatedPlayer {
    state: Arc<Mutex<PlayerState>>,
}

impl SimulatedPlayer {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(PlayerState {
                media: None,
                ready: false,
                ready_on_load: true,
                anchor_ms: 0,
                resumed_at: None,
                rate: 1.0,
                seeks: Vec::new(),
            })),
        }
    }

    /// Loading no longer makes the player ready; call [`Self::mark_ready`].
    pub fn with_manual_ready(self) -> Self {
        self.lock().ready_on_load = false;
        self
    }

    /// Play faster or slower than real time, to provoke drift.
    pub fn with_rate(self, rate: f64) -> Self {
        self.lock().rate = rate;
        self
    }

    pub fn mark_ready(&self) {
        self.lock().ready = true;
    }

    pub fn media(&self) -> Option<MediaReference> {
        self.lock().media.clone()
    }

    /// Every position passed to `seek`, oldest first.
    pub fn seeks(&self) -> Vec<u64> {
        self.lock().seeks.clone()
    }

    fn lock(&self) -> MutexGuard<'_, PlayerState> {
        // A panic while holding the lock leaves plain data behind; keep going.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for SimulatedPlayer {
    fn default() -> Self {
        Self::new()
    }
}

impl Player for SimulatedPlayer {
    fn load(&mut self, media: &MediaReference) {
        let mut state = self.lock();
        state.media = Some(media.clone());
        state.ready = state.ready_on_load;
        state.anchor_ms = 0;
        state.resumed_at = None;
    }

    fn is_ready(&self) -> bool {
        let state = self.lock();
        state.media.is_some() && state.ready
    }

    fn current_position(&self) -> u64 {
        self.lock().position_ms() / 1000
    }

    fn is_playing(&self) -> bool {
        self.lock().resumed_at.is_some()
    }

    fn seek(&mut self, seconds: u64) {
        let mut state = self.lock();
        state.anchor_ms = seconds.saturating_mul(1000);
        if state.resumed_at.is_some() {
            state.resumed_at = Some(Instant::now());
        }
        state.seeks.push(seconds);
    }

    fn play(&mut self) {
        let mut state = self.lock();
        if state.resumed_at.is_none() {
            state.resumed_at = Some(Instant::now());
        }
    }

    fn pause(&mut self) {
        let mut state = self.lock();
        state.anchor_ms = state.position_ms();
        state.resumed_at = None;
    }
}
