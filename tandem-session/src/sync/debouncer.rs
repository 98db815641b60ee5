use std::future;
use std::time::Duration;
use tokio::time::{Instant, sleep_until};

/// Holds the latest value of a burst and releases it once the burst has
/// been quiet for `delay`. Each push replaces the pending value and restarts
/// the window.
#[derive(Debug)]
pub struct Debouncer<T> {
    delay: Duration,
    pending: Option<(Instant, T)>,
}

impl<T> Debouncer<T> {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    pub fn push(&mut self, value: T) {
        self.pending = Some((Instant::now() + self.delay, value));
    }

    pub fn cancel(&mut self) {
        self.pending = None;
    }

    pub fn is_armed(&self) -> bool {
        self.pending.is_some()
    }

    /// Resolves with the pending value once its window elapses. Never
    /// resolves while nothing is pending. Cancel safe.
    pub async fn ready(&mut self) -> T {
        loop {
            let Some((deadline, _)) = &self.pending else {
                return future::pending().await;
            };
            sleep_until(*deadline).await;

            if let Some((_, value)) = self.pending.take() {
                return value;
            }
        }
    }
}
