use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tandem_session::{CaptureSource, CaptureStream, Result, SessionError};

/// CaptureSource that hands out track-less streams, or refuses.
#[derive(Clone)]
pub struct MockCapture {
    available: bool,
    acquired: Arc<Mutex<Vec<CaptureStream>>>,
}

impl MockCapture {
    pub fn available() -> Self {
        Self {
            available: true,
            acquired: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::available()
        }
    }

    /// The most recently acquired stream.
    pub fn last(&self) -> Option<CaptureStream> {
        self.acquired.lock().unwrap().last().cloned()
    }

    /// Simulate the user revoking the capture.
    pub fn revoke(&self) {
        if let Some(stream) = self.last() {
            stream.stop();
        }
    }
}

#[async_trait]
impl CaptureSource for MockCapture {
    async fn acquire(&self) -> Result<CaptureStream> {
        if !self.available {
            return Err(SessionError::Capture("permission denied".into()));
        }

        let mut acquired = self.acquired.lock().unwrap();
        let stream = CaptureStream::new(format!("mock-capture-{}", acquired.len()), Vec::new());
        acquired.push(stream.clone());
        Ok(stream)
    }
}
