use crate::error::Result;
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::debug;
use webrtc::api::media_engine::MIME_TYPE_VP8;
use webrtc::media::Sample;
use webrtc::rtp_transceiver::rtp_codec::RTCRtpCodecCapability;
use webrtc::track::track_local::TrackLocal;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;

/// The host's local capture. Clones share the same tracks and end signal.
#[derive(Clone)]
pub struct CaptureStream {
    id: String,
    tracks: Vec<Arc<dyn TrackLocal + Send + Sync>>,
    ended_tx: Arc<watch::Sender<bool>>,
    ended_rx: watch::Receiver<bool>,
}

impl CaptureStream {
    pub fn new(id: impl Into<String>, tracks: Vec<Arc<dyn TrackLocal + Send + Sync>>) -> Self {
        let (ended_tx, ended_rx) = watch::channel(false);
        Self {
            id: id.into(),
            tracks,
            ended_tx: Arc::new(ended_tx),
            ended_rx,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn tracks(&self) -> &[Arc<dyn TrackLocal + Send + Sync>] {
        &self.tracks
    }

    /// Release the capture. Also what the platform does when the user
    /// revokes it.
    pub fn stop(&self) {
        self.ended_tx.send_replace(true);
    }

    pub fn is_ended(&self) -> bool {
        *self.ended_rx.borrow()
    }

    /// Resolves once the capture has ended.
    pub async fn ended(&self) {
        let mut rx = self.ended_rx.clone();
        let _ = rx.wait_for(|ended| *ended).await;
    }
}

impl std::fmt::Debug for CaptureStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureStream")
            .field("id", &self.id)
            .field("tracks", &self.tracks.len())
            .field("ended", &self.is_ended())
            .finish()
    }
}

/// Where the host's screen comes from.
#[async_trait]
pub trait CaptureSource: Send + Sync {
    async fn acquire(&self) -> Result<CaptureStream>;
}

/// A VP8 video track fed with placeholder frames, for demos and tests that
/// need real media flowing without a screen.
pub struct SyntheticCapture {
    frame_interval: Duration,
}

impl SyntheticCapture {
    pub fn new(frame_interval: Duration) -> Self {
        Self { frame_interval }
    }
}

impl Default for SyntheticCapture {
    fn default() -> Self {
        Self::new(Duration::from_millis(33))
    }
}

#[async_trait]
impl CaptureSource for SyntheticCapture {
    async fn acquire(&self) -> Result<CaptureStream> {
        let track = Arc::new(TrackLocalStaticSample::new(
            RTCRtpCodecCapability {
                mime_type: MIME_TYPE_VP8.to_owned(),
                ..Default::default()
            },
            "screen".to_owned(),
            "tandem-capture".to_owned(),
        ));

        let stream = CaptureStream::new("tandem-capture", vec![track.clone()]);

        let pump = stream.clone();
        let interval = self.frame_interval;
        tokio::spawn(async move {
            let frame = Bytes::from_static(&[0u8; 128]);
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = pump.ended() => break,
                    _ = ticker.tick() => {
                        let sample = Sample {
                            data: frame.clone(),
                            duration: interval,
                            ..Default::default()
                        };
                        if let Err(e) = track.write_sample(&sample).await {
                            debug!("Synthetic frame dropped: {}", e);
                        }
                    }
                }
            }
            debug!("Synthetic capture {} stopped", pump.id());
        });

        Ok(stream)
    }
}
