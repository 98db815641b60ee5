use serde::{Deserialize, Deserializer};
use std::time::Duration;
use tandem_core::IceServerConfig;

// Empirically tuned values; treat them as knobs rather than invariants.

/// How often a playing host republishes its position.
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(3);
/// How often a viewer re-fetches the record as a safety net.
pub const PERIODIC_INTERVAL: Duration = Duration::from_secs(10);
/// Quiet window that coalesces bursts of change notices.
pub const NOTICE_DEBOUNCE: Duration = Duration::from_millis(300);
/// Drift (seconds) tolerated on the notice-driven path.
pub const EVENT_DRIFT_THRESHOLD: u64 = 2;
/// Drift (seconds) tolerated on the periodic path.
pub const PERIODIC_DRIFT_THRESHOLD: u64 = 3;
/// Delay between player readiness and applying the initial state.
pub const SETTLE_DELAY: Duration = Duration::from_millis(500);
pub const EVENT_SYNC_INDICATOR: Duration = Duration::from_millis(500);
pub const PERIODIC_SYNC_INDICATOR: Duration = Duration::from_secs(1);
/// How often a sharing host reports elapsed sharing time.
pub const SHARE_CLOCK_INTERVAL: Duration = Duration::from_secs(3);

fn millis<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    u64::deserialize(deserializer).map(Duration::from_millis)
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    #[serde(rename = "heartbeat_interval_ms", deserialize_with = "millis")]
    pub heartbeat_interval: Duration,
    #[serde(rename = "periodic_interval_ms", deserialize_with = "millis")]
    pub periodic_interval: Duration,
    #[serde(rename = "debounce_ms", deserialize_with = "millis")]
    pub debounce: Duration,
    pub event_drift_threshold: u64,
    pub periodic_drift_threshold: u64,
    #[serde(rename = "settle_delay_ms", deserialize_with = "millis")]
    pub settle_delay: Duration,
    #[serde(rename = "event_sync_indicator_ms", deserialize_with = "millis")]
    pub event_sync_indicator: Duration,
    #[serde(rename = "periodic_sync_indicator_ms", deserialize_with = "millis")]
    pub periodic_sync_indicator: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval: HEARTBEAT_INTERVAL,
            periodic_interval: PERIODIC_INTERVAL,
            debounce: NOTICE_DEBOUNCE,
            event_drift_threshold: EVENT_DRIFT_THRESHOLD,
            periodic_drift_threshold: PERIODIC_DRIFT_THRESHOLD,
            settle_delay: SETTLE_DELAY,
            event_sync_indicator: EVENT_SYNC_INDICATOR,
            periodic_sync_indicator: PERIODIC_SYNC_INDICATOR,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SignalingConfig {
    #[serde(rename = "share_clock_interval_ms", deserialize_with = "millis")]
    pub share_clock_interval: Duration,
    /// Capacity of the channel transport callbacks push events into.
    pub transport_event_buffer: usize,
}

impl Default for SignalingConfig {
    fn default() -> Self {
        Self {
            share_clock_interval: SHARE_CLOCK_INTERVAL,
            transport_event_buffer: 256,
        }
    }
}

/// ICE servers handed to every peer connection.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    pub ice_servers: Vec<IceServerConfig>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            ice_servers: vec![IceServerConfig {
                urls: vec!["stun:stun.l.google.com:19302".to_owned()],
                username: None,
                credential: None,
            }],
        }
    }
}

/// Everything a participant process needs, loadable from TOML.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub sync: SyncConfig,
    pub signaling: SignalingConfig,
    pub transport: TransportConfig,
}

impl SessionConfig {
    pub fn from_toml(source: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(source)
    }
}
