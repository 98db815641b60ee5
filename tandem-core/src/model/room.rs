use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, Hash, Eq, PartialEq)]
#[serde(transparent)]
pub struct RoomId(String);

impl RoomId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RoomId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for RoomId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for RoomId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The authoritative shared state of a session.
///
/// Only the host writes playback fields. `share_started_at` is set exactly
/// while `is_sharing_screen` is true; [`RoomRecord::apply`] keeps that pairing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomRecord {
    /// Opaque media source; empty when nothing is loaded.
    pub media_reference: String,
    /// Seconds elapsed in the current media.
    pub position: u64,
    pub is_playing: bool,
    pub is_sharing_screen: bool,
    pub share_started_at: Option<DateTime<Utc>>,
    /// Host-reported sharing duration, independent of `position`.
    pub share_elapsed_seconds: u64,
}

impl RoomRecord {
    pub fn has_media(&self) -> bool {
        !self.media_reference.is_empty()
    }

    /// Apply an update-by-field patch, last write wins.
    pub fn apply(&mut self, patch: &RoomPatch) {
        if let Some(media) = &patch.media_reference {
            self.media_reference = media.clone();
        }
        if let Some(position) = patch.position {
            self.position = position;
        }
        if let Some(playing) = patch.is_playing {
            self.is_playing = playing;
        }
        if let Some(elapsed) = patch.share_elapsed_seconds {
            self.share_elapsed_seconds = elapsed;
        }

        match patch.is_sharing_screen {
            Some(true) => {
                self.is_sharing_screen = true;
                self.share_started_at = patch
                    .share_started_at
                    .or(self.share_started_at)
                    .or_else(|| Some(Utc::now()));
            }
            Some(false) => {
                self.is_sharing_screen = false;
                self.share_started_at = None;
            }
            None => {
                if self.is_sharing_screen {
                    if let Some(at) = patch.share_started_at {
                        self.share_started_at = Some(at);
                    }
                }
            }
        }
    }

    /// Whole seconds since sharing began, if sharing.
    pub fn share_elapsed(&self, now: DateTime<Utc>) -> Option<u64> {
        self.share_started_at
            .map(|started| (now - started).num_seconds().max(0) as u64)
    }
}

/// Field-wise update of a [`RoomRecord`]. Unset fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_playing: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_sharing_screen: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub share_started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub share_elapsed_seconds: Option<u64>,
}

impl RoomPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn media(mut self, reference: impl Into<String>) -> Self {
        self.media_reference = Some(reference.into());
        self
    }

    pub fn position(mut self, seconds: u64) -> Self {
        self.position = Some(seconds);
        self
    }

    pub fn playing(mut self, playing: bool) -> Self {
        self.is_playing = Some(playing);
        self
    }

    pub fn start_sharing(mut self, at: DateTime<Utc>) -> Self {
        self.is_sharing_screen = Some(true);
        self.share_started_at = Some(at);
        self
    }

    pub fn stop_sharing(mut self) -> Self {
        self.is_sharing_screen = Some(false);
        self.share_started_at = None;
        self
    }

    pub fn share_elapsed(mut self, seconds: u64) -> Self {
        self.share_elapsed_seconds = Some(seconds);
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
