use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;
use thiserror::Error;

static VIDEO_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^.*((youtu\.be/)|(v/)|(/u/\w/)|(embed/)|(watch\?))\??v?=?([^#&?]*).*")
        .expect("video url pattern is valid")
});

const VIDEO_ID_LEN: usize = 11;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MediaReferenceError {
    #[error("media reference is empty")]
    Empty,
    #[error("no video id found in {0:?}")]
    NoVideoId(String),
}

/// A loadable media source: the reference the host typed plus the video id
/// the player needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaReference {
    url: String,
    video_id: String,
}

impl MediaReference {
    pub fn parse(url: &str) -> Result<Self, MediaReferenceError> {
        let url = url.trim();
        if url.is_empty() {
            return Err(MediaReferenceError::Empty);
        }

        let video_id = VIDEO_URL
            .captures(url)
            .and_then(|caps| caps.get(7))
            .map(|m| m.as_str())
            .filter(|id| id.len() == VIDEO_ID_LEN)
            .ok_or_else(|| MediaReferenceError::NoVideoId(url.to_owned()))?;

        Ok(Self {
            url: url.to_owned(),
            video_id: video_id.to_owned(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn video_id(&self) -> &str {
        &self.video_id
    }
}

impl fmt::Display for MediaReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url)
    }
}
