use crate::player::LocalPlayback;
use tandem_core::RoomRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayStateChange {
    Play,
    Pause,
}

/// What a follower must do to match the authoritative record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Correction {
    pub seek_to: Option<u64>,
    pub play_state: Option<PlayStateChange>,
}

/// Compare local playback with the record.
///
/// Drift strictly greater than `threshold` seconds yields a seek to the
/// record's position; a play flag mismatch yields a play or pause. Returns
/// `None` when nothing needs to change or the record carries no media.
pub fn reconcile(local: LocalPlayback, record: &RoomRecord, threshold: u64) -> Option<Correction> {
    if !record.has_media() {
        return None;
    }

    let drift = local.position.abs_diff(record.position);
    let seek_to = (drift > threshold).then_some(record.position);

    let play_state = match (record.is_playing, local.is_playing) {
        (true, false) => Some(PlayStateChange::Play),
        (false, true) => Some(PlayStateChange::Pause),
        _ => None,
    };

    if seek_to.is_none() && play_state.is_none() {
        return None;
    }

    Some(Correction {
        seek_to,
        play_state,
    })
}
