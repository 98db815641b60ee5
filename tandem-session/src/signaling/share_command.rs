use std::fmt;

/// Requests sent to a running [`crate::SignalingCoordinator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShareCommand {
    /// Host: acquire the capture and announce sharing.
    Start,
    /// Host: revoke the capture and end sharing for everyone.
    Stop,
    Leave,
}

/// Something the participant should be told about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShareNotice {
    /// A viewer's link failed; rejoining is the remedy.
    ConnectionFailed,
    NegotiationFailed,
    CaptureUnavailable,
}

impl fmt::Display for ShareNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShareNotice::ConnectionFailed => f.write_str("connection failed, consider rejoining"),
            ShareNotice::NegotiationFailed => f.write_str("failed to connect to the shared screen"),
            ShareNotice::CaptureUnavailable => f.write_str("screen capture is unavailable"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShareStatus {
    /// The room is currently sharing a screen.
    pub sharing: bool,
    /// Viewer: waiting for the host's media.
    pub connecting: bool,
    /// Viewer: remote media is arriving.
    pub receiving: bool,
    /// Host: connected viewers.
    pub viewer_count: u32,
    pub elapsed_seconds: u64,
    pub notice: Option<ShareNotice>,
}
