mod capture;
mod media_transport;
mod transport_event;
mod webrtc_transport;

pub use capture::*;
pub use media_transport::*;
pub use transport_event::*;
pub use webrtc_transport::*;
