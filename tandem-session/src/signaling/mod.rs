mod peer_link;
mod peer_registry;
mod share_command;
mod signaling_coordinator;

pub use peer_link::*;
pub use peer_registry::*;
pub use share_command::*;
pub use signaling_coordinator::*;
