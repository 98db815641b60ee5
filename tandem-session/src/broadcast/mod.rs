mod broadcast_channel;
mod memory_broadcast;

pub use broadcast_channel::*;
pub use memory_broadcast::*;
