mod memory_room_store;
mod room_member;
mod room_store;

pub use memory_room_store::*;
pub use room_member::*;
pub use room_store::*;
