mod player;
mod simulated_player;

pub use player::*;
pub use simulated_player::*;
