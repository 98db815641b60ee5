mod broadcast;
mod config;
mod error;
mod player;
mod room;
mod signaling;
mod sync;
mod transport;

pub use broadcast::*;
pub use config::*;
pub use error::*;
pub use player::*;
pub use room::*;
pub use signaling::*;
pub use sync::*;
pub use transport::*;
