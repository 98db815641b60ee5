mod error;
mod frame;
mod hub;
mod ws_handler;

pub use error::*;
pub use frame::*;
pub use hub::*;
pub use ws_handler::*;
