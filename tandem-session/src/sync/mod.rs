mod correction;
mod debouncer;
mod sync_command;
mod sync_engine;

pub use correction::*;
pub use debouncer::*;
pub use sync_command::*;
pub use sync_engine::*;
