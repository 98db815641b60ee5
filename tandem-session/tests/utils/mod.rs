pub mod mock_capture;
pub mod wait;

pub use mock_capture::*;
pub use mock_transport::*;
pub use signal_helpers::*;
pub use wait::*;
