pub mod logger;
pub mod shutdown;

pub use logger::init_logger;
pub use shutdown::{is_shutdown_requested, wait_for_shutdown};
