//! Resilience patterns for the exchange feed
//!
//! - Fixed-delay backoff between attempts
//! - Connection manager that reconnects on every failure or drop

pub mod backoff;
pub mod manager;

pub use backoff::FixedBackoff;
pub use manager::{ConnectionManager, IngestStats};
