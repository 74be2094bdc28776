//! Progress throttling for transport callbacks.
//!
//! Transports read in small chunks; this module keeps the listener from being
//! called for every chunk.

mod throttle;

pub use throttle::ProgressThrottle;
