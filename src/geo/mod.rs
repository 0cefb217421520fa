//! Geolocation module.
//!
//! Net-pos snapshots written at handshake time and the pass that turns
//! them into cached positions.

pub mod locator;
pub mod netpos;

pub use locator::*;
pub use netpos::*;
