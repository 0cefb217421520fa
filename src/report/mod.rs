//! Report module.
//!
//! Delivery of work items to the grid with single refresh-and-retry on
//! authentication failure.

pub mod dispatcher;

pub use dispatcher::*;
