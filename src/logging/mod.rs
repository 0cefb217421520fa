//! Structured logging with pass context.
//!
//! Every log line carries the pass id and, inside a pass, the work item.

pub mod structured;

pub use structured::*;
