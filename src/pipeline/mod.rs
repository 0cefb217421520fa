//! Pipeline orchestration module.
//!
//! The grid pass run each time the unit comes online:
//! - Capture enumeration
//! - Token acquisition
//! - Exclusion filtering
//! - Report dispatch and ledger updates

pub mod context;
pub mod grid_pass;

pub use context::*;
pub use grid_pass::*;
