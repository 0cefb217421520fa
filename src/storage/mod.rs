//! Storage module.
//!
//! Durable status documents, persisted ledgers built on them, and the
//! cross-process pass lock.

pub mod ledger;
pub mod lock;
pub mod status_file;

pub use ledger::*;
pub use lock::*;
pub use status_file::*;
