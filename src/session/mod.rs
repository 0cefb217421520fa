//! Session summary and host information.
//!
//! The operating session is summarised by an external collaborator into a
//! small JSON file; enrollment copies those statistics verbatim. Host info
//! and the "brain" blob are best effort: failures yield empty values.

pub mod stats;

pub use stats::*;
