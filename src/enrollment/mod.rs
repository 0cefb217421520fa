//! Enrollment module.
//!
//! Signed unit enrollment and the token freshness window.

pub mod token;

pub use token::*;
