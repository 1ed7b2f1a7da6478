//! Crate-wide identifiers and the error taxonomy.

pub mod core;
pub mod error;
