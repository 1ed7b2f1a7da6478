//! Canvas compositing.

pub mod composite;
