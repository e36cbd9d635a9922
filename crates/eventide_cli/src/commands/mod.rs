//! CLI command implementations.

pub mod demo;
pub mod stream;
pub mod stress;
