//! Benchmarks for Eventide.
//!
//! The benches live under `benches/`; this library only holds shared helpers.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod utils;
