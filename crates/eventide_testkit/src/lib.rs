//! # Eventide Testkit
//!
//! Test utilities for Eventide.
//!
//! This crate provides:
//! - Journal fixtures and recording subscribers
//! - Property-based test generators using proptest
//! - Stress testing utilities for concurrent writers and readers
//!
//! ## Usage
//!
//! ```rust,ignore
//! use eventide_testkit::prelude::*;
//!
//! #[test]
//! fn test_with_journal() {
//!     with_journal(|journal| {
//!         journal.write("order_1", NO_STREAM_VERSION, &batch_of("Placed", 3)).unwrap();
//!         // ... assertions
//!     });
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod stress;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::stress::*;
}

pub use fixtures::*;
pub use generators::*;
pub use stress::*;
