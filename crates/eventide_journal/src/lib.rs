//! # Eventide Journal
//!
//! In-memory, append-only journal for event sourcing.
//!
//! This crate provides:
//! - Versioned entries grouped into named streams
//! - Optimistic concurrency checks on every stream write
//! - Snapshot compaction when materializing a stream
//! - Category reads across every stream of an entity kind
//! - Sequential readers with acknowledge-based positions
//!
//! Nothing is persisted. A journal lives as long as its registry, or until
//! it is closed.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod entry;
mod error;
mod journal;
mod reader;
mod stream;

pub use entry::{BatchEntry, EntryBatch, EntryValue, StoredEntry, NO_ID, NO_STREAM_VERSION};
pub use error::{JournalError, JournalResult};
pub use journal::{Journal, JournalRegistry};
pub use reader::{JournalReader, StreamReader};
pub use stream::{
    category_stream_for, stream_name_for, EntryStream, StreamCategory, StreamQuery,
    CATEGORY_PREFIX,
};
