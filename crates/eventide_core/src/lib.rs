//! # Eventide Core
//!
//! Glue between the Eventide journal and message bus.
//!
//! This crate provides:
//! - `JournalPublisher`, relaying journaled entries onto a topic
//! - `Runtime`, owning named journals, buses and publishers
//! - `TypeRegistry`, decoding entry bodies by their type tag
//! - Event-sourced entities and a repository to load and save them
//!
//! ## Quick Start
//!
//! ```
//! use eventide_core::{Config, Runtime};
//! use eventide_bus::{BusResult, Message};
//! use eventide_journal::{EntryBatch, NO_STREAM_VERSION};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let runtime = Runtime::new(Config::new().poll_every(Duration::from_millis(10)));
//! let journal = runtime.open_journal("shop");
//! let publisher = runtime.publish("shop", "shop-bus", "products").unwrap();
//!
//! publisher.topic().subscribe(Arc::new(|message: &Message| -> BusResult<()> {
//!     println!("{} {}", message.message_type, message.payload);
//!     Ok(())
//! }));
//!
//! journal
//!     .write("product_1", NO_STREAM_VERSION, &EntryBatch::of("ProductDefined", "{}"))
//!     .unwrap();
//! runtime.shutdown();
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod codec;
mod config;
mod entity;
mod error;
mod publisher;
mod runtime;

pub use codec::{encode, TypeRegistry};
pub use config::{Config, PublisherConfig};
pub use entity::{EventSourced, Repository, SourceEvent, Sourced};
pub use error::{CoreError, CoreResult};
pub use publisher::JournalPublisher;
pub use runtime::Runtime;

// Re-export the building blocks for convenience
pub use eventide_bus::{BusError, Message, MessageBus, Subscriber, Topic, TopicConfig};
pub use eventide_journal::{
    EntryBatch, EntryStream, EntryValue, Journal, JournalError, JournalReader, StoredEntry,
    StreamCategory, StreamQuery, StreamReader, NO_STREAM_VERSION,
};
