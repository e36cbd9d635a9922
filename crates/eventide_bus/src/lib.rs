//! # Eventide Bus
//!
//! In-process publish/subscribe for Eventide.
//!
//! This crate provides:
//! - Named message buses, each a registry of named topics
//! - Topics with an unbounded queue and one dispatcher thread
//! - Fault isolation: a failing subscriber never stalls the others
//! - Draining close that waits for in-flight deliveries
//!
//! Delivery is in publish order per topic. Subscribers run on the
//! dispatcher thread and should not block for long.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod bus;
mod config;
mod error;
mod message;
mod topic;

pub use bus::{BusRegistry, MessageBus};
pub use config::TopicConfig;
pub use error::{BusError, BusResult};
pub use message::{Message, Subscriber};
pub use topic::Topic;
