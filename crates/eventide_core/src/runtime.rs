//! The composition root owning journals, buses and publishers.

use crate::config::{Config, PublisherConfig};
use crate::error::CoreResult;
use crate::publisher::JournalPublisher;
use eventide_bus::{BusRegistry, MessageBus};
use eventide_journal::{Journal, JournalRegistry};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::info;

/// Owns every journal, bus and publisher of an application.
///
/// Journals and buses are looked up by name, so independent parts of an
/// application share them by sharing the runtime.
///
/// # Example
///
/// ```
/// use eventide_core::{Config, Runtime};
/// use eventide_journal::{EntryBatch, NO_STREAM_VERSION};
///
/// let runtime = Runtime::new(Config::default());
/// let journal = runtime.open_journal("orders");
/// runtime.publish("orders", "orders-bus", "orders").unwrap();
///
/// journal
///     .write("order_1", NO_STREAM_VERSION, &EntryBatch::of("OrderPlaced", "{}"))
///     .unwrap();
/// runtime.shutdown();
/// ```
pub struct Runtime {
    config: Config,
    journals: JournalRegistry,
    buses: BusRegistry,
    publishers: Mutex<Vec<Arc<JournalPublisher>>>,
}

impl Runtime {
    /// Creates an empty runtime.
    pub fn new(config: Config) -> Self {
        Self {
            buses: BusRegistry::new(config.topic.clone()),
            journals: JournalRegistry::new(),
            publishers: Mutex::new(Vec::new()),
            config,
        }
    }

    /// Returns the runtime configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the journal called `name`, opening it if needed.
    pub fn open_journal(&self, name: &str) -> Arc<Journal> {
        self.journals.open(name)
    }

    /// Returns the bus called `name`, starting it if needed.
    pub fn start_bus(&self, name: &str) -> Arc<MessageBus> {
        self.buses.start(name)
    }

    /// Returns the journal registry.
    pub fn journals(&self) -> &JournalRegistry {
        &self.journals
    }

    /// Publishes entries of `journal` to `topic` on `bus`, with the default
    /// publisher configuration.
    ///
    /// The journal, bus and topic are opened if they do not exist yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the topic dispatcher or publisher thread cannot
    /// be started.
    pub fn publish(&self, journal: &str, bus: &str, topic: &str) -> CoreResult<Arc<JournalPublisher>> {
        self.publish_with(journal, bus, topic, self.config.publisher.clone())
    }

    /// Like [`publish`](Self::publish), with an explicit publisher configuration.
    pub fn publish_with(
        &self,
        journal: &str,
        bus: &str,
        topic: &str,
        config: PublisherConfig,
    ) -> CoreResult<Arc<JournalPublisher>> {
        let journal = self.open_journal(journal);
        let topic = self.start_bus(bus).open_topic(topic)?;
        let publisher = Arc::new(JournalPublisher::from(&journal, topic, config)?);
        self.publishers.lock().push(Arc::clone(&publisher));
        Ok(publisher)
    }

    /// Returns the number of publishers started through this runtime.
    pub fn publisher_count(&self) -> usize {
        self.publishers.lock().len()
    }

    /// Stops every publisher, drains and closes every bus, then closes
    /// every journal.
    ///
    /// Entries already handed to a topic are delivered before its bus
    /// closes.
    pub fn shutdown(&self) {
        self.stop_publishers();
        self.buses.shutdown();
        self.journals.close_all();
        info!("runtime shut down");
    }

    fn stop_publishers(&self) {
        let publishers: Vec<_> = self.publishers.lock().drain(..).collect();
        for publisher in publishers {
            publisher.close();
        }
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl Drop for Runtime {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("journals", &self.journals)
            .field("publishers", &self.publisher_count())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eventide_journal::{EntryBatch, NO_STREAM_VERSION};
    use std::time::Duration;

    fn runtime() -> Runtime {
        Runtime::new(Config::new().poll_every(Duration::from_millis(5)))
    }

    #[test]
    fn registries_are_shared_by_name() {
        let runtime = runtime();
        assert!(Arc::ptr_eq(
            &runtime.open_journal("j"),
            &runtime.open_journal("j")
        ));
        assert!(Arc::ptr_eq(&runtime.start_bus("b"), &runtime.start_bus("b")));
    }

    #[test]
    fn publish_opens_everything_it_needs() {
        let runtime = runtime();
        let publisher = runtime.publish("j", "b", "t").unwrap();
        assert!(runtime.journals().contains("j"));
        assert_eq!(runtime.start_bus("b").topic_names(), ["t"]);
        assert_eq!(publisher.topic().name(), "t");
        assert_eq!(runtime.publisher_count(), 1);
    }

    #[test]
    fn shutdown_closes_everything() {
        let runtime = runtime();
        let journal = runtime.open_journal("j");
        let publisher = runtime.publish("j", "b", "t").unwrap();
        journal
            .write("s", NO_STREAM_VERSION, &EntryBatch::of("t", "b"))
            .unwrap();

        runtime.shutdown();
        assert!(publisher.is_closed());
        assert!(publisher.topic().is_closed());
        assert!(journal.is_empty());
        assert!(!runtime.journals().contains("j"));
        assert_eq!(runtime.publisher_count(), 0);
    }
}
