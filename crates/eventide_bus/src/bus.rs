//! Named buses and their topics.

use crate::config::TopicConfig;
use crate::error::BusResult;
use crate::topic::Topic;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// A named group of topics.
///
/// # Example
///
/// ```
/// use eventide_bus::{BusRegistry, BusResult, Message, TopicConfig};
/// use std::sync::Arc;
///
/// let buses = BusRegistry::new(TopicConfig::default());
/// let bus = buses.start("orders-bus");
/// let topic = bus.open_topic("orders").unwrap();
///
/// topic.subscribe(Arc::new(|message: &Message| -> BusResult<()> {
///     println!("{message}");
///     Ok(())
/// }));
/// topic.publish(Message::new("0", "OrderPlaced", "{}")).unwrap();
/// topic.close();
/// ```
pub struct MessageBus {
    name: String,
    config: TopicConfig,
    topics: Mutex<HashMap<String, Arc<Topic>>>,
}

impl MessageBus {
    fn new(name: String, config: TopicConfig) -> Self {
        Self {
            name,
            config,
            topics: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the bus name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the topic called `name`, creating it and its dispatcher if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if a new topic's dispatcher thread cannot be started.
    pub fn open_topic(&self, name: &str) -> BusResult<Arc<Topic>> {
        let mut topics = self.topics.lock();
        if let Some(topic) = topics.get(name) {
            return Ok(Arc::clone(topic));
        }

        let topic = Arc::new(Topic::new(name, self.config.clone())?);
        debug!(bus = %self.name, topic = name, "opened topic");
        topics.insert(name.to_string(), Arc::clone(&topic));
        Ok(topic)
    }

    /// Returns the names of all open topics, sorted.
    pub fn topic_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.topics.lock().keys().cloned().collect();
        names.sort();
        names
    }

    /// Closes every topic, draining each first.
    pub fn close(&self) {
        let topics: Vec<_> = self.topics.lock().drain().map(|(_, t)| t).collect();
        for topic in topics {
            topic.close();
        }
        info!(bus = %self.name, "message bus closed");
    }
}

impl std::fmt::Debug for MessageBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageBus")
            .field("name", &self.name)
            .field("topics", &self.topic_names())
            .finish()
    }
}

/// Named message buses, started on first use.
pub struct BusRegistry {
    config: TopicConfig,
    buses: Mutex<HashMap<String, Arc<MessageBus>>>,
}

impl BusRegistry {
    /// Creates an empty registry whose buses open topics with `config`.
    pub fn new(config: TopicConfig) -> Self {
        Self {
            config,
            buses: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the bus called `name`, creating it if needed.
    pub fn start(&self, name: &str) -> Arc<MessageBus> {
        let mut buses = self.buses.lock();
        if let Some(bus) = buses.get(name) {
            return Arc::clone(bus);
        }

        debug!(bus = name, "started message bus");
        let bus = Arc::new(MessageBus::new(name.to_string(), self.config.clone()));
        buses.insert(name.to_string(), Arc::clone(&bus));
        bus
    }

    /// Returns true if a bus called `name` has been started.
    pub fn contains(&self, name: &str) -> bool {
        self.buses.lock().contains_key(name)
    }

    /// Closes and forgets every bus.
    pub fn shutdown(&self) {
        let buses: Vec<_> = self.buses.lock().drain().map(|(_, b)| b).collect();
        for bus in buses {
            bus.close();
        }
    }
}

impl Default for BusRegistry {
    fn default() -> Self {
        Self::new(TopicConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Message;
    use std::time::Duration;

    #[test]
    fn start_is_idempotent() {
        let buses = BusRegistry::default();
        let bus = buses.start("test_bus");
        assert_eq!(bus.name(), "test_bus");
        assert!(Arc::ptr_eq(&bus, &buses.start("test_bus")));
        assert!(buses.contains("test_bus"));
        assert!(!buses.contains("other"));
    }

    #[test]
    fn open_topic_is_idempotent() {
        let bus = BusRegistry::default().start("test_bus");
        let topic = bus.open_topic("test_topic").unwrap();
        assert_eq!(topic.name(), "test_topic");
        assert!(Arc::ptr_eq(&topic, &bus.open_topic("test_topic").unwrap()));
        assert_eq!(bus.topic_names(), ["test_topic"]);
        topic.close();
    }

    #[test]
    fn concurrent_open_yields_one_topic() {
        let bus = BusRegistry::default().start("race");
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let bus = Arc::clone(&bus);
                std::thread::spawn(move || bus.open_topic("t").unwrap())
            })
            .collect();
        let topics: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(topics.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    }

    #[test]
    fn shutdown_drains_topics() {
        let buses = BusRegistry::new(TopicConfig::new().idle_interval(Duration::from_millis(5)));
        let topic = buses.start("b").open_topic("t").unwrap();
        let seen = Arc::new(Mutex::new(0usize));
        let counter = Arc::clone(&seen);
        topic.subscribe(Arc::new(move |_: &Message| -> BusResult<()> {
            *counter.lock() += 1;
            Ok(())
        }));
        for i in 0..10 {
            topic.publish(Message::new(i.to_string(), "t", "p")).unwrap();
        }

        buses.shutdown();
        assert_eq!(*seen.lock(), 10);
        assert!(topic.is_closed());
        assert!(!buses.contains("b"));
    }
}
