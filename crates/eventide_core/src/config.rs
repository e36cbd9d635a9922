//! Runtime configuration.

use eventide_bus::TopicConfig;
use eventide_journal::StreamQuery;
use std::time::Duration;

/// Configuration for a [`JournalPublisher`](crate::JournalPublisher).
#[derive(Debug, Clone)]
pub struct PublisherConfig {
    /// How long the relay sleeps after finding nothing new to publish.
    pub poll_interval: Duration,

    /// Which entries the publisher relays.
    ///
    /// Defaults to [`StreamQuery::All`]: every entry of the journal.
    pub scope: StreamQuery,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(100),
            scope: StreamQuery::All,
        }
    }
}

impl PublisherConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the poll interval.
    #[must_use]
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Restricts the publisher to the entries selected by `scope`.
    #[must_use]
    pub fn scope(mut self, scope: StreamQuery) -> Self {
        self.scope = scope;
        self
    }
}

/// Configuration for a [`Runtime`](crate::Runtime).
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Applied to every topic opened through the runtime's buses.
    pub topic: TopicConfig,

    /// Default for publishers started with [`Runtime::publish`](crate::Runtime::publish).
    pub publisher: PublisherConfig,
}

impl Config {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the topic configuration.
    #[must_use]
    pub fn topic(mut self, topic: TopicConfig) -> Self {
        self.topic = topic;
        self
    }

    /// Sets the default publisher configuration.
    #[must_use]
    pub fn publisher(mut self, publisher: PublisherConfig) -> Self {
        self.publisher = publisher;
        self
    }

    /// Uses `interval` both for topic idling and publisher polling.
    ///
    /// Short intervals make tests and demos respond quickly.
    #[must_use]
    pub fn poll_every(mut self, interval: Duration) -> Self {
        self.topic.idle_interval = interval;
        self.publisher.poll_interval = interval;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.publisher.poll_interval, Duration::from_millis(100));
        assert_eq!(config.publisher.scope, StreamQuery::All);
        assert_eq!(config.topic.idle_interval, Duration::from_millis(100));
    }

    #[test]
    fn builder_pattern() {
        let config = Config::new()
            .poll_every(Duration::from_millis(10))
            .publisher(
                PublisherConfig::new()
                    .poll_interval(Duration::from_millis(20))
                    .scope(StreamQuery::parse("cat-product")),
            );

        assert_eq!(config.topic.idle_interval, Duration::from_millis(10));
        assert_eq!(config.publisher.poll_interval, Duration::from_millis(20));
        assert_eq!(
            config.publisher.scope,
            StreamQuery::Category("product".into())
        );
    }
}
