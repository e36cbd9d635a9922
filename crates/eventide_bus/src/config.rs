//! Topic configuration.

use std::time::Duration;

/// Configuration applied to every topic a bus opens.
#[derive(Debug, Clone)]
pub struct TopicConfig {
    /// How long the dispatcher sleeps when there is nothing to deliver.
    ///
    /// Publishing and subscribing wake the dispatcher early, so this only
    /// bounds how often an idle dispatcher rechecks its state.
    pub idle_interval: Duration,

    /// Prefix of dispatcher thread names; the topic name is appended.
    pub thread_name_prefix: String,
}

impl Default for TopicConfig {
    fn default() -> Self {
        Self {
            idle_interval: Duration::from_millis(100),
            thread_name_prefix: "eventide-topic".to_string(),
        }
    }
}

impl TopicConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the dispatcher idle interval.
    #[must_use]
    pub fn idle_interval(mut self, interval: Duration) -> Self {
        self.idle_interval = interval;
        self
    }

    /// Sets the dispatcher thread name prefix.
    #[must_use]
    pub fn thread_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name_prefix = prefix.into();
        self
    }

    pub(crate) fn thread_name(&self, topic: &str) -> String {
        format!("{}-{}", self.thread_name_prefix, topic)
    }
}
