//! Test fixtures and journal helpers.
//!
//! Provides convenience functions for setting up journals, topics and
//! subscribers in tests.

use eventide_bus::{BusError, BusResult, Message, Subscriber, Topic, TopicConfig};
use eventide_journal::{EntryBatch, Journal, JournalRegistry};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// How long the wait helpers give up after.
pub const DEFAULT_WAIT: Duration = Duration::from_secs(5);

/// Returns a name that is unique across the test run.
pub fn unique_name(prefix: &str) -> String {
    format!("{prefix}-{}", uuid::Uuid::new_v4().simple())
}

/// Topic configuration with a short idle interval, so tests finish quickly.
pub fn fast_topic_config() -> TopicConfig {
    TopicConfig::new().idle_interval(Duration::from_millis(5))
}

/// Creates a topic with [`fast_topic_config`].
pub fn fast_topic(name: &str) -> Arc<Topic> {
    Arc::new(Topic::new(name, fast_topic_config()).expect("Failed to start topic"))
}

/// A journal backed by its own registry.
pub struct TestJournal {
    /// The journal instance.
    pub journal: Arc<Journal>,
    /// The registry (kept alive so the journal can be closed normally).
    pub registry: JournalRegistry,
}

impl TestJournal {
    /// Creates an empty journal with a unique name.
    pub fn new() -> Self {
        let registry = JournalRegistry::new();
        let journal = registry.open(&unique_name("test-journal"));
        Self { journal, registry }
    }
}

impl Default for TestJournal {
    fn default() -> Self {
        Self::new()
    }
}

impl std::ops::Deref for TestJournal {
    type Target = Journal;

    fn deref(&self) -> &Self::Target {
        &self.journal
    }
}

/// Runs a test with an empty journal.
///
/// # Example
///
/// ```rust,ignore
/// use eventide_testkit::with_journal;
///
/// #[test]
/// fn my_test() {
///     with_journal(|journal| {
///         assert!(journal.is_empty());
///     });
/// }
/// ```
pub fn with_journal<F, R>(f: F) -> R
where
    F: FnOnce(&Journal) -> R,
{
    let test_journal = TestJournal::new();
    f(&test_journal)
}

/// Builds a batch of `count` entries typed `entry_type`.
///
/// Bodies are `"<entry_type>-<n>"` for n in `0..count`.
pub fn batch_of(entry_type: &str, count: usize) -> EntryBatch {
    let mut batch = EntryBatch::with_capacity(count);
    for i in 0..count {
        batch.add_entry(entry_type, format!("{entry_type}-{i}"));
    }
    batch
}

/// Polls `condition` until it holds or `timeout` passes.
///
/// Returns the final value of the condition.
pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    condition()
}

/// A subscriber that keeps every message it handles.
#[derive(Debug, Default)]
pub struct RecordingSubscriber {
    handled: Mutex<Vec<Message>>,
}

impl RecordingSubscriber {
    /// Creates a subscriber with no recorded messages.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Returns a copy of the recorded messages, in handling order.
    pub fn messages(&self) -> Vec<Message> {
        self.handled.lock().clone()
    }

    /// Returns the recorded message ids.
    pub fn ids(&self) -> Vec<String> {
        self.handled.lock().iter().map(|m| m.id.clone()).collect()
    }

    /// Returns the recorded payloads.
    pub fn payloads(&self) -> Vec<String> {
        self.handled.lock().iter().map(|m| m.payload.clone()).collect()
    }

    /// Returns the number of recorded messages.
    pub fn len(&self) -> usize {
        self.handled.lock().len()
    }

    /// Returns true if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Waits until at least `count` messages were recorded.
    pub fn wait_for(&self, count: usize) -> bool {
        wait_until(DEFAULT_WAIT, || self.len() >= count)
    }
}

impl Subscriber for RecordingSubscriber {
    fn handle(&self, message: &Message) -> BusResult<()> {
        self.handled.lock().push(message.clone());
        Ok(())
    }
}

/// A subscriber that rejects every message.
#[derive(Debug, Default)]
pub struct FailingSubscriber {
    attempts: AtomicUsize,
}

impl FailingSubscriber {
    /// Creates a failing subscriber.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Returns how many messages it was handed.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl Subscriber for FailingSubscriber {
    fn handle(&self, message: &Message) -> BusResult<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(BusError::subscriber(format!("rejected message {}", message.id)))
    }
}

/// Test scenario helpers.
pub mod scenarios {
    use super::*;
    use eventide_journal::NO_STREAM_VERSION;

    /// Creates a journal with `streams` streams named `<category>_<n>`,
    /// each holding `per_stream` entries.
    ///
    /// Streams are written one after another, so each stream's entries are
    /// contiguous in the journal.
    pub fn populated_journal(category: &str, streams: usize, per_stream: usize) -> TestJournal {
        let journal = TestJournal::new();
        for n in 0..streams {
            journal
                .write(
                    &format!("{category}_{n}"),
                    NO_STREAM_VERSION,
                    &batch_of("Populated", per_stream),
                )
                .expect("Failed to populate journal");
        }
        journal
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eventide_journal::NO_STREAM_VERSION;

    #[test]
    fn test_with_journal() {
        let len = with_journal(|journal| {
            journal
                .write("s", NO_STREAM_VERSION, &batch_of("t", 3))
                .unwrap();
            journal.len()
        });
        assert_eq!(len, 3);
    }

    #[test]
    fn test_unique_names() {
        assert_ne!(unique_name("j"), unique_name("j"));
        assert!(unique_name("j").starts_with("j-"));
    }

    #[test]
    fn test_recording_and_failing_subscribers() {
        let topic = fast_topic("fixtures");
        let recorder = RecordingSubscriber::new();
        let failing = FailingSubscriber::new();
        topic.subscribe(failing.clone());
        topic.subscribe(recorder.clone());

        topic.publish(Message::new("0", "t", "a")).unwrap();
        topic.publish(Message::new("1", "t", "b")).unwrap();
        topic.close();

        assert_eq!(recorder.ids(), ["0", "1"]);
        assert_eq!(recorder.payloads(), ["a", "b"]);
        assert_eq!(failing.attempts(), 2);
    }

    #[test]
    fn test_populated_journal() {
        let journal = scenarios::populated_journal("product", 3, 4);
        assert_eq!(journal.len(), 12);
        let stream = journal.stream_reader().stream_for("product_2");
        assert_eq!(stream.stream_version, 3);
    }
}
