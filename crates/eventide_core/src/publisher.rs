//! Relaying journaled entries onto a topic.

use crate::config::PublisherConfig;
use crate::error::{CoreError, CoreResult};
use eventide_bus::{BusError, Message, Topic};
use eventide_journal::{Journal, JournalReader};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};
use std::time::Duration;
use tracing::{debug, info, warn};

struct Relay {
    reader: Arc<JournalReader>,
    topic: Arc<Topic>,
    poll_interval: Duration,
    closed: AtomicBool,
}

impl Relay {
    /// Publishes the next unread entry, if any.
    ///
    /// Returns false when the reader has caught up with the journal.
    fn relay_next(&self) -> CoreResult<bool> {
        let stored = self.reader.read_next()?;
        if !stored.is_valid() {
            return Ok(false);
        }

        self.topic.publish(Message::new(
            stored.id.to_string(),
            stored.entry.entry_type,
            stored.entry.body,
        ))?;
        self.reader.acknowledge(stored.id)?;
        Ok(true)
    }

    fn dispatch_each(&self) {
        debug!(topic = %self.topic.name(), reader = %self.reader.name(), "publisher started");
        while !self.closed.load(Ordering::SeqCst) {
            match self.relay_next() {
                Ok(true) => {}
                Ok(false) => thread::sleep(self.poll_interval),
                Err(CoreError::Bus(BusError::TopicClosed { name })) => {
                    info!(topic = %name, "topic closed, stopping publisher");
                    self.closed.store(true, Ordering::SeqCst);
                }
                Err(err) => {
                    warn!(topic = %self.topic.name(), error = %err, "failed to relay entry");
                    thread::sleep(self.poll_interval);
                }
            }
        }
        debug!(topic = %self.topic.name(), "publisher stopped");
    }
}

/// Continuously publishes new journal entries to a topic.
///
/// The publisher tails the journal with its own reader, named after the
/// topic, so publishers feeding different topics keep independent
/// positions. Each entry becomes a [`Message`] whose id is the entry's
/// position in the reader's scope, whose type is the entry type and whose
/// payload is the entry body. An entry is acknowledged only after it has
/// been queued on the topic.
pub struct JournalPublisher {
    relay: Arc<Relay>,
    worker: Mutex<Option<JoinHandle<()>>>,
    worker_id: ThreadId,
}

impl JournalPublisher {
    /// Starts relaying `journal` onto `topic`.
    ///
    /// The reader is created over `config.scope` the first time this topic
    /// is published from this journal; later publishers for the same topic
    /// resume from its position.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Io`] if the relay thread cannot be started.
    pub fn from(journal: &Journal, topic: Arc<Topic>, config: PublisherConfig) -> CoreResult<Self> {
        let reader = journal.reader_with_scope(topic.name(), config.scope);
        let relay = Arc::new(Relay {
            reader,
            topic,
            poll_interval: config.poll_interval,
            closed: AtomicBool::new(false),
        });

        let worker = Arc::clone(&relay);
        let handle = thread::Builder::new()
            .name(format!("eventide-publisher-{}", relay.topic.name()))
            .spawn(move || worker.dispatch_each())?;

        info!(
            journal = %journal.name(),
            topic = %relay.topic.name(),
            scope = %relay.reader.scope(),
            "journal publisher started"
        );
        Ok(Self {
            relay,
            worker_id: handle.thread().id(),
            worker: Mutex::new(Some(handle)),
        })
    }

    /// Returns the reader tracking what has been published.
    pub fn reader(&self) -> &Arc<JournalReader> {
        &self.relay.reader
    }

    /// Returns the topic entries are published to.
    pub fn topic(&self) -> &Arc<Topic> {
        &self.relay.topic
    }

    /// Returns true once the publisher has stopped or been asked to stop.
    pub fn is_closed(&self) -> bool {
        self.relay.closed.load(Ordering::SeqCst)
    }

    /// Stops relaying after the current iteration and waits for the thread.
    ///
    /// An entry already being published is finished, not abandoned.
    pub fn close(&self) {
        self.relay.closed.store(true, Ordering::SeqCst);
        if thread::current().id() == self.worker_id {
            return;
        }
        if let Some(handle) = self.worker.lock().take() {
            if handle.join().is_err() {
                warn!(topic = %self.relay.topic.name(), "publisher thread panicked");
            } else {
                info!(topic = %self.relay.topic.name(), "journal publisher closed");
            }
        }
    }
}

impl Drop for JournalPublisher {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for JournalPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JournalPublisher")
            .field("topic", &self.relay.topic.name())
            .field("reader", &self.relay.reader)
            .field("closed", &self.is_closed())
            .finish()
    }
}
