//! Topics and their dispatcher threads.

use crate::config::TopicConfig;
use crate::error::{BusError, BusResult};
use crate::message::{Message, Subscriber};
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};
use tracing::{debug, error, info, warn};

#[derive(Default)]
struct TopicState {
    queue: VecDeque<Message>,
    subscribers: Vec<Arc<dyn Subscriber>>,
    /// A message has been dequeued and is still being handed to subscribers.
    delivering: bool,
}

struct TopicShared {
    name: String,
    config: TopicConfig,
    state: Mutex<TopicState>,
    /// Signalled on publish, subscribe and close.
    wake: Condvar,
    /// Signalled whenever a delivery finishes.
    delivered: Condvar,
    closed: AtomicBool,
}

impl TopicShared {
    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Takes the next message and the subscribers to hand it to.
    ///
    /// Returns `None` after idling when there is nothing to deliver.
    fn next_delivery(&self) -> Option<(Message, Vec<Arc<dyn Subscriber>>)> {
        let mut state = self.state.lock();
        if self.is_closed() {
            return None;
        }
        if state.subscribers.is_empty() || state.queue.is_empty() {
            self.wake.wait_for(&mut state, self.config.idle_interval);
            return None;
        }

        let message = state.queue.pop_front()?;
        state.delivering = true;
        Some((message, state.subscribers.clone()))
    }

    fn deliver(&self, message: &Message, subscribers: &[Arc<dyn Subscriber>]) {
        for subscriber in subscribers {
            match panic::catch_unwind(AssertUnwindSafe(|| subscriber.handle(message))) {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    error!(
                        topic = %self.name,
                        message_id = %message.id,
                        error = %err,
                        "error dispatching message to subscriber"
                    );
                }
                Err(_) => {
                    error!(
                        topic = %self.name,
                        message_id = %message.id,
                        "subscriber panicked while handling message"
                    );
                }
            }
        }
    }

    fn finish_delivery(&self) {
        let mut state = self.state.lock();
        state.delivering = false;
        self.delivered.notify_all();
    }

    fn dispatch_each(&self) {
        debug!(topic = %self.name, "dispatcher started");
        while !self.is_closed() {
            if let Some((message, subscribers)) = self.next_delivery() {
                self.deliver(&message, &subscribers);
                self.finish_delivery();
            }
        }
        debug!(topic = %self.name, "dispatcher stopped");
    }
}

/// A named channel that fans published messages out to its subscribers.
///
/// Each topic owns one dispatcher thread for its whole lifetime. The
/// dispatcher delivers one message at a time, in publish order, to every
/// subscriber registered when the message is taken off the queue.
/// Messages published while the topic has no subscribers wait in the
/// queue until one subscribes.
///
/// Every message accepted by [`Topic::publish`] is delivered, with two
/// exceptions where [`Topic::close`] cannot drain the queue: a topic closed
/// while it has no subscribers, and a topic closed from inside one of its
/// own subscribers. In both cases the waiting messages are discarded and
/// the number dropped is logged.
pub struct Topic {
    shared: Arc<TopicShared>,
    dispatcher: Mutex<Option<JoinHandle<()>>>,
    dispatcher_id: ThreadId,
}

impl Topic {
    /// Creates a topic and starts its dispatcher thread.
    ///
    /// # Errors
    ///
    /// Returns [`BusError::Spawn`] if the thread cannot be started.
    pub fn new(name: impl Into<String>, config: TopicConfig) -> BusResult<Self> {
        let name = name.into();
        let shared = Arc::new(TopicShared {
            config: config.clone(),
            name: name.clone(),
            state: Mutex::new(TopicState::default()),
            wake: Condvar::new(),
            delivered: Condvar::new(),
            closed: AtomicBool::new(false),
        });

        let worker = Arc::clone(&shared);
        let handle = thread::Builder::new()
            .name(config.thread_name(&name))
            .spawn(move || worker.dispatch_each())?;

        Ok(Self {
            shared,
            dispatcher_id: handle.thread().id(),
            dispatcher: Mutex::new(Some(handle)),
        })
    }

    /// Returns the topic's name.
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Queues a message for delivery. Never blocks on delivery.
    ///
    /// # Errors
    ///
    /// Returns [`BusError::TopicClosed`] once the topic has been closed.
    pub fn publish(&self, message: Message) -> BusResult<()> {
        let mut state = self.shared.state.lock();
        // Checked under the lock so a message is never queued behind a close.
        if self.shared.is_closed() {
            return Err(BusError::topic_closed(self.name()));
        }
        state.queue.push_back(message);
        self.shared.wake.notify_one();
        Ok(())
    }

    /// Registers a subscriber. Registering the same `Arc` twice has no effect.
    pub fn subscribe(&self, subscriber: Arc<dyn Subscriber>) {
        let mut state = self.shared.state.lock();
        let known = state
            .subscribers
            .iter()
            .any(|s| std::ptr::addr_eq(Arc::as_ptr(s), Arc::as_ptr(&subscriber)));
        if !known {
            state.subscribers.push(subscriber);
            self.shared.wake.notify_one();
        }
    }

    /// Returns the number of registered subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.shared.state.lock().subscribers.len()
    }

    /// Returns the number of messages waiting for delivery.
    pub fn pending(&self) -> usize {
        self.shared.state.lock().queue.len()
    }

    /// Returns true once the topic has been closed.
    pub fn is_closed(&self) -> bool {
        self.shared.is_closed()
    }

    /// Waits for every queued message to be delivered, then stops the dispatcher.
    ///
    /// Returns only after the last dequeued message has been handed to all
    /// subscribers. Blocks for as long as messages keep being published.
    /// Messages queued on a topic nobody subscribed to are discarded, as
    /// are messages still queued when a subscriber closes its own topic.
    pub fn close(&self) {
        let mut state = self.shared.state.lock();
        if thread::current().id() == self.dispatcher_id {
            // Called from a subscriber: the dispatcher cannot wait for itself.
            self.discard_queue(&mut state, "closing topic from its own subscriber");
            self.shared.closed.store(true, Ordering::SeqCst);
            return;
        }

        while state.delivering || !(state.queue.is_empty() || state.subscribers.is_empty()) {
            self.shared
                .delivered
                .wait_for(&mut state, self.shared.config.idle_interval);
        }
        self.discard_queue(&mut state, "closing topic without subscribers");
        self.shared.closed.store(true, Ordering::SeqCst);
        self.shared.wake.notify_all();
        drop(state);

        self.join();
        info!(topic = %self.name(), "topic closed");
    }

    fn discard_queue(&self, state: &mut TopicState, reason: &str) {
        if !state.queue.is_empty() {
            warn!(topic = %self.name(), dropped = state.queue.len(), "{reason}");
            state.queue.clear();
        }
    }

    fn stop(&self) {
        let _state = self.shared.state.lock();
        self.shared.closed.store(true, Ordering::SeqCst);
        self.shared.wake.notify_all();
    }

    fn join(&self) {
        if let Some(handle) = self.dispatcher.lock().take() {
            if handle.join().is_err() {
                warn!(topic = %self.name(), "dispatcher thread panicked");
            }
        }
    }
}

impl Drop for Topic {
    fn drop(&mut self) {
        if !self.is_closed() {
            debug!(
                topic = %self.name(),
                pending = self.pending(),
                "dropping open topic without draining"
            );
        }
        self.stop();
        if thread::current().id() != self.dispatcher_id {
            self.join();
        }
    }
}

impl std::fmt::Debug for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Topic")
            .field("name", &self.name())
            .field("subscribers", &self.subscriber_count())
            .field("pending", &self.pending())
            .field("closed", &self.is_closed())
            .finish()
    }
}
