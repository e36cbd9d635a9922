//! Stress tests for Eventide.
//!
//! These helpers drive a journal and a topic under heavy load and
//! concurrent access.

use crate::fixtures::RecordingSubscriber;
use eventide_bus::{Message, Topic};
use eventide_journal::{EntryBatch, Journal, StreamQuery, NO_STREAM_VERSION};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Outcome of one stress run.
///
/// `retried` counts optimistic concurrency conflicts that were retried
/// until they succeeded, so it never overlaps with `failed`.
#[derive(Debug, Clone, Default)]
pub struct StressReport {
    /// Writes appended, entries read or messages delivered.
    pub completed: usize,
    /// Conflicting writes that were retried.
    pub retried: usize,
    /// Operations that did not complete.
    pub failed: usize,
    /// Wall-clock time of the run.
    pub elapsed: Duration,
}

impl StressReport {
    /// Completed operations per second.
    pub fn throughput(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.completed as f64 / secs
        } else {
            0.0
        }
    }

    /// Fraction of write attempts that hit a conflict.
    pub fn conflict_rate(&self) -> f64 {
        let attempts = self.completed + self.retried;
        if attempts == 0 {
            0.0
        } else {
            self.retried as f64 / attempts as f64
        }
    }

    /// Prints the report under `title`.
    pub fn print_summary(&self, title: &str) {
        println!("\n{title}\n{self}");
    }
}

impl fmt::Display for StressReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "  completed {:>8}  retried {:>8} ({:.1}%)  failed {:>6}  {:>10.0} ops/s  in {:?}",
            self.completed,
            self.retried,
            self.conflict_rate() * 100.0,
            self.failed,
            self.throughput(),
            self.elapsed
        )
    }
}

/// Configuration for stress tests.
#[derive(Debug, Clone)]
pub struct StressConfig {
    /// Number of operations to perform.
    pub operations: usize,
    /// Number of concurrent threads (for concurrent tests).
    pub threads: usize,
    /// Number of entries per written batch.
    pub batch_size: usize,
    /// Number of distinct streams.
    pub stream_count: usize,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            operations: 10_000,
            threads: 4,
            batch_size: 1,
            stream_count: 100,
        }
    }
}

fn stress_batch(size: usize) -> EntryBatch {
    let mut batch = EntryBatch::with_capacity(size);
    for i in 0..size {
        batch.add_entry("StressEvent", format!("{{\"n\":{i}}}"));
    }
    batch
}

/// Run a sequential write stress test, spreading writes over
/// `stream_count` streams with correct expected versions.
pub fn stress_sequential_writes(journal: &Journal, config: &StressConfig) -> StressReport {
    let batch = stress_batch(config.batch_size);
    let mut versions = vec![NO_STREAM_VERSION; config.stream_count.max(1)];

    let start = Instant::now();
    let mut successful = 0usize;
    let mut failed = 0usize;

    for i in 0..config.operations {
        let slot = i % versions.len();
        match journal.write(&format!("stress_{slot}"), versions[slot], &batch) {
            Ok(()) => {
                versions[slot] += batch.len() as i64;
                successful += 1;
            }
            Err(_) => failed += 1,
        }
    }

    StressReport {
        completed: successful,
        failed,
        elapsed: start.elapsed(),
        ..StressReport::default()
    }
}

/// Run a concurrent write stress test where every thread competes for the
/// same stream.
///
/// Each thread reads the stream's version and retries on conflict, so
/// `completed` counts appended batches and `retried` counts conflicts
/// that sent a writer back to re-read the stream.
pub fn stress_contended_writes(journal: Arc<Journal>, config: &StressConfig) -> StressReport {
    let successful = Arc::new(AtomicUsize::new(0));
    let conflicts = Arc::new(AtomicUsize::new(0));
    let ops_per_thread = config.operations / config.threads.max(1);

    let start = Instant::now();

    let handles: Vec<_> = (0..config.threads.max(1))
        .map(|_| {
            let journal = Arc::clone(&journal);
            let successful = Arc::clone(&successful);
            let conflicts = Arc::clone(&conflicts);
            let batch = stress_batch(config.batch_size);

            thread::spawn(move || {
                let stream = StreamQuery::Stream("contended_1".to_string());
                for _ in 0..ops_per_thread {
                    loop {
                        let current = journal.stream_reader().stream_for_query(&stream);
                        let expected = if current.is_empty() {
                            NO_STREAM_VERSION
                        } else {
                            current.stream_version
                        };
                        match journal.write("contended_1", expected, &batch) {
                            Ok(()) => {
                                successful.fetch_add(1, Ordering::Relaxed);
                                break;
                            }
                            Err(_) => {
                                conflicts.fetch_add(1, Ordering::Relaxed);
                            }
                        }
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    StressReport {
        completed: successful.load(Ordering::Relaxed),
        retried: conflicts.load(Ordering::Relaxed),
        failed: 0,
        elapsed: start.elapsed(),
    }
}

/// Run concurrent readers over a populated journal.
///
/// Each thread owns a reader and drains the whole journal, acknowledging
/// every entry. An out-of-order id counts as a failure.
pub fn stress_concurrent_readers(journal: Arc<Journal>, config: &StressConfig) -> StressReport {
    let batch = stress_batch(config.batch_size);
    for i in 0..config.operations {
        let _ = journal.write(&format!("readers_{i}"), NO_STREAM_VERSION, &batch);
    }

    let successful = Arc::new(AtomicUsize::new(0));
    let failed = Arc::new(AtomicUsize::new(0));
    let start = Instant::now();

    let handles: Vec<_> = (0..config.threads.max(1))
        .map(|t| {
            let reader = journal.reader_with_scope(&format!("stress-reader-{t}"), StreamQuery::All);
            let successful = Arc::clone(&successful);
            let failed = Arc::clone(&failed);

            thread::spawn(move || {
                let mut next = 0i64;
                loop {
                    let stored = match reader.read_next() {
                        Ok(stored) if stored.is_valid() => stored,
                        Ok(_) => break,
                        Err(_) => {
                            failed.fetch_add(1, Ordering::Relaxed);
                            break;
                        }
                    };
                    if stored.id == next && reader.acknowledge(stored.id).is_ok() {
                        successful.fetch_add(1, Ordering::Relaxed);
                    } else {
                        failed.fetch_add(1, Ordering::Relaxed);
                        break;
                    }
                    next += 1;
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    StressReport {
        completed: successful.load(Ordering::Relaxed),
        failed: failed.load(Ordering::Relaxed),
        elapsed: start.elapsed(),
        ..StressReport::default()
    }
}

/// Publish `operations` messages from `threads` publishers onto one topic
/// and wait until a recording subscriber has seen all of them.
///
/// Messages that never arrive count as failures.
pub fn stress_topic_fanout(topic: Arc<Topic>, config: &StressConfig) -> StressReport {
    let recorder = RecordingSubscriber::new();
    topic.subscribe(recorder.clone());
    let threads = config.threads.max(1);
    let per_thread = config.operations / threads;

    let start = Instant::now();
    let handles: Vec<_> = (0..threads)
        .map(|t| {
            let topic = Arc::clone(&topic);
            thread::spawn(move || {
                (0..per_thread)
                    .filter(|i| {
                        topic
                            .publish(Message::new(format!("{t}-{i}"), "StressEvent", "{}"))
                            .is_ok()
                    })
                    .count()
            })
        })
        .collect();

    let published: usize = handles
        .into_iter()
        .map(|h| h.join().expect("Thread panicked"))
        .sum();
    recorder.wait_for(published);

    let delivered = recorder.len().min(published);
    StressReport {
        completed: delivered,
        failed: threads * per_thread - delivered,
        elapsed: start.elapsed(),
        ..StressReport::default()
    }
}
