//! Benchmark utilities.

use eventide_journal::{EntryBatch, Journal, JournalRegistry, NO_STREAM_VERSION};
use rand::distributions::Alphanumeric;
use rand::seq::SliceRandom;
use rand::Rng;
use std::sync::Arc;

/// Generate a random alphanumeric body of the specified size.
pub fn random_body(size: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(size)
        .map(char::from)
        .collect()
}

/// Generate a batch of `count` entries with bodies of `body_size` bytes.
pub fn generate_batch(count: usize, body_size: usize) -> EntryBatch {
    let mut batch = EntryBatch::with_capacity(count);
    for _ in 0..count {
        batch.add_entry("BenchEvent", random_body(body_size));
    }
    batch
}

/// Open a journal holding `streams` streams of `per_stream` entries each,
/// interleaved in random order.
pub fn populated_journal(streams: usize, per_stream: usize) -> Arc<Journal> {
    let journal = JournalRegistry::new().open("bench");
    let mut order: Vec<usize> = (0..streams).flat_map(|s| std::iter::repeat(s).take(per_stream)).collect();
    order.shuffle(&mut rand::thread_rng());

    let mut versions = vec![NO_STREAM_VERSION; streams];
    let single = generate_batch(1, 64);
    for slot in order {
        journal
            .write(&format!("bench_{slot}"), versions[slot], &single)
            .expect("writes at the current version cannot conflict");
        versions[slot] += 1;
    }
    journal
}
