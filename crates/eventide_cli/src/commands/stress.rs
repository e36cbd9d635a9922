//! Stress command implementation.

use eventide_testkit::{
    fast_topic, stress_concurrent_readers, stress_contended_writes, stress_sequential_writes,
    stress_topic_fanout, StressConfig, TestJournal,
};
use std::sync::Arc;
use tracing::info;

/// Runs the stress command.
pub fn run(operations: usize, threads: usize, batch_size: usize) -> Result<(), Box<dyn std::error::Error>> {
    if threads == 0 || batch_size == 0 {
        return Err("threads and batch size must be at least 1".into());
    }

    let config = StressConfig {
        operations,
        threads,
        batch_size,
        ..Default::default()
    };
    info!(?config, "running stress tests");

    let journal = TestJournal::new();
    stress_sequential_writes(&journal, &config).print_summary("Sequential writes");

    let journal = TestJournal::new();
    stress_contended_writes(Arc::clone(&journal.journal), &config)
        .print_summary("Contended writes");

    let journal = TestJournal::new();
    stress_concurrent_readers(Arc::clone(&journal.journal), &config)
        .print_summary("Concurrent readers");

    let topic = fast_topic("stress");
    let result = stress_topic_fanout(Arc::clone(&topic), &config);
    topic.close();
    result.print_summary("Topic fan-out");

    Ok(())
}
