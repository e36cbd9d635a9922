//! Property-based test generators using proptest.
//!
//! Provides strategies for generating stream names, entries and write
//! sequences against the journal.

use eventide_journal::EntryBatch;
use proptest::prelude::*;

/// Category keys used by generated stream names.
pub const CATEGORIES: [&str; 3] = ["product", "person", "order"];

/// Strategy for generating entity stream names, `<category>_<id>`.
pub fn stream_name_strategy() -> impl Strategy<Value = String> {
    (prop::sample::select(CATEGORIES.to_vec()), 0u8..8).prop_map(|(category, id)| format!("{category}_{id}"))
}

/// Strategy for generating entry type tags.
pub fn entry_type_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[A-Z][a-zA-Z]{0,15}").expect("Invalid regex")
}

/// Strategy for generating entry bodies.
pub fn body_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("\\{\"[a-z]{1,8}\":[0-9]{1,6}\\}").expect("Invalid regex")
}

/// Strategy for generating non-empty batches of up to `max_len` entries.
pub fn batch_strategy(max_len: usize) -> impl Strategy<Value = EntryBatch> {
    prop::collection::vec((entry_type_strategy(), body_strategy()), 1..=max_len.max(1)).prop_map(
        |entries| {
            let mut batch = EntryBatch::with_capacity(entries.len());
            for (entry_type, body) in entries {
                batch.add_entry(entry_type, body);
            }
            batch
        },
    )
}

/// One write against the journal.
#[derive(Debug, Clone)]
pub struct WriteOperation {
    /// Stream written to.
    pub stream: String,
    /// Entries written.
    pub batch: EntryBatch,
}

/// Strategy for generating a single write of up to 4 entries.
pub fn write_operation_strategy() -> impl Strategy<Value = WriteOperation> {
    (stream_name_strategy(), batch_strategy(4)).prop_map(|(stream, batch)| WriteOperation { stream, batch })
}

/// Strategy for generating a sequence of writes.
pub fn write_sequence_strategy(
    min_ops: usize,
    max_ops: usize,
) -> impl Strategy<Value = Vec<WriteOperation>> {
    prop::collection::vec(write_operation_strategy(), min_ops..max_ops)
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::TestJournal;
    use eventide_journal::StreamQuery;
    use std::collections::HashMap;

    /// Applies `ops` at the correct expected versions and returns the
    /// per-stream entry bodies in write order.
    fn apply(journal: &TestJournal, ops: &[WriteOperation]) -> HashMap<String, Vec<String>> {
        let mut written: HashMap<String, Vec<String>> = HashMap::new();
        for op in ops {
            let bodies = written.entry(op.stream.clone()).or_default();
            let expected = bodies.len() as i64 - 1;
            journal.write(&op.stream, expected, &op.batch).unwrap();
            bodies.extend(op.batch.iter().map(|e| e.body.clone()));
        }
        written
    }

    proptest! {
        #![proptest_config(PropTestConfig::quick().to_proptest_config())]

        #[test]
        fn stream_versions_are_contiguous(ops in write_sequence_strategy(1, 12)) {
            let journal = TestJournal::new();
            let written = apply(&journal, &ops);

            for (stream, bodies) in &written {
                let read = journal.stream_reader().stream_for(stream);
                let versions: Vec<_> = read.stream.iter().map(|e| e.stream_version).collect();
                let expected: Vec<_> = (0..bodies.len() as i64).collect();
                prop_assert_eq!(versions, expected);
                prop_assert_eq!(read.stream_version, bodies.len() as i64 - 1);
            }
        }

        #[test]
        fn stale_writes_append_nothing(ops in write_sequence_strategy(1, 6), batch in batch_strategy(3)) {
            let journal = TestJournal::new();
            let written = apply(&journal, &ops);
            let before = journal.len();

            let stream = &ops[0].stream;
            let stale = written[stream].len() as i64 - 2;
            prop_assert!(journal.write(stream, stale, &batch).unwrap_err().is_conflict());
            prop_assert_eq!(journal.len(), before);
        }

        #[test]
        fn category_reads_keep_append_order(ops in write_sequence_strategy(1, 12)) {
            let journal = TestJournal::new();
            apply(&journal, &ops);

            for category in CATEGORIES {
                let expected: Vec<_> = ops
                    .iter()
                    .filter(|op| op.stream.starts_with(category))
                    .flat_map(|op| op.batch.iter().map(|e| e.body.clone()))
                    .collect();
                let read = journal
                    .stream_reader()
                    .stream_for_query(&StreamQuery::Category(category.to_string()));

                let bodies: Vec<_> = read.stream.iter().map(|e| e.body.clone()).collect();
                prop_assert_eq!(bodies, expected);
                for (position, entry) in read.stream.iter().enumerate() {
                    prop_assert_eq!(entry.stream_version, position as i64);
                }
            }
        }

        #[test]
        fn reader_delivers_every_entry_once(ops in write_sequence_strategy(1, 12)) {
            let journal = TestJournal::new();
            apply(&journal, &ops);
            let reader = journal.reader_with_scope("all", StreamQuery::All);

            let mut seen = Vec::new();
            loop {
                let stored = reader.read_next().unwrap();
                if !stored.is_valid() {
                    break;
                }
                prop_assert_eq!(stored.id, seen.len() as i64);
                reader.acknowledge(stored.id).unwrap();
                seen.push(stored.entry.body);
            }

            let expected: Vec<_> = ops
                .iter()
                .flat_map(|op| op.batch.iter().map(|e| e.body.clone()))
                .collect();
            prop_assert_eq!(seen, expected);
        }

        #[test]
        fn stream_names_follow_entity_convention(name in stream_name_strategy()) {
            let (category, id) = name.split_once('_').unwrap();
            prop_assert!(CATEGORIES.contains(&category));
            prop_assert!(id.parse::<u8>().is_ok());
            prop_assert_eq!(StreamQuery::parse(&name), StreamQuery::Stream(name.clone()));
        }
    }
}
