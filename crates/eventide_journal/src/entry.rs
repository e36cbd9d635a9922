//! Journaled entry values and write batches.

use std::fmt;

/// Version passed when writing the first batch of a new stream.
///
/// Also the version reported for streams that do not exist yet.
pub const NO_STREAM_VERSION: i64 = -1;

/// Id of the invalid [`StoredEntry`] returned when nothing is available.
pub const NO_ID: i64 = -1;

/// One immutable journaled fact.
///
/// `entry_type`, `body` and `snapshot` are opaque to the journal. An empty
/// `snapshot` means the entry carries no snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntryValue {
    /// Name of the stream the entry belongs to (empty for unstreamed writes).
    pub stream_name: String,
    /// Version of the entry within its stream.
    pub stream_version: i64,
    /// Payload type tag.
    pub entry_type: String,
    /// Serialized payload.
    pub body: String,
    /// Serialized snapshot, empty when absent.
    pub snapshot: String,
}

impl EntryValue {
    /// Creates a new entry value.
    pub fn new(
        stream_name: impl Into<String>,
        stream_version: i64,
        entry_type: impl Into<String>,
        body: impl Into<String>,
        snapshot: impl Into<String>,
    ) -> Self {
        Self {
            stream_name: stream_name.into(),
            stream_version,
            entry_type: entry_type.into(),
            body: body.into(),
            snapshot: snapshot.into(),
        }
    }

    /// The all-empty value carried by an invalid [`StoredEntry`].
    pub fn empty() -> Self {
        Self::new("", NO_STREAM_VERSION, "", "", "")
    }

    /// Returns true if this entry carries a snapshot.
    pub fn has_snapshot(&self) -> bool {
        !self.snapshot.is_empty()
    }

    /// Returns a copy with a different stream version.
    #[must_use]
    pub fn with_stream_version(&self, stream_version: i64) -> Self {
        Self {
            stream_version,
            ..self.clone()
        }
    }
}

impl fmt::Display for EntryValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "EntryValue[stream_name={} stream_version={} type={} body={} snapshot={}]",
            self.stream_name, self.stream_version, self.entry_type, self.body, self.snapshot
        )
    }
}

/// An entry value paired with its position as seen by a reader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredEntry {
    /// Position of the entry within the reader's scope, or [`NO_ID`].
    pub id: i64,
    /// The journaled value.
    pub entry: EntryValue,
}

impl StoredEntry {
    /// Creates a stored entry.
    pub fn new(id: i64, entry: EntryValue) -> Self {
        Self { id, entry }
    }

    /// The sentinel returned when no entry is available.
    pub fn invalid() -> Self {
        Self::new(NO_ID, EntryValue::empty())
    }

    /// Returns true unless this is the [`StoredEntry::invalid`] sentinel.
    pub fn is_valid(&self) -> bool {
        self.id != NO_ID
    }
}

/// One entry of an [`EntryBatch`], before the journal assigns it a version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchEntry {
    /// Payload type tag.
    pub entry_type: String,
    /// Serialized payload.
    pub body: String,
    /// Serialized snapshot, empty when absent.
    pub snapshot: String,
}

/// An ordered group of entries appended by a single write call.
///
/// Batches are not transactions across streams; they only preserve the
/// order in which their entries were added.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryBatch {
    entries: Vec<BatchEntry>,
}

impl EntryBatch {
    /// Creates an empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty batch with room for `capacity` entries.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Creates a batch holding a single entry without a snapshot.
    pub fn of(entry_type: impl Into<String>, body: impl Into<String>) -> Self {
        let mut batch = Self::with_capacity(1);
        batch.add_entry(entry_type, body);
        batch
    }

    /// Creates a batch holding a single entry with a snapshot.
    pub fn of_snapshot(
        entry_type: impl Into<String>,
        body: impl Into<String>,
        snapshot: impl Into<String>,
    ) -> Self {
        let mut batch = Self::with_capacity(1);
        batch.add_entry_with_snapshot(entry_type, body, snapshot);
        batch
    }

    /// Appends an entry without a snapshot.
    pub fn add_entry(&mut self, entry_type: impl Into<String>, body: impl Into<String>) {
        self.add_entry_with_snapshot(entry_type, body, String::new());
    }

    /// Appends an entry with a snapshot.
    pub fn add_entry_with_snapshot(
        &mut self,
        entry_type: impl Into<String>,
        body: impl Into<String>,
        snapshot: impl Into<String>,
    ) {
        self.entries.push(BatchEntry {
            entry_type: entry_type.into(),
            body: body.into(),
            snapshot: snapshot.into(),
        });
    }

    /// Returns the entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &BatchEntry> {
        self.entries.iter()
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the batch has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'a> IntoIterator for &'a EntryBatch {
    type Item = &'a BatchEntry;
    type IntoIter = std::slice::Iter<'a, BatchEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_presence() {
        assert!(!EntryValue::new("s", 0, "t", "b", "").has_snapshot());
        assert!(EntryValue::new("s", 0, "t", "b", "X").has_snapshot());
    }

    #[test]
    fn structural_equality() {
        let a = EntryValue::new("s", 1, "t", "b", "");
        assert_eq!(a, EntryValue::new("s", 1, "t", "b", ""));
        assert_ne!(a, EntryValue::new("s", 1, "t", "other", ""));
        assert_ne!(a, a.with_stream_version(2));
    }

    #[test]
    fn invalid_stored_entry() {
        let entry = StoredEntry::invalid();
        assert!(!entry.is_valid());
        assert_eq!(entry.entry, EntryValue::new("", -1, "", "", ""));
        assert!(StoredEntry::new(0, EntryValue::empty()).is_valid());
    }

    #[test]
    fn batch_keeps_order() {
        let mut batch = EntryBatch::of("a", "1");
        batch.add_entry_with_snapshot("b", "2", "snap");
        batch.add_entry("c", "3");

        let types: Vec<_> = batch.iter().map(|e| e.entry_type.as_str()).collect();
        assert_eq!(types, ["a", "b", "c"]);
        assert_eq!(batch.len(), 3);
        assert_eq!((&batch).into_iter().nth(1).unwrap().snapshot, "snap");
    }
}
