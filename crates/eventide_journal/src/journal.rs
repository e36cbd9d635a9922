//! The append-only journal and its registry.

use crate::entry::{EntryBatch, EntryValue, NO_STREAM_VERSION};
use crate::error::{JournalError, JournalResult};
use crate::reader::{JournalReader, StreamReader};
use crate::stream::{fold_stream, stream_name_for, EntryStream, StreamCategory, StreamQuery};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use tracing::{debug, info};

type JournalMap = Mutex<HashMap<String, Arc<Journal>>>;

/// The shared log of one journal.
///
/// A single lock guards the whole log. Writers hold it for the
/// check-then-append sequence, readers hold it only long enough to copy
/// or index into the entries.
#[derive(Debug, Default)]
pub(crate) struct JournalLog {
    entries: RwLock<Vec<EntryValue>>,
}

impl JournalLog {
    /// Appends a batch after checking the stream's last version.
    fn append_checked(
        &self,
        stream_name: &str,
        expected_version: i64,
        batch: &EntryBatch,
    ) -> JournalResult<()> {
        let mut entries = self.entries.write();

        let current = entries
            .iter()
            .rev()
            .find(|e| e.stream_name == stream_name)
            .map(|e| e.stream_version);
        let accepted = match current {
            Some(version) => version == expected_version,
            None => expected_version == NO_STREAM_VERSION,
        };
        if !accepted {
            return Err(JournalError::concurrency_conflict(
                stream_name,
                expected_version,
                current.unwrap_or(NO_STREAM_VERSION),
            ));
        }

        push_batch(&mut entries, stream_name, expected_version, batch);
        Ok(())
    }

    /// Appends a batch without a version check.
    fn append_unchecked(&self, stream_name: &str, base_version: i64, batch: &EntryBatch) {
        push_batch(&mut self.entries.write(), stream_name, base_version, batch);
    }

    /// Takes a point-in-time copy of the log.
    fn copy(&self) -> Vec<EntryValue> {
        self.entries.read().clone()
    }

    pub(crate) fn read_stream(&self, stream_name: String, query: &StreamQuery) -> EntryStream {
        let log = self.copy();
        fold_stream(stream_name, query, &log)
    }

    pub(crate) fn greatest_id(&self, query: &StreamQuery) -> i64 {
        let entries = self.entries.read();
        let count = match query {
            StreamQuery::All => entries.len(),
            _ => entries.iter().filter(|e| query.matches(e)).count(),
        };
        count as i64 - 1
    }

    /// Returns the `id`-th entry (0-based) selected by `query`.
    pub(crate) fn entry_value_at(&self, id: i64, query: &StreamQuery) -> JournalResult<EntryValue> {
        let entries = self.entries.read();
        usize::try_from(id)
            .ok()
            .and_then(|index| match query {
                StreamQuery::All => entries.get(index),
                _ => entries.iter().filter(|e| query.matches(e)).nth(index),
            })
            .cloned()
            .ok_or(JournalError::IdOutOfRange { id })
    }

    fn len(&self) -> usize {
        self.entries.read().len()
    }

    fn clear(&self) {
        self.entries.write().clear();
    }
}

/// Versions the batch `base_version + 1` onwards. Callers hold the write lock
/// for the whole batch, so readers see all of it or none of it.
fn push_batch(entries: &mut Vec<EntryValue>, stream_name: &str, base_version: i64, batch: &EntryBatch) {
    entries.reserve(batch.len());
    for (offset, entry) in (1i64..).zip(batch.iter()) {
        entries.push(EntryValue::new(
            stream_name,
            base_version + offset,
            entry.entry_type.clone(),
            entry.body.clone(),
            entry.snapshot.clone(),
        ));
    }
}

/// An in-memory, append-only journal of versioned entries.
///
/// Entries are never changed or removed once written, except by
/// [`Journal::close`], which empties the journal and removes it from its
/// registry.
///
/// # Example
///
/// ```
/// use eventide_journal::{EntryBatch, JournalRegistry, NO_STREAM_VERSION};
///
/// let journals = JournalRegistry::new();
/// let journal = journals.open("orders");
///
/// let mut batch = EntryBatch::new();
/// batch.add_entry("OrderPlaced", r#"{"total":10}"#);
/// batch.add_entry("OrderPaid", r#"{"total":10}"#);
/// journal.write("order_1", NO_STREAM_VERSION, &batch).unwrap();
///
/// let stream = journal.stream_reader().stream_for("order_1");
/// assert_eq!(stream.stream_version, 1);
/// assert_eq!(stream.stream.len(), 2);
/// ```
pub struct Journal {
    name: String,
    log: Arc<JournalLog>,
    readers: Mutex<HashMap<String, Arc<JournalReader>>>,
    registry: Weak<JournalMap>,
}

impl Journal {
    fn new(name: String, registry: Weak<JournalMap>) -> Self {
        Self {
            name,
            log: Arc::new(JournalLog::default()),
            readers: Mutex::new(HashMap::new()),
            registry,
        }
    }

    /// Returns the journal's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Appends `batch` to `stream_name`, checking the stream's version.
    ///
    /// `expected_version` must be the version of the stream's last entry,
    /// or [`NO_STREAM_VERSION`] if the stream has never been written.
    /// Entries are versioned `expected_version + 1` onwards.
    ///
    /// # Errors
    ///
    /// Returns [`JournalError::ConcurrencyConflict`] if the expected version
    /// does not match. Nothing is appended in that case.
    pub fn write(
        &self,
        stream_name: &str,
        expected_version: i64,
        batch: &EntryBatch,
    ) -> JournalResult<()> {
        self.log.append_checked(stream_name, expected_version, batch)?;
        debug!(
            journal = %self.name,
            stream = stream_name,
            expected_version,
            count = batch.len(),
            "appended batch"
        );
        Ok(())
    }

    /// Appends `batch` to the stream of entity `id` of kind `T`.
    pub fn write_for<T: StreamCategory>(
        &self,
        id: &str,
        expected_version: i64,
        batch: &EntryBatch,
    ) -> JournalResult<()> {
        self.write(&stream_name_for::<T>(id), expected_version, batch)
    }

    /// Appends `batch` without a stream name and without a version check.
    ///
    /// Entries are versioned `1..=batch.len()`. Prefer named streams.
    pub fn write_unstreamed(&self, batch: &EntryBatch) {
        self.log.append_unchecked("", 0, batch);
        debug!(journal = %self.name, count = batch.len(), "appended unstreamed batch");
    }

    /// Returns the reader called `name`, creating it on first use.
    ///
    /// The name is also what the reader reads, interpreted with
    /// [`StreamQuery::parse`].
    pub fn reader(&self, name: &str) -> Arc<JournalReader> {
        self.reader_with_scope(name, StreamQuery::parse(name))
    }

    /// Returns the reader called `name`, creating it over `scope` on first use.
    ///
    /// An existing reader keeps the scope it was created with.
    pub fn reader_with_scope(&self, name: &str, scope: StreamQuery) -> Arc<JournalReader> {
        let mut readers = self.readers.lock();
        if let Some(reader) = readers.get(name) {
            return Arc::clone(reader);
        }

        debug!(journal = %self.name, reader = name, %scope, "created reader");
        let reader = Arc::new(JournalReader::new(
            name.to_string(),
            scope,
            Arc::clone(&self.log),
        ));
        readers.insert(name.to_string(), Arc::clone(&reader));
        reader
    }

    /// Returns a reader for on-demand stream materialization.
    pub fn stream_reader(&self) -> StreamReader {
        StreamReader::new(Arc::clone(&self.log))
    }

    /// Returns the number of entries in the journal.
    pub fn len(&self) -> usize {
        self.log.len()
    }

    /// Returns true if the journal has no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Empties the journal, drops its readers and removes it from its registry.
    ///
    /// Opening the same name afterwards yields a new, empty journal.
    pub fn close(&self) {
        self.log.clear();
        self.readers.lock().clear();

        if let Some(registry) = self.registry.upgrade() {
            let mut journals = registry.lock();
            let registered = journals
                .get(&self.name)
                .is_some_and(|j| std::ptr::eq(Arc::as_ptr(j), self));
            if registered {
                journals.remove(&self.name);
            }
        }
        info!(journal = %self.name, "journal closed");
    }
}

impl std::fmt::Debug for Journal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Journal")
            .field("name", &self.name)
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}

/// Named journals, opened on first use.
///
/// Opening is idempotent: the same name yields the same [`Journal`] until
/// that journal is closed.
#[derive(Default)]
pub struct JournalRegistry {
    journals: Arc<JournalMap>,
}

impl JournalRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the journal called `name`, creating it if needed.
    pub fn open(&self, name: &str) -> Arc<Journal> {
        let mut journals = self.journals.lock();
        if let Some(journal) = journals.get(name) {
            return Arc::clone(journal);
        }

        debug!(journal = name, "opened journal");
        let journal = Arc::new(Journal::new(
            name.to_string(),
            Arc::downgrade(&self.journals),
        ));
        journals.insert(name.to_string(), Arc::clone(&journal));
        journal
    }

    /// Returns true if a journal called `name` is open.
    pub fn contains(&self, name: &str) -> bool {
        self.journals.lock().contains_key(name)
    }

    /// Returns the names of all open journals, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.journals.lock().keys().cloned().collect();
        names.sort();
        names
    }

    /// Closes every open journal.
    pub fn close_all(&self) {
        let journals: Vec<_> = self.journals.lock().drain().map(|(_, j)| j).collect();
        for journal in journals {
            journal.close();
        }
    }
}

impl std::fmt::Debug for JournalRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JournalRegistry")
            .field("journals", &self.names())
            .finish()
    }
}
