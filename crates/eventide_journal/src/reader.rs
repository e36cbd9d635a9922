//! Sequential and on-demand readers over a journal.

use crate::entry::StoredEntry;
use crate::error::{JournalError, JournalResult};
use crate::journal::JournalLog;
use crate::stream::{stream_name_for, EntryStream, StreamCategory, StreamQuery};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

/// A forward-only cursor over one stream, category, or the whole journal.
///
/// The cursor only moves on [`JournalReader::acknowledge`], so an entry
/// that was read but not acknowledged is delivered again. This gives
/// at-least-once consumption.
///
/// Ids handed out by the reader are 0-based positions within its scope.
/// For a reader over [`StreamQuery::All`] they equal the journal-wide
/// append position.
pub struct JournalReader {
    name: String,
    scope: StreamQuery,
    log: Arc<JournalLog>,
    read_sequence: AtomicI64,
}

impl JournalReader {
    pub(crate) fn new(name: String, scope: StreamQuery, log: Arc<JournalLog>) -> Self {
        Self {
            name,
            scope,
            log,
            read_sequence: AtomicI64::new(0),
        }
    }

    /// Returns the reader's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns what the reader reads.
    pub fn scope(&self) -> &StreamQuery {
        &self.scope
    }

    /// Returns the position of the next entry to be read.
    pub fn read_sequence(&self) -> i64 {
        self.read_sequence.load(Ordering::SeqCst)
    }

    /// Returns the entry at the current position without advancing.
    ///
    /// Returns [`StoredEntry::invalid`] when the reader has caught up.
    ///
    /// # Errors
    ///
    /// Returns [`JournalError::IdOutOfRange`] if the journal was emptied
    /// between the bounds check and the read.
    pub fn read_next(&self) -> JournalResult<StoredEntry> {
        let sequence = self.read_sequence();
        if sequence <= self.log.greatest_id(&self.scope) {
            let entry = self.log.entry_value_at(sequence, &self.scope)?;
            return Ok(StoredEntry::new(sequence, entry));
        }
        Ok(StoredEntry::invalid())
    }

    /// Marks the entry at `id` as consumed.
    ///
    /// Acknowledging the current position advances the reader by one.
    /// Acknowledging an earlier position is accepted and ignored.
    ///
    /// # Errors
    ///
    /// Returns [`JournalError::AckOutOfRange`] if `id` is ahead of the
    /// current position, which means a read was skipped.
    pub fn acknowledge(&self, id: i64) -> JournalResult<()> {
        let mut current = self.read_sequence();
        loop {
            if id < current {
                return Ok(());
            }
            if id > current {
                return Err(JournalError::AckOutOfRange {
                    id,
                    read_sequence: current,
                });
            }
            match self.read_sequence.compare_exchange(
                current,
                current + 1,
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => return Ok(()),
                Err(actual) => current = actual,
            }
        }
    }

    /// Rewinds the reader to the start of its scope.
    pub fn reset(&self) {
        self.read_sequence.store(0, Ordering::SeqCst);
    }
}

impl std::fmt::Debug for JournalReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JournalReader")
            .field("name", &self.name)
            .field("scope", &self.scope)
            .field("read_sequence", &self.read_sequence())
            .finish()
    }
}

/// Materializes whole streams on demand.
///
/// Holds no cursor; every call reads the journal afresh.
#[derive(Clone)]
pub struct StreamReader {
    log: Arc<JournalLog>,
}

impl StreamReader {
    pub(crate) fn new(log: Arc<JournalLog>) -> Self {
        Self { log }
    }

    /// Reads a stream by name, treating `cat-<key>` names as categories.
    pub fn stream_for(&self, stream_name: &str) -> EntryStream {
        self.log
            .read_stream(stream_name.to_string(), &StreamQuery::parse(stream_name))
    }

    /// Reads the entries selected by `query`.
    pub fn stream_for_query(&self, query: &StreamQuery) -> EntryStream {
        self.log.read_stream(query.to_string(), query)
    }

    /// Reads the stream of entity `id` of kind `T`.
    pub fn stream_for_entity<T: StreamCategory>(&self, id: &str) -> EntryStream {
        self.stream_for(&stream_name_for::<T>(id))
    }
}
