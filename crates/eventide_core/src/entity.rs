//! Event-sourced entities and their repository.
//!
//! An entity's state is never stored directly. It is rebuilt by folding
//! the events of its stream, optionally starting from a snapshot, and new
//! events are appended with the version the entity was loaded at as the
//! expected version.

use crate::codec::{self, TypeRegistry};
use crate::error::{CoreError, CoreResult};
use eventide_journal::{
    stream_name_for, EntryBatch, EntryStream, Journal, StreamCategory, StreamQuery,
    NO_STREAM_VERSION,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

/// An event that can be journaled.
pub trait SourceEvent: Serialize {
    /// The entry type the event is stored under.
    fn type_tag(&self) -> &'static str;
}

/// State derived from a history of events.
pub trait EventSourced: Default {
    /// The events this state is built from.
    type Event: SourceEvent;

    /// Applies a single event to produce the next state.
    ///
    /// Must be a pure, total function.
    fn apply(self, event: &Self::Event) -> Self;
}

/// An entity's state together with its not-yet-saved events.
#[derive(Debug, Clone)]
pub struct Sourced<S: EventSourced> {
    state: S,
    pending: Vec<S::Event>,
    current_version: i64,
}

impl<S: EventSourced> Sourced<S> {
    /// Creates a new entity whose stream has never been written.
    pub fn new() -> Self {
        Self::at_version(S::default(), NO_STREAM_VERSION)
    }

    /// Creates an entity by replaying `events` onto the default state.
    ///
    /// `version` is the stream version of the last event.
    pub fn from_stream<'a>(events: impl IntoIterator<Item = &'a S::Event>, version: i64) -> Self
    where
        S::Event: 'a,
    {
        let state = events.into_iter().fold(S::default(), S::apply);
        Self::at_version(state, version)
    }

    fn at_version(state: S, current_version: i64) -> Self {
        Self {
            state,
            pending: Vec::new(),
            current_version,
        }
    }

    /// Applies a new event and keeps it for the next save.
    pub fn apply(&mut self, event: S::Event) {
        self.state = std::mem::take(&mut self.state).apply(&event);
        self.pending.push(event);
    }

    /// Returns the current state.
    pub fn state(&self) -> &S {
        &self.state
    }

    /// Consumes the entity, returning its state.
    pub fn into_state(self) -> S {
        self.state
    }

    /// Returns the events applied since the entity was loaded or saved.
    pub fn pending(&self) -> &[S::Event] {
        &self.pending
    }

    /// Returns the stream version the entity was loaded or saved at.
    pub fn current_version(&self) -> i64 {
        self.current_version
    }

    /// Returns the stream version after the pending events are saved.
    pub fn next_version(&self) -> i64 {
        self.current_version + self.pending.len() as i64
    }

    fn mark_saved(&mut self) {
        self.current_version = self.next_version();
        self.pending.clear();
    }
}

impl<S: EventSourced> Default for Sourced<S> {
    fn default() -> Self {
        Self::new()
    }
}

/// Loads and saves entities of type `S` through a journal.
pub struct Repository<S: EventSourced> {
    journal: Arc<Journal>,
    types: TypeRegistry<S::Event>,
}

impl<S: EventSourced> Repository<S> {
    /// Creates a repository decoding stored events with `types`.
    pub fn new(journal: Arc<Journal>, types: TypeRegistry<S::Event>) -> Self {
        Self { journal, types }
    }

    /// Returns the journal entities are stored in.
    pub fn journal(&self) -> &Arc<Journal> {
        &self.journal
    }

    /// Appends the entity's pending events to `stream_name`.
    ///
    /// Does nothing if there are no pending events.
    ///
    /// # Errors
    ///
    /// Returns a concurrency conflict if the stream moved on since the
    /// entity was loaded. The entity is left unchanged in that case.
    pub fn save(&self, stream_name: &str, entity: &mut Sourced<S>) -> CoreResult<()> {
        self.write(stream_name, entity, None)
    }

    /// Appends the entity's pending events to the stream of entity `id` of kind `T`.
    pub fn save_for<T: StreamCategory>(&self, id: &str, entity: &mut Sourced<S>) -> CoreResult<()> {
        self.save(&stream_name_for::<T>(id), entity)
    }

    /// Rebuilds the entity stored in `stream_name`.
    ///
    /// An unknown stream yields a new entity.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::SnapshotUnsupported`] if the stream was
    /// compacted by a snapshot, or a codec error if an event cannot be
    /// decoded.
    pub fn load(&self, stream_name: &str) -> CoreResult<Sourced<S>> {
        let stream = self.read(stream_name);
        if stream.has_snapshot() {
            return Err(CoreError::SnapshotUnsupported {
                stream: stream_name.to_string(),
            });
        }
        self.replay(S::default(), &stream)
    }

    /// Rebuilds the entity `id` of kind `T`.
    pub fn load_for<T: StreamCategory>(&self, id: &str) -> CoreResult<Sourced<S>> {
        self.load(&stream_name_for::<T>(id))
    }

    fn read(&self, stream_name: &str) -> EntryStream {
        self.journal
            .stream_reader()
            .stream_for_query(&StreamQuery::Stream(stream_name.to_string()))
    }

    fn replay(&self, initial: S, stream: &EntryStream) -> CoreResult<Sourced<S>> {
        if stream.is_empty() && !stream.has_snapshot() {
            return Ok(Sourced::at_version(initial, NO_STREAM_VERSION));
        }

        let mut state = initial;
        for entry in &stream.stream {
            state = state.apply(&self.types.decode(entry)?);
        }
        debug!(
            stream = %stream.stream_name,
            version = stream.stream_version,
            replayed = stream.stream.len(),
            "loaded entity"
        );
        Ok(Sourced::at_version(state, stream.stream_version))
    }

    fn write(
        &self,
        stream_name: &str,
        entity: &mut Sourced<S>,
        snapshot: Option<String>,
    ) -> CoreResult<()> {
        let Some((last, rest)) = entity.pending.split_last() else {
            return Ok(());
        };

        let mut batch = EntryBatch::with_capacity(entity.pending.len());
        for event in rest {
            batch.add_entry(event.type_tag(), codec::encode(event)?);
        }
        batch.add_entry_with_snapshot(
            last.type_tag(),
            codec::encode(last)?,
            snapshot.unwrap_or_default(),
        );

        self.journal
            .write(stream_name, entity.current_version, &batch)?;
        entity.mark_saved();
        Ok(())
    }
}

impl<S> Repository<S>
where
    S: EventSourced + Serialize + DeserializeOwned,
{
    /// Saves like [`save`](Self::save), attaching the resulting state as a
    /// snapshot to the last event.
    ///
    /// Later loads start from the snapshot instead of replaying the events
    /// before it.
    pub fn save_with_snapshot(&self, stream_name: &str, entity: &mut Sourced<S>) -> CoreResult<()> {
        let snapshot = codec::encode(&entity.state)?;
        self.write(stream_name, entity, Some(snapshot))
    }

    /// Rebuilds the entity stored in `stream_name`, starting from its
    /// latest snapshot when there is one.
    pub fn load_snapshotted(&self, stream_name: &str) -> CoreResult<Sourced<S>> {
        let stream = self.read(stream_name);
        let initial = if stream.has_snapshot() {
            serde_json::from_str(&stream.snapshot)?
        } else {
            S::default()
        };
        self.replay(initial, &stream)
    }
}

impl<S: EventSourced> std::fmt::Debug for Repository<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("journal", &self.journal.name())
            .field("types", &self.types)
            .finish()
    }
}
