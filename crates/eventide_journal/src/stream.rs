//! Stream naming, read targets and materialized streams.

use crate::entry::EntryValue;
use std::fmt;

/// Prefix marking a string stream name as a category read.
pub const CATEGORY_PREFIX: &str = "cat-";

const CATEGORY_DELIMITER: char = '-';
const ENTITY_DELIMITER: char = '_';

/// A kind of entity whose streams share a name prefix.
///
/// Streams of such entities are named `<CATEGORY>_<id>` and can be read
/// together through [`StreamQuery::Category`].
pub trait StreamCategory {
    /// Category key, for example `"person"`.
    const CATEGORY: &'static str;
}

/// Builds the stream name of one entity: `<category>_<id>`.
pub fn stream_name_for<T: StreamCategory>(id: &str) -> String {
    format!("{}{}{}", T::CATEGORY, ENTITY_DELIMITER, id)
}

/// Builds the category stream name of an entity kind: `cat-<category>`.
pub fn category_stream_for<T: StreamCategory>() -> String {
    format!("{}{}", CATEGORY_PREFIX, T::CATEGORY)
}

/// What a read selects from the journal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StreamQuery {
    /// Entries whose stream name equals the given name.
    Stream(String),
    /// Entries whose stream name starts with the given category key.
    Category(String),
    /// Every entry in the journal.
    All,
}

impl StreamQuery {
    /// Interprets a string name using the `cat-<key>` convention.
    ///
    /// Names starting with [`CATEGORY_PREFIX`] select the category named
    /// by the segment following the prefix; any other name selects the
    /// stream with exactly that name.
    pub fn parse(name: &str) -> Self {
        if name.starts_with(CATEGORY_PREFIX) {
            let key = name.split(CATEGORY_DELIMITER).nth(1).unwrap_or_default();
            Self::Category(key.to_string())
        } else {
            Self::Stream(name.to_string())
        }
    }

    /// Selects the stream of one entity.
    pub fn entity<T: StreamCategory>(id: &str) -> Self {
        Self::Stream(stream_name_for::<T>(id))
    }

    /// Selects every stream of an entity kind.
    pub fn category_of<T: StreamCategory>() -> Self {
        Self::Category(T::CATEGORY.to_string())
    }

    /// Returns true if `entry` is part of this query's result.
    pub fn matches(&self, entry: &EntryValue) -> bool {
        match self {
            Self::Stream(name) => entry.stream_name == *name,
            Self::Category(key) => entry.stream_name.starts_with(key.as_str()),
            Self::All => true,
        }
    }

    /// Returns true if results span several streams.
    ///
    /// Versions of such results are positions in the filtered sequence
    /// rather than per-stream versions.
    pub fn spans_streams(&self) -> bool {
        !matches!(self, Self::Stream(_))
    }
}

impl fmt::Display for StreamQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stream(name) => f.write_str(name),
            Self::Category(key) => write!(f, "{CATEGORY_PREFIX}{key}"),
            Self::All => f.write_str("*"),
        }
    }
}

/// A stream materialized from the journal at one point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryStream {
    /// Name the stream was requested under.
    pub stream_name: String,
    /// Version of the last entry, or of the snapshot if nothing followed it.
    pub stream_version: i64,
    /// Entries after the latest snapshot, in append order.
    pub stream: Vec<EntryValue>,
    /// Latest snapshot payload, empty when the stream has none.
    pub snapshot: String,
}

impl EntryStream {
    /// Returns true if the stream was compacted by a snapshot.
    pub fn has_snapshot(&self) -> bool {
        !self.snapshot.is_empty()
    }

    /// Returns true if no entries follow the snapshot (or the stream is empty).
    pub fn is_empty(&self) -> bool {
        self.stream.is_empty()
    }
}

/// Folds matching entries of a log copy into an [`EntryStream`].
pub(crate) fn fold_stream(stream_name: String, query: &StreamQuery, log: &[EntryValue]) -> EntryStream {
    let renumber = query.spans_streams();
    let mut values = Vec::new();
    let mut latest_snapshot: Option<&EntryValue> = None;

    for (position, value) in log.iter().filter(|v| query.matches(v)).enumerate() {
        if value.has_snapshot() {
            values.clear();
            latest_snapshot = Some(value);
        } else if renumber {
            values.push(value.with_stream_version(position as i64));
        } else {
            values.push(value.clone());
        }
    }

    let snapshot_version = latest_snapshot.map_or(0, |s| s.stream_version);
    let stream_version = values.last().map_or(snapshot_version, |v| v.stream_version);

    EntryStream {
        stream_name,
        stream_version,
        stream: values,
        snapshot: latest_snapshot
            .map(|s| s.snapshot.clone())
            .unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Person;

    impl StreamCategory for Person {
        const CATEGORY: &'static str = "person";
    }

    #[test]
    fn entity_and_category_names() {
        assert_eq!(stream_name_for::<Person>("1234"), "person_1234");
        assert_eq!(category_stream_for::<Person>(), "cat-person");
    }

    #[test]
    fn parse_convention() {
        assert_eq!(
            StreamQuery::parse("cat-person"),
            StreamQuery::Category("person".into())
        );
        assert_eq!(
            StreamQuery::parse("cat-person-extra"),
            StreamQuery::Category("person".into())
        );
        assert_eq!(
            StreamQuery::parse("person_1"),
            StreamQuery::Stream("person_1".into())
        );
        assert_eq!(StreamQuery::parse(""), StreamQuery::Stream(String::new()));
    }

    #[test]
    fn display_round_trips_category_names() {
        let query = StreamQuery::category_of::<Person>();
        assert_eq!(query.to_string(), category_stream_for::<Person>());
        assert_eq!(StreamQuery::parse(&query.to_string()), query);
    }

    #[test]
    fn category_is_a_prefix_match() {
        let query = StreamQuery::Category("name".into());
        assert!(query.matches(&EntryValue::new("name_1", 0, "t", "b", "")));
        assert!(query.matches(&EntryValue::new("name_2", 0, "t", "b", "")));
        assert!(!query.matches(&EntryValue::new("other_1", 0, "t", "b", "")));

        let exact = StreamQuery::Stream("name".into());
        assert!(!exact.matches(&EntryValue::new("name_1", 0, "t", "b", "")));
    }

    #[test]
    fn fold_empty_log() {
        let stream = fold_stream("s".into(), &StreamQuery::Stream("s".into()), &[]);
        assert_eq!(stream.stream_version, 0);
        assert!(stream.is_empty());
        assert!(!stream.has_snapshot());
    }

    #[test]
    fn fold_snapshot_only() {
        let log = vec![EntryValue::new("s", 4, "t", "b", "SNAP")];
        let stream = fold_stream("s".into(), &StreamQuery::Stream("s".into()), &log);
        assert_eq!(stream.stream_version, 4);
        assert!(stream.is_empty());
        assert_eq!(stream.snapshot, "SNAP");
    }
}
