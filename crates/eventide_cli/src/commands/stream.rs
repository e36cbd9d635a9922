//! Stream command implementation.

use eventide_journal::{
    EntryBatch, EntryStream, Journal, JournalRegistry, StreamQuery, NO_STREAM_VERSION,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

/// One entry of the input file.
#[derive(Debug, Deserialize)]
pub struct InputEntry {
    /// Stream to append to; empty for an unstreamed entry.
    #[serde(default)]
    pub stream: String,
    /// Entry type.
    #[serde(rename = "type")]
    pub entry_type: String,
    /// Entry body. JSON values other than strings are stored as their JSON text.
    pub body: serde_json::Value,
    /// Optional snapshot.
    #[serde(default)]
    pub snapshot: Option<serde_json::Value>,
}

/// Entry representation for output.
#[derive(Debug, Serialize)]
pub struct EntryInfo {
    /// Stream the entry was written to.
    pub stream: String,
    /// Version within the materialized stream.
    pub version: i64,
    /// Entry type.
    #[serde(rename = "type")]
    pub entry_type: String,
    /// Entry body.
    pub body: String,
}

/// Materialized stream representation for output.
#[derive(Debug, Serialize)]
pub struct StreamInfo {
    /// Requested name.
    pub name: String,
    /// Version of the stream.
    pub version: i64,
    /// Snapshot the stream starts from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<String>,
    /// Entries after the snapshot.
    pub entries: Vec<EntryInfo>,
}

impl From<EntryStream> for StreamInfo {
    fn from(stream: EntryStream) -> Self {
        Self {
            name: stream.stream_name,
            version: stream.stream_version,
            snapshot: (!stream.snapshot.is_empty()).then_some(stream.snapshot),
            entries: stream
                .stream
                .into_iter()
                .map(|e| EntryInfo {
                    stream: e.stream_name,
                    version: e.stream_version,
                    entry_type: e.entry_type,
                    body: e.body,
                })
                .collect(),
        }
    }
}

/// Runs the stream command.
pub fn run(input: &Path, name: &str, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    if !input.exists() {
        return Err(format!("Input file not found: {}", input.display()).into());
    }

    let entries: Vec<InputEntry> = serde_json::from_str(&std::fs::read_to_string(input)?)?;
    let journals = JournalRegistry::new();
    let journal = journals.open("cli");
    load(&journal, entries)?;

    let query = if name == "*" {
        StreamQuery::All
    } else {
        StreamQuery::parse(name)
    };
    let info = StreamInfo::from(journal.stream_reader().stream_for_query(&query));
    let info = StreamInfo {
        name: name.to_string(),
        ..info
    };

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&info)?);
        }
        _ => {
            print_text_output(&info);
        }
    }

    Ok(())
}

/// Appends `entries` in file order, each at its stream's current version.
pub fn load(journal: &Journal, entries: Vec<InputEntry>) -> Result<(), Box<dyn std::error::Error>> {
    let mut versions: HashMap<String, i64> = HashMap::new();

    for entry in entries {
        let body = as_text(entry.body);
        let snapshot = entry.snapshot.map(as_text).unwrap_or_default();
        let batch = EntryBatch::of_snapshot(entry.entry_type, body, snapshot);

        if entry.stream.is_empty() {
            journal.write_unstreamed(&batch);
            continue;
        }
        let expected = versions
            .get(&entry.stream)
            .copied()
            .unwrap_or(NO_STREAM_VERSION);
        journal.write(&entry.stream, expected, &batch)?;
        versions.insert(entry.stream, expected + 1);
    }

    debug!(entries = journal.len(), "loaded input");
    Ok(())
}

fn as_text(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(text) => text,
        other => other.to_string(),
    }
}

fn print_text_output(info: &StreamInfo) {
    println!("Stream: {}", info.name);
    println!("Version: {}", info.version);
    if let Some(snapshot) = &info.snapshot {
        println!("Snapshot: {snapshot}");
    }
    println!("Entries: {}", info.entries.len());
    for entry in &info.entries {
        println!(
            "  {:>4}  {:<20} {:<16} {}",
            entry.version, entry.stream, entry.entry_type, entry.body
        );
    }
}
