//! On-disk checkpoint for batch jobs.
//!
//! The checkpoint is the job's output CSV itself: rows already present are
//! the work already done. It is read once at startup, grown in memory, and
//! rewritten in full on every flush.

use crate::error::{Error, Result};
use csv::StringRecord;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// A typed output row with a fixed column layout.
pub trait Record: Serialize + DeserializeOwned {
    /// Column names, in the order the struct serializes its fields.
    const COLUMNS: &'static [&'static str];

    /// Column identifying the work item a row belongs to.
    const KEY_COLUMN: &'static str;

    fn key(&self) -> &str;
}

pub struct Checkpoint<R> {
    path: PathBuf,
    entries: Vec<Entry<R>>,
    keys: HashSet<String>,
}

enum Entry<R> {
    Row(R),
    /// A loaded row whose key is valid but whose other fields do not parse.
    /// Kept verbatim, aligned to `Record::COLUMNS`.
    Raw { key: String, record: StringRecord },
}

impl<R: Record> Entry<R> {
    fn key(&self) -> &str {
        match self {
            Entry::Row(row) => row.key(),
            Entry::Raw { key, .. } => key,
        }
    }
}

impl<R: Record> Checkpoint<R> {
    /// Load the existing output at `path`.
    ///
    /// A missing file is an empty checkpoint. An unreadable file, or one
    /// without the key column, is logged and also treated as empty. Every
    /// row with a non-empty key counts as done; rows that fail to parse
    /// are carried through to the next flush as they are.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = if path.exists() {
            match read_entries::<R>(&path) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Ignoring unreadable checkpoint");
                    Vec::new()
                }
            }
        } else {
            Vec::new()
        };

        let keys: HashSet<String> = entries.iter().map(|e| e.key().to_string()).collect();
        if !keys.is_empty() {
            info!(
                path = %path.display(),
                items = keys.len(),
                rows = entries.len(),
                "Resuming from checkpoint"
            );
        }

        Self {
            path,
            entries,
            keys,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn push(&mut self, row: R) {
        if !self.keys.contains(row.key()) {
            self.keys.insert(row.key().to_string());
        }
        self.entries.push(Entry::Row(row));
    }

    /// Typed rows, in file order. Rows kept verbatim are not included.
    pub fn rows(&self) -> impl Iterator<Item = &R> {
        self.entries.iter().filter_map(|e| match e {
            Entry::Row(row) => Some(row),
            Entry::Raw { .. } => None,
        })
    }

    /// Rewrite the output file with every row held so far.
    ///
    /// Rows go to a sibling temp file first, which is then renamed over the
    /// target, so an interrupted flush leaves the previous checkpoint intact.
    pub fn flush(&self) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let tmp_path = tmp_path_for(&self.path);
        {
            let mut writer = csv::WriterBuilder::new()
                .has_headers(false)
                .from_path(&tmp_path)?;
            writer.write_record(R::COLUMNS)?;
            for entry in &self.entries {
                match entry {
                    Entry::Row(row) => writer.serialize(row)?,
                    Entry::Raw { record, .. } => writer.write_record(record)?,
                }
            }
            writer.flush()?;
        }
        fs::rename(&tmp_path, &self.path)?;

        debug!(path = %self.path.display(), rows = self.entries.len(), "Checkpoint flushed");
        Ok(())
    }
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

fn read_entries<R: Record>(path: &Path) -> Result<Vec<Entry<R>>> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;

    let headers = reader.headers()?.clone();
    let Some(key_idx) = headers.iter().position(|h| h == R::KEY_COLUMN) else {
        return Err(Error::custom(format!(
            "checkpoint has no '{}' column",
            R::KEY_COLUMN
        )));
    };

    let mut entries = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        // +2: one for the header, one for 1-based line numbers
        let line = idx + 2;
        let record = match record {
            Ok(record) => record,
            Err(e) => {
                warn!(line, error = %e, "Skipping unreadable checkpoint row");
                continue;
            }
        };

        let key = record.get(key_idx).unwrap_or_default();
        if key.trim().is_empty() {
            warn!(line, "Skipping checkpoint row without a key");
            continue;
        }

        match record.deserialize::<R>(Some(&headers)) {
            Ok(row) => entries.push(Entry::Row(row)),
            Err(e) => {
                warn!(line, key, error = %e, "Keeping checkpoint row that does not parse");
                entries.push(Entry::Raw {
                    key: key.to_string(),
                    record: align_to_columns::<R>(&headers, &record),
                });
            }
        }
    }
    Ok(entries)
}

/// Reorder `record` from the file's header layout into `R::COLUMNS`.
fn align_to_columns<R: Record>(headers: &StringRecord, record: &StringRecord) -> StringRecord {
    R::COLUMNS
        .iter()
        .map(|column| {
            headers
                .iter()
                .position(|h| h == *column)
                .and_then(|i| record.get(i))
                .unwrap_or_default()
        })
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Row {
        pub id: String,
        pub value: u32,
    }

    impl Record for Row {
        const COLUMNS: &'static [&'static str] = &["id", "value"];
        const KEY_COLUMN: &'static str = "id";

        fn key(&self) -> &str {
            &self.id
        }
    }

    pub fn row(id: &str, value: u32) -> Row {
        Row {
            id: id.to_string(),
            value,
        }
    }

    /// Serialize `sample` with headers and check they match `R::COLUMNS`.
    pub fn assert_columns<R: Record>(sample: &R) {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.serialize(sample).expect("serialize sample");
        let bytes = writer.into_inner().expect("flush writer");
        let text = String::from_utf8(bytes).expect("utf8");
        let header = text.lines().next().expect("header line");
        assert_eq!(header, R::COLUMNS.join(","));
    }

    #[test]
    fn missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let cp = Checkpoint::<Row>::open(dir.path().join("out.csv"));
        assert!(cp.is_empty());
        assert!(!cp.contains("a"));
    }

    #[test]
    fn flush_then_reopen_keeps_rows_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("out.csv");

        let mut cp = Checkpoint::<Row>::open(&path);
        cp.push(row("b", 2));
        cp.push(row("a", 1));
        cp.flush().unwrap();

        let reopened = Checkpoint::<Row>::open(&path);
        assert_eq!(
            reopened.rows().cloned().collect::<Vec<_>>(),
            vec![row("b", 2), row("a", 1)]
        );
        assert!(reopened.contains("a"));
        assert!(!dir.path().join("nested").join("out.csv.tmp").exists());
    }

    #[test]
    fn empty_flush_writes_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        Checkpoint::<Row>::open(&path).flush().unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "id,value\n");
    }

    #[test]
    fn row_with_bad_field_still_counts_as_done_and_survives_flush() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        fs::write(&path, "id,value\na,1\nb,True\nc,3\n").unwrap();

        let mut cp = Checkpoint::<Row>::open(&path);
        assert!(cp.contains("b"));
        assert_eq!(cp.len(), 3);
        assert_eq!(
            cp.rows().cloned().collect::<Vec<_>>(),
            vec![row("a", 1), row("c", 3)]
        );

        cp.push(row("d", 4));
        cp.flush().unwrap();
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "id,value\na,1\nb,True\nc,3\nd,4\n"
        );
        assert!(Checkpoint::<Row>::open(&path).contains("b"));
    }

    #[test]
    fn rows_without_a_key_are_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        fs::write(&path, "id,value\na,1\n,2\n  ,3\n").unwrap();

        let cp = Checkpoint::<Row>::open(&path);
        assert_eq!(cp.len(), 1);
        assert!(cp.contains("a"));
    }

    #[test]
    fn kept_rows_follow_the_record_column_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        fs::write(&path, "value,extra,id\nnot-a-number,x,a\n").unwrap();

        let cp = Checkpoint::<Row>::open(&path);
        assert!(cp.contains("a"));
        cp.flush().unwrap();
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "id,value\na,not-a-number\n"
        );
    }

    #[test]
    fn missing_key_column_is_treated_as_no_checkpoint() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        fs::write(&path, "something,else\nx,y\n").unwrap();

        let cp = Checkpoint::<Row>::open(&path);
        assert!(cp.is_empty());
    }

    #[test]
    fn row_columns_match_serialization() {
        assert_columns(&row("a", 1));
    }
}
