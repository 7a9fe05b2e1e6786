//! Poll history persistence
//!
//! Finished polls are appended to a durable store and read back for the
//! dashboard's "recent polls" view. The store sits behind [`HistoryStore`]
//! so the core never knows which engine backs it; the shipped
//! implementation is a JSON-lines file, one finished poll per line.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use thiserror::Error;
use tracing::warn;

use crate::poll::PollRecord;

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("history io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("history record malformed: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Durable store of finished polls.
pub trait HistoryStore: Send + Sync {
    /// Append one finished poll.
    fn append(&self, record: &PollRecord) -> Result<(), HistoryError>;

    /// The most recent `limit` finished polls, newest first by start time.
    fn recent(&self, limit: usize) -> Result<Vec<PollRecord>, HistoryError>;
}

/// JSON-lines file store.
#[derive(Debug, Clone)]
pub struct JsonlHistory {
    path: PathBuf,
}

impl JsonlHistory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl HistoryStore for JsonlHistory {
    fn append(&self, record: &PollRecord) -> Result<(), HistoryError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let line = serde_json::to_string(record)?;
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        writeln!(file, "{line}")?;
        Ok(())
    }

    fn recent(&self, limit: usize) -> Result<Vec<PollRecord>, HistoryError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let raw = fs::read_to_string(&self.path)?;
        let mut records: Vec<PollRecord> = Vec::new();
        for line in raw.lines().filter(|l| !l.trim().is_empty()) {
            match serde_json::from_str(line) {
                Ok(record) => records.push(record),
                Err(err) => {
                    warn!(path = %self.path.display(), error = %err, "skipping malformed history line");
                }
            }
        }
        records.sort_by(|a, b| b.start_time.cmp(&a.start_time));
        records.truncate(limit);
        Ok(records)
    }
}

/// In-memory store for tests and ephemeral runs.
#[derive(Debug, Default)]
pub struct MemoryHistory {
    records: Mutex<Vec<PollRecord>>,
}

impl MemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

impl HistoryStore for MemoryHistory {
    fn append(&self, record: &PollRecord) -> Result<(), HistoryError> {
        self.records.lock().push(record.clone());
        Ok(())
    }

    fn recent(&self, limit: usize) -> Result<Vec<PollRecord>, HistoryError> {
        let mut records = self.records.lock().clone();
        records.sort_by(|a, b| b.start_time.cmp(&a.start_time));
        records.truncate(limit);
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::poll::ResultsMap;
    use chrono::{Duration, Utc};

    fn record(question: &str, offset_secs: i64) -> PollRecord {
        let start = Utc::now() + Duration::seconds(offset_secs);
        PollRecord {
            question: question.to_string(),
            options: vec!["A".into(), "B".into()],
            results: ResultsMap::new(),
            time_limit: 60,
            start_time: start,
            end_time: Some(start + Duration::seconds(60)),
            is_active: false,
        }
    }

    #[test]
    fn jsonl_roundtrip_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonlHistory::new(dir.path().join("history.jsonl"));

        store.append(&record("first", 0)).unwrap();
        store.append(&record("second", 10)).unwrap();
        store.append(&record("third", 20)).unwrap();

        let recent = store.recent(10).unwrap();
        let questions: Vec<_> = recent.iter().map(|r| r.question.as_str()).collect();
        assert_eq!(questions, ["third", "second", "first"]);

        let limited = store.recent(2).unwrap();
        assert_eq!(limited.len(), 2);
        assert_eq!(limited[0].question, "third");
    }

    #[test]
    fn jsonl_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonlHistory::new(dir.path().join("nope.jsonl"));
        assert!(store.recent(10).unwrap().is_empty());
    }

    #[test]
    fn jsonl_skips_malformed_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.jsonl");
        let store = JsonlHistory::new(&path);
        store.append(&record("good", 0)).unwrap();
        fs::write(
            &path,
            format!("{}\nnot json\n", fs::read_to_string(&path).unwrap().trim_end()),
        )
        .unwrap();

        let recent = store.recent(10).unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].question, "good");
    }

    #[test]
    fn jsonl_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonlHistory::new(dir.path().join("nested/dir/history.jsonl"));
        store.append(&record("q", 0)).unwrap();
        assert_eq!(store.recent(10).unwrap().len(), 1);
    }

    #[test]
    fn memory_store_limits_and_orders() {
        let store = MemoryHistory::new();
        store.append(&record("old", 0)).unwrap();
        store.append(&record("new", 10)).unwrap();
        let recent = store.recent(1).unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].question, "new");
    }
}
