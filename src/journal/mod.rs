//! # Snapshot Journal Module
//!
//! Persists published snapshots to JSONL files with rotation.
//!
//! This module handles:
//! - Formatting snapshots as JSONL (JSON Lines) with UTC timestamps
//! - Writing to rotating journal files
//! - Managing file rotation (max N records per file)
//! - Retaining only the last M files

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::Serialize;
use tracing::debug;

use crate::error::Result;
use crate::publisher::TelemetrySnapshot;

/// One journal line: the snapshot plus the time it was recorded
#[derive(Debug, Serialize)]
struct JournalRecord<'a> {
    timestamp: String,
    #[serde(flatten)]
    snapshot: &'a TelemetrySnapshot,
}

/// Rotating JSONL journal of published snapshots
pub struct SnapshotJournal {
    log_dir: PathBuf,
    max_records_per_file: usize,
    max_files_to_keep: usize,
    writer: Option<BufWriter<File>>,
    records_in_file: usize,
    file_seq: u64,
}

impl std::fmt::Debug for SnapshotJournal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotJournal")
            .field("log_dir", &self.log_dir)
            .field("records_in_file", &self.records_in_file)
            .finish_non_exhaustive()
    }
}

impl SnapshotJournal {
    /// Create a journal rooted at `log_dir`, creating the directory if needed
    ///
    /// # Arguments
    ///
    /// * `log_dir` - Directory receiving the journal files
    /// * `max_records_per_file` - Records written before rotating
    /// * `max_files_to_keep` - Newest files retained after rotation
    ///
    /// # Errors
    ///
    /// Returns error if the directory cannot be created
    pub fn new(
        log_dir: impl AsRef<Path>,
        max_records_per_file: usize,
        max_files_to_keep: usize,
    ) -> Result<Self> {
        let log_dir = log_dir.as_ref().to_path_buf();
        fs::create_dir_all(&log_dir)?;

        Ok(Self {
            log_dir,
            max_records_per_file,
            max_files_to_keep,
            writer: None,
            records_in_file: 0,
            file_seq: 0,
        })
    }

    /// Append one snapshot as a JSON line, rotating files as needed
    ///
    /// # Errors
    ///
    /// Returns error on serialization or file I/O failure
    pub fn append(&mut self, snapshot: &TelemetrySnapshot) -> Result<()> {
        if self.writer.is_none() || self.records_in_file >= self.max_records_per_file {
            self.rotate()?;
        }

        let record = JournalRecord {
            timestamp: Utc::now().to_rfc3339(),
            snapshot,
        };
        let line = serde_json::to_string(&record)?;

        if let Some(writer) = self.writer.as_mut() {
            writeln!(writer, "{}", line)?;
            writer.flush()?;
            self.records_in_file += 1;
        }

        Ok(())
    }

    /// Start a new journal file and prune files beyond the retention limit
    fn rotate(&mut self) -> Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
        }

        self.file_seq += 1;
        let name = format!(
            "telemetry-{}-{:04}.jsonl",
            Utc::now().format("%Y%m%d-%H%M%S"),
            self.file_seq
        );
        let path = self.log_dir.join(name);

        debug!("Rotating journal to {}", path.display());
        self.writer = Some(BufWriter::new(File::create(&path)?));
        self.records_in_file = 0;

        self.prune_old_files()
    }

    /// Delete the oldest journal files beyond `max_files_to_keep`
    ///
    /// File names sort chronologically (timestamp + sequence), so lexical
    /// order is age order.
    fn prune_old_files(&self) -> Result<()> {
        let mut files: Vec<PathBuf> = fs::read_dir(&self.log_dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().map_or(false, |ext| ext == "jsonl"))
            .collect();
        files.sort();

        while files.len() > self.max_files_to_keep {
            let oldest = files.remove(0);
            debug!("Pruning old journal file {}", oldest.display());
            fs::remove_file(&oldest)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn snapshot() -> TelemetrySnapshot {
        TelemetrySnapshot {
            temperature: Some(21.5),
            relative_humidity: Some(40.0),
            light: Some(120),
            ..Default::default()
        }
    }

    fn journal_files(dir: &Path) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = fs::read_dir(dir)
            .unwrap()
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .collect();
        files.sort();
        files
    }

    #[test]
    fn test_append_writes_parseable_json_line() {
        let dir = tempdir().unwrap();
        let mut journal = SnapshotJournal::new(dir.path(), 100, 10).unwrap();

        journal.append(&snapshot()).unwrap();

        let files = journal_files(dir.path());
        assert_eq!(files.len(), 1);

        let contents = fs::read_to_string(&files[0]).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 1);

        let value: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(value["temperature"], 21.5);
        assert_eq!(value["light"], 120);
        assert!(value["air_pressure"].is_null());

        // Timestamp must be RFC 3339
        let timestamp = value["timestamp"].as_str().unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(timestamp).is_ok());
    }

    #[test]
    fn test_rotation_after_max_records() {
        let dir = tempdir().unwrap();
        let mut journal = SnapshotJournal::new(dir.path(), 2, 10).unwrap();

        for _ in 0..5 {
            journal.append(&snapshot()).unwrap();
        }

        let files = journal_files(dir.path());
        assert_eq!(files.len(), 3, "5 records at 2 per file need 3 files");

        let line_counts: Vec<usize> = files
            .iter()
            .map(|path| fs::read_to_string(path).unwrap().lines().count())
            .collect();
        assert_eq!(line_counts, vec![2, 2, 1]);
    }

    #[test]
    fn test_retention_prunes_oldest_files() {
        let dir = tempdir().unwrap();
        let mut journal = SnapshotJournal::new(dir.path(), 1, 2).unwrap();

        for _ in 0..5 {
            journal.append(&snapshot()).unwrap();
        }

        let files = journal_files(dir.path());
        assert_eq!(files.len(), 2, "Only the newest 2 files are retained");

        // The survivors are the highest-sequence files
        let names: Vec<String> = files
            .iter()
            .map(|path| path.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert!(names[0].ends_with("-0004.jsonl"));
        assert!(names[1].ends_with("-0005.jsonl"));
    }

    #[test]
    fn test_new_creates_missing_directory() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("journal").join("env");

        let mut journal = SnapshotJournal::new(&nested, 10, 10).unwrap();
        journal.append(&snapshot()).unwrap();

        assert!(nested.is_dir());
        assert_eq!(journal_files(&nested).len(), 1);
    }
}
