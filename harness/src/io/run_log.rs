//! Append-only JSONL run log.
//!
//! One serialized record per line. The file is opened in append mode so
//! interrupted runs can be resumed without clobbering earlier records, and
//! each append flushes so a crash loses at most the record in flight.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;

pub struct RunLog {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl RunLog {
    /// Open (or create) the log at `path`, creating parent directories.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .with_context(|| format!("create log dir {}", parent.display()))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("open run log {}", path.display()))?;
        Ok(Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record as a single JSON line.
    pub fn append<T: Serialize>(&mut self, record: &T) -> Result<()> {
        let mut line = serde_json::to_string(record).context("serialize log record")?;
        line.push('\n');
        self.writer
            .write_all(line.as_bytes())
            .with_context(|| format!("append to {}", self.path.display()))?;
        self.writer
            .flush()
            .with_context(|| format!("flush {}", self.path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Record {
        idx: usize,
        note: String,
    }

    #[test]
    fn appends_one_json_line_per_record() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("runs").join("trace.jsonl");

        let mut log = RunLog::open(&path).expect("open");
        log.append(&Record {
            idx: 0,
            note: "first".to_string(),
        })
        .expect("append");
        log.append(&Record {
            idx: 1,
            note: "second".to_string(),
        })
        .expect("append");
        drop(log);

        let contents = fs::read_to_string(&path).expect("read");
        let records: Vec<Record> = contents
            .lines()
            .map(|line| serde_json::from_str(line).expect("parse"))
            .collect();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].idx, 1);
    }

    #[test]
    fn reopening_appends_instead_of_truncating() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("trace.jsonl");

        {
            let mut log = RunLog::open(&path).expect("open");
            log.append(&Record {
                idx: 0,
                note: "kept".to_string(),
            })
            .expect("append");
        }
        {
            let mut log = RunLog::open(&path).expect("reopen");
            log.append(&Record {
                idx: 1,
                note: "added".to_string(),
            })
            .expect("append");
        }

        let contents = fs::read_to_string(&path).expect("read");
        assert_eq!(contents.lines().count(), 2);
    }
}
