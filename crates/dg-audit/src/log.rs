// log.rs — Append-only, hash-chained JSONL audit log.
//
// One JSON object per line. Every line wraps the exported record together
// with `previous_hash`, the SHA-256 of the raw preceding line. The first line
// has no previous hash. Verification re-hashes the raw lines, never a
// re-serialization, because field order is not guaranteed to survive.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::AuditError;
use crate::hasher;

/// One line of an exported audit log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainedRecord<T> {
    /// Hash of the previous raw line; `None` for the first line.
    pub previous_hash: Option<String>,
    /// The exported record.
    pub record: T,
}

/// An append-only audit log backed by a JSONL file.
pub struct AuditLog {
    writer: BufWriter<File>,
    path: PathBuf,
    last_hash: Option<String>,
    appended: usize,
}

impl AuditLog {
    /// Open (or create) an audit log at the given path.
    ///
    /// An existing file is scanned for its last line so new records keep
    /// extending the same chain.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, AuditError> {
        let path = path.as_ref().to_path_buf();

        let last_hash = if path.exists() {
            Self::read_last_hash(&path)?
        } else {
            None
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| AuditError::OpenFailed {
                path: path.clone(),
                source,
            })?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| AuditError::OpenFailed {
                path: path.clone(),
                source,
            })?;

        tracing::debug!(path = %path.display(), resumed = last_hash.is_some(), "audit log opened");
        Ok(Self {
            writer: BufWriter::new(file),
            path,
            last_hash,
            appended: 0,
        })
    }

    /// Append a record, chaining it to the previous line. Flushes before
    /// returning. Returns the hash of the written line.
    pub fn append<T: Serialize>(&mut self, record: &T) -> Result<String, AuditError> {
        let line = serde_json::to_string(&ChainedRecord {
            previous_hash: self.last_hash.clone(),
            record,
        })?;
        let hash = hasher::hash_str(&line);

        writeln!(self.writer, "{}", line)?;
        self.writer.flush()?;

        self.last_hash = Some(hash.clone());
        self.appended += 1;
        Ok(hash)
    }

    /// Number of records appended through this handle.
    pub fn appended(&self) -> usize {
        self.appended
    }

    /// Return the path to the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every record from a log file, oldest first. Blank lines are skipped.
    pub fn read_all<T: DeserializeOwned>(
        path: impl AsRef<Path>,
    ) -> Result<Vec<ChainedRecord<T>>, AuditError> {
        let mut records = Vec::new();
        for line in Self::lines(path.as_ref())? {
            let (_, line) = line?;
            records.push(serde_json::from_str(&line)?);
        }
        Ok(records)
    }

    /// Verify the hash chain of a log file.
    ///
    /// Returns the number of records checked, or `IntegrityViolation` naming
    /// the first line whose `previous_hash` does not match.
    pub fn verify_chain(path: impl AsRef<Path>) -> Result<usize, AuditError> {
        let mut previous_hash: Option<String> = None;
        let mut checked = 0;

        for line in Self::lines(path.as_ref())? {
            let (line_num, line) = line?;
            let record: ChainedRecord<serde_json::Value> = serde_json::from_str(&line)?;

            if record.previous_hash != previous_hash {
                tracing::warn!(path = %path.as_ref().display(), line = line_num, "audit chain broken");
                return Err(AuditError::IntegrityViolation {
                    line: line_num,
                    expected: previous_hash.unwrap_or_else(|| "None".to_string()),
                    actual: record.previous_hash.unwrap_or_else(|| "None".to_string()),
                });
            }

            previous_hash = Some(hasher::hash_str(&line));
            checked += 1;
        }

        Ok(checked)
    }

    /// Non-blank lines with their 1-based line numbers.
    fn lines(
        path: &Path,
    ) -> Result<impl Iterator<Item = Result<(usize, String), AuditError>>, AuditError> {
        let file = File::open(path).map_err(|source| AuditError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(BufReader::new(file)
            .lines()
            .enumerate()
            .filter_map(|(i, line)| match line {
                Ok(l) if l.trim().is_empty() => None,
                Ok(l) => Some(Ok((i + 1, l))),
                Err(e) => Some(Err(AuditError::from(e))),
            }))
    }

    fn read_last_hash(path: &Path) -> Result<Option<String>, AuditError> {
        let mut last_line = None;
        for line in Self::lines(path)? {
            last_line = Some(line?.1);
        }
        Ok(last_line.map(|line| hasher::hash_str(&line)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn append_and_read_back() {
        let dir = tempdir().unwrap();
        let log_path = dir.path().join("audit.jsonl");

        {
            let mut log = AuditLog::open(&log_path).unwrap();
            log.append(&json!({"operation": "scaffold", "allowed": true}))
                .unwrap();
            log.append(&json!({"operation": "teleport", "allowed": false}))
                .unwrap();
            assert_eq!(log.appended(), 2);
        }

        let records: Vec<ChainedRecord<serde_json::Value>> =
            AuditLog::read_all(&log_path).unwrap();
        assert_eq!(records.len(), 2);
        assert!(records[0].previous_hash.is_none());
        assert!(records[1].previous_hash.is_some());
        assert_eq!(records[1].record["operation"], "teleport");
    }

    #[test]
    fn chain_verifies_across_reopen() {
        let dir = tempdir().unwrap();
        let log_path = dir.path().join("nested").join("audit.jsonl");

        {
            let mut log = AuditLog::open(&log_path).unwrap();
            log.append(&json!({"n": 1})).unwrap();
        }
        {
            let mut log = AuditLog::open(&log_path).unwrap();
            log.append(&json!({"n": 2})).unwrap();
            log.append(&json!({"n": 3})).unwrap();
        }

        assert_eq!(AuditLog::verify_chain(&log_path).unwrap(), 3);
    }

    #[test]
    fn tampering_is_detected() {
        let dir = tempdir().unwrap();
        let log_path = dir.path().join("audit.jsonl");

        {
            let mut log = AuditLog::open(&log_path).unwrap();
            for n in 0..3 {
                log.append(&json!({"n": n, "allowed": false})).unwrap();
            }
        }

        let content = std::fs::read_to_string(&log_path).unwrap();
        let edited = content.replacen("\"allowed\":false", "\"allowed\":true", 1);
        std::fs::write(&log_path, edited).unwrap();

        match AuditLog::verify_chain(&log_path) {
            Err(AuditError::IntegrityViolation { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected IntegrityViolation, got {:?}", other),
        }
    }

    #[test]
    fn open_missing_file_for_read_fails() {
        let dir = tempdir().unwrap();
        let err = AuditLog::verify_chain(dir.path().join("absent.jsonl")).unwrap_err();
        assert!(matches!(err, AuditError::OpenFailed { .. }));
    }
}
