//! Append-only audit trail of every operation attempted during a run.
//!
//! Entries are JSON lines. Each line is written and flushed as a single unit
//! under a mutex, so concurrent callers never interleave partial entries.
//! Opening the log creates it if absent and never truncates existing content,
//! so the trail survives process restarts.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use chrono::Utc;
use log::debug;
use uuid::Uuid;

use crate::errors::Result;
use crate::models::{AuditEntry, Outcome};

pub struct AuditLogger {
    file: Mutex<File>,
    run_id: String,
}

impl AuditLogger {
    /// Open the audit log for appending, creating it (and parent directories)
    /// if absent. A fresh run id is minted for this process.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let run_id = Uuid::new_v4().to_string();
        debug!("Audit log opened at {} (run {})", path.display(), run_id);

        Ok(Self {
            file: Mutex::new(file),
            run_id,
        })
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Append one entry as a single line. The line is built in memory first so
    /// exactly one write hits the file.
    pub fn record(&self, operation: &str, arguments: &[String], outcome: Outcome) -> Result<()> {
        let entry = AuditEntry {
            timestamp: Utc::now(),
            run_id: self.run_id.clone(),
            operation: operation.to_string(),
            arguments: arguments.to_vec(),
            outcome,
        };

        let mut line = serde_json::to_string(&entry)?;
        line.push('\n');

        // Keep appending even if another thread panicked mid-write; the trail
        // matters more than the poison flag.
        let mut file = self.file.lock().unwrap_or_else(|e| e.into_inner());
        file.write_all(line.as_bytes())?;
        file.flush()?;

        Ok(())
    }

    pub fn success(&self, operation: &str, arguments: &[String]) -> Result<()> {
        self.record(operation, arguments, Outcome::Success)
    }

    pub fn failure(&self, operation: &str, arguments: &[String], message: &str) -> Result<()> {
        self.record(
            operation,
            arguments,
            Outcome::Failure {
                message: message.to_string(),
            },
        )
    }

    pub fn cancelled(&self, operation: &str, arguments: &[String], message: &str) -> Result<()> {
        self.record(
            operation,
            arguments,
            Outcome::Cancelled {
                message: message.to_string(),
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::Arc;
    use std::thread;
    use tempfile::TempDir;

    use crate::models::AuditEntry;

    fn read_entries(path: &Path) -> Vec<AuditEntry> {
        fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).expect("well-formed audit line"))
            .collect()
    }

    #[test]
    fn test_record_and_read_back() {
        let dir = TempDir::new().unwrap();
        let log_path = dir.path().join("audit.jsonl");
        let logger = AuditLogger::open(&log_path).unwrap();

        logger.success("mmls", &["disk.img".to_string()]).unwrap();
        logger
            .failure("fsstat", &["disk.img".to_string()], "exit 1")
            .unwrap();

        let entries = read_entries(&log_path);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].operation, "mmls");
        assert_eq!(entries[0].outcome, Outcome::Success);
        assert_eq!(entries[1].operation, "fsstat");
        assert!(matches!(entries[1].outcome, Outcome::Failure { .. }));
    }

    #[test]
    fn test_reopen_appends_never_truncates() {
        let dir = TempDir::new().unwrap();
        let log_path = dir.path().join("audit.jsonl");

        {
            let logger = AuditLogger::open(&log_path).unwrap();
            logger.success("first-run", &[]).unwrap();
        }
        {
            let logger = AuditLogger::open(&log_path).unwrap();
            logger.success("second-run", &[]).unwrap();
        }

        let entries = read_entries(&log_path);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].operation, "first-run");
        assert_eq!(entries[1].operation, "second-run");
        // Run ids differ across process lifetimes.
        assert_ne!(entries[0].run_id, entries[1].run_id);
    }

    #[test]
    fn test_concurrent_appends_do_not_interleave() {
        let dir = TempDir::new().unwrap();
        let log_path = dir.path().join("audit.jsonl");
        let logger = Arc::new(AuditLogger::open(&log_path).unwrap());

        let mut handles = Vec::new();
        for t in 0..8 {
            let logger = Arc::clone(&logger);
            handles.push(thread::spawn(move || {
                for i in 0..50 {
                    logger
                        .success(&format!("op-{}-{}", t, i), &[format!("arg-{}", i)])
                        .unwrap();
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        // Every line parses, and all 400 entries are present exactly once.
        let entries = read_entries(&log_path);
        assert_eq!(entries.len(), 400);

        // Per-thread relative order is preserved.
        for t in 0..8 {
            let ops: Vec<&str> = entries
                .iter()
                .filter(|e| e.operation.starts_with(&format!("op-{}-", t)))
                .map(|e| e.operation.as_str())
                .collect();
            let expected: Vec<String> = (0..50).map(|i| format!("op-{}-{}", t, i)).collect();
            assert_eq!(ops, expected.iter().map(|s| s.as_str()).collect::<Vec<_>>());
        }
    }

    #[test]
    fn test_creates_missing_parent_directory() {
        let dir = TempDir::new().unwrap();
        let log_path = dir.path().join("nested").join("audit.jsonl");
        let logger = AuditLogger::open(&log_path).unwrap();
        logger.success("op", &[]).unwrap();
        assert!(log_path.exists());
    }
}
