//! Persists analysis output into per-image report files.
//!
//! Reports are keyed by (image id, stage). A key is written exactly once:
//! content goes to a temp file in the destination directory and is committed
//! with a no-clobber rename, so a collision surfaces as `AlreadyExists` and a
//! cancelled run never leaves a half-written report behind.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use log::info;
use tempfile::NamedTempFile;

use crate::errors::{Result, SkatError};
use crate::workflow::Stage;

pub struct ReportWriter {
    reports_dir: PathBuf,
}

impl ReportWriter {
    pub fn new(reports_dir: &Path) -> Result<Self> {
        fs::create_dir_all(reports_dir)?;
        Ok(Self {
            reports_dir: reports_dir.to_path_buf(),
        })
    }

    /// Destination path for a (image, stage) report.
    pub fn report_path(&self, image_id: &str, stage: Stage) -> PathBuf {
        self.reports_dir
            .join(image_id)
            .join(format!("{}.txt", stage.slug()))
    }

    /// Write the report for one stage. Fails with `AlreadyExists` if a report
    /// for this (image, stage) key was written before; the prior content is
    /// left untouched.
    pub fn write(&self, image_id: &str, stage: Stage, contents: &[u8]) -> Result<PathBuf> {
        let path = self.report_path(image_id, stage);
        self.commit(&path, contents)?;
        info!("{} report saved to {}", stage.slug(), path.display());
        Ok(path)
    }

    /// Write an auxiliary artifact (body file, run summary) under the image's
    /// report directory, with the same no-clobber discipline.
    pub fn write_named(&self, image_id: &str, file_name: &str, contents: &[u8]) -> Result<PathBuf> {
        let path = self.reports_dir.join(image_id).join(file_name);
        self.commit(&path, contents)?;
        Ok(path)
    }

    fn commit(&self, path: &Path, contents: &[u8]) -> Result<()> {
        let dir = path
            .parent()
            .ok_or_else(|| SkatError::InvalidArgument(format!("bad report path: {}", path.display())))?;
        fs::create_dir_all(dir)?;

        if path.exists() {
            return Err(SkatError::AlreadyExists(path.to_path_buf()));
        }

        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(contents)?;
        tmp.persist_noclobber(path).map_err(|e| {
            if e.error.kind() == std::io::ErrorKind::AlreadyExists {
                SkatError::AlreadyExists(path.to_path_buf())
            } else {
                SkatError::Io(e.error)
            }
        })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_then_collision() {
        let dir = TempDir::new().unwrap();
        let writer = ReportWriter::new(dir.path()).unwrap();

        let path = writer
            .write("disk", Stage::Partitions, b"first contents")
            .unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"first contents");

        let err = writer
            .write("disk", Stage::Partitions, b"second contents")
            .unwrap_err();
        assert!(matches!(err, SkatError::AlreadyExists(_)));

        // On-disk content is still the first write's.
        assert_eq!(fs::read(&path).unwrap(), b"first contents");
    }

    #[test]
    fn test_distinct_keys_do_not_collide() {
        let dir = TempDir::new().unwrap();
        let writer = ReportWriter::new(dir.path()).unwrap();

        writer.write("disk", Stage::Partitions, b"mmls output").unwrap();
        writer.write("disk", Stage::Filesystem, b"fsstat output").unwrap();
        writer.write("other", Stage::Partitions, b"mmls output").unwrap();

        assert!(writer.report_path("disk", Stage::Partitions).exists());
        assert!(writer.report_path("disk", Stage::Filesystem).exists());
        assert!(writer.report_path("other", Stage::Partitions).exists());
    }

    #[test]
    fn test_no_temp_files_left_behind() {
        let dir = TempDir::new().unwrap();
        let writer = ReportWriter::new(dir.path()).unwrap();

        writer.write("disk", Stage::Timeline, b"timeline").unwrap();
        writer.write("disk", Stage::Timeline, b"again").unwrap_err();

        let image_dir = dir.path().join("disk");
        let names: Vec<String> = fs::read_dir(&image_dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["timeline.txt".to_string()]);
    }

    #[test]
    fn test_write_named_auxiliary_file() {
        let dir = TempDir::new().unwrap();
        let writer = ReportWriter::new(dir.path()).unwrap();

        let path = writer.write_named("disk", "timeline.body", b"0|/etc|...").unwrap();
        assert!(path.ends_with("disk/timeline.body"));
        assert!(matches!(
            writer.write_named("disk", "timeline.body", b"x").unwrap_err(),
            SkatError::AlreadyExists(_)
        ));
    }
}
