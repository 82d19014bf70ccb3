//! Streaming integrity verification for acquired images.
//!
//! Two independent digests (MD5 and SHA-1, the pairing evidence handling
//! procedures conventionally record) are computed in a single bounded-memory
//! pass over the file. The record is persisted as a JSON sidecar next to the
//! image and re-checked before any analysis stage trusts the image.

use std::fs::{File, OpenOptions};
use std::io::{BufReader, Read, Write};
use std::path::{Path, PathBuf};

use log::{debug, info};
use md5::Md5;
use sha1::{Digest, Sha1};

use crate::errors::{Result, SkatError};
use crate::models::{AcquisitionMetadata, IntegrityRecord};

/// Compute both digests over the file in one pass.
///
/// The file is read in `chunk_size` blocks, so memory use stays bounded no
/// matter how large the image is.
pub fn compute_record(path: &Path, chunk_size: usize) -> Result<IntegrityRecord> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let mut md5 = Md5::new();
    let mut sha1 = Sha1::new();
    let mut buffer = vec![0u8; chunk_size];

    loop {
        let bytes_read = reader.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        md5.update(&buffer[..bytes_read]);
        sha1.update(&buffer[..bytes_read]);
    }

    let record = IntegrityRecord {
        md5: format!("{:x}", md5.finalize()),
        sha1: format!("{:x}", sha1.finalize()),
    };
    debug!(
        "Digests for {}: md5={} sha1={}",
        path.display(),
        record.md5,
        record.sha1
    );

    Ok(record)
}

/// Recompute digests and compare against a stored record.
///
/// A mismatch is an `IntegrityViolation`; callers must halt any dependent
/// workflow stage.
pub fn verify(path: &Path, expected: &IntegrityRecord, chunk_size: usize) -> Result<()> {
    let actual = compute_record(path, chunk_size)?;

    if actual != *expected {
        let detail = format!(
            "expected md5={} sha1={}, recomputed md5={} sha1={}",
            expected.md5, expected.sha1, actual.md5, actual.sha1
        );
        return Err(SkatError::IntegrityViolation {
            image: path.to_path_buf(),
            detail,
        });
    }

    info!("Integrity verified for {}", path.display());
    Ok(())
}

/// Path of the metadata sidecar for an image: `<image>.json`.
pub fn sidecar_path(image: &Path) -> PathBuf {
    let mut name = image.as_os_str().to_os_string();
    name.push(".json");
    PathBuf::from(name)
}

/// Persist acquisition metadata next to the image. The sidecar is written
/// exactly once; an existing sidecar is never replaced.
pub fn write_sidecar(meta: &AcquisitionMetadata) -> Result<PathBuf> {
    let path = sidecar_path(&meta.image_path);

    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&path)
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::AlreadyExists {
                SkatError::AlreadyExists(path.clone())
            } else {
                SkatError::Io(e)
            }
        })?;

    let json = serde_json::to_string_pretty(meta)?;
    file.write_all(json.as_bytes())?;

    info!("Integrity record written to {}", path.display());
    Ok(path)
}

/// Load the sidecar for an image, if one exists.
pub fn load_sidecar(image: &Path) -> Result<Option<AcquisitionMetadata>> {
    let path = sidecar_path(image);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let meta: AcquisitionMetadata = serde_json::from_str(&contents)?;
    Ok(Some(meta))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::fs;
    use tempfile::TempDir;

    const CHUNK: usize = 4096;

    #[test]
    fn test_empty_file_digests() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.img");
        fs::write(&path, b"").unwrap();

        let record = compute_record(&path, CHUNK).unwrap();
        assert_eq!(record.md5, "d41d8cd98f00b204e9800998ecf8427e");
        assert_eq!(record.sha1, "da39a3ee5e6b4b0d3255bfef95601890afd80709");
    }

    #[test]
    fn test_known_content_digests() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("abc.img");
        fs::write(&path, b"abc").unwrap();

        let record = compute_record(&path, CHUNK).unwrap();
        assert_eq!(record.md5, "900150983cd24fb0d6963f7d28e17f72");
        assert_eq!(record.sha1, "a9993e364706816aba3e25717850c26c9cd0d89d");
    }

    #[test]
    fn test_chunked_read_matches_small_chunk() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("big.img");
        fs::write(&path, vec![0xabu8; 10_000]).unwrap();

        let whole = compute_record(&path, 1024 * 1024).unwrap();
        let chunked = compute_record(&path, 7).unwrap();
        assert_eq!(whole, chunked);
    }

    #[test]
    fn test_verify_passes_then_fails_after_mutation() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("disk.img");
        fs::write(&path, b"original evidence bytes").unwrap();

        let record = compute_record(&path, CHUNK).unwrap();
        verify(&path, &record, CHUNK).unwrap();

        // Flip a single byte.
        let mut bytes = fs::read(&path).unwrap();
        bytes[3] ^= 0x01;
        fs::write(&path, &bytes).unwrap();

        let err = verify(&path, &record, CHUNK).unwrap_err();
        assert!(matches!(err, SkatError::IntegrityViolation { .. }));
    }

    #[test]
    fn test_sidecar_round_trip() {
        let dir = TempDir::new().unwrap();
        let image = dir.path().join("disk.img");
        fs::write(&image, b"data").unwrap();

        let meta = AcquisitionMetadata {
            source: "/dev/sdb".to_string(),
            image_path: image.clone(),
            acquisition_date: Utc::now(),
            digests: compute_record(&image, CHUNK).unwrap(),
        };

        let sidecar = write_sidecar(&meta).unwrap();
        assert_eq!(sidecar, sidecar_path(&image));

        let loaded = load_sidecar(&image).unwrap().unwrap();
        assert_eq!(loaded.digests, meta.digests);
        assert_eq!(loaded.source, "/dev/sdb");
    }

    #[test]
    fn test_sidecar_never_replaced() {
        let dir = TempDir::new().unwrap();
        let image = dir.path().join("disk.img");
        fs::write(&image, b"data").unwrap();

        let meta = AcquisitionMetadata {
            source: "/dev/sdb".to_string(),
            image_path: image.clone(),
            acquisition_date: Utc::now(),
            digests: compute_record(&image, CHUNK).unwrap(),
        };

        write_sidecar(&meta).unwrap();
        let err = write_sidecar(&meta).unwrap_err();
        assert!(matches!(err, SkatError::AlreadyExists(_)));
    }

    #[test]
    fn test_load_sidecar_absent() {
        let dir = TempDir::new().unwrap();
        let image = dir.path().join("unverified.img");
        fs::write(&image, b"data").unwrap();
        assert!(load_sidecar(&image).unwrap().is_none());
    }
}
