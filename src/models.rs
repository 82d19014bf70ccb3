use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::workflow::Stage;

/// An acquired (or operator-supplied) disk image on persistent storage.
///
/// Immutable once acquisition completes; the integrity record bound to it is
/// the only authority on whether its bytes are still trustworthy.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct EvidenceImage {
    pub path: PathBuf,
    pub source: String,
    pub acquired_at: DateTime<Utc>,
}

impl EvidenceImage {
    /// Short identifier used to key reports: the image file stem.
    pub fn image_id(path: &Path) -> String {
        path.file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "image".to_string())
    }
}

/// Pair of independent digests bound to one evidence image.
///
/// Created once at acquisition time, never mutated. Both digests are lowercase
/// hex.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct IntegrityRecord {
    pub md5: String,
    pub sha1: String,
}

/// Acquisition metadata persisted as a JSON sidecar next to the image.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct AcquisitionMetadata {
    pub source: String,
    pub image_path: PathBuf,
    pub acquisition_date: DateTime<Utc>,
    #[serde(flatten)]
    pub digests: IntegrityRecord,
}

/// Output of one external tool invocation against one evidence image.
#[derive(Debug, Clone)]
pub struct AnalysisResult {
    pub stage: Stage,
    pub image_id: String,
    pub offset: Option<u64>,
    pub output: Vec<u8>,
    pub produced_at: DateTime<Utc>,
}

/// Outcome of an audited operation.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Success,
    Failure { message: String },
    Cancelled { message: String },
}

/// One line of the append-only audit log.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    pub run_id: String,
    pub operation: String,
    pub arguments: Vec<String>,
    #[serde(flatten)]
    pub outcome: Outcome,
}
