//! Runtime configuration.
//!
//! Defaults work out of the box; a YAML file can override them and CLI flags
//! override the file.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_AUDIT_LOG, DEFAULT_DD_BLOCK_SIZE, DEFAULT_EVIDENCE_DIR, DEFAULT_HASH_CHUNK_SIZE,
    DEFAULT_REPORTS_DIR, DEFAULT_TOOL_TIMEOUT_SECS,
};

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct SkatConfig {
    /// Directory for acquired images and their integrity records
    pub evidence_dir: PathBuf,
    /// Directory for per-image analysis reports
    pub reports_dir: PathBuf,
    /// Append-only audit log file
    pub audit_log: PathBuf,
    /// Timeout applied to every external tool invocation, in seconds
    pub tool_timeout_secs: u64,
    /// Chunk size for streaming hash computation, in bytes
    pub hash_chunk_size: usize,
    /// Block size passed to dd during acquisition
    pub dd_block_size: String,
    /// When set, TSK tools are invoked from this directory instead of PATH
    pub tool_dir: Option<PathBuf>,
}

impl Default for SkatConfig {
    fn default() -> Self {
        Self {
            evidence_dir: PathBuf::from(DEFAULT_EVIDENCE_DIR),
            reports_dir: PathBuf::from(DEFAULT_REPORTS_DIR),
            audit_log: PathBuf::from(DEFAULT_AUDIT_LOG),
            tool_timeout_secs: DEFAULT_TOOL_TIMEOUT_SECS,
            hash_chunk_size: DEFAULT_HASH_CHUNK_SIZE,
            dd_block_size: DEFAULT_DD_BLOCK_SIZE.to_string(),
            tool_dir: None,
        }
    }
}

impl SkatConfig {
    /// Resolve a tool name against the configured tool directory, if any.
    pub fn tool(&self, name: &str) -> String {
        match &self.tool_dir {
            Some(dir) => dir.join(name).to_string_lossy().to_string(),
            None => name.to_string(),
        }
    }
}

/// Load configuration from a YAML file, or fall back to defaults when no path
/// is given.
pub fn load_or_default(path: Option<&Path>) -> Result<SkatConfig> {
    match path {
        Some(path) => {
            info!("Loading configuration from {}", path.display());
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            let config: SkatConfig = serde_yaml::from_str(&contents)
                .with_context(|| format!("Failed to parse config file {}", path.display()))?;
            Ok(config)
        }
        None => {
            debug!("No config file given, using defaults");
            Ok(SkatConfig::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = SkatConfig::default();
        assert_eq!(config.evidence_dir, PathBuf::from("evidence"));
        assert_eq!(config.reports_dir, PathBuf::from("reports"));
        assert_eq!(config.tool_timeout_secs, DEFAULT_TOOL_TIMEOUT_SECS);
        assert!(config.tool_dir.is_none());
    }

    #[test]
    fn test_partial_yaml_overrides() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("skat.yaml");
        fs::write(
            &path,
            "evidence_dir: /mnt/case-0153/evidence\ntool_timeout_secs: 120\n",
        )
        .unwrap();

        let config = load_or_default(Some(&path)).unwrap();
        assert_eq!(config.evidence_dir, PathBuf::from("/mnt/case-0153/evidence"));
        assert_eq!(config.tool_timeout_secs, 120);
        // Unspecified fields keep their defaults.
        assert_eq!(config.reports_dir, PathBuf::from("reports"));
        assert_eq!(config.dd_block_size, "4M");
    }

    #[test]
    fn test_missing_config_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nope.yaml");
        assert!(load_or_default(Some(&path)).is_err());
    }

    #[test]
    fn test_tool_resolution_with_tool_dir() {
        let mut config = SkatConfig::default();
        assert_eq!(config.tool("mmls"), "mmls");

        config.tool_dir = Some(PathBuf::from("/opt/tsk/bin"));
        assert_eq!(config.tool("mmls"), "/opt/tsk/bin/mmls");
    }
}
