//! Global constants for the skat application.

/// Chunk size for streaming hash computation (1MB)
pub const DEFAULT_HASH_CHUNK_SIZE: usize = 1024 * 1024;

/// Default timeout for external tool invocations (1 hour; acquisitions of
/// large images are slow)
pub const DEFAULT_TOOL_TIMEOUT_SECS: u64 = 3600;

/// Block size passed to dd during acquisition
pub const DEFAULT_DD_BLOCK_SIZE: &str = "4M";

/// Default directory for acquired images and integrity records
pub const DEFAULT_EVIDENCE_DIR: &str = "evidence";

/// Default directory for per-image analysis reports
pub const DEFAULT_REPORTS_DIR: &str = "reports";

/// Default path of the append-only audit log
pub const DEFAULT_AUDIT_LOG: &str = "skat-audit.jsonl";

/// Width of the ruler line under report headers
pub const REPORT_RULER_WIDTH: usize = 80;
