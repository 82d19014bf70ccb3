//! Workflow orchestration over the analysis stages.
//!
//! A run moves through an explicit state machine rather than implicit control
//! flow, so partial failure and single-stage re-entry are well defined:
//!
//! ```text
//! NotStarted -> Acquired -> PartitionsAnalyzed -> FilesystemAnalyzed
//!            -> FilesAnalyzed -> TimelineBuilt -> Complete
//! ```
//!
//! `Failed(stage, reason)` absorbs from any stage. A failed stage is terminal
//! for the run: no later stage executes, no tool invocation is retried, and
//! reports from completed stages are retained.

use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use log::{error, info, warn};
use serde::Serialize;
use serde_json::json;

use crate::audit::AuditLogger;
use crate::config::SkatConfig;
use crate::errors::{Result, SkatError};
use crate::integrity;
use crate::models::{AcquisitionMetadata, AnalysisResult, EvidenceImage};
use crate::report::ReportWriter;
use crate::runner::{resolve_tool, CommandRunner, ToolOutput};
use crate::tsk;

/// Analysis stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Acquisition,
    Partitions,
    Filesystem,
    FileListing,
    Extraction,
    Timeline,
}

impl Stage {
    pub fn slug(&self) -> &'static str {
        match self {
            Stage::Acquisition => "acquisition",
            Stage::Partitions => "partitions",
            Stage::Filesystem => "filesystem",
            Stage::FileListing => "file_list",
            Stage::Extraction => "extraction",
            Stage::Timeline => "timeline",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

/// State of one workflow run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowState {
    NotStarted,
    Acquired,
    PartitionsAnalyzed,
    FilesystemAnalyzed,
    FilesAnalyzed { extracted: bool },
    TimelineBuilt,
    Complete,
    Failed { stage: Stage, reason: String },
}

impl WorkflowState {
    /// The state a successful run advances to after this one.
    pub fn successor(&self) -> Option<WorkflowState> {
        match self {
            WorkflowState::NotStarted => Some(WorkflowState::Acquired),
            WorkflowState::Acquired => Some(WorkflowState::PartitionsAnalyzed),
            WorkflowState::PartitionsAnalyzed => Some(WorkflowState::FilesystemAnalyzed),
            WorkflowState::FilesystemAnalyzed => {
                Some(WorkflowState::FilesAnalyzed { extracted: false })
            }
            WorkflowState::FilesAnalyzed { .. } => Some(WorkflowState::TimelineBuilt),
            WorkflowState::TimelineBuilt => Some(WorkflowState::Complete),
            WorkflowState::Complete | WorkflowState::Failed { .. } => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, WorkflowState::Complete | WorkflowState::Failed { .. })
    }
}

/// One forensic session: configuration, audit trail, command runner, and
/// report writer, injected into every stage.
pub struct Session {
    config: SkatConfig,
    audit: Arc<AuditLogger>,
    runner: CommandRunner,
    reports: ReportWriter,
}

impl Session {
    pub fn new(config: SkatConfig) -> Result<Self> {
        fs::create_dir_all(&config.evidence_dir)?;
        let audit = Arc::new(AuditLogger::open(&config.audit_log)?);
        let runner = CommandRunner::new(
            Arc::clone(&audit),
            Duration::from_secs(config.tool_timeout_secs),
        )?;
        let reports = ReportWriter::new(&config.reports_dir)?;

        Ok(Self {
            config,
            audit,
            runner,
            reports,
        })
    }

    /// Check that every required TSK utility resolves to an executable,
    /// without spawning any of them.
    pub fn verify_tools(&self) -> Result<()> {
        let missing: Vec<String> = tsk::REQUIRED_TOOLS
            .iter()
            .filter(|name| resolve_tool(&self.config.tool(name)).is_err())
            .map(|name| name.to_string())
            .collect();

        if missing.is_empty() {
            info!("Sleuth Kit installation verified");
            self.audit.success("verify", &[])?;
            Ok(())
        } else {
            let err = SkatError::ToolNotFound(missing.join(", "));
            self.audit.failure("verify", &[], &err.to_string())?;
            Err(err)
        }
    }

    /// Acquire a forensic image of `source` with dd, then compute and persist
    /// its integrity record. Acquisition is not resumable; a failed run
    /// restarts from scratch.
    pub fn acquire(&self, source: &Path, output: Option<PathBuf>) -> Result<EvidenceImage> {
        if !source.exists() {
            return Err(SkatError::InvalidArgument(format!(
                "acquisition source does not exist: {}",
                source.display()
            )));
        }

        let output = output.unwrap_or_else(|| {
            let stamp = Utc::now().format("%Y%m%d_%H%M%S");
            self.config.evidence_dir.join(format!("image_{}.dd", stamp))
        });
        if output.exists() {
            return Err(SkatError::AlreadyExists(output));
        }

        info!(
            "Creating forensic image of {} at {}",
            source.display(),
            output.display()
        );
        self.runner.run_checked(
            &self.config.tool(tsk::DD),
            &tsk::dd_args(source, &output, &self.config.dd_block_size),
            None,
        )?;

        let acquired_at = Utc::now();
        let digests = integrity::compute_record(&output, self.config.hash_chunk_size)?;
        info!("MD5:  {}", digests.md5);
        info!("SHA1: {}", digests.sha1);

        let meta = AcquisitionMetadata {
            source: source.to_string_lossy().to_string(),
            image_path: output.clone(),
            acquisition_date: acquired_at,
            digests,
        };
        integrity::write_sidecar(&meta)?;

        self.audit.success(
            "acquire",
            &[
                source.to_string_lossy().to_string(),
                output.to_string_lossy().to_string(),
            ],
        )?;

        Ok(EvidenceImage {
            path: output,
            source: meta.source,
            acquired_at,
        })
    }

    /// Analyze the partition structure of an image with mmls.
    pub fn partitions(&self, image: &Path) -> Result<AnalysisResult> {
        self.require_image(image)?;
        self.ensure_verified(image)?;
        self.run_partitions(image)
    }

    /// Extract filesystem statistics with fsstat.
    pub fn fsstat(&self, image: &Path, offset: Option<u64>) -> Result<AnalysisResult> {
        self.require_image(image)?;
        self.ensure_verified(image)?;
        self.run_fsstat(image, offset)
    }

    /// List files in the filesystem with fls.
    pub fn list_files(
        &self,
        image: &Path,
        offset: Option<u64>,
        recursive: bool,
    ) -> Result<AnalysisResult> {
        self.require_image(image)?;
        self.ensure_verified(image)?;
        self.run_file_listing(image, offset, recursive)
    }

    /// Extract one file by inode with icat. Returns the path the content was
    /// written to.
    pub fn extract(
        &self,
        image: &Path,
        inode: u64,
        offset: Option<u64>,
        output: Option<PathBuf>,
    ) -> Result<PathBuf> {
        self.require_image(image)?;
        if inode == 0 {
            return Err(SkatError::InvalidArgument(
                "inode must be greater than zero".to_string(),
            ));
        }
        self.ensure_verified(image)?;

        let output = output.unwrap_or_else(|| {
            self.config
                .evidence_dir
                .join(format!("inode_{}.bin", inode))
        });

        let tool_output = self.runner.run_checked(
            &self.config.tool(tsk::ICAT),
            &tsk::icat_args(image, offset, inode),
            None,
        )?;
        write_new(&output, &tool_output.stdout)?;

        info!("Extracted inode {} to {}", inode, output.display());
        Ok(output)
    }

    /// Build an activity timeline: fls body file, then mactime.
    pub fn timeline(&self, image: &Path, offset: Option<u64>) -> Result<AnalysisResult> {
        self.require_image(image)?;
        self.ensure_verified(image)?;
        self.run_timeline(image, offset)
    }

    /// Hand the evidence off to Autopsy without waiting for it.
    pub fn autopsy(&self, evidence: &Path) -> Result<()> {
        if !evidence.exists() {
            return Err(SkatError::InvalidArgument(format!(
                "evidence path does not exist: {}",
                evidence.display()
            )));
        }
        self.runner.spawn_detached(
            &self.config.tool(tsk::AUTOPSY),
            &[evidence.to_string_lossy().to_string()],
        )?;
        info!("Autopsy launched for {}", evidence.display());
        Ok(())
    }

    /// Run the full analysis workflow against an image.
    ///
    /// When `offset` is not supplied, the offset consumed by the filesystem,
    /// file-listing, and timeline stages is derived from the partitions stage
    /// output. The returned state is `Complete` or `Failed(stage, reason)`;
    /// `Err` is reserved for faults that prevent even recording the outcome.
    pub fn full(&self, image: &Path, offset: Option<u64>) -> Result<WorkflowState> {
        let image_id = EvidenceImage::image_id(image);
        let image_arg = vec![image.to_string_lossy().to_string()];
        let started_at = Utc::now();
        let mut state = WorkflowState::NotStarted;

        info!("Starting full analysis of {}", image.display());
        self.audit.success("full.start", &image_arg)?;

        // NotStarted -> Acquired: the image must exist and its integrity
        // record, when present, must still match.
        if let Err(err) = self
            .require_image(image)
            .and_then(|_| self.ensure_verified(image))
        {
            return self.fail(Stage::Acquisition, &image_arg, err);
        }
        state = advance(state);

        let mmls = match self.run_partitions(image) {
            Ok(result) => result,
            Err(err) => return self.fail(Stage::Partitions, &image_arg, err),
        };
        state = advance(state);

        // Later stages consume the partition offset found above unless the
        // caller supplied one.
        let offset = offset.or_else(|| {
            let derived = tsk::first_partition_offset(&mmls.output);
            match derived {
                Some(sectors) => info!("Using partition offset {} from mmls", sectors),
                None => warn!("No partition offset found in mmls output, analyzing at offset 0"),
            }
            derived
        });

        if let Err(err) = self.run_fsstat(image, offset) {
            return self.fail(Stage::Filesystem, &image_arg, err);
        }
        state = advance(state);

        if let Err(err) = self.run_file_listing(image, offset, true) {
            return self.fail(Stage::FileListing, &image_arg, err);
        }
        state = advance(state);

        if let Err(err) = self.run_timeline(image, offset) {
            return self.fail(Stage::Timeline, &image_arg, err);
        }
        state = advance(state);

        self.write_run_summary(&image_id, image, offset, &started_at)?;
        state = advance(state);

        self.audit.success("full.complete", &image_arg)?;
        info!("Full analysis of {} complete", image.display());
        Ok(state)
    }

    fn fail(&self, stage: Stage, image_arg: &[String], err: SkatError) -> Result<WorkflowState> {
        let reason = err.to_string();
        error!("{} stage failed: {}", stage, reason);
        self.audit
            .failure(&format!("stage.{}", stage.slug()), image_arg, &reason)?;
        Ok(WorkflowState::Failed { stage, reason })
    }

    fn require_image(&self, image: &Path) -> Result<()> {
        if image.is_file() {
            Ok(())
        } else {
            Err(SkatError::InvalidArgument(format!(
                "image does not exist: {}",
                image.display()
            )))
        }
    }

    /// Re-verify the image against its integrity record before trusting any
    /// analysis. An image acquired outside this tool has no record; that is
    /// allowed, but flagged.
    fn ensure_verified(&self, image: &Path) -> Result<()> {
        match integrity::load_sidecar(image)? {
            Some(meta) => integrity::verify(image, &meta.digests, self.config.hash_chunk_size),
            None => {
                warn!(
                    "No integrity record found for {}; analysis results are unverified",
                    image.display()
                );
                Ok(())
            }
        }
    }

    fn run_partitions(&self, image: &Path) -> Result<AnalysisResult> {
        let output = self.runner.run_checked(
            &self.config.tool(tsk::MMLS),
            &tsk::mmls_args(image),
            None,
        )?;
        self.persist(image, Stage::Partitions, None, output)
    }

    fn run_fsstat(&self, image: &Path, offset: Option<u64>) -> Result<AnalysisResult> {
        let output = self.runner.run_checked(
            &self.config.tool(tsk::FSSTAT),
            &tsk::fsstat_args(image, offset),
            None,
        )?;
        self.persist(image, Stage::Filesystem, offset, output)
    }

    fn run_file_listing(
        &self,
        image: &Path,
        offset: Option<u64>,
        recursive: bool,
    ) -> Result<AnalysisResult> {
        let output = self.runner.run_checked(
            &self.config.tool(tsk::FLS),
            &tsk::fls_args(image, offset, recursive),
            None,
        )?;
        self.persist(image, Stage::FileListing, offset, output)
    }

    fn run_timeline(&self, image: &Path, offset: Option<u64>) -> Result<AnalysisResult> {
        let image_id = EvidenceImage::image_id(image);

        let body = self.runner.run_checked(
            &self.config.tool(tsk::FLS),
            &tsk::fls_bodyfile_args(image, offset),
            None,
        )?;
        let body_path = self
            .reports
            .write_named(&image_id, "timeline.body", &body.stdout)?;

        let output = self.runner.run_checked(
            &self.config.tool(tsk::MACTIME),
            &tsk::mactime_args(&body_path),
            None,
        )?;
        self.persist(image, Stage::Timeline, offset, output)
    }

    /// Persist captured tool output as the stage report and wrap it as an
    /// analysis result.
    fn persist(
        &self,
        image: &Path,
        stage: Stage,
        offset: Option<u64>,
        output: ToolOutput,
    ) -> Result<AnalysisResult> {
        let image_id = EvidenceImage::image_id(image);
        let body = report_body(stage, image, offset, &output.stdout);
        self.reports.write(&image_id, stage, &body)?;

        Ok(AnalysisResult {
            stage,
            image_id,
            offset,
            output: output.stdout,
            produced_at: Utc::now(),
        })
    }

    fn write_run_summary(
        &self,
        image_id: &str,
        image: &Path,
        offset: Option<u64>,
        started_at: &chrono::DateTime<Utc>,
    ) -> Result<()> {
        let summary = json!({
            "run_id": self.audit.run_id(),
            "image": image.to_string_lossy(),
            "offset": offset,
            "started_at": started_at.to_rfc3339(),
            "finished_at": Utc::now().to_rfc3339(),
            "skat_version": env!("CARGO_PKG_VERSION"),
            "reports": {
                "partitions": self.reports.report_path(image_id, Stage::Partitions),
                "filesystem": self.reports.report_path(image_id, Stage::Filesystem),
                "file_list": self.reports.report_path(image_id, Stage::FileListing),
                "timeline": self.reports.report_path(image_id, Stage::Timeline),
            },
        });

        let rendered = serde_json::to_string_pretty(&summary)?;
        match self
            .reports
            .write_named(image_id, "summary.json", rendered.as_bytes())
        {
            Ok(path) => {
                info!("Run summary saved to {}", path.display());
                Ok(())
            }
            // The stage reports are the evidence; a leftover summary from an
            // earlier partial run must not fail a run whose stages all passed.
            Err(SkatError::AlreadyExists(path)) => {
                warn!("Run summary already exists at {}, keeping it", path.display());
                Ok(())
            }
            Err(err) => Err(err),
        }
    }
}

fn advance(state: WorkflowState) -> WorkflowState {
    match state.successor() {
        Some(next) => next,
        None => state,
    }
}

/// Stage report: a short header identifying image and offset, then the tool
/// output verbatim.
fn report_body(stage: Stage, image: &Path, offset: Option<u64>, stdout: &[u8]) -> Vec<u8> {
    let title = match offset {
        Some(sectors) => format!(
            "{} analysis for {} (offset: {})",
            stage,
            image.display(),
            sectors
        ),
        None => format!("{} analysis for {}", stage, image.display()),
    };

    let mut body = format!(
        "{}\n{}\n",
        title,
        "=".repeat(crate::constants::REPORT_RULER_WIDTH)
    )
    .into_bytes();
    body.extend_from_slice(stdout);
    body
}

/// Write bytes to a path that must not already exist.
fn write_new(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::AlreadyExists {
                SkatError::AlreadyExists(path.to_path_buf())
            } else {
                SkatError::Io(e)
            }
        })?;
    file.write_all(contents)?;
    Ok(())
}
