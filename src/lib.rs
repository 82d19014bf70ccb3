//! # skat
//!
//! Sleuth Kit automation for disk forensics: acquisition with integrity
//! verification, partition/filesystem analysis, file listing and extraction,
//! and timeline generation, orchestrated over The Sleuth Kit's command-line
//! utilities.
//!
//! ## Overview
//!
//! skat treats each TSK utility (`mmls`, `fsstat`, `fls`, `icat`, `mactime`)
//! as an opaque executable: it runs them with vector arguments, captures their
//! output verbatim, and organizes the results into per-image reports. What
//! skat owns is the evidentiary discipline around those invocations:
//!
//! - **Integrity**: every acquired image gets a dual-digest (MD5 + SHA-1)
//!   record computed in one streaming pass, re-checked before any analysis.
//! - **Auditing**: every operation attempted, with arguments and outcome,
//!   lands in an append-only JSON-lines log that survives restarts.
//! - **Orchestration**: full runs traverse an explicit state machine; a
//!   failed stage halts the run, keeps earlier reports, and never retries.
//! - **Non-repudiation**: reports and extracted files are written once;
//!   collisions are errors, never overwrites.
//!
//! ## Module Organization
//!
//! - [`cli`]: Command-line interface definitions and argument parsing
//! - [`config`]: Runtime configuration with YAML override support
//! - [`models`]: Evidence, integrity, analysis, and audit data models
//! - [`errors`]: Error taxonomy for workflow failures
//! - [`audit`]: Append-only audit logging
//! - [`integrity`]: Streaming dual-digest computation and verification
//! - [`runner`]: Child process execution with timeouts and capture
//! - [`report`]: No-clobber report persistence
//! - [`tsk`]: The Sleuth Kit tool surface and argument grammar
//! - [`workflow`]: Stage state machine and session orchestration

/// Command-line interface definitions and argument parsing
pub mod cli;

/// Runtime configuration
pub mod config;

/// Application constants
pub mod constants;

/// Error taxonomy for workflow failures
pub mod errors;

/// Core data models
pub mod models;

/// Append-only audit logging
pub mod audit;

/// Streaming integrity computation and verification
pub mod integrity;

/// Child process execution
pub mod runner;

/// Report persistence
pub mod report;

/// The Sleuth Kit tool surface
pub mod tsk;

/// Workflow orchestration
pub mod workflow;
