use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Command-line arguments for the skat tool.
///
/// Global options select the evidence/report locations and tool behavior;
/// each forensic operation is a subcommand.
#[derive(Parser, Debug)]
#[clap(name = "skat", about = "Sleuth Kit automation tool for disk forensics")]
pub struct Args {
    /// Directory for acquired images and integrity records
    #[clap(long)]
    pub evidence_dir: Option<PathBuf>,

    /// Directory for analysis reports
    #[clap(long)]
    pub reports_dir: Option<PathBuf>,

    /// Path of the append-only audit log
    #[clap(long)]
    pub audit_log: Option<PathBuf>,

    /// Path to a YAML configuration file
    #[clap(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Timeout for external tool invocations, in seconds
    #[clap(long)]
    pub timeout: Option<u64>,

    /// Directory holding the TSK binaries (default: search PATH)
    #[clap(long)]
    pub tool_dir: Option<PathBuf>,

    /// Verbose logging
    #[clap(short, long)]
    pub verbose: bool,

    #[clap(subcommand)]
    pub command: Commands,
}

/// Forensic operations.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Verify that the required Sleuth Kit tools are installed
    Verify,

    /// Create a forensic image of a source disk or partition
    Acquire {
        /// Source disk or partition (e.g. /dev/sdb)
        source: PathBuf,

        /// Output image file (default: evidence/image_<timestamp>.dd)
        #[clap(short, long)]
        output: Option<PathBuf>,
    },

    /// Analyze the partition structure of an image
    Partitions {
        /// Path to the forensic image
        image: PathBuf,
    },

    /// Extract filesystem statistics
    Fsstat {
        /// Path to the forensic image
        image: PathBuf,

        /// Partition offset in sectors
        #[clap(short, long)]
        offset: Option<u64>,
    },

    /// List files in the filesystem
    List {
        /// Path to the forensic image
        image: PathBuf,

        /// Partition offset in sectors
        #[clap(short, long)]
        offset: Option<u64>,

        /// Non-recursive listing
        #[clap(short = 'n', long)]
        no_recursive: bool,
    },

    /// Extract a file by inode
    Extract {
        /// Path to the forensic image
        image: PathBuf,

        /// Inode to extract
        inode: u64,

        /// Partition offset in sectors
        #[clap(short, long)]
        offset: Option<u64>,

        /// Output file path (default: evidence/inode_<n>.bin)
        #[clap(long)]
        output: Option<PathBuf>,
    },

    /// Create a timeline of filesystem activity
    Timeline {
        /// Path to the forensic image
        image: PathBuf,

        /// Partition offset in sectors
        #[clap(short, long)]
        offset: Option<u64>,
    },

    /// Run the full analysis workflow
    Full {
        /// Path to the forensic image
        image: PathBuf,

        /// Partition offset in sectors (default: derived from mmls)
        #[clap(short, long)]
        offset: Option<u64>,
    },

    /// Launch Autopsy with the specified evidence
    Autopsy {
        /// Path to the evidence file
        evidence: PathBuf,
    },
}
