use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info, LevelFilter};
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};

use skat::cli::{Args, Commands};
use skat::config::{self, SkatConfig};
use skat::workflow::{Session, WorkflowState};

fn main() -> Result<()> {
    let args = Args::parse();

    initialize_logging(args.verbose)?;

    let config = load_and_override_config(&args)?;
    let session = Session::new(config).context("Failed to initialize session")?;

    match &args.command {
        Commands::Verify => {
            session.verify_tools()?;
        }
        Commands::Acquire { source, output } => {
            let image = session.acquire(source, output.clone())?;
            info!("Image acquisition complete: {}", image.path.display());
        }
        Commands::Partitions { image } => {
            session.partitions(image)?;
        }
        Commands::Fsstat { image, offset } => {
            session.fsstat(image, *offset)?;
        }
        Commands::List {
            image,
            offset,
            no_recursive,
        } => {
            session.list_files(image, *offset, !no_recursive)?;
        }
        Commands::Extract {
            image,
            inode,
            offset,
            output,
        } => {
            session.extract(image, *inode, *offset, output.clone())?;
        }
        Commands::Timeline { image, offset } => {
            session.timeline(image, *offset)?;
        }
        Commands::Full { image, offset } => match session.full(image, *offset)? {
            WorkflowState::Failed { stage, reason } => {
                error!("Full analysis failed at the {} stage: {}", stage, reason);
                std::process::exit(1);
            }
            state => {
                info!("Full analysis finished in state {:?}", state);
            }
        },
        Commands::Autopsy { evidence } => {
            session.autopsy(evidence)?;
        }
    }

    Ok(())
}

/// Initialize logging with the specified verbosity level
fn initialize_logging(verbose: bool) -> Result<()> {
    let log_level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    TermLogger::init(
        log_level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )
    .context("Failed to initialize logger")?;
    Ok(())
}

/// Load configuration from file (or defaults) and apply CLI overrides.
fn load_and_override_config(args: &Args) -> Result<SkatConfig> {
    let mut config = config::load_or_default(args.config.as_deref())?;

    if let Some(dir) = &args.evidence_dir {
        config.evidence_dir = dir.clone();
    }
    if let Some(dir) = &args.reports_dir {
        config.reports_dir = dir.clone();
    }
    if let Some(path) = &args.audit_log {
        config.audit_log = path.clone();
    }
    if let Some(secs) = args.timeout {
        config.tool_timeout_secs = secs;
    }
    if let Some(dir) = &args.tool_dir {
        config.tool_dir = Some(dir.clone());
    }

    Ok(config)
}
