use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use blobcopy_core::{CopyOptions, RateLimit, RemotesConfig};

mod commands;

#[derive(Parser)]
#[command(name = "blobcopy")]
#[command(about = "Bulk copy between object-storage backends", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the remotes configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Also write log output to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// Enable verbose logging (-v for debug, -vv for trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Copy objects from a source location to a destination location
    ///
    /// Locations are `remote:prefix` (resolved against --config) or direct
    /// URLs such as `s3://bucket/prefix`.
    Copy {
        /// Source location
        source: String,

        /// Destination location
        dest: String,

        /// Concurrent transfer workers
        #[arg(long, default_value_t = 4)]
        transfers: usize,

        /// Concurrent destination checkers
        #[arg(long, default_value_t = 8)]
        checkers: usize,

        /// Part size in bytes; objects this large copy as multipart uploads
        #[arg(long, default_value_t = 16 * 1024 * 1024)]
        chunk_size: u64,

        /// Concurrent part transfers within one object
        #[arg(long, default_value_t = 4)]
        upload_concurrency: usize,

        /// Cap remote API calls at this many per second
        #[arg(long)]
        rate_limit: Option<u32>,

        /// Burst allowance for the rate limiter
        #[arg(long, default_value_t = 20)]
        rate_burst: u32,

        /// Whole-object retries
        #[arg(long, default_value_t = 3)]
        retries: u32,

        /// Per-call retries for transient errors
        #[arg(long, default_value_t = 10)]
        low_level_retries: u32,

        /// Base backoff delay between per-call retries, in milliseconds
        #[arg(long, default_value_t = 100)]
        retry_sleep_ms: u64,

        /// Seconds between progress log lines
        #[arg(long, default_value_t = 30)]
        stats_interval: u64,
    },

    /// List objects under a location
    Ls {
        /// Location to enumerate
        target: String,
    },

    /// Report what a copy would transfer, without writing anything
    Check {
        /// Source location
        source: String,

        /// Destination location
        dest: String,

        /// Concurrent destination checkers
        #[arg(long, default_value_t = 8)]
        checkers: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    // Priority: RUST_LOG env var > verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        match cli.verbose {
            0 => EnvFilter::new("info"),
            1 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    let file_layer = match &cli.log_file {
        Some(path) => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("Cannot create log file {}", path.display()))?;
            Some(fmt::layer().with_ansi(false).with_writer(std::sync::Mutex::new(file)))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(file_layer)
        .with(filter)
        .init();

    let remotes = match &cli.config {
        Some(path) => RemotesConfig::load(path)?,
        None => RemotesConfig::default(),
    };

    let exit_code = match cli.command {
        Commands::Copy {
            source,
            dest,
            transfers,
            checkers,
            chunk_size,
            upload_concurrency,
            rate_limit,
            rate_burst,
            retries,
            low_level_retries,
            retry_sleep_ms,
            stats_interval,
        } => {
            let options = CopyOptions {
                transfers,
                checkers,
                chunk_size,
                upload_concurrency,
                rate_limit: rate_limit.map(|rps| RateLimit {
                    rps,
                    burst: rate_burst,
                }),
                retries,
                low_level_retries,
                retry_sleep_ms,
                stats_interval_secs: stats_interval,
                log_file: cli.log_file.clone(),
            };
            commands::copy::run(&source, &dest, options, &remotes).await?
        }
        Commands::Ls { target } => {
            commands::list::run(&target, &remotes).await?;
            0
        }
        Commands::Check {
            source,
            dest,
            checkers,
        } => commands::check::run(&source, &dest, checkers, &remotes).await?,
    };

    if exit_code != 0 {
        std::process::exit(exit_code);
    }
    Ok(())
}
