//! Music Trends Ingest - chart and catalogue ingestion tool

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};
use trends_common::logging::{init_logging, LogConfig, LogLevel};
use trends_ingest::{Family, IngestConfig, LoadScope, Loader, Pipeline, StagingWriter, Store};

#[derive(Parser, Debug)]
#[command(name = "trends-ingest")]
#[command(author, version, about = "Music trends ingestion tool")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the full pipeline: acquire, clean, stage and load
    Run {
        /// Staging directory (overrides TRENDS_STAGING_DIR)
        #[arg(long)]
        staging_dir: Option<PathBuf>,
    },

    /// Load staged files of one family into its destination table
    Load {
        /// Dataset family (billboard, dj_mag, spotify, playlists, artists)
        family: Family,

        /// Only load the files of this run (YYYYMMDDHHMMSS)
        #[arg(long)]
        run: Option<String>,

        /// Staging directory (overrides TRENDS_STAGING_DIR)
        #[arg(long)]
        staging_dir: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // .env is optional
    let _ = dotenvy::dotenv();

    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };

    let log_config = LogConfig::builder()
        .level(log_level)
        .log_file_prefix("trends-ingest")
        .build()
        .merge_env()?;

    let _guard = init_logging(&log_config)?;

    let mut config = IngestConfig::from_env().context("Failed to load configuration")?;

    match cli.command {
        Command::Run { staging_dir } => {
            if let Some(dir) = staging_dir {
                config.staging.dir = dir;
            }

            let pipeline = Pipeline::from_config(&config).await?;
            let report = pipeline.run().await;
            let success = report.is_success();
            pipeline.shutdown().await;

            if let Some(failure) = &report.failure {
                error!("Run {} failed during {}: {}", report.run_timestamp, failure.stage, failure.message);
            }
            for outcome in report.failed_families() {
                error!("Load failed: {}", outcome);
            }

            if success {
                info!("Run {} complete ({} files staged)", report.run_timestamp, report.staged.len());
                Ok(ExitCode::SUCCESS)
            } else {
                Ok(ExitCode::FAILURE)
            }
        }
        Command::Load {
            family,
            run,
            staging_dir,
        } => {
            if let Some(dir) = staging_dir {
                config.staging.dir = dir;
            }

            let store = Store::connect(&config.store).await?;
            store.ensure_schema().await?;

            let scope = run.map_or(LoadScope::All, LoadScope::Run);
            let loader = Loader::new(&store, StagingWriter::new(&config.staging.dir));
            let outcome = loader.load_family(family, &scope).await;
            store.pool().close().await;

            info!("{}", outcome);
            if outcome.is_failed() {
                Ok(ExitCode::FAILURE)
            } else {
                Ok(ExitCode::SUCCESS)
            }
        }
    }
}
