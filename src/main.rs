//! DriveWarden - Removable Media Data-Loss-Prevention Agent
//!
//! Watches removable drives and screens every file written to them before it
//! is released to the safe zone, escalated to the alert zone, or deleted.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use drivewarden::{
    config::AgentConfig,
    device::{DeviceManager, SysinfoEnumerator, Volume, VolumeEnumerator},
    pipeline::{FileEvent, FilePipeline},
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

#[derive(Parser)]
#[command(name = "drivewarden")]
#[command(author = "DriveWarden Team")]
#[command(version)]
#[command(about = "Removable media data-loss-prevention agent")]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "DRIVEWARDEN_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Monitor removable drives until interrupted
    Run,

    /// Run a single file through the screening pipeline
    Scan {
        /// File to screen
        file: PathBuf,
    },

    /// List mounted removable volumes
    Volumes,

    /// Show configuration
    Config {
        /// Show default configuration
        #[arg(long)]
        default: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => AgentConfig::load(path)
            .with_context(|| format!("Failed to load {}", path.display()))?,
        None => AgentConfig::default(),
    };

    let _log_guard = init_logging(&config, cli.verbose);

    match cli.command {
        Commands::Run => run_agent(config).await?,
        Commands::Scan { file } => scan_file(&config, &file).await?,
        Commands::Volumes => list_volumes().await?,
        Commands::Config { default } => {
            show_config(if default { None } else { Some(&config) })?;
        }
    }

    Ok(())
}

/// Console plus log-file output. The returned guard flushes the file writer on drop.
fn init_logging(config: &AgentConfig, verbose: bool) -> Option<WorkerGuard> {
    let level = if verbose { "debug" } else { config.logging.level.as_str() };
    let make_filter = || {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| format!("drivewarden={}", level).into())
    };

    let mut guard = None;
    let file_layer = match std::fs::create_dir_all(&config.logging.dir) {
        Ok(()) => {
            let appender =
                tracing_appender::rolling::never(&config.logging.dir, &config.logging.file);
            let (writer, worker_guard) = tracing_appender::non_blocking(appender);
            guard = Some(worker_guard);
            Some(
                tracing_subscriber::fmt::layer()
                    .with_writer(writer)
                    .with_ansi(false)
                    .with_filter(make_filter()),
            )
        }
        Err(e) => {
            eprintln!(
                "Warning: failed to create log directory {}: {}",
                config.logging.dir.display(),
                e
            );
            None
        }
    };

    tracing_subscriber::registry()
        .with(file_layer)
        .with(tracing_subscriber::fmt::layer().with_filter(make_filter()))
        .init();

    guard
}

async fn run_agent(config: AgentConfig) -> Result<()> {
    tracing::info!(
        safe = %config.zones.safe_dir.display(),
        alert = %config.zones.alert_dir.display(),
        approval = %config.approval.endpoint,
        "Starting DriveWarden"
    );

    let pipeline = Arc::new(FilePipeline::from_config(&config)?);
    let mut manager = DeviceManager::from_config(&config, pipeline);

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for shutdown signal");
        }
        tracing::info!("Shutting down...");
        trigger.cancel();
    });

    manager.run(cancel).await;
    Ok(())
}

async fn scan_file(config: &AgentConfig, file: &Path) -> Result<()> {
    let pipeline = FilePipeline::from_config(config)?;
    let volume = Volume::new(file.parent().map(Path::to_path_buf).unwrap_or_default());
    let report = pipeline.process(&FileEvent::new(file.to_path_buf(), volume)).await;

    println!("File:        {}", report.path.display());
    println!("Category:    {}", report.category);
    println!("Disposition: {}", report.disposition);
    if let Some(error) = &report.error {
        println!("Error:       {}", error);
    }

    if report.succeeded() {
        Ok(())
    } else {
        anyhow::bail!("Failed to dispose {}", report.path.display())
    }
}

async fn list_volumes() -> Result<()> {
    let volumes = SysinfoEnumerator::new().removable_volumes().await?;
    if volumes.is_empty() {
        println!("No removable volumes mounted");
    }
    for volume in volumes {
        println!("{}", volume);
    }
    Ok(())
}

fn show_config(config: Option<&AgentConfig>) -> Result<()> {
    let config = config.cloned().unwrap_or_default();
    let toml = toml::to_string_pretty(&config)?;
    println!("{}", toml);
    Ok(())
}
