//! batchwatch CLI - bw command

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod cmd;

/// batchwatch - run a command once per coalesced batch of file changes
#[derive(Parser)]
#[command(name = "bw")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file (default: ./batchwatch.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// More logging (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Also write logs to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Watch paths and run a command for every batch of changes
    Watch(cmd::watch::WatchArgs),
    /// Inspect configuration
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show the effective configuration
    List,
    /// Show the config file path
    Path {
        /// Create the file with defaults if missing
        #[arg(long)]
        create: bool,
    },
    /// Print an annotated example configuration
    Example,
}

fn init_logging(verbose: u8, log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "warn,bw={level},batchwatch_cli={level},batchwatch_core={level},batchwatch_watcher={level}"
        ))
    });

    let console = fmt::layer().with_writer(std::io::stderr).with_target(false);

    let (file, guard) = match log_file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let name = path
                .file_name()
                .with_context(|| format!("Log file path has no file name: {}", path.display()))?;
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory {}", dir.display()))?;

            let (writer, guard) =
                tracing_appender::non_blocking(tracing_appender::rolling::never(dir, name));
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file)
        .init();

    Ok(guard)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Held until exit so buffered file logs are flushed
    let _guard = init_logging(cli.verbose, cli.log_file.as_deref())?;

    let config_path = batchwatch_cli::config::config_file_path(cli.config.as_deref())?;

    match cli.command {
        Commands::Watch(args) => cmd::watch::run(args, &config_path).await,
        Commands::Config(ConfigCommands::List) => cmd::config::run_list(&config_path).await,
        Commands::Config(ConfigCommands::Path { create }) => {
            cmd::config::run_path(&config_path, create).await
        }
        Commands::Config(ConfigCommands::Example) => cmd::config::run_example().await,
    }
}
