//! Watch command
//!
//! Runs a shell command once per coalesced batch until Ctrl-C.

use anyhow::{Context, Result};
use batchwatch_cli::config::{self, Config};
use batchwatch_cli::shell::ShellCommand;
use batchwatch_core::{routine, Aggregator, Batch, Emitter, EventKind};
use batchwatch_watcher::{FileStat, Watcher};
use clap::Args;
use owo_colors::OwoColorize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::info;

/// Paths shown per kind before the summary is truncated
const SUMMARY_LIMIT: usize = 10;

#[derive(Args, Debug, Default)]
pub struct WatchArgs {
    /// Paths to watch (default: current directory)
    pub paths: Vec<PathBuf>,

    /// Command run once before the first batch
    #[arg(long)]
    pub setup: Option<String>,

    /// Delay in milliseconds between draining a batch and running the command
    #[arg(long, conflicts_with = "no_throttle")]
    pub throttle_ms: Option<u64>,

    /// Run the command as soon as a batch is ready
    #[arg(long)]
    pub no_throttle: bool,

    /// Do not report files that exist when watching starts
    #[arg(long)]
    pub ignore_initial: bool,

    /// Do not read .gitignore files
    #[arg(long)]
    pub no_gitignore: bool,

    /// Extra ignore pattern, gitignore syntax (repeatable)
    #[arg(long = "ignore", value_name = "PATTERN")]
    pub ignore: Vec<String>,

    /// Command run for every batch, after `--`
    #[arg(last = true)]
    pub command: Vec<String>,
}

impl WatchArgs {
    /// Layer command line flags over the loaded configuration
    fn apply(&self, config: &mut Config) {
        if let Some(ms) = self.throttle_ms {
            config.watch.throttle_ms = ms;
        }
        if self.no_throttle {
            config.watch.throttle_ms = 0;
        }
        if self.ignore_initial {
            config.watch.ignore_initial = true;
        }
        if self.no_gitignore {
            config.watch.ignore.use_gitignore = false;
        }
        config
            .watch
            .ignore
            .additional_patterns
            .extend(self.ignore.iter().cloned());
        if self.setup.is_some() {
            config.run.setup = self.setup.clone();
        }
        if !self.command.is_empty() {
            config.run.command = Some(self.command.join(" "));
        }
    }

    fn roots(&self) -> Vec<PathBuf> {
        if self.paths.is_empty() {
            vec![PathBuf::from(".")]
        } else {
            self.paths.clone()
        }
    }
}

pub async fn run(args: WatchArgs, config_path: &Path) -> Result<()> {
    let mut config = config::load(config_path)?;
    args.apply(&mut config);
    config.validate().context("Invalid configuration")?;

    let line = config.run.command.clone().context(
        "No command to run. Pass one after `--` (bw watch -- make test) or set run.command",
    )?;
    let command = ShellCommand::new(&config.run.shell, line);

    let batches = Arc::new(AtomicUsize::new(0));
    let counter = batches.clone();
    let consumer = routine::from_fn(move |batch: Batch<FileStat>| {
        let command = command.clone();
        let number = counter.fetch_add(1, Ordering::Relaxed) + 1;
        async move {
            print_batch(number, &batch);
            command.run_batch(&batch).await
        }
    });

    let emitter = Arc::new(Emitter::new());
    emitter.on_error(|error| {
        eprintln!("{} {}", "✗".red(), error);
    });

    let mut builder = Aggregator::builder(consumer).name("bw");
    if let Some(line) = config.run.setup.clone() {
        let setup = ShellCommand::new(&config.run.shell, line);
        println!("{} {}", "Setup:".dimmed(), setup.line());
        builder = builder.setup(routine::setup_fn(move || {
            let setup = setup.clone();
            async move { setup.run(&[]).await }
        }));
    }

    let mut watcher = Watcher::start_with_source(&args.roots(), &config.watch, emitter, builder)
        .context("Failed to start watching")?;

    for root in watcher.roots() {
        println!("{} {}", "Watching".bold(), root.display());
    }
    println!("{}", "Press Ctrl-C to stop".dimmed());

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;

    watcher.close();
    let total = batches.load(Ordering::Relaxed);
    info!("Stopped after {} batch(es)", total);
    println!("\n{} after {} batch(es)", "Stopped".bold(), total);

    Ok(())
}

fn print_batch(number: usize, batch: &Batch<FileStat>) {
    println!(
        "{} {} {} {}",
        format!("[batch {}]", number).bold(),
        format!("+{}", batch.added.len()).green(),
        format!("~{}", batch.changed.len()).yellow(),
        format!("-{}", batch.removed.len()).red(),
    );

    for kind in EventKind::ALL {
        let paths: Vec<&Path> = batch.paths(kind).collect();
        for path in paths.iter().take(SUMMARY_LIMIT) {
            let shown = display_path(path);
            match kind {
                EventKind::Added => println!("  {} {}", "+".green(), shown),
                EventKind::Changed => println!("  {} {}", "~".yellow(), shown),
                EventKind::Removed => println!("  {} {}", "-".red(), shown),
            }
        }
        if paths.len() > SUMMARY_LIMIT {
            println!(
                "  {}",
                format!("... and {} more {}", paths.len() - SUMMARY_LIMIT, kind).dimmed()
            );
        }
    }
}

/// Path relative to the working directory when possible
fn display_path(path: &Path) -> String {
    std::env::current_dir()
        .ok()
        .and_then(|cwd| path.strip_prefix(&cwd).ok().map(Path::to_path_buf))
        .unwrap_or_else(|| path.to_path_buf())
        .display()
        .to_string()
}
