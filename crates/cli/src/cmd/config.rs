//! Configuration command
//!
//! Shows the effective configuration and where it comes from.

use anyhow::Result;
use batchwatch_cli::config;
use batchwatch_watcher::MAX_THROTTLE_MS;
use owo_colors::OwoColorize;
use std::path::Path;

/// List all configuration values
pub async fn run_list(config_path: &Path) -> Result<()> {
    let config = config::load(config_path)?;

    println!("{}", "Configuration".bold());
    if config_path.exists() {
        println!("{}: {}\n", "Location".dimmed(), config_path.display().dimmed());
    } else {
        println!(
            "{}: {} {}\n",
            "Location".dimmed(),
            config_path.display().dimmed(),
            "(not found, using defaults)".yellow()
        );
    }

    println!("{}", "[watch]".yellow());
    println!(
        "  {} = {} {}",
        "throttle_ms".cyan(),
        config.watch.throttle_ms,
        if config.watch.throttle_ms == 0 {
            "(disabled)".dimmed().to_string()
        } else {
            format!("({}ms after each drain)", config.watch.throttle_ms)
                .dimmed()
                .to_string()
        }
    );
    println!("  {} = {}", "ignore_initial".cyan(), config.watch.ignore_initial);
    println!("  {} = {}", "recursive".cyan(), config.watch.recursive);

    println!("\n{}", "[watch.ignore]".yellow());
    println!("  {} = {}", "use_gitignore".cyan(), config.watch.ignore.use_gitignore);
    println!("  {} = {}", "use_bwignore".cyan(), config.watch.ignore.use_bwignore);
    println!(
        "  {} = {:?}",
        "additional_patterns".cyan(),
        config.watch.ignore.additional_patterns
    );

    println!("\n{}", "[run]".yellow());
    println!("  {} = {}", "shell".cyan(), config.run.shell);
    println!(
        "  {} = {}",
        "setup".cyan(),
        config.run.setup.as_deref().unwrap_or("(none)")
    );
    println!(
        "  {} = {}",
        "command".cyan(),
        config.run.command.as_deref().unwrap_or("(none)")
    );

    println!("\n{}", "Valid Ranges:".bold());
    println!("  throttle_ms: 0-{} (0 = no delay)", MAX_THROTTLE_MS);

    Ok(())
}

/// Show the config file path and optionally create it
pub async fn run_path(config_path: &Path, create: bool) -> Result<()> {
    if create && config::init_if_missing(config_path)? {
        println!("{} Created config file at: {}", "✓".green(), config_path.display());
    } else {
        println!("{}", config_path.display());
        if !config_path.exists() {
            println!("{}", "File does not exist. Use --create to create it.".yellow());
        }
    }

    Ok(())
}

/// Show example configuration
pub async fn run_example() -> Result<()> {
    println!("{}", config::example_config());
    Ok(())
}
