//! `batchwatch.toml` configuration
//!
//! Every field has a default, so a missing file or a partial file is
//! valid. Command line flags are applied on top after loading.

use anyhow::{Context, Result};
use batchwatch_watcher::WatchOptions;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Default configuration file name, looked up in the working directory
pub const CONFIG_FILE: &str = "batchwatch.toml";

/// Complete `bw` configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub watch: WatchOptions,
    pub run: RunConfig,
}

/// How commands are executed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Shell used to interpret commands
    pub shell: String,

    /// Command run once before the first batch
    pub setup: Option<String>,

    /// Command run for every batch, used when none is given on the
    /// command line
    pub command: Option<String>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            shell: default_shell().to_string(),
            setup: None,
            command: None,
        }
    }
}

fn default_shell() -> &'static str {
    if cfg!(windows) {
        "cmd"
    } else {
        "sh"
    }
}

impl Config {
    /// Check value ranges
    pub fn validate(&self) -> Result<()> {
        self.watch
            .validate()
            .map_err(|e| anyhow::anyhow!("[watch] {}", e))?;

        if self.run.shell.trim().is_empty() {
            anyhow::bail!("[run] shell must not be empty");
        }
        if self.run.setup.as_deref().map_or(false, |s| s.trim().is_empty()) {
            anyhow::bail!("[run] setup must not be empty when set");
        }

        Ok(())
    }
}

/// Resolve the configuration file: an explicit path, or `batchwatch.toml`
/// in the working directory
pub fn config_file_path(explicit: Option<&Path>) -> Result<PathBuf> {
    match explicit {
        Some(path) => Ok(path.to_path_buf()),
        None => {
            let cwd = std::env::current_dir().context("Could not determine working directory")?;
            Ok(cwd.join(CONFIG_FILE))
        }
    }
}

/// Load configuration from `path`, falling back to defaults if it does
/// not exist
pub fn load(path: &Path) -> Result<Config> {
    if !path.exists() {
        debug!("No config at {}, using defaults", path.display());
        return Ok(Config::default());
    }

    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let config: Config = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    config
        .validate()
        .with_context(|| format!("Invalid configuration in {}", path.display()))?;

    debug!("Loaded config from {}", path.display());
    Ok(config)
}

/// Write `config` to `path`
pub fn save(path: &Path, config: &Config) -> Result<()> {
    config.validate()?;
    let contents = toml::to_string_pretty(config).context("Failed to serialize configuration")?;
    std::fs::write(path, contents).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

/// Create the file with defaults if it does not exist; returns whether it
/// was created
pub fn init_if_missing(path: &Path) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    std::fs::write(path, example_config())
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(true)
}

/// Annotated example configuration
pub fn example_config() -> String {
    format!(
        r#"# batchwatch configuration

[watch]
# Delay in milliseconds between draining a batch and running the command.
# 0 runs the command as soon as a batch is ready. Maximum 60000.
throttle_ms = 100

# Do not report files that already exist when watching starts
ignore_initial = false

# Watch subdirectories
recursive = true

[watch.ignore]
use_gitignore = true
use_bwignore = true
# Extra patterns in .gitignore syntax
additional_patterns = ["target/", "*.tmp"]

[run]
shell = "{shell}"
# Run once before the first batch
# setup = "make deps"
# Run for every batch; BW_ADDED, BW_CHANGED and BW_REMOVED hold the paths
# command = "make test"
"#,
        shell = default_shell()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_yields_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = load(&temp_dir.path().join(CONFIG_FILE)).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.watch.throttle_ms, 100);
    }

    #[test]
    fn test_example_config_parses_and_validates() {
        let config: Config = toml::from_str(&example_config()).unwrap();
        config.validate().unwrap();
        assert_eq!(
            config.watch.ignore.additional_patterns,
            vec!["target/".to_string(), "*.tmp".to_string()]
        );
        assert_eq!(config.run.command, None);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "[run]\ncommand = \"cargo test\"\n").unwrap();

        let config = load(&path).unwrap();
        assert_eq!(config.run.command.as_deref(), Some("cargo test"));
        assert_eq!(config.run.shell, default_shell());
        assert!(config.watch.recursive);
    }

    #[test]
    fn test_out_of_range_throttle_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "[watch]\nthrottle_ms = 600000\n").unwrap();

        let err = load(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("throttle_ms"));
    }

    #[test]
    fn test_save_then_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(CONFIG_FILE);

        let mut config = Config::default();
        config.watch.ignore_initial = true;
        config.run.setup = Some("make deps".to_string());
        save(&path, &config).unwrap();

        assert_eq!(load(&path).unwrap(), config);
    }

    #[test]
    fn test_init_if_missing_only_creates_once() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(CONFIG_FILE);

        assert!(init_if_missing(&path).unwrap());
        assert!(!init_if_missing(&path).unwrap());
        assert!(load(&path).is_ok());
    }

    #[test]
    fn test_empty_shell_is_rejected() {
        let mut config = Config::default();
        config.run.shell = "  ".to_string();
        assert!(config.validate().is_err());
    }
}
