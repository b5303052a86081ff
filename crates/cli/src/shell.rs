//! Running batch commands through the shell

use batchwatch_core::{Batch, EventKind};
use batchwatch_watcher::FileStat;
use std::process::ExitStatus;
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

/// Environment variable holding the paths of one kind
pub fn env_var(kind: EventKind) -> &'static str {
    match kind {
        EventKind::Added => "BW_ADDED",
        EventKind::Changed => "BW_CHANGED",
        EventKind::Removed => "BW_REMOVED",
    }
}

/// Environment for one batch: newline separated paths per kind
///
/// Every variable is present, empty when the batch has no paths of that
/// kind.
pub fn batch_env<P>(batch: &Batch<P>) -> Vec<(&'static str, String)> {
    EventKind::ALL
        .iter()
        .map(|&kind| {
            let paths: Vec<String> = batch
                .paths(kind)
                .map(|p| p.to_string_lossy().into_owned())
                .collect();
            (env_var(kind), paths.join("\n"))
        })
        .collect()
}

#[derive(Debug, Error)]
pub enum ShellError {
    #[error("failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` exited with {status}")]
    Exit { command: String, status: ExitStatus },
}

/// A command line interpreted by a shell
#[derive(Debug, Clone)]
pub struct ShellCommand {
    shell: String,
    line: String,
}

impl ShellCommand {
    pub fn new(shell: impl Into<String>, line: impl Into<String>) -> Self {
        Self {
            shell: shell.into(),
            line: line.into(),
        }
    }

    pub fn line(&self) -> &str {
        &self.line
    }

    fn command(&self) -> Command {
        let flag = if self.shell.eq_ignore_ascii_case("cmd")
            || self.shell.to_ascii_lowercase().ends_with("cmd.exe")
        {
            "/C"
        } else {
            "-c"
        };
        let mut command = Command::new(&self.shell);
        command.arg(flag).arg(&self.line);
        command
    }

    /// Run to completion with `envs` added; a nonzero exit is an error
    pub async fn run(&self, envs: &[(&'static str, String)]) -> Result<(), ShellError> {
        debug!("Running `{}`", self.line);
        let status = self
            .command()
            .envs(envs.iter().map(|(k, v)| (*k, v.as_str())))
            .kill_on_drop(true)
            .status()
            .await
            .map_err(|source| ShellError::Spawn {
                command: self.line.clone(),
                source,
            })?;

        if status.success() {
            Ok(())
        } else {
            Err(ShellError::Exit {
                command: self.line.clone(),
                status,
            })
        }
    }

    /// Run for `batch`, exposing its paths through the `BW_*` variables
    pub async fn run_batch(&self, batch: &Batch<FileStat>) -> Result<(), ShellError> {
        self.run(&batch_env(batch)).await
    }
}
