//! Ignore pattern management for watched roots
//!
//! Supports multiple sources of ignore patterns:
//! 1. Built-in patterns (VCS metadata, editor temp files - always active)
//! 2. .gitignore patterns (optional, enabled by default)
//! 3. .bwignore patterns (batchwatch-specific, optional)
//! 4. Config-based patterns (gitignore syntax)

use crate::error::{Result, WatchError};
use ignore::gitignore::{Gitignore, GitignoreBuilder};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Directories never worth reporting
const BUILTIN_DIRS: &[&str] = &[".git", ".jj", ".hg", ".svn"];

/// Ignore rule set for one watched root
///
/// Paths are matched relative to the root. Precedence:
/// 1. Built-in patterns (always enforced)
/// 2. .bwignore (overrides .gitignore, including `!` whitelists)
/// 3. .gitignore
/// 4. Additional config patterns
pub struct IgnoreRules {
    root: PathBuf,
    gitignore: Option<Gitignore>,
    bwignore: Option<Gitignore>,
    extra: Option<Gitignore>,
    config: IgnoreConfig,
}

impl IgnoreRules {
    /// Load ignore rules for `root`
    pub fn load(root: &Path, config: IgnoreConfig) -> Result<Self> {
        let mut rules = Self {
            root: root.to_path_buf(),
            gitignore: None,
            bwignore: None,
            extra: None,
            config,
        };

        rules.reload()?;
        Ok(rules)
    }

    /// Rebuild matchers from disk and config
    pub fn reload(&mut self) -> Result<()> {
        self.gitignore = if self.config.use_gitignore {
            self.load_file(".gitignore")?
        } else {
            None
        };

        self.bwignore = if self.config.use_bwignore {
            self.load_file(".bwignore")?
        } else {
            None
        };

        self.extra = if self.config.additional_patterns.is_empty() {
            None
        } else {
            let mut builder = GitignoreBuilder::new(&self.root);
            for pattern in &self.config.additional_patterns {
                builder
                    .add_line(None, pattern)
                    .map_err(|e| WatchError::Ignore(format!("pattern '{}': {}", pattern, e)))?;
            }
            Some(builder.build().map_err(|e| WatchError::Ignore(e.to_string()))?)
        };

        Ok(())
    }

    fn load_file(&self, name: &str) -> Result<Option<Gitignore>> {
        let path = self.root.join(name);
        if !path.exists() {
            return Ok(None);
        }

        let mut builder = GitignoreBuilder::new(&self.root);
        if let Some(err) = builder.add(&path) {
            return Err(WatchError::Ignore(format!("{}: {}", path.display(), err)));
        }
        let matcher = builder
            .build()
            .map_err(|e| WatchError::Ignore(format!("{}: {}", path.display(), e)))?;
        Ok(Some(matcher))
    }

    /// Whether `path` (absolute, or relative to the root) should be skipped
    pub fn should_ignore(&self, path: &Path, is_dir: bool) -> bool {
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        if relative.is_absolute() {
            // Outside this root
            return false;
        }

        if is_builtin_ignored(relative) {
            return true;
        }

        if let Some(ref bwignore) = self.bwignore {
            let matched = bwignore.matched_path_or_any_parents(relative, is_dir);
            if matched.is_ignore() {
                return true;
            }
            if matched.is_whitelist() {
                return false;
            }
        }

        if let Some(ref gitignore) = self.gitignore {
            if gitignore.matched_path_or_any_parents(relative, is_dir).is_ignore() {
                return true;
            }
        }

        if let Some(ref extra) = self.extra {
            if extra.matched_path_or_any_parents(relative, is_dir).is_ignore() {
                return true;
            }
        }

        false
    }

    /// Number of active ignore sources
    pub fn active_sources(&self) -> usize {
        1 + usize::from(self.gitignore.is_some())
            + usize::from(self.bwignore.is_some())
            + usize::from(self.extra.is_some())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Check built-in patterns against a root-relative path
fn is_builtin_ignored(relative: &Path) -> bool {
    let in_vcs_dir = relative.components().any(|c| {
        c.as_os_str()
            .to_str()
            .map_or(false, |name| BUILTIN_DIRS.contains(&name))
    });
    if in_vcs_dir {
        return true;
    }

    let filename = relative
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("");
    is_editor_temp(filename)
}

/// Editor swap/backup files and OS litter
fn is_editor_temp(filename: &str) -> bool {
    // Vim swap files
    if filename.ends_with(".swp") || filename.ends_with(".swo") || filename.ends_with(".swx") {
        return true;
    }

    // Vim/Emacs backups
    if filename.ends_with('~') {
        return true;
    }

    // Emacs auto-save and lock files
    if (filename.starts_with('#') && filename.ends_with('#')) || filename.starts_with(".#") {
        return true;
    }

    // Vim writes this to probe directory permissions
    if filename == "4913" {
        return true;
    }

    matches!(filename, ".DS_Store" | "Thumbs.db" | "desktop.ini") || filename.starts_with("._")
}

/// Ignore configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IgnoreConfig {
    /// Use .gitignore patterns (default: true)
    #[serde(default = "default_true")]
    pub use_gitignore: bool,

    /// Use .bwignore patterns (default: true)
    #[serde(default = "default_true")]
    pub use_bwignore: bool,

    /// Additional patterns, gitignore syntax
    #[serde(default)]
    pub additional_patterns: Vec<String>,
}

impl Default for IgnoreConfig {
    fn default() -> Self {
        Self {
            use_gitignore: true,
            use_bwignore: true,
            additional_patterns: vec![],
        }
    }
}

fn default_true() -> bool {
    true
}
