//! File system watching for batchwatch
//!
//! This crate feeds real filesystem notifications into the coalescing
//! core:
//! - `notify` backend events translated to added/changed/removed
//! - Ignore rules (built-in, .gitignore, .bwignore, config patterns)
//! - Initial scan reporting existing files as added
//! - Throttled hand-off of drained batches to the consumer

pub mod error;
pub mod ignore;
pub mod scan;
pub mod translate;

pub use error::{Result, WatchError};
pub use ignore::{IgnoreConfig, IgnoreRules};
pub use translate::FileStat;

use batchwatch_core::{Aggregator, AggregatorBuilder, Batch, Emitter, EventKind, Routine};
use notify::{RecommendedWatcher, RecursiveMode, Watcher as _};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, trace};

/// Largest accepted throttle, in milliseconds
pub const MAX_THROTTLE_MS: u64 = 60_000;

/// Watch configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchOptions {
    /// Delay between draining a batch and running the consumer, 0 disables
    pub throttle_ms: u64,

    /// Skip reporting files that exist when watching starts
    pub ignore_initial: bool,

    /// Watch subdirectories too
    pub recursive: bool,

    pub ignore: IgnoreConfig,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            throttle_ms: 100,
            ignore_initial: false,
            recursive: true,
            ignore: IgnoreConfig::default(),
        }
    }
}

impl WatchOptions {
    pub fn throttle(&self) -> Option<Duration> {
        (self.throttle_ms > 0).then(|| Duration::from_millis(self.throttle_ms))
    }

    /// Reject out-of-range values
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.throttle_ms > MAX_THROTTLE_MS {
            return Err(format!(
                "throttle_ms must be at most {} (got {})",
                MAX_THROTTLE_MS, self.throttle_ms
            ));
        }
        Ok(())
    }
}

/// Routes backend events through ignore rules into the emitter
struct Dispatcher {
    emitter: Arc<Emitter<FileStat>>,
    rules: Vec<IgnoreRules>,
}

impl Dispatcher {
    fn dispatch(&self, event: &notify::Event) {
        for (kind, path) in translate::translate(event, |p| p.exists()) {
            let stat = match kind {
                EventKind::Removed => None,
                EventKind::Added | EventKind::Changed => FileStat::probe(&path),
            };
            if stat.as_ref().map_or(false, |s| s.is_dir) {
                continue;
            }
            if self.is_ignored(&path) {
                trace!("Ignoring {} for {}", kind, path.display());
                continue;
            }

            trace!("{} {}", kind, path.display());
            self.emitter.emit(kind, &path, stat.as_ref());
        }
    }

    fn is_ignored(&self, path: &Path) -> bool {
        self.rules.iter().any(|rules| rules.should_ignore(path, false))
    }

    fn backend_error(&self, error: notify::Error) {
        self.emitter
            .emit_error(&batchwatch_core::Error::Source(Box::new(error)));
    }
}

/// A running watch: backend, emitter and aggregator
///
/// Dropping the watcher stops the backend and closes the emitter.
pub struct Watcher {
    emitter: Arc<Emitter<FileStat>>,
    aggregator: Arc<Aggregator<FileStat>>,
    backend: Option<RecommendedWatcher>,
    roots: Vec<PathBuf>,
}

impl Watcher {
    /// Start watching `paths`, delivering to a caller-supplied emitter
    ///
    /// Handlers registered on `emitter` beforehand (e.g. `on_error`) see
    /// every notification and failure from the start, including the
    /// initial scan and setup. On error nothing is subscribed to `emitter`
    /// and the setup routine never runs.
    pub fn start_with_source(
        paths: &[PathBuf],
        options: &WatchOptions,
        emitter: Arc<Emitter<FileStat>>,
        aggregator: AggregatorBuilder<FileStat>,
    ) -> Result<Self> {
        if paths.is_empty() {
            return Err(WatchError::NoRoots);
        }
        options.validate().map_err(WatchError::Config)?;

        let mut roots = Vec::with_capacity(paths.len());
        let mut rules = Vec::with_capacity(paths.len());
        for path in paths {
            let root = std::fs::canonicalize(path).map_err(|source| WatchError::Root {
                path: path.clone(),
                source,
            })?;
            rules.push(IgnoreRules::load(&root, options.ignore.clone())?);
            roots.push(root);
        }

        let dispatcher = Arc::new(Dispatcher {
            emitter: emitter.clone(),
            rules,
        });
        let handler = dispatcher.clone();
        let mut backend = notify::recommended_watcher(
            move |res: notify::Result<notify::Event>| match res {
                Ok(event) => handler.dispatch(&event),
                Err(e) => handler.backend_error(e),
            },
        )?;

        let mode = if options.recursive {
            RecursiveMode::Recursive
        } else {
            RecursiveMode::NonRecursive
        };
        for root in &roots {
            backend.watch(root, mode)?;
            debug!("Watching {}", root.display());
        }

        // Last fallible step: subscribing launches the setup routine
        let aggregator = aggregator.throttle(options.throttle()).attach(&emitter)?;

        if !options.ignore_initial {
            let mut count = 0usize;
            for rules in &dispatcher.rules {
                for (path, stat) in scan::initial_files(rules, options.recursive) {
                    emitter.emit_added(&path, Some(&stat));
                    count += 1;
                }
            }
            debug!("Initial scan reported {} files", count);
        }

        info!(
            "Watching {} root(s) (throttle: {:?})",
            roots.len(),
            options.throttle()
        );

        Ok(Self {
            emitter,
            aggregator,
            backend: Some(backend),
            roots,
        })
    }

    /// Start watching `paths` with a fresh emitter
    pub fn start(
        paths: &[PathBuf],
        options: &WatchOptions,
        aggregator: AggregatorBuilder<FileStat>,
    ) -> Result<Self> {
        Self::start_with_source(paths, options, Arc::new(Emitter::new()), aggregator)
    }

    pub fn emitter(&self) -> &Arc<Emitter<FileStat>> {
        &self.emitter
    }

    pub fn aggregator(&self) -> &Arc<Aggregator<FileStat>> {
        &self.aggregator
    }

    /// Canonicalized watched roots
    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Stop the backend and close the emitter
    ///
    /// An invocation already in flight runs to completion; nothing new is
    /// recorded afterwards.
    pub fn close(&mut self) {
        if let Some(backend) = self.backend.take() {
            drop(backend);
            self.emitter.close();
            info!("Stopped watching {} root(s)", self.roots.len());
        }
    }
}

impl Drop for Watcher {
    fn drop(&mut self) {
        self.close();
    }
}

/// Watch `paths` and hand coalesced batches to `consumer`
pub fn watch<C>(paths: &[PathBuf], options: &WatchOptions, consumer: C) -> Result<Watcher>
where
    C: Routine<Batch<FileStat>> + 'static,
{
    Watcher::start(paths, options, Aggregator::builder(consumer).name("watch"))
}

/// Like [`watch`], running `setup` to completion before the first batch
pub fn watch_with_setup<C, S>(
    paths: &[PathBuf],
    options: &WatchOptions,
    consumer: C,
    setup: S,
) -> Result<Watcher>
where
    C: Routine<Batch<FileStat>> + 'static,
    S: Routine<()> + 'static,
{
    Watcher::start(
        paths,
        options,
        Aggregator::builder(consumer).name("watch").setup(setup),
    )
}
