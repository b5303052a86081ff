//! Translation of backend events into add/change/remove notifications

use batchwatch_core::EventKind;
use notify::event::{CreateKind, ModifyKind, RemoveKind, RenameMode};
use notify::Event;
use std::fs::Metadata;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Stat data attached to added and changed paths
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStat {
    pub len: u64,
    pub modified: Option<SystemTime>,
    pub is_dir: bool,
}

impl FileStat {
    pub fn from_metadata(metadata: &Metadata) -> Self {
        Self {
            len: metadata.len(),
            modified: metadata.modified().ok(),
            is_dir: metadata.is_dir(),
        }
    }

    /// Stat `path`, following symlinks; `None` if it vanished
    pub fn probe(path: &Path) -> Option<Self> {
        std::fs::metadata(path).ok().map(|m| Self::from_metadata(&m))
    }
}

/// Map one backend event to zero or more notifications
///
/// `exists` resolves events whose direction the backend could not tell
/// (e.g. a rename reported without from/to).
pub fn translate(event: &Event, exists: impl Fn(&Path) -> bool) -> Vec<(EventKind, PathBuf)> {
    let each = |kind: EventKind| -> Vec<(EventKind, PathBuf)> {
        event.paths.iter().map(|p| (kind, p.clone())).collect()
    };
    let probe = || -> Vec<(EventKind, PathBuf)> {
        event
            .paths
            .iter()
            .map(|p| {
                let kind = if exists(p) {
                    EventKind::Changed
                } else {
                    EventKind::Removed
                };
                (kind, p.clone())
            })
            .collect()
    };

    match event.kind {
        notify::EventKind::Create(CreateKind::Folder) => Vec::new(),
        notify::EventKind::Create(_) => each(EventKind::Added),

        notify::EventKind::Remove(RemoveKind::Folder) => Vec::new(),
        notify::EventKind::Remove(_) => each(EventKind::Removed),

        notify::EventKind::Modify(ModifyKind::Name(RenameMode::From)) => each(EventKind::Removed),
        notify::EventKind::Modify(ModifyKind::Name(RenameMode::To)) => each(EventKind::Added),
        notify::EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            let mut out = Vec::with_capacity(2);
            if let Some(from) = event.paths.first() {
                out.push((EventKind::Removed, from.clone()));
            }
            if let Some(to) = event.paths.get(1) {
                out.push((EventKind::Added, to.clone()));
            }
            out
        }
        notify::EventKind::Modify(ModifyKind::Name(_)) => event
            .paths
            .iter()
            .map(|p| {
                let kind = if exists(p) {
                    EventKind::Added
                } else {
                    EventKind::Removed
                };
                (kind, p.clone())
            })
            .collect(),
        notify::EventKind::Modify(_) => each(EventKind::Changed),

        notify::EventKind::Any => probe(),
        notify::EventKind::Access(_) | notify::EventKind::Other => Vec::new(),
    }
}
