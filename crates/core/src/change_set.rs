//! Pending-event bookkeeping with per-path coalescing
//!
//! A path lives in at most one of the three pending maps. New notifications
//! are flattened against whatever is already pending for the same path:
//!
//! | pending   | incoming | result                       |
//! |-----------|----------|------------------------------|
//! | added     | removed  | dropped entirely             |
//! | added     | changed  | stays added, original payload|
//! | removed   | added    | changed, new payload         |
//! | removed   | changed  | changed, new payload         |
//! | changed   | added    | stays changed, new payload   |
//! | changed   | removed  | removed                      |

use crate::event::{Batch, Entry, EventKind, Notification};
use ahash::RandomState;
use indexmap::IndexMap;
use std::path::PathBuf;

type PendingMap<P> = IndexMap<PathBuf, Option<P>, RandomState>;

/// Mutable set of not-yet-delivered notifications
#[derive(Debug)]
pub struct ChangeSet<P> {
    added: PendingMap<P>,
    changed: PendingMap<P>,
    removed: PendingMap<P>,
}

impl<P> ChangeSet<P> {
    pub fn new() -> Self {
        Self {
            added: PendingMap::default(),
            changed: PendingMap::default(),
            removed: PendingMap::default(),
        }
    }

    /// Record one notification, flattening it against pending state
    pub fn observe(&mut self, kind: EventKind, path: PathBuf, payload: Option<P>) {
        match kind {
            EventKind::Removed => {
                if self.added.shift_remove(&path).is_some() {
                    return;
                }
                self.changed.shift_remove(&path);
                self.removed.insert(path, payload);
            }
            EventKind::Changed => {
                if self.added.contains_key(&path) {
                    return;
                }
                self.removed.shift_remove(&path);
                self.changed.insert(path, payload);
            }
            EventKind::Added => {
                if self.removed.shift_remove(&path).is_some() || self.changed.contains_key(&path) {
                    self.changed.insert(path, payload);
                } else {
                    self.added.insert(path, payload);
                }
            }
        }
    }

    /// Record a [`Notification`]
    pub fn apply(&mut self, notification: Notification<P>) {
        self.observe(notification.kind, notification.path, notification.payload);
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.changed.is_empty() && self.removed.is_empty()
    }

    /// Number of distinct pending paths
    pub fn len(&self) -> usize {
        self.added.len() + self.changed.len() + self.removed.len()
    }

    /// Snapshot every pending entry and clear the set
    pub fn drain(&mut self) -> Batch<P> {
        Batch {
            added: into_entries(std::mem::take(&mut self.added)),
            changed: into_entries(std::mem::take(&mut self.changed)),
            removed: into_entries(std::mem::take(&mut self.removed)),
        }
    }
}

impl<P> Default for ChangeSet<P> {
    fn default() -> Self {
        Self::new()
    }
}

fn into_entries<P>(map: PendingMap<P>) -> Vec<Entry<P>> {
    map.into_iter()
        .map(|(path, payload)| Entry { path, payload })
        .collect()
}
