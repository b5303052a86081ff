//! Notification and batch types shared by every layer

use std::fmt;
use std::path::{Path, PathBuf};

/// Kind of filesystem notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Path appeared
    Added,
    /// Path contents or metadata changed
    Changed,
    /// Path disappeared
    Removed,
}

impl EventKind {
    /// All kinds, in handler registration order
    pub const ALL: [EventKind; 3] = [EventKind::Added, EventKind::Changed, EventKind::Removed];

    /// Short lowercase name, as used in logs
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Added => "added",
            EventKind::Changed => "changed",
            EventKind::Removed => "removed",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One add/change/remove event for a path
///
/// The payload is opaque to the core and carried verbatim.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification<P> {
    pub kind: EventKind,
    pub path: PathBuf,
    pub payload: Option<P>,
}

impl<P> Notification<P> {
    pub fn new(kind: EventKind, path: impl Into<PathBuf>, payload: Option<P>) -> Self {
        Self {
            kind,
            path: path.into(),
            payload,
        }
    }
}

/// A path together with the payload it was last observed with
#[derive(Debug, Clone, PartialEq)]
pub struct Entry<P> {
    pub path: PathBuf,
    pub payload: Option<P>,
}

impl<P> Entry<P> {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Immutable snapshot of a drained change set
///
/// Each list keeps first-observation order within the batch.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch<P> {
    pub added: Vec<Entry<P>>,
    pub changed: Vec<Entry<P>>,
    pub removed: Vec<Entry<P>>,
}

impl<P> Batch<P> {
    /// Total number of entries across the three lists
    pub fn len(&self) -> usize {
        self.added.len() + self.changed.len() + self.removed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Paths of one category, in batch order
    pub fn paths(&self, kind: EventKind) -> impl Iterator<Item = &Path> {
        let entries = match kind {
            EventKind::Added => &self.added,
            EventKind::Changed => &self.changed,
            EventKind::Removed => &self.removed,
        };
        entries.iter().map(Entry::path)
    }

    /// Every entry tagged with its kind
    pub fn iter(&self) -> impl Iterator<Item = (EventKind, &Entry<P>)> {
        self.added
            .iter()
            .map(|e| (EventKind::Added, e))
            .chain(self.changed.iter().map(|e| (EventKind::Changed, e)))
            .chain(self.removed.iter().map(|e| (EventKind::Removed, e)))
    }
}

impl<P> Default for Batch<P> {
    fn default() -> Self {
        Self {
            added: Vec::new(),
            changed: Vec::new(),
            removed: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(path: &str) -> Entry<()> {
        Entry {
            path: PathBuf::from(path),
            payload: None,
        }
    }

    #[test]
    fn test_batch_len_and_paths() {
        let batch = Batch {
            added: vec![entry("a"), entry("b")],
            changed: vec![entry("c")],
            removed: vec![],
        };

        assert_eq!(batch.len(), 3);
        assert!(!batch.is_empty());
        let added: Vec<_> = batch.paths(EventKind::Added).collect();
        assert_eq!(added, vec![Path::new("a"), Path::new("b")]);
        assert_eq!(batch.paths(EventKind::Removed).count(), 0);
    }

    #[test]
    fn test_batch_iter_tags_kinds() {
        let batch = Batch {
            added: vec![entry("a")],
            changed: vec![entry("b")],
            removed: vec![entry("c")],
        };

        let kinds: Vec<_> = batch.iter().map(|(kind, e)| (kind, e.path.clone())).collect();
        assert_eq!(
            kinds,
            vec![
                (EventKind::Added, PathBuf::from("a")),
                (EventKind::Changed, PathBuf::from("b")),
                (EventKind::Removed, PathBuf::from("c")),
            ]
        );
    }

    #[test]
    fn test_default_batch_is_empty() {
        assert!(Batch::<()>::default().is_empty());
        assert_eq!(EventKind::Removed.to_string(), "removed");
    }
}
