//! Notification sources and the in-process [`Emitter`]

use crate::error::{Error, Result};
use crate::event::EventKind;
use parking_lot::RwLock;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Handler invoked for one notification kind
pub type Handler<P> = Arc<dyn Fn(&Path, Option<&P>) + Send + Sync>;

/// Handler invoked for reported runtime errors
pub type ErrorHandler = Arc<dyn Fn(&Error) + Send + Sync>;

/// Anything that can deliver add/change/remove notifications and accept
/// error reports
pub trait NotificationSource<P>: Send + Sync + 'static {
    /// Register a handler for one notification kind
    ///
    /// Returns [`Error::SourceClosed`] if the source no longer delivers
    /// notifications.
    fn subscribe(&self, kind: EventKind, handler: Handler<P>) -> Result<()>;

    /// Report a runtime failure on the source's error channel
    fn report_error(&self, error: Error);
}

/// Simple multi-handler emitter
///
/// Handlers run synchronously on the emitting thread, in registration
/// order. The handler lists are cloned before dispatch, so a handler may
/// emit or subscribe re-entrantly.
pub struct Emitter<P> {
    added: RwLock<Vec<Handler<P>>>,
    changed: RwLock<Vec<Handler<P>>>,
    removed: RwLock<Vec<Handler<P>>>,
    errors: RwLock<Vec<ErrorHandler>>,
    closed: AtomicBool,
}

impl<P> Emitter<P> {
    pub fn new() -> Self {
        Self {
            added: RwLock::new(Vec::new()),
            changed: RwLock::new(Vec::new()),
            removed: RwLock::new(Vec::new()),
            errors: RwLock::new(Vec::new()),
            closed: AtomicBool::new(false),
        }
    }

    fn handlers(&self, kind: EventKind) -> &RwLock<Vec<Handler<P>>> {
        match kind {
            EventKind::Added => &self.added,
            EventKind::Changed => &self.changed,
            EventKind::Removed => &self.removed,
        }
    }

    /// Register a handler for `kind`; ignored once closed
    pub fn on<F>(&self, kind: EventKind, handler: F) -> &Self
    where
        F: Fn(&Path, Option<&P>) + Send + Sync + 'static,
    {
        if !self.is_closed() {
            self.handlers(kind).write().push(Arc::new(handler));
        }
        self
    }

    /// Register an error handler; ignored once closed
    pub fn on_error<F>(&self, handler: F) -> &Self
    where
        F: Fn(&Error) + Send + Sync + 'static,
    {
        if !self.is_closed() {
            self.errors.write().push(Arc::new(handler));
        }
        self
    }

    /// Deliver a notification to every handler of `kind`
    pub fn emit(&self, kind: EventKind, path: impl AsRef<Path>, payload: Option<&P>) {
        if self.is_closed() {
            return;
        }
        let handlers = self.handlers(kind).read().clone();
        for handler in &handlers {
            handler(path.as_ref(), payload);
        }
    }

    pub fn emit_added(&self, path: impl AsRef<Path>, payload: Option<&P>) {
        self.emit(EventKind::Added, path, payload);
    }

    pub fn emit_changed(&self, path: impl AsRef<Path>, payload: Option<&P>) {
        self.emit(EventKind::Changed, path, payload);
    }

    pub fn emit_removed(&self, path: impl AsRef<Path>, payload: Option<&P>) {
        self.emit(EventKind::Removed, path, payload);
    }

    /// Deliver an error to every error handler
    ///
    /// With no error handler registered the error is logged instead.
    pub fn emit_error(&self, error: &Error) {
        let handlers = self.errors.read().clone();
        if handlers.is_empty() {
            tracing::warn!("Unhandled aggregation error: {}", error);
            return;
        }
        for handler in &handlers {
            handler(error);
        }
    }

    /// Number of handlers registered for `kind`
    pub fn handler_count(&self, kind: EventKind) -> usize {
        self.handlers(kind).read().len()
    }

    /// Stop delivering notifications and drop every handler
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        for kind in EventKind::ALL {
            self.handlers(kind).write().clear();
        }
        self.errors.write().clear();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl<P> Default for Emitter<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: 'static> NotificationSource<P> for Emitter<P> {
    fn subscribe(&self, kind: EventKind, handler: Handler<P>) -> Result<()> {
        if self.is_closed() {
            return Err(Error::SourceClosed);
        }
        self.handlers(kind).write().push(handler);
        Ok(())
    }

    fn report_error(&self, error: Error) {
        self.emit_error(&error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::path::PathBuf;

    #[test]
    fn test_emit_reaches_handlers_of_matching_kind() {
        let emitter = Emitter::<u8>::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let s = seen.clone();
        emitter.on(EventKind::Added, move |path, payload| {
            s.lock().push((path.to_path_buf(), payload.copied()));
        });
        let s = seen.clone();
        emitter.on(EventKind::Removed, move |path, _| {
            s.lock().push((path.join("removed"), None));
        });

        emitter.emit_added("a", Some(&1));
        emitter.emit_changed("b", None);
        emitter.emit_removed("c", None);

        assert_eq!(
            *seen.lock(),
            vec![(PathBuf::from("a"), Some(1)), (PathBuf::from("c/removed"), None)]
        );
    }

    #[test]
    fn test_handlers_can_emit_reentrantly() {
        let emitter = Arc::new(Emitter::<()>::new());
        let count = Arc::new(Mutex::new(0));

        let inner = emitter.clone();
        emitter.on(EventKind::Added, move |path, _| {
            if path == Path::new("outer") {
                inner.emit_changed("inner", None);
            }
        });
        let c = count.clone();
        emitter.on(EventKind::Changed, move |_, _| *c.lock() += 1);

        emitter.emit_added("outer", None);
        assert_eq!(*count.lock(), 1);
    }

    #[test]
    fn test_closed_emitter_rejects_subscribers() {
        let emitter = Emitter::<()>::new();
        emitter.on(EventKind::Added, |_, _| {});
        assert_eq!(emitter.handler_count(EventKind::Added), 1);

        emitter.close();
        assert_eq!(emitter.handler_count(EventKind::Added), 0);

        let result = emitter.subscribe(EventKind::Added, Arc::new(|_: &Path, _: Option<&()>| {}));
        assert!(matches!(result, Err(Error::SourceClosed)));
    }

    #[test]
    fn test_report_error_reaches_error_handlers() {
        let emitter = Emitter::<()>::new();
        let messages = Arc::new(Mutex::new(Vec::new()));

        let m = messages.clone();
        emitter.on_error(move |err| m.lock().push(err.to_string()));
        emitter.report_error(Error::Consumer("boom".into()));

        assert_eq!(*messages.lock(), vec!["consumer failed: boom".to_string()]);
    }
}
