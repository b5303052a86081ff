//! Uniform "run, then signal completion" adapter for consumers and setup
//!
//! Two calling conventions are supported:
//! - future style: a closure returning a future that resolves to `Result`
//! - callback style: a closure receiving a [`Completion`] it must signal
//!
//! Both are hidden behind [`Routine`], so the scheduler never branches on
//! which one it was given.

use crate::error::{BoxError, Error};
use async_trait::async_trait;
use std::future::Future;
use tokio::sync::oneshot;

/// Something the scheduler can run to completion with an input
#[async_trait]
pub trait Routine<I>: Send + Sync
where
    I: Send + 'static,
{
    /// Run once, resolving when the routine reports completion
    async fn run(&self, input: I) -> Result<(), BoxError>;
}

/// Adapter for closures returning a future
pub struct FutureRoutine<F>(F);

#[async_trait]
impl<I, F, Fut, E> Routine<I> for FutureRoutine<F>
where
    I: Send + 'static,
    F: Fn(I) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), E>> + Send + 'static,
    E: Into<BoxError> + 'static,
{
    async fn run(&self, input: I) -> Result<(), BoxError> {
        (self.0)(input).await.map_err(Into::into)
    }
}

/// Adapter for closures that signal completion through a [`Completion`]
pub struct CallbackRoutine<F>(F);

#[async_trait]
impl<I, F> Routine<I> for CallbackRoutine<F>
where
    I: Send + 'static,
    F: Fn(I, Completion) + Send + Sync + 'static,
{
    async fn run(&self, input: I) -> Result<(), BoxError> {
        let (completion, rx) = Completion::new();
        (self.0)(input, completion);

        match rx.await {
            Ok(result) => result,
            Err(_) => Err(Box::new(Error::CompletionDropped)),
        }
    }
}

/// One-shot completion signal handed to callback-style routines
///
/// Consumed on use, so it can be signalled at most once. Dropping it
/// without signalling counts as a failure.
#[derive(Debug)]
pub struct Completion {
    tx: oneshot::Sender<Result<(), BoxError>>,
}

impl Completion {
    fn new() -> (Self, oneshot::Receiver<Result<(), BoxError>>) {
        let (tx, rx) = oneshot::channel();
        (Self { tx }, rx)
    }

    /// Signal success
    pub fn done(self) {
        self.finish::<BoxError>(Ok(()));
    }

    /// Signal failure
    pub fn fail(self, error: impl Into<BoxError>) {
        self.finish(Err(error));
    }

    /// Signal with an arbitrary result
    pub fn finish<E: Into<BoxError>>(self, result: Result<(), E>) {
        // Receiver is gone only if the scheduler itself was dropped
        let _ = self.tx.send(result.map_err(Into::into));
    }
}

/// Wrap a future-returning closure taking the routine input
pub fn from_fn<I, F, Fut>(f: F) -> FutureRoutine<F>
where
    F: Fn(I) -> Fut,
{
    FutureRoutine(f)
}

/// Wrap a completion-callback closure taking the routine input
pub fn callback<I, F>(f: F) -> CallbackRoutine<F>
where
    F: Fn(I, Completion),
{
    CallbackRoutine(f)
}

/// Wrap a future-returning closure as a setup routine
pub fn setup_fn<F, Fut, E>(f: F) -> FutureRoutine<impl Fn(()) -> Fut + Send + Sync + 'static>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), E>> + Send + 'static,
    E: Into<BoxError> + 'static,
{
    FutureRoutine(move |()| f())
}

/// Wrap a completion-callback closure as a setup routine
pub fn setup_callback<F>(f: F) -> CallbackRoutine<impl Fn((), Completion) + Send + Sync + 'static>
where
    F: Fn(Completion) + Send + Sync + 'static,
{
    CallbackRoutine(move |(), done| f(done))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_future_routine_passes_input_and_result() {
        let seen = Arc::new(AtomicUsize::new(0));
        let seen_clone = seen.clone();
        let routine = from_fn(move |n: usize| {
            let seen = seen_clone.clone();
            async move {
                seen.store(n, Ordering::SeqCst);
                if n > 10 {
                    Err("too big")
                } else {
                    Ok(())
                }
            }
        });

        assert!(routine.run(3).await.is_ok());
        assert_eq!(seen.load(Ordering::SeqCst), 3);

        let err = routine.run(11).await.unwrap_err();
        assert_eq!(err.to_string(), "too big");
    }

    #[tokio::test]
    async fn test_callback_routine_completes_from_another_task() {
        let routine = callback(|n: u32, done: Completion| {
            tokio::spawn(async move {
                tokio::task::yield_now().await;
                if n == 0 {
                    done.fail("zero");
                } else {
                    done.done();
                }
            });
        });

        assert!(routine.run(1).await.is_ok());
        assert_eq!(routine.run(0).await.unwrap_err().to_string(), "zero");
    }

    #[tokio::test]
    async fn test_dropped_completion_is_an_error() {
        let routine = callback(|_: (), done: Completion| drop(done));

        let err = routine.run(()).await.unwrap_err();
        let err = err.downcast::<Error>().unwrap();
        assert!(matches!(*err, Error::CompletionDropped));
    }

    #[tokio::test]
    async fn test_setup_helpers_take_no_input() {
        let calls = Arc::new(AtomicUsize::new(0));

        let c = calls.clone();
        let future_setup = setup_fn(move || {
            let c = c.clone();
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Ok::<(), BoxError>(())
            }
        });
        let c = calls.clone();
        let callback_setup = setup_callback(move |done| {
            c.fetch_add(1, Ordering::SeqCst);
            done.done();
        });

        future_setup.run(()).await.unwrap();
        callback_setup.run(()).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
