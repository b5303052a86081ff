//! Single-flight execution loop
//!
//! The scheduler owns the pending [`ChangeSet`] and the execution phase
//! behind one lock, so draining a batch and marking the scheduler busy are
//! a single step. At most one routine (setup or consumer) is outstanding at
//! any time. When a routine finishes, the driver task re-checks the change
//! set and keeps draining until it is empty, then parks in [`Phase::Idle`]
//! until the next [`Scheduler::request_run`].

use crate::change_set::ChangeSet;
use crate::error::{BoxError, Error};
use crate::event::{Batch, Notification};
use crate::routine::Routine;
use futures::FutureExt;
use parking_lot::Mutex;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tracing::{debug, Instrument, Span};

/// Routine receiving drained batches
pub type Consumer<P> = Arc<dyn Routine<Batch<P>>>;

/// Routine run once before any consumer invocation
pub type Setup = Arc<dyn Routine<()>>;

/// Destination for runtime failures
pub type ErrorSink = Arc<dyn Fn(Error) + Send + Sync>;

/// Execution phase of a scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Nothing outstanding
    Idle,
    /// Setup routine outstanding
    SettingUp,
    /// Consumer invocation outstanding
    Running,
}

struct State<P> {
    changes: ChangeSet<P>,
    phase: Phase,
    setup: Option<Setup>,
    invocations: u64,
}

enum Step<P> {
    Setup(Setup),
    Consume(Batch<P>),
}

/// Settings fixed at construction
pub struct SchedulerConfig<P> {
    pub consumer: Consumer<P>,
    pub setup: Option<Setup>,
    pub sink: ErrorSink,
    /// Delay between draining a batch and handing it to the consumer
    pub throttle: Option<Duration>,
    pub runtime: Handle,
    pub span: Span,
}

/// Coalescing single-flight scheduler
pub struct Scheduler<P> {
    state: Mutex<State<P>>,
    consumer: Consumer<P>,
    sink: ErrorSink,
    throttle: Option<Duration>,
    runtime: Handle,
    span: Span,
}

impl<P: Send + 'static> Scheduler<P> {
    /// Create a scheduler
    ///
    /// With a setup routine the scheduler starts in [`Phase::SettingUp`]
    /// and stays there until [`Scheduler::launch`] has run the setup to
    /// completion. Notifications are recorded meanwhile.
    pub fn new(config: SchedulerConfig<P>) -> Arc<Self> {
        let phase = if config.setup.is_some() {
            Phase::SettingUp
        } else {
            Phase::Idle
        };

        Arc::new(Self {
            state: Mutex::new(State {
                changes: ChangeSet::new(),
                phase,
                setup: config.setup,
                invocations: 0,
            }),
            consumer: config.consumer,
            sink: config.sink,
            throttle: config.throttle,
            runtime: config.runtime,
            span: config.span,
        })
    }

    /// Start the setup routine, if one is still waiting
    pub fn launch(self: &Arc<Self>) {
        let setup = self.state.lock().setup.take();
        if let Some(setup) = setup {
            self.spawn(Step::Setup(setup));
        }
    }

    /// Apply one notification to the pending change set
    pub fn record(&self, notification: Notification<P>) {
        self.state.lock().changes.apply(notification);
    }

    /// Start a consumer invocation if idle and there is pending work
    ///
    /// A no-op while a routine is outstanding: the pending changes are
    /// picked up when it completes.
    pub fn request_run(self: &Arc<Self>) {
        let batch = {
            let mut state = self.state.lock();
            if state.phase != Phase::Idle || state.changes.is_empty() {
                return;
            }
            state.phase = Phase::Running;
            state.invocations += 1;
            state.changes.drain()
        };

        self.spawn(Step::Consume(batch));
    }

    /// Take the pending changes without running the consumer
    pub fn drain(&self) -> Batch<P> {
        self.state.lock().changes.drain()
    }

    pub fn phase(&self) -> Phase {
        self.state.lock().phase
    }

    pub fn is_busy(&self) -> bool {
        self.phase() != Phase::Idle
    }

    /// Number of distinct pending paths
    pub fn pending(&self) -> usize {
        self.state.lock().changes.len()
    }

    /// Number of consumer invocations started so far
    pub fn invocations(&self) -> u64 {
        self.state.lock().invocations
    }

    fn spawn(self: &Arc<Self>, step: Step<P>) {
        let span = self.span.clone();
        self.runtime
            .spawn(Arc::clone(self).drive(step).instrument(span));
    }

    async fn drive(self: Arc<Self>, first: Step<P>) {
        let mut next = Some(first);

        while let Some(step) = next.take() {
            match step {
                Step::Setup(setup) => {
                    debug!("Running setup");
                    if let Err(e) = invoke(setup.as_ref(), ()).await {
                        self.report(e, Error::Setup);
                    }
                    debug!("Setup finished");
                }
                Step::Consume(batch) => {
                    if let Some(delay) = self.throttle {
                        tokio::time::sleep(delay).await;
                    }
                    debug!(
                        added = batch.added.len(),
                        changed = batch.changed.len(),
                        removed = batch.removed.len(),
                        "Handing batch to consumer"
                    );
                    if let Err(e) = invoke(self.consumer.as_ref(), batch).await {
                        self.report(e, Error::Consumer);
                    }
                }
            }

            next = self.settle();
        }

        debug!("Scheduler idle");
    }

    /// Leave the current phase: either drain the next batch or go idle
    fn settle(&self) -> Option<Step<P>> {
        let mut state = self.state.lock();
        if state.changes.is_empty() {
            state.phase = Phase::Idle;
            return None;
        }
        state.phase = Phase::Running;
        state.invocations += 1;
        Some(Step::Consume(state.changes.drain()))
    }

    fn report(&self, error: BoxError, wrap: fn(BoxError) -> Error) {
        // Adapter-level failures already carry their own variant
        let error = match error.downcast::<Error>() {
            Ok(own) => *own,
            Err(other) => wrap(other),
        };
        (self.sink)(error);
    }
}

/// Run a routine to completion, turning a panic into an error
async fn invoke<I: Send + 'static>(routine: &dyn Routine<I>, input: I) -> Result<(), BoxError> {
    match AssertUnwindSafe(routine.run(input)).catch_unwind().await {
        Ok(result) => result,
        Err(panic) => Err(Box::new(Error::Panicked(panic_message(panic)))),
    }
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
