//! Binds a notification source to a scheduler

use crate::error::{Error, Result};
use crate::event::{Batch, EventKind, Notification};
use crate::routine::Routine;
use crate::scheduler::{Consumer, ErrorSink, Phase, Scheduler, SchedulerConfig, Setup};
use crate::source::NotificationSource;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tracing::{info_span, warn};

/// Facade over one scheduler and its pending change set
///
/// Every notification delivered by the source is recorded, then the
/// scheduler is asked to consider running. The aggregator stays alive as
/// long as the source holds its handlers.
pub struct Aggregator<P> {
    name: String,
    scheduler: Arc<Scheduler<P>>,
}

impl<P: Clone + Send + 'static> Aggregator<P> {
    /// Start configuring an aggregator for `consumer`
    pub fn builder<C>(consumer: C) -> AggregatorBuilder<P>
    where
        C: Routine<Batch<P>> + 'static,
    {
        AggregatorBuilder {
            consumer: Arc::new(consumer),
            setup: None,
            throttle: None,
            name: None,
            runtime: None,
        }
    }

    /// Record one notification and schedule a run if idle
    pub fn observe(&self, kind: EventKind, path: impl Into<PathBuf>, payload: Option<P>) {
        self.scheduler.record(Notification::new(kind, path, payload));
        self.scheduler.request_run();
    }

    /// Take the pending batch without handing it to the consumer
    pub fn drain(&self) -> Batch<P> {
        self.scheduler.drain()
    }

    pub fn request_run(&self) {
        self.scheduler.request_run();
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn phase(&self) -> Phase {
        self.scheduler.phase()
    }

    pub fn is_busy(&self) -> bool {
        self.scheduler.is_busy()
    }

    /// Number of distinct pending paths
    pub fn pending(&self) -> usize {
        self.scheduler.pending()
    }

    /// Number of consumer invocations started so far
    pub fn invocations(&self) -> u64 {
        self.scheduler.invocations()
    }
}

/// Construction options for an [`Aggregator`]
pub struct AggregatorBuilder<P> {
    consumer: Consumer<P>,
    setup: Option<Setup>,
    throttle: Option<Duration>,
    name: Option<String>,
    runtime: Option<Handle>,
}

impl<P: Clone + Send + 'static> AggregatorBuilder<P> {
    /// Routine run once before the first consumer invocation
    pub fn setup<S>(mut self, setup: S) -> Self
    where
        S: Routine<()> + 'static,
    {
        self.setup = Some(Arc::new(setup));
        self
    }

    /// Delay between draining a batch and handing it over
    pub fn throttle(mut self, throttle: Option<Duration>) -> Self {
        self.throttle = throttle;
        self
    }

    /// Name used in the aggregator's tracing span
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Runtime to spawn invocations on (default: the current one)
    pub fn runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Subscribe to `source` and start the setup routine, if any
    ///
    /// Fails before any notification is processed when no runtime is
    /// available or the source refuses handlers.
    pub fn attach<S>(self, source: &Arc<S>) -> Result<Arc<Aggregator<P>>>
    where
        S: NotificationSource<P>,
    {
        let runtime = match self.runtime {
            Some(handle) => handle,
            None => Handle::try_current().map_err(|_| Error::NoRuntime)?,
        };
        let name = self.name.unwrap_or_else(|| "aggregator".to_string());

        let scheduler = Scheduler::new(SchedulerConfig {
            consumer: self.consumer,
            setup: self.setup,
            sink: error_sink::<P, S>(source, name.clone()),
            throttle: self.throttle,
            runtime,
            span: info_span!("aggregator", name = %name),
        });
        let aggregator = Arc::new(Aggregator { name, scheduler });

        for kind in EventKind::ALL {
            let target = Arc::clone(&aggregator);
            source.subscribe(
                kind,
                Arc::new(move |path: &Path, payload: Option<&P>| {
                    target.observe(kind, path, payload.cloned());
                }),
            )?;
        }

        aggregator.scheduler.launch();
        Ok(aggregator)
    }
}

/// Report runtime failures on the source without keeping it alive
fn error_sink<P, S>(source: &Arc<S>, name: String) -> ErrorSink
where
    S: NotificationSource<P>,
{
    let source = Arc::downgrade(source);
    Arc::new(move |error: Error| match source.upgrade() {
        Some(source) => source.report_error(error),
        None => warn!(aggregator = %name, "Source dropped, discarding error: {}", error),
    })
}

/// Attach a consumer to `source` and hand the source back for chaining
pub fn aggregate<P, S, C>(source: Arc<S>, consumer: C) -> Result<Arc<S>>
where
    P: Clone + Send + 'static,
    S: NotificationSource<P>,
    C: Routine<Batch<P>> + 'static,
{
    Aggregator::builder(consumer).attach(&source)?;
    Ok(source)
}

/// Like [`aggregate`], running `setup` once before the first invocation
pub fn aggregate_with_setup<P, S, C, U>(source: Arc<S>, consumer: C, setup: U) -> Result<Arc<S>>
where
    P: Clone + Send + 'static,
    S: NotificationSource<P>,
    C: Routine<Batch<P>> + 'static,
    U: Routine<()> + 'static,
{
    Aggregator::builder(consumer).setup(setup).attach(&source)?;
    Ok(source)
}
