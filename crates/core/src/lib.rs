//! Event-coalescing scheduler for batchwatch
//!
//! This crate provides the core that sits between a stream of
//! add/change/remove notifications and a single expensive consumer:
//! - Per-path coalescing into change sets
//! - Single-flight consumer execution with immediate re-runs
//! - Optional one-shot setup gating the first run
//! - Failure reporting through the source's error channel

pub mod aggregator;
pub mod change_set;
pub mod error;
pub mod event;
pub mod routine;
pub mod scheduler;
pub mod source;

// Re-exports
pub use aggregator::{aggregate, aggregate_with_setup, Aggregator, AggregatorBuilder};
pub use change_set::ChangeSet;
pub use error::{BoxError, Error, Result};
pub use event::{Batch, Entry, EventKind, Notification};
pub use routine::{Completion, Routine};
pub use scheduler::{Phase, Scheduler};
pub use source::{Emitter, NotificationSource};
