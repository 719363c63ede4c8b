//! Cooperative tick-driven task scheduler for simulation loops.
//!
//! The scheduler advances a virtual monotonic clock in discrete steps
//! ("ticks") and fires one-shot, repeating, or grouped callbacks when their
//! deadlines come due. Everything runs on the caller's thread: handlers run
//! to completion, and re-entrant mutation from inside a handler goes through
//! [`TaskContext`], which buffers the effect until the start of the next
//! tick. Repeating is the one exception: a handler calls
//! [`TaskContext::repeat_same`] (or a variant) and the dispatch loop
//! re-enqueues the task right after the handler returns.
//!
//! Typical host loop:
//!
//! ```
//! use std::time::Duration;
//! use tempo_scheduler::Scheduler;
//!
//! let mut scheduler = Scheduler::new();
//! scheduler.schedule(Duration::from_millis(100), |ctx| {
//!     // fires once, 100ms of virtual time from now
//!     ctx.repeat_same(); // ...and again every 100ms after that
//! });
//!
//! // host update loop, one tick per frame
//! scheduler.update_by(Duration::from_millis(16));
//! ```

pub mod context;
pub mod metrics;
pub mod queue;
pub mod runner;
pub mod task;
pub mod types;

pub use context::TaskContext;
pub use metrics::SchedulerMetrics;
pub use runner::Scheduler;
pub use task::{GroupId, TaskHandler};
pub use types::{ConfigError, SchedulerConfig};

pub use tempo_core::{
    Clock, DurationSampler, FixedSampler, ManualClock, SteadyClock, ThreadRngSampler,
};
