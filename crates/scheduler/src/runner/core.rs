use std::cell::RefCell;
use std::rc::Rc;
use std::time::Instant;

use tempo_core::{Clock, DurationSampler, SteadyClock, ThreadRngSampler};

use crate::metrics::SchedulerMetrics;
use crate::queue::{AsyncQueue, TaskQueue};
use crate::types::{SchedulerConfig, Validator};

/// The task scheduler. Drives time-based callbacks on the host's update
/// tick: one-shot, repeating, and grouped tasks, plus deferred operations
/// applied at the start of the next tick.
///
/// Single-owner and single-threaded. Handlers receive a
/// [`TaskContext`](crate::context::TaskContext) for re-entrant mutation;
/// direct scheduler methods are for use between ticks only, which the
/// borrow checker enforces (a running handler has no scheduler reference).
pub struct Scheduler {
    /// Current virtual time, advanced only by the update entry points.
    pub(super) now: Instant,
    /// Monotonic time source for clock-driven updates.
    pub(super) clock: Box<dyn Clock>,
    /// Uniform duration source for the `*_range` operations.
    pub(super) sampler: Box<dyn DurationSampler>,
    /// Pending tasks, ordered by deadline.
    pub(super) tasks: TaskQueue,
    /// Deferred operations; live contexts hold the weak half as their
    /// liveness token.
    pub(super) asyncs: Rc<RefCell<AsyncQueue>>,
    /// Consulted before each due task fires.
    pub(super) validator: Validator,
    pub(super) config: SchedulerConfig,
    pub(super) metrics: SchedulerMetrics,
}

impl Scheduler {
    /// Create a scheduler pinned to the current steady time.
    pub fn new() -> Self {
        Self::with_clock(SteadyClock)
    }

    /// Create a scheduler driven by a custom clock.
    pub fn with_clock(clock: impl Clock + 'static) -> Self {
        let now = clock.now();
        Self {
            now,
            clock: Box::new(clock),
            sampler: Box::new(ThreadRngSampler),
            tasks: TaskQueue::new(),
            asyncs: Rc::new(RefCell::new(AsyncQueue::default())),
            validator: Box::new(|| true),
            config: SchedulerConfig::default(),
            metrics: SchedulerMetrics::default(),
        }
    }

    /// Replace the duration sampler used by the `*_range` operations.
    pub fn with_sampler(mut self, sampler: impl DurationSampler + 'static) -> Self {
        self.sampler = Box::new(sampler);
        self
    }

    /// Replace the config.
    pub fn with_config(mut self, config: SchedulerConfig) -> Self {
        self.config = config;
        self
    }

    /// Install a validator at construction time.
    pub fn with_validator(mut self, validator: impl Fn() -> bool + 'static) -> Self {
        self.validator = Box::new(validator);
        self
    }

    /// Install a validator consulted before each due task fires. A false
    /// verdict leaves due tasks queued, untouched, until a later tick.
    pub fn set_validator(&mut self, validator: impl Fn() -> bool + 'static) -> &mut Self {
        self.validator = Box::new(validator);
        self
    }

    /// Restore the always-true validator.
    pub fn clear_validator(&mut self) -> &mut Self {
        self.validator = Box::new(|| true);
        self
    }

    /// Current virtual time.
    pub fn now(&self) -> Instant {
        self.now
    }

    /// Number of pending tasks.
    pub fn pending_tasks(&self) -> usize {
        self.tasks.len()
    }

    /// Number of buffered deferred operations.
    pub fn pending_deferred_ops(&self) -> usize {
        self.asyncs.borrow().len()
    }

    /// True when no tasks are pending and no deferred ops are buffered.
    pub fn is_idle(&self) -> bool {
        self.tasks.is_empty() && self.asyncs.borrow().is_empty()
    }

    /// Snapshot of the scheduler's counters.
    pub fn metrics(&self) -> SchedulerMetrics {
        self.metrics.clone()
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}
