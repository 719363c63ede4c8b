use std::cell::RefCell;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;
use std::time::Duration;

use tracing::{error, trace, warn};

use crate::context::{FireState, RepeatWith, TaskContext};
use crate::runner::Scheduler;
use crate::task::TaskHandle;

impl Scheduler {
    /// Advance to the clock's current time and dispatch all due work.
    pub fn update(&mut self) -> &mut Self {
        self.now = self.clock.now();
        self.run_tick();
        self
    }

    /// Advance virtual time by `delta` and dispatch all due work.
    pub fn update_by(&mut self, delta: Duration) -> &mut Self {
        self.now += delta;
        self.run_tick();
        self
    }

    /// Advance virtual time by `ms` milliseconds and dispatch all due work.
    pub fn update_ms(&mut self, ms: u64) -> &mut Self {
        self.update_by(Duration::from_millis(ms))
    }

    /// Like [`update`](Self::update), invoking `on_drained` once all due
    /// work has run.
    pub fn update_with(&mut self, on_drained: impl FnOnce()) -> &mut Self {
        self.now = self.clock.now();
        self.run_tick();
        on_drained();
        self
    }

    /// Like [`update_by`](Self::update_by), invoking `on_drained` once all
    /// due work has run.
    pub fn update_by_with(&mut self, delta: Duration, on_drained: impl FnOnce()) -> &mut Self {
        self.now += delta;
        self.run_tick();
        on_drained();
        self
    }

    /// Like [`update_ms`](Self::update_ms), invoking `on_drained` once all
    /// due work has run.
    pub fn update_ms_with(&mut self, ms: u64, on_drained: impl FnOnce()) -> &mut Self {
        self.update_by_with(Duration::from_millis(ms), on_drained)
    }

    /// One tick: apply buffered deferred operations, then dispatch due
    /// tasks in deadline order.
    fn run_tick(&mut self) {
        self.metrics.ticks += 1;
        self.drain_deferred();
        self.drain_due();
        self.check_backlog();
    }

    /// Log when the pending-task backlog sits above the configured
    /// watermarks after a tick.
    fn check_backlog(&self) {
        let pending = self.tasks.len();
        let critical = self.config.backlog_critical_threshold;
        let elevated = self.config.backlog_warn_threshold;
        if critical != 0 && pending >= critical {
            error!("Task backlog critical: {} pending", pending);
        } else if elevated != 0 && pending >= elevated {
            warn!("Task backlog elevated: {} pending", pending);
        }
    }

    /// Apply buffered operations front to back. Ops pushed during the
    /// drain run in the same tick; the drain is a loop, never recursion.
    fn drain_deferred(&mut self) {
        let limit = self.config.max_asyncs_per_tick;
        let mut run = 0usize;
        loop {
            if limit != 0 && run == limit {
                warn!(
                    "Deferred-op valve tripped after {} ops; {} held for next tick",
                    run,
                    self.asyncs.borrow().len()
                );
                break;
            }
            let op = self.asyncs.borrow_mut().pop();
            match op {
                Some(op) => {
                    op(self);
                    run += 1;
                    self.metrics.deferred_ops_run += 1;
                }
                None => break,
            }
        }
    }

    /// Pop and fire every task whose deadline has passed. A validator veto
    /// stops the drain with the due tasks still queued.
    fn drain_due(&mut self) {
        let limit = self.config.max_dispatches_per_tick;
        let mut dispatched = 0usize;
        loop {
            if limit != 0 && dispatched == limit {
                warn!(
                    "Dispatch valve tripped after {} tasks; {} still pending",
                    dispatched,
                    self.tasks.len()
                );
                break;
            }
            let due = match self.tasks.first() {
                Some(task) => task.borrow().deadline <= self.now,
                None => break,
            };
            if !due {
                break;
            }
            if !(self.validator)() {
                self.metrics.validator_vetoes += 1;
                trace!("Validator vetoed dispatch; due tasks stay queued");
                break;
            }
            let task = self.tasks.pop().expect("checked non-empty above");
            self.fire(task);
            dispatched += 1;
        }
    }

    /// Invoke one task's handler and apply the outcome recorded on its
    /// fire state. A handler panic propagates after the outcome is
    /// applied, so a repeat requested before the panic still lands and the
    /// queue stays consistent.
    fn fire(&mut self, task: TaskHandle) {
        let mut handler = task
            .borrow_mut()
            .handler
            .take()
            .expect("queued task always carries its handler");

        let fire = Rc::new(RefCell::new(FireState::default()));
        let ctx = TaskContext::new(Rc::clone(&task), Rc::downgrade(&self.asyncs), Rc::clone(&fire));

        trace!("Dispatching task (repeat {})", task.borrow().repeated);
        self.metrics.tasks_dispatched += 1;

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| handler(ctx)));

        task.borrow_mut().handler = Some(handler);

        if let Some(request) = fire.borrow_mut().repeat_with.take() {
            let duration = match request {
                RepeatWith::Fixed(duration) => duration,
                RepeatWith::Between(min, max) => self.sampler.sample_between(min, max),
            };
            {
                let mut t = task.borrow_mut();
                // Measured from the previous deadline, so repeats do not
                // drift even when the tick overshoots.
                t.deadline += duration;
                t.duration = duration;
                t.repeated += 1;
            }
            self.tasks.push(task);
            self.metrics.tasks_repeated += 1;
        }

        if let Err(payload) = outcome {
            panic::resume_unwind(payload);
        }
    }
}
