use std::cell::RefCell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::context::TaskContext;
use crate::runner::Scheduler;
use crate::task::{GroupId, Task};

impl Scheduler {
    /// Schedule `handler` to fire once, `duration` of virtual time from
    /// now.
    pub fn schedule(
        &mut self,
        duration: Duration,
        handler: impl FnMut(TaskContext) + 'static,
    ) -> &mut Self {
        self.schedule_at(self.now, duration, None, Box::new(handler))
    }

    /// Schedule `handler` under a group tag.
    pub fn schedule_group(
        &mut self,
        duration: Duration,
        group: GroupId,
        handler: impl FnMut(TaskContext) + 'static,
    ) -> &mut Self {
        self.schedule_at(self.now, duration, Some(group), Box::new(handler))
    }

    /// Schedule with a duration drawn uniformly from `[min, max]`.
    pub fn schedule_range(
        &mut self,
        min: Duration,
        max: Duration,
        handler: impl FnMut(TaskContext) + 'static,
    ) -> &mut Self {
        let duration = self.sampler.sample_between(min, max);
        self.schedule(duration, handler)
    }

    /// Schedule under a group tag with a duration drawn from `[min, max]`.
    pub fn schedule_group_range(
        &mut self,
        min: Duration,
        max: Duration,
        group: GroupId,
        handler: impl FnMut(TaskContext) + 'static,
    ) -> &mut Self {
        let duration = self.sampler.sample_between(min, max);
        self.schedule_group(duration, group, handler)
    }

    /// Run `callable` once at the start of the next tick. Callables may
    /// freely mutate the scheduler, including adding more deferred work,
    /// which still runs in that same tick.
    pub fn defer(&mut self, callable: impl FnOnce(&mut Scheduler) + 'static) -> &mut Self {
        self.asyncs.borrow_mut().push(Box::new(callable));
        self
    }

    /// Cancel every pending task.
    pub fn cancel_all(&mut self) -> &mut Self {
        let removed = self.tasks.len();
        self.tasks.clear();
        self.metrics.tasks_cancelled += removed as u64;
        debug!("Cancelled all {} pending tasks", removed);
        self
    }

    /// Cancel every pending task in `group`.
    pub fn cancel_group(&mut self, group: GroupId) -> &mut Self {
        let removed = self.tasks.remove_if(|task| task.is_in_group(group));
        self.metrics.tasks_cancelled += removed as u64;
        debug!("Cancelled {} tasks in group {}", removed, group);
        self
    }

    /// Cancel every pending task belonging to any of `groups`.
    pub fn cancel_groups(&mut self, groups: &[GroupId]) -> &mut Self {
        let removed = self
            .tasks
            .remove_if(|task| task.group.is_some_and(|g| groups.contains(&g)));
        self.metrics.tasks_cancelled += removed as u64;
        debug!("Cancelled {} tasks across groups {:?}", removed, groups);
        self
    }

    /// Push every pending deadline back by `delta`.
    pub fn delay_all(&mut self, delta: Duration) -> &mut Self {
        let moved = self.tasks.modify_if(|_| true, |task| task.deadline += delta);
        debug!("Delayed {} tasks by {:?}", moved, delta);
        self
    }

    /// Push every pending deadline in `group` back by `delta`.
    pub fn delay_group(&mut self, group: GroupId, delta: Duration) -> &mut Self {
        let moved = self.tasks.modify_if(
            |task| task.is_in_group(group),
            |task| task.deadline += delta,
        );
        debug!("Delayed {} tasks in group {} by {:?}", moved, group, delta);
        self
    }

    /// Delay all tasks by a delta drawn uniformly from `[min, max]` (one
    /// draw for the whole batch).
    pub fn delay_all_range(&mut self, min: Duration, max: Duration) -> &mut Self {
        let delta = self.sampler.sample_between(min, max);
        self.delay_all(delta)
    }

    /// Delay a group by a delta drawn uniformly from `[min, max]`.
    pub fn delay_group_range(&mut self, group: GroupId, min: Duration, max: Duration) -> &mut Self {
        let delta = self.sampler.sample_between(min, max);
        self.delay_group(group, delta)
    }

    /// Move every pending task to `now + delta` and make `delta` its new
    /// nominal duration.
    pub fn reschedule_all(&mut self, delta: Duration) -> &mut Self {
        let deadline = self.now + delta;
        let moved = self.tasks.modify_if(
            |_| true,
            |task| {
                task.deadline = deadline;
                task.duration = delta;
            },
        );
        debug!("Rescheduled {} tasks to fire in {:?}", moved, delta);
        self
    }

    /// Move every pending task in `group` to `now + delta` with `delta` as
    /// its new nominal duration.
    pub fn reschedule_group(&mut self, group: GroupId, delta: Duration) -> &mut Self {
        let deadline = self.now + delta;
        let moved = self.tasks.modify_if(
            |task| task.is_in_group(group),
            |task| {
                task.deadline = deadline;
                task.duration = delta;
            },
        );
        debug!(
            "Rescheduled {} tasks in group {} to fire in {:?}",
            moved, group, delta
        );
        self
    }

    /// Reschedule all tasks with a delta drawn uniformly from `[min, max]`
    /// (one draw for the whole batch).
    pub fn reschedule_all_range(&mut self, min: Duration, max: Duration) -> &mut Self {
        let delta = self.sampler.sample_between(min, max);
        self.reschedule_all(delta)
    }

    /// Reschedule a group with a delta drawn uniformly from `[min, max]`.
    pub fn reschedule_group_range(
        &mut self,
        group: GroupId,
        min: Duration,
        max: Duration,
    ) -> &mut Self {
        let delta = self.sampler.sample_between(min, max);
        self.reschedule_group(group, delta)
    }

    /// Insert a task due `duration` after `from`.
    pub(super) fn schedule_at(
        &mut self,
        from: Instant,
        duration: Duration,
        group: Option<GroupId>,
        handler: crate::task::TaskHandler,
    ) -> &mut Self {
        let task = Task::new(from + duration, duration, group, handler);
        self.tasks.push(Rc::new(RefCell::new(task)));
        self
    }
}
