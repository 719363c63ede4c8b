use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::time::Duration;

use crate::queue::{AsyncQueue, DeferredOp};
use crate::runner::Scheduler;
use crate::task::{GroupId, TaskHandle};

/// Requested repeat interval, resolved when the dispatch loop applies it.
pub(crate) enum RepeatWith {
    /// Repeat after exactly this long.
    Fixed(Duration),
    /// Repeat after a duration drawn uniformly from `[min, max]`.
    Between(Duration, Duration),
}

/// Outcome of one task firing, shared between the dispatch loop and every
/// copy of the fired task's context.
#[derive(Default)]
pub(crate) struct FireState {
    /// Set once a `repeat*` call has consumed the context.
    pub consumed: bool,
    /// Repeat request applied after the handler returns.
    pub repeat_with: Option<RepeatWith>,
}

/// One-shot handle passed to a firing task's handler.
///
/// Copies share the consumed bit: across all copies of one firing,
/// `repeat*` may be called at most once. Every other mutating operation is
/// buffered on the owning scheduler and applied at the start of the next
/// tick; once the scheduler has been dropped those calls become silent
/// no-ops.
#[derive(Clone)]
pub struct TaskContext {
    /// The firing task, absent only on the default (inert) context.
    task: Option<TaskHandle>,
    /// Weak handle to the owner's deferred-op queue; doubles as the
    /// liveness token.
    owner: Weak<RefCell<AsyncQueue>>,
    fire: Rc<RefCell<FireState>>,
}

impl Default for TaskContext {
    /// An inert context: expired and already consumed.
    fn default() -> Self {
        Self {
            task: None,
            owner: Weak::new(),
            fire: Rc::new(RefCell::new(FireState {
                consumed: true,
                repeat_with: None,
            })),
        }
    }
}

impl TaskContext {
    pub(crate) fn new(
        task: TaskHandle,
        owner: Weak<RefCell<AsyncQueue>>,
        fire: Rc<RefCell<FireState>>,
    ) -> Self {
        Self {
            task: Some(task),
            owner,
            fire,
        }
    }

    /// Returns true once the owning scheduler has been dropped.
    pub fn is_expired(&self) -> bool {
        self.owner.strong_count() == 0
    }

    /// Returns true if the firing task carries the given group tag.
    pub fn is_in_group(&self, group: GroupId) -> bool {
        self.task
            .as_ref()
            .is_some_and(|task| task.borrow().is_in_group(group))
    }

    /// Tag the firing task with a group.
    ///
    /// Applies immediately; group tags do not participate in queue
    /// ordering, and this does not consume the context.
    pub fn set_group(&self, group: GroupId) -> &Self {
        if let Some(task) = &self.task {
            task.borrow_mut().group = Some(group);
        }
        self
    }

    /// Remove the firing task's group tag. Applies immediately.
    pub fn clear_group(&self) -> &Self {
        if let Some(task) = &self.task {
            task.borrow_mut().group = None;
        }
        self
    }

    /// Repeat counter of the firing task: 0 on the first invocation, 1
    /// after the first repeat, and so on.
    pub fn repeat_counter(&self) -> u32 {
        self.task.as_ref().map_or(0, |task| task.borrow().repeated)
    }

    /// Re-enqueue the firing task once its handler returns, with a new
    /// interval measured from the task's previous deadline (repeats do not
    /// drift).
    ///
    /// Consumes the context: a second `repeat*` call on this context or any
    /// copy of it panics.
    pub fn repeat(&self, duration: Duration) -> &Self {
        self.consume(RepeatWith::Fixed(duration))
    }

    /// Repeat with the task's current nominal duration.
    pub fn repeat_same(&self) -> &Self {
        let duration = self
            .task
            .as_ref()
            .map_or(Duration::ZERO, |task| task.borrow().duration);
        self.repeat(duration)
    }

    /// Repeat with a duration drawn uniformly from `[min, max]` at the
    /// moment the repeat is applied.
    pub fn repeat_range(&self, min: Duration, max: Duration) -> &Self {
        self.consume(RepeatWith::Between(min, max))
    }

    fn consume(&self, with: RepeatWith) -> &Self {
        let mut fire = self.fire.borrow_mut();
        assert!(
            !fire.consumed,
            "task context consumed twice; repeat may be called at most once per firing"
        );
        fire.consumed = true;
        fire.repeat_with = Some(with);
        self
    }

    /// Run `callable` once at the start of the next tick.
    pub fn defer(&self, callable: impl FnOnce(&mut Scheduler) + 'static) -> &Self {
        self.dispatch(Box::new(callable))
    }

    /// Schedule a new task `duration` from the scheduler's time at the
    /// start of the next tick. The new task may fire in that same tick if
    /// its deadline has already passed.
    pub fn schedule(
        &self,
        duration: Duration,
        handler: impl FnMut(TaskContext) + 'static,
    ) -> &Self {
        self.dispatch(Box::new(move |scheduler| {
            scheduler.schedule(duration, handler);
        }))
    }

    /// Schedule a new task under a group tag.
    pub fn schedule_group(
        &self,
        duration: Duration,
        group: GroupId,
        handler: impl FnMut(TaskContext) + 'static,
    ) -> &Self {
        self.dispatch(Box::new(move |scheduler| {
            scheduler.schedule_group(duration, group, handler);
        }))
    }

    /// Schedule a new task with a duration drawn from `[min, max]`.
    pub fn schedule_range(
        &self,
        min: Duration,
        max: Duration,
        handler: impl FnMut(TaskContext) + 'static,
    ) -> &Self {
        self.dispatch(Box::new(move |scheduler| {
            scheduler.schedule_range(min, max, handler);
        }))
    }

    /// Schedule a new grouped task with a duration drawn from `[min, max]`.
    pub fn schedule_group_range(
        &self,
        min: Duration,
        max: Duration,
        group: GroupId,
        handler: impl FnMut(TaskContext) + 'static,
    ) -> &Self {
        self.dispatch(Box::new(move |scheduler| {
            scheduler.schedule_group_range(min, max, group, handler);
        }))
    }

    /// Cancel every pending task. Applies at the start of the next tick;
    /// that includes the firing task if it was repeated.
    pub fn cancel_all(&self) -> &Self {
        self.dispatch(Box::new(|scheduler| {
            scheduler.cancel_all();
        }))
    }

    /// Cancel every pending task in `group` at the start of the next tick.
    pub fn cancel_group(&self, group: GroupId) -> &Self {
        self.dispatch(Box::new(move |scheduler| {
            scheduler.cancel_group(group);
        }))
    }

    /// Cancel every pending task in any of `groups` at the start of the
    /// next tick.
    pub fn cancel_groups(&self, groups: Vec<GroupId>) -> &Self {
        self.dispatch(Box::new(move |scheduler| {
            scheduler.cancel_groups(&groups);
        }))
    }

    /// Push every pending deadline back by `delta` at the start of the
    /// next tick.
    pub fn delay_all(&self, delta: Duration) -> &Self {
        self.dispatch(Box::new(move |scheduler| {
            scheduler.delay_all(delta);
        }))
    }

    /// Push every pending deadline in `group` back by `delta`.
    pub fn delay_group(&self, group: GroupId, delta: Duration) -> &Self {
        self.dispatch(Box::new(move |scheduler| {
            scheduler.delay_group(group, delta);
        }))
    }

    /// Delay all tasks by a delta drawn from `[min, max]` (one draw for the
    /// whole batch).
    pub fn delay_all_range(&self, min: Duration, max: Duration) -> &Self {
        self.dispatch(Box::new(move |scheduler| {
            scheduler.delay_all_range(min, max);
        }))
    }

    /// Delay a group by a delta drawn from `[min, max]`.
    pub fn delay_group_range(&self, group: GroupId, min: Duration, max: Duration) -> &Self {
        self.dispatch(Box::new(move |scheduler| {
            scheduler.delay_group_range(group, min, max);
        }))
    }

    /// Move every pending task to `now + delta` with `delta` as its new
    /// nominal duration, at the start of the next tick.
    pub fn reschedule_all(&self, delta: Duration) -> &Self {
        self.dispatch(Box::new(move |scheduler| {
            scheduler.reschedule_all(delta);
        }))
    }

    /// Reschedule every pending task in `group`.
    pub fn reschedule_group(&self, group: GroupId, delta: Duration) -> &Self {
        self.dispatch(Box::new(move |scheduler| {
            scheduler.reschedule_group(group, delta);
        }))
    }

    /// Reschedule all tasks with a delta drawn from `[min, max]`.
    pub fn reschedule_all_range(&self, min: Duration, max: Duration) -> &Self {
        self.dispatch(Box::new(move |scheduler| {
            scheduler.reschedule_all_range(min, max);
        }))
    }

    /// Reschedule a group with a delta drawn from `[min, max]`.
    pub fn reschedule_group_range(&self, group: GroupId, min: Duration, max: Duration) -> &Self {
        self.dispatch(Box::new(move |scheduler| {
            scheduler.reschedule_group_range(group, min, max);
        }))
    }

    /// Buffer `op` on the owning scheduler. Silent no-op once the
    /// scheduler is gone.
    fn dispatch(&self, op: DeferredOp) -> &Self {
        if let Some(owner) = self.owner.upgrade() {
            owner.borrow_mut().push(op);
        }
        self
    }
}
