use std::cell::RefCell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use crate::context::TaskContext;

/// Group tag used to address batches of tasks in bulk operations.
pub type GroupId = u32;

/// Callback invoked each time a task comes due.
pub type TaskHandler = Box<dyn FnMut(TaskContext)>;

/// Shared handle to a scheduled task.
///
/// The queue holds one strong reference; a firing task's context holds
/// another for the duration of the callback, plus any copies the handler
/// keeps alive.
pub(crate) type TaskHandle = Rc<RefCell<Task>>;

/// A deferred callable with a deadline, nominal duration, optional group
/// tag, and repeat counter.
pub(crate) struct Task {
    /// Absolute monotonic deadline.
    pub deadline: Instant,
    /// Nominal interval, the default for a same-duration repeat.
    pub duration: Duration,
    /// Optional group tag; `None` means ungrouped.
    pub group: Option<GroupId>,
    /// Times this task has been re-enqueued via a context repeat.
    pub repeated: u32,
    /// Taken out while the callback runs so the context can borrow the
    /// task without aliasing the handler.
    pub handler: Option<TaskHandler>,
}

impl Task {
    pub fn new(
        deadline: Instant,
        duration: Duration,
        group: Option<GroupId>,
        handler: TaskHandler,
    ) -> Self {
        Self {
            deadline,
            duration,
            group,
            repeated: 0,
            handler: Some(handler),
        }
    }

    /// Returns true if the task carries the given group tag.
    pub fn is_in_group(&self, group: GroupId) -> bool {
        self.group == Some(group)
    }
}
