//! Per-thread current-task context.
//!
//! The external scheduler stamps every worker thread with the id of the
//! task it is about to execute and clears it afterwards. Deferred messages
//! snapshot this id at construction, which is what gives the shared inbox
//! its ordering key.

use std::cell::Cell;

use crate::types::{TaskId, NO_TASK};

thread_local! {
    /// The task currently executing on this thread.
    static CURRENT_TASK: Cell<TaskId> = const { Cell::new(NO_TASK) };
}

/// Returns the id of the task currently executing on this thread, or
/// [`NO_TASK`] outside any scheduled unit.
pub fn current_task() -> TaskId {
    CURRENT_TASK.with(|c| c.get())
}

/// Stamps this thread with `id`, returning the previous value.
///
/// Called by the scheduler at task dispatch; restore the previous value
/// (usually [`NO_TASK`]) when the task completes.
pub fn set_current_task(id: TaskId) -> TaskId {
    CURRENT_TASK.with(|c| c.replace(id))
}
