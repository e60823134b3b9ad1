//! Cross-thread ordered message passing.
//!
//! Worker threads evaluate tasks in parallel, but the simulation's side
//! effects must land in the order the sequential semantics would have
//! produced. Each worker therefore buffers its side effects in a private
//! [`TaskOutbox`]; at a pass boundary the scheduler flushes every outbox
//! into the pass's shared [`EvalQueue`], which a single consumer thread
//! drains in ascending task-id order.
//!
//! Messages posted while no task is active bypass the queues entirely and
//! run at the point of submission.
//!
//! # Example
//!
//! ```rust
//! use simrt::{DeferredMsg, EvalQueue, FlushPending, TaskOutbox};
//!
//! let pending = FlushPending::new();
//! let inbox = EvalQueue::new();
//!
//! simrt::task::set_current_task(3);
//! TaskOutbox::post(&pending, DeferredMsg::new(|| println!("from task 3")));
//! simrt::task::set_current_task(simrt::NO_TASK);
//!
//! TaskOutbox::flush(&pending, &inbox);
//! inbox.drain();
//! assert!(!pending.any());
//! ```

use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tracing::{error, trace};

use crate::task;
use crate::types::{TaskId, NO_TASK};

/// A side effect deferred by a task for later ordered execution.
///
/// Construction snapshots the calling thread's current task id; the queue
/// orders by that snapshot, so later changes to the thread's task context
/// cannot reorder an already-created message.
pub struct DeferredMsg {
    task: TaskId,
    action: Box<dyn FnOnce() + Send>,
}

impl DeferredMsg {
    /// Pairs `action` with the calling thread's current task id.
    pub fn new(action: impl FnOnce() + Send + 'static) -> Self {
        Self {
            task: task::current_task(),
            action: Box::new(action),
        }
    }

    /// The task that created this message.
    pub fn task(&self) -> TaskId {
        self.task
    }

    /// Executes the stored action, consuming the message.
    pub fn run(self) {
        (self.action)();
    }
}

impl fmt::Debug for DeferredMsg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeferredMsg").field("task", &self.task).finish()
    }
}

/// Scheduler-visible count of messages buffered in outboxes but not yet
/// flushed to any [`EvalQueue`].
///
/// The scheduler checks [`any`](Self::any) at pass end to know whether some
/// thread still has unflushed work.
#[derive(Debug, Default)]
pub struct FlushPending(AtomicU64);

impl FlushPending {
    /// Creates a counter with nothing pending.
    pub fn new() -> Self {
        Self::default()
    }

    /// True if any thread has buffered messages awaiting a flush.
    pub fn any(&self) -> bool {
        self.0.load(Ordering::Acquire) != 0
    }

    fn inc(&self) {
        self.0.fetch_add(1, Ordering::AcqRel);
    }

    fn dec(&self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

struct QueueInner {
    /// Keyed by (origin task, enqueue sequence): ascending task order, FIFO
    /// among messages from the same task.
    queue: BTreeMap<(TaskId, u64), DeferredMsg>,
    next_seq: u64,
}

/// One evaluation pass's shared inbox of deferred messages.
///
/// Any number of producers may [`post`](Self::post) concurrently; exactly
/// one consumer thread [`drain`](Self::drain)s. Task-id ordering is the
/// contract; the FIFO tie-break among equal task ids is stronger than
/// callers may rely on and is documented looseness, not a guarantee.
pub struct EvalQueue {
    /// Redundant with the map size, but an atomic load on the consumer's
    /// "anything pending?" check is far cheaper than taking the mutex.
    depth: AtomicU64,
    inner: Mutex<QueueInner>,
}

impl EvalQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self {
            depth: AtomicU64::new(0),
            inner: Mutex::new(QueueInner {
                queue: BTreeMap::new(),
                next_seq: 0,
            }),
        }
    }

    /// Adds a message to the queue. Callable from any thread.
    pub fn post(&self, msg: DeferredMsg) {
        let mut inner = self.inner.lock();
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.queue.insert((msg.task(), seq), msg);
        // Incremented while still holding the lock so depth never lags the map.
        self.depth.fetch_add(1, Ordering::Release);
    }

    /// Number of messages currently queued.
    pub fn len(&self) -> usize {
        self.depth.load(Ordering::Acquire) as usize
    }

    /// True if nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Runs every queued message in ascending task order.
    ///
    /// Must be called from exactly one consumer thread per pass. Each
    /// message is removed under the lock but executed outside it, so a
    /// nested `post` from inside an action can neither deadlock nor stall
    /// unrelated producers. Runs until the queue is observed empty,
    /// including messages posted concurrently during the drain.
    pub fn drain(&self) {
        while self.depth.load(Ordering::Acquire) != 0 {
            let msg = {
                let mut inner = self.inner.lock();
                let (_, msg) = inner
                    .queue
                    .pop_first()
                    .expect("depth counter out of sync with queue contents");
                msg
            };
            // Only the consumer decrements, so this is fine outside the lock.
            self.depth.fetch_sub(1, Ordering::Release);
            trace!(task = msg.task(), "running deferred message");
            msg.run();
        }
    }
}

impl Default for EvalQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EvalQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvalQueue").field("depth", &self.len()).finish()
    }
}

struct OutboxBuf(RefCell<VecDeque<DeferredMsg>>);

impl Drop for OutboxBuf {
    fn drop(&mut self) {
        // A flush requires the destination queue, which only the scheduler
        // knows; messages still buffered at thread exit are lost.
        let buffered = self.0.borrow().len();
        if buffered != 0 {
            error!(
                buffered,
                "thread exited with unflushed deferred messages; their destination is unknowable"
            );
        }
    }
}

thread_local! {
    static OUTBOX: OutboxBuf = OutboxBuf(RefCell::new(VecDeque::new()));
}

/// The calling thread's private FIFO of deferred messages.
///
/// Created lazily per thread and never flushed automatically: the scheduler
/// flushes it once the ordering of the task's simulated dependencies is no
/// longer ambiguous, typically at the end of the pass.
pub struct TaskOutbox;

impl TaskOutbox {
    /// Defers `msg` on the calling thread, or runs it immediately when it
    /// was created outside any task.
    ///
    /// Buffered messages are invisible to every other thread until
    /// [`flush`](Self::flush).
    pub fn post(pending: &FlushPending, msg: DeferredMsg) {
        if msg.task() == NO_TASK {
            // An initial action or driver code: nothing to order against.
            msg.run();
            return;
        }
        pending.inc();
        OUTBOX.with(|b| b.0.borrow_mut().push_back(msg));
    }

    /// Moves every buffered message into `inbox`, in FIFO order.
    ///
    /// Must run on the thread that produced the messages; one thread cannot
    /// flush another's outbox. A no-op when the outbox is empty.
    pub fn flush(pending: &FlushPending, inbox: &EvalQueue) {
        OUTBOX.with(|b| {
            let mut buf = b.0.borrow_mut();
            while let Some(msg) = buf.pop_front() {
                inbox.post(msg);
                pending.dec();
            }
        });
    }

    /// True if the calling thread has no buffered messages.
    pub fn is_empty() -> bool {
        OUTBOX.with(|b| b.0.borrow().is_empty())
    }
}
