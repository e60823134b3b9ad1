//! # Simrt Runtime Support Layer
//!
//! Process-wide runtime support for a multi-threaded simulation evaluation
//! engine: ordered cross-thread deferral of side effects, plus the shared
//! registries every task and simulated module instance may touch at any
//! time.
//!
//! ## Design Principles
//!
//! - **Deterministic replay of parallel side effects**: tasks run on
//!   worker threads in any order, but their deferred side effects drain in
//!   task-id order, reproducing the sequential semantics independent of
//!   thread scheduling.
//! - **One well-known consumer**: each evaluation pass has exactly one
//!   drain thread and arbitrarily many producers; the whole queue contract
//!   is built around that asymmetry.
//! - **Fine-grained locking**: every registry table carries its own lock;
//!   no lock is held while running caller-supplied code.
//! - **Explicit handle, no hidden global**: the driver constructs one
//!   [`SimRuntime`] and passes it to whatever needs it, so concurrent-access
//!   contracts stay visible in API signatures.
//!
//! ## Quick Start
//!
//! ```rust
//! use simrt::{EvalQueue, ScopeDesc, SimRuntime};
//! use std::sync::Arc;
//!
//! // One runtime per process, built by the driver.
//! let rt = Arc::new(SimRuntime::new());
//! rt.args().set(["+seed=5", "+verbose"]);
//!
//! // Model construction registers scopes.
//! let scope = Arc::new(ScopeDesc::new(1, "top.dut"));
//! rt.scopes().register(Arc::clone(&scope));
//!
//! // A worker thread, stamped by the scheduler, defers a side effect.
//! let inbox = EvalQueue::new();
//! simrt::task::set_current_task(3);
//! rt.defer(|| println!("side effect of task 3"));
//! simrt::task::set_current_task(simrt::NO_TASK);
//!
//! // Pass boundary: flush this thread's outbox, then drain in task order.
//! rt.flush_outbox(&inbox);
//! inbox.drain();
//! assert!(!rt.pending_flush().any());
//! ```

pub mod args;
pub mod error;
pub mod export;
pub mod files;
pub mod queue;
pub mod runtime;
pub mod scope;
pub mod task;
pub mod timefmt;
pub mod types;

// Re-export commonly used types
pub use args::ArgTable;
pub use error::{RuntimeError, RuntimeResult};
pub use export::{ExportTable, UNKNOWN_EXPORT};
pub use files::{FileRef, FileTable};
pub use queue::{DeferredMsg, EvalQueue, FlushPending, TaskOutbox};
pub use runtime::SimRuntime;
pub use scope::{HierarchyTable, ScopeDesc, ScopeTable, UserDataTable};
pub use timefmt::{TimeFormat, TimeFormatSettings, TimeFormatSnapshot};
pub use types::{FileToken, ScopeId, TaskId, NO_TASK};

/// Initialize the tracing subscriber for logging.
///
/// Call this at the start of your program to enable logging.
///
/// # Example
///
/// ```rust,ignore
/// simrt::init_logging("info");
/// ```
pub fn init_logging(level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}
