//! The composed process-wide runtime handle.
//!
//! [`SimRuntime`] owns every shared table the evaluation engine and the
//! simulated models touch. It is constructed once at startup by the driver
//! and passed explicitly (usually as an `Arc`) to whatever needs it; there
//! is no hidden global. Each table carries its own lock, so operations on
//! different tables never contend and the handle itself needs no
//! synchronization.

use std::io::{self, Write};

use crate::args::ArgTable;
use crate::export::ExportTable;
use crate::files::FileTable;
use crate::queue::{DeferredMsg, EvalQueue, FlushPending, TaskOutbox};
use crate::scope::{HierarchyTable, ScopeDesc, ScopeTable, UserDataTable};
use crate::timefmt::TimeFormat;

/// Process-wide shared state for one simulation process.
///
/// Lives for the whole process. Scope-related entries come and go as
/// simulated module instances are constructed and destroyed; everything
/// else is write-rarely, read-often.
#[derive(Debug, Default)]
pub struct SimRuntime {
    args: ArgTable,
    user_data: UserDataTable,
    scopes: ScopeTable,
    hierarchy: HierarchyTable,
    exports: ExportTable,
    time_format: TimeFormat,
    files: FileTable,
    pending_flush: FlushPending,
}

impl SimRuntime {
    /// Creates the runtime with every table empty and the standard file
    /// channels open.
    pub fn new() -> Self {
        Self {
            args: ArgTable::new(),
            user_data: UserDataTable::new(),
            scopes: ScopeTable::new(),
            hierarchy: HierarchyTable::new(),
            exports: ExportTable::new(),
            time_format: TimeFormat::new(),
            files: FileTable::new(),
            pending_flush: FlushPending::new(),
        }
    }

    /// Argument storage and plusarg matching.
    pub fn args(&self) -> &ArgTable {
        &self.args
    }

    /// Per-scope user-data attachments.
    pub fn user_data(&self) -> &UserDataTable {
        &self.user_data
    }

    /// Scope name registration and lookup.
    pub fn scopes(&self) -> &ScopeTable {
        &self.scopes
    }

    /// Parent/child scope edges.
    pub fn hierarchy(&self) -> &HierarchyTable {
        &self.hierarchy
    }

    /// Export-name id allocation and resolution.
    pub fn exports(&self) -> &ExportTable {
        &self.exports
    }

    /// Time-display formatting state.
    pub fn time_format(&self) -> &TimeFormat {
        &self.time_format
    }

    /// Virtual file handles.
    pub fn files(&self) -> &FileTable {
        &self.files
    }

    /// The scheduler's unflushed-outbox counter.
    pub fn pending_flush(&self) -> &FlushPending {
        &self.pending_flush
    }

    /// Defers `action` on the calling thread's outbox, tagged with the
    /// thread's current task; runs it immediately outside any task.
    pub fn defer(&self, action: impl FnOnce() + Send + 'static) {
        TaskOutbox::post(&self.pending_flush, DeferredMsg::new(action));
    }

    /// Flushes the calling thread's outbox into `inbox`.
    ///
    /// The scheduler calls this on each worker at a pass boundary, before
    /// the consumer drains `inbox`.
    pub fn flush_outbox(&self, inbox: &EvalQueue) {
        TaskOutbox::flush(&self.pending_flush, inbox);
    }

    /// Removes a scope's name entry and every user-data attachment it
    /// owns. Called once at scope teardown.
    pub fn unregister_scope(&self, desc: &ScopeDesc) {
        self.scopes.unregister(desc);
        self.user_data.clear_scope(desc.id());
    }

    /// Writes the crate name and version.
    pub fn version_dump<W: Write>(&self, w: &mut W) -> io::Result<()> {
        writeln!(
            w,
            "{} {}",
            env!("CARGO_PKG_NAME"),
            env!("CARGO_PKG_VERSION")
        )
    }

    /// Writes a human-readable listing of every table's contents, for
    /// debugging and introspection rather than machine parsing.
    pub fn internals_dump<W: Write>(&self, w: &mut W) -> io::Result<()> {
        writeln!(w, "internals dump:")?;
        self.version_dump(w)?;
        self.args.dump(w)?;
        self.scopes.dump(w)?;
        self.hierarchy.dump(w)?;
        self.user_data.dump(w)?;
        self.exports.dump(w)?;
        self.time_format.dump(w)?;
        self.files.dump(w)?;
        Ok(())
    }
}
