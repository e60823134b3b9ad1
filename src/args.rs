//! Argument storage and plusarg matching.
//!
//! The driver stores the process command line once at startup; simulated
//! code then queries `+name`-style flags by exact, case-sensitive prefix
//! match. The table only stores and matches; parsing values out of a
//! matched argument belongs to the collaborator.

use std::io::{self, Write};

use parking_lot::Mutex;

use crate::error::{RuntimeError, RuntimeResult};

#[derive(Default)]
struct ArgsInner {
    args: Vec<String>,
    loaded: bool,
}

/// Ordered storage for the process argument list.
///
/// Write-once in practice (set at startup), read many times.
#[derive(Default)]
pub struct ArgTable {
    inner: Mutex<ArgsInner>,
}

impl ArgTable {
    /// Creates an empty, not-yet-loaded table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the stored argument sequence and marks the table loaded.
    pub fn set<I, S>(&self, args: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut inner = self.inner.lock();
        inner.args = args.into_iter().map(Into::into).collect();
        inner.loaded = true;
    }

    /// Appends to the stored argument sequence and marks the table loaded.
    pub fn add<I, S>(&self, args: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut inner = self.inner.lock();
        inner.args.extend(args.into_iter().map(Into::into));
        inner.loaded = true;
    }

    /// True once [`set`](Self::set) or [`add`](Self::add) has ever run.
    pub fn loaded(&self) -> bool {
        self.inner.lock().loaded
    }

    /// A copy of the stored arguments, in order.
    pub fn all(&self) -> Vec<String> {
        self.inner.lock().args.clone()
    }

    /// Returns the first stored argument beginning with `+prefix`.
    ///
    /// The query does not include the leading `+`; the returned string
    /// does. First match wins; a miss is `Ok(None)`. Querying before the
    /// arguments were ever loaded means the compiled testbench and the
    /// runtime disagree about initialization, which is the unrecoverable
    /// [`RuntimeError::ArgsNotLoaded`].
    pub fn plus_arg_match(&self, prefix: &str) -> RuntimeResult<Option<String>> {
        let inner = self.inner.lock();
        if !inner.loaded {
            return Err(RuntimeError::ArgsNotLoaded);
        }
        Ok(inner
            .args
            .iter()
            .find(|arg| arg.strip_prefix('+').is_some_and(|rest| rest.starts_with(prefix)))
            .cloned())
    }

    /// Writes a human-readable listing of the stored arguments.
    pub fn dump<W: Write>(&self, w: &mut W) -> io::Result<()> {
        let inner = self.inner.lock();
        if inner.args.is_empty() {
            return Ok(());
        }
        writeln!(w, "  args:")?;
        for arg in &inner.args {
            writeln!(w, "    {}", arg)?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for ArgTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("ArgTable")
            .field("loaded", &inner.loaded)
            .field("len", &inner.args.len())
            .finish()
    }
}
