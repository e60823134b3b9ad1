//! Export-name table: externally-callable function names and their ids.
//!
//! Every externally-callable function name is assigned a small dense
//! integer id, shared by all models loaded into the process. Ids are
//! allocated monotonically and never freed: another independently-loaded
//! model may hold an id, so reuse would be unsafe.

use std::collections::HashMap;
use std::io::{self, Write};

use parking_lot::Mutex;

use crate::error::{RuntimeError, RuntimeResult};

/// Sentinel returned by [`ExportTable::name_for`] for an unallocated id.
pub const UNKNOWN_EXPORT: &str = "*unknown*";

struct ExportInner {
    map: HashMap<String, u32>,
    next: u32,
}

/// Name → dense id table for externally-callable functions.
///
/// Reads are lock-free-safe only under the externally-asserted condition
/// that registration has fully completed; this implementation keeps its
/// lock on every operation and leaves that relaxation to callers who copy
/// the table out.
pub struct ExportTable {
    inner: Mutex<ExportInner>,
}

impl ExportTable {
    /// Creates an empty table; the first allocated id is 0.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(ExportInner {
                map: HashMap::new(),
                next: 0,
            }),
        }
    }

    /// Returns the id for `name`, allocating the next id if the name is
    /// new. Idempotent: the same name always yields the same id.
    pub fn id_for(&self, name: &str) -> u32 {
        let mut inner = self.inner.lock();
        if let Some(&id) = inner.map.get(name) {
            return id;
        }
        let id = inner.next;
        inner.next += 1;
        inner.map.insert(name.to_string(), id);
        id
    }

    /// Returns the id previously allocated for `name`.
    ///
    /// A caller invoking an export that no loaded model registered cannot
    /// proceed meaningfully, so a miss is the unrecoverable
    /// [`RuntimeError::UnknownExport`].
    pub fn resolve(&self, name: &str) -> RuntimeResult<u32> {
        self.inner
            .lock()
            .map
            .get(name)
            .copied()
            .ok_or_else(|| RuntimeError::UnknownExport(name.to_string()))
    }

    /// Reverse lookup of the name allocated `id`.
    ///
    /// Linear scan; only diagnostics call this, so no reverse map is kept.
    /// Returns [`UNKNOWN_EXPORT`] for an id never allocated.
    pub fn name_for(&self, id: u32) -> String {
        let inner = self.inner.lock();
        inner
            .map
            .iter()
            .find(|(_, &v)| v == id)
            .map(|(name, _)| name.clone())
            .unwrap_or_else(|| UNKNOWN_EXPORT.to_string())
    }

    /// Number of allocated export names.
    pub fn len(&self) -> usize {
        self.inner.lock().map.len()
    }

    /// True if nothing was ever registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Writes a human-readable listing of every export and its id.
    pub fn dump<W: Write>(&self, w: &mut W) -> io::Result<()> {
        let inner = self.inner.lock();
        if inner.map.is_empty() {
            return Ok(());
        }
        writeln!(w, "  exports:")?;
        let mut entries: Vec<_> = inner.map.iter().collect();
        entries.sort_by_key(|(_, &id)| id);
        for (name, id) in entries {
            writeln!(w, "    {:05}: {}", id, name)?;
        }
        Ok(())
    }
}

impl Default for ExportTable {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ExportTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExportTable").field("len", &self.len()).finish()
    }
}
