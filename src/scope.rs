//! Scope registration, hierarchy, and per-scope user data.
//!
//! Scopes are the named, addressable units of the simulated hierarchy
//! (module instances, generate blocks). Model code registers a scope at
//! construction, looks other scopes up by fully-qualified name for
//! cross-module references, and may attach opaque user data to its own
//! scope. Every table here has its own lock and is safe to use from any
//! thread at any time.

use std::collections::HashMap;
use std::io::{self, Write};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::ScopeId;

/// Descriptor of one named unit of the simulated hierarchy.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeDesc {
    id: ScopeId,
    name: String,
}

impl ScopeDesc {
    /// Creates a descriptor with a stable id and fully-qualified name.
    pub fn new(id: ScopeId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }

    /// The scope's stable identity.
    pub fn id(&self) -> ScopeId {
        self.id
    }

    /// The fully-qualified name, e.g. `top.cpu.alu`.
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Flat table of `(scope, key)` → opaque value attachments.
///
/// One map for all scopes rather than one map per scope: most scopes attach
/// zero or one value, so per-scope maps would mostly hold nothing.
#[derive(Debug, Default)]
pub struct UserDataTable {
    map: Mutex<HashMap<(ScopeId, u64), Value>>,
}

impl UserDataTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces the value stored under `(scope, key)`.
    pub fn set(&self, scope: ScopeId, key: u64, value: Value) {
        self.map.lock().insert((scope, key), value);
    }

    /// Looks up the value stored under `(scope, key)`; a miss is `None`,
    /// not an error.
    pub fn get(&self, scope: ScopeId, key: u64) -> Option<Value> {
        self.map.lock().get(&(scope, key)).cloned()
    }

    /// Removes every entry attached to `scope`.
    ///
    /// Called once at scope teardown; a full sweep is fine at that rate.
    pub fn clear_scope(&self, scope: ScopeId) {
        self.map.lock().retain(|(s, _), _| *s != scope);
    }

    /// Number of attachments across all scopes.
    pub fn len(&self) -> usize {
        self.map.lock().len()
    }

    /// True if no scope has attachments.
    pub fn is_empty(&self) -> bool {
        self.map.lock().is_empty()
    }

    /// Writes a human-readable listing of every attachment.
    pub fn dump<W: Write>(&self, w: &mut W) -> io::Result<()> {
        let map = self.map.lock();
        if map.is_empty() {
            return Ok(());
        }
        writeln!(w, "  user data:")?;
        let mut entries: Vec<_> = map.iter().collect();
        entries.sort_by_key(|((scope, key), _)| (*scope, *key));
        for ((scope, key), value) in entries {
            writeln!(w, "    scope {} key {}: {}", scope, key, value)?;
        }
        Ok(())
    }
}

/// Table of fully-qualified scope name → descriptor.
///
/// Entries are added once when a scope is constructed and removed once when
/// it is destroyed. After model construction completes the table is
/// read-mostly; [`snapshot`](Self::snapshot) serves the hot introspection
/// path without repeated locking.
#[derive(Debug, Default)]
pub struct ScopeTable {
    map: RwLock<HashMap<String, Arc<ScopeDesc>>>,
}

impl ScopeTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `desc` under its name. A no-op when the name is already
    /// present, guarding against duplicate registration.
    pub fn register(&self, desc: Arc<ScopeDesc>) {
        self.map
            .write()
            .entry(desc.name().to_string())
            .or_insert(desc);
    }

    /// Exact-name lookup; unknown names are `None`.
    pub fn find(&self, name: &str) -> Option<Arc<ScopeDesc>> {
        self.map.read().get(name).cloned()
    }

    /// Removes the name entry for `desc`, if present.
    ///
    /// User-data cleanup is cascaded by
    /// [`SimRuntime::unregister_scope`](crate::SimRuntime::unregister_scope),
    /// which sees both tables.
    pub fn unregister(&self, desc: &ScopeDesc) {
        self.map.write().remove(desc.name());
    }

    /// A point-in-time copy of the whole table.
    ///
    /// Descriptors are shared, so this clones only the `Arc`s. Intended for
    /// introspection after model construction completes.
    pub fn snapshot(&self) -> HashMap<String, Arc<ScopeDesc>> {
        self.map.read().clone()
    }

    /// Number of registered scopes.
    pub fn len(&self) -> usize {
        self.map.read().len()
    }

    /// True if no scope is registered.
    pub fn is_empty(&self) -> bool {
        self.map.read().is_empty()
    }

    /// Writes a human-readable listing of every registered scope.
    pub fn dump<W: Write>(&self, w: &mut W) -> io::Result<()> {
        let map = self.map.read();
        writeln!(w, "  scopes:")?;
        let mut names: Vec<_> = map.keys().collect();
        names.sort();
        for name in names {
            writeln!(w, "    {}", name)?;
        }
        Ok(())
    }
}

/// Append-only table of parent scope → ordered child scopes.
///
/// Built during model construction and read-only thereafter. Duplicate
/// edges are permitted; nothing is ever removed.
#[derive(Debug, Default)]
pub struct HierarchyTable {
    map: RwLock<HashMap<ScopeId, Vec<Arc<ScopeDesc>>>>,
}

impl HierarchyTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `child` to `parent`'s child list.
    pub fn add_edge(&self, parent: ScopeId, child: Arc<ScopeDesc>) {
        self.map.write().entry(parent).or_default().push(child);
    }

    /// The children recorded under `parent`, in insertion order.
    pub fn children(&self, parent: ScopeId) -> Vec<Arc<ScopeDesc>> {
        self.map.read().get(&parent).cloned().unwrap_or_default()
    }

    /// A point-in-time copy of the whole hierarchy.
    pub fn snapshot(&self) -> HashMap<ScopeId, Vec<Arc<ScopeDesc>>> {
        self.map.read().clone()
    }

    /// Writes a human-readable listing of every edge.
    pub fn dump<W: Write>(&self, w: &mut W) -> io::Result<()> {
        let map = self.map.read();
        if map.is_empty() {
            return Ok(());
        }
        writeln!(w, "  hierarchy:")?;
        let mut parents: Vec<_> = map.iter().collect();
        parents.sort_by_key(|(id, _)| **id);
        for (parent, children) in parents {
            let names: Vec<_> = children.iter().map(|c| c.name()).collect();
            writeln!(w, "    {} -> {}", parent, names.join(", "))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_user_data_set_get() {
        let table = UserDataTable::new();
        assert!(table.is_empty());

        table.set(1, 10, json!(42));
        assert_eq!(table.get(1, 10), Some(json!(42)));
        assert_eq!(table.get(1, 11), None);
        assert_eq!(table.get(2, 10), None);
    }

    #[test]
    fn test_user_data_upsert_replaces() {
        let table = UserDataTable::new();
        table.set(1, 10, json!("first"));
        table.set(1, 10, json!("second"));
        assert_eq!(table.get(1, 10), Some(json!("second")));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_user_data_clear_scope() {
        let table = UserDataTable::new();
        table.set(1, 10, json!(1));
        table.set(1, 11, json!(2));
        table.set(2, 10, json!(3));

        table.clear_scope(1);
        assert_eq!(table.get(1, 10), None);
        assert_eq!(table.get(1, 11), None);
        assert_eq!(table.get(2, 10), Some(json!(3)));
    }

    #[test]
    fn test_scope_register_find() {
        let table = ScopeTable::new();
        let desc = Arc::new(ScopeDesc::new(1, "top.cpu"));

        table.register(Arc::clone(&desc));
        let found = table.find("top.cpu").unwrap();
        assert_eq!(found.id(), 1);
        assert!(table.find("top.gpu").is_none());
    }

    #[test]
    fn test_scope_register_is_idempotent() {
        let table = ScopeTable::new();
        let first = Arc::new(ScopeDesc::new(1, "top.cpu"));
        let imposter = Arc::new(ScopeDesc::new(2, "top.cpu"));

        table.register(Arc::clone(&first));
        table.register(imposter);

        // First registration wins.
        assert_eq!(table.find("top.cpu").unwrap().id(), 1);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_scope_unregister() {
        let table = ScopeTable::new();
        let desc = Arc::new(ScopeDesc::new(1, "top.cpu"));

        table.register(Arc::clone(&desc));
        table.unregister(&desc);
        assert!(table.find("top.cpu").is_none());
        assert!(table.is_empty());
    }

    #[test]
    fn test_scope_snapshot_is_point_in_time() {
        let table = ScopeTable::new();
        table.register(Arc::new(ScopeDesc::new(1, "top.a")));

        let snap = table.snapshot();
        table.register(Arc::new(ScopeDesc::new(2, "top.b")));

        assert_eq!(snap.len(), 1);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_hierarchy_append_and_duplicates() {
        let table = HierarchyTable::new();
        let child = Arc::new(ScopeDesc::new(2, "top.a"));

        table.add_edge(1, Arc::clone(&child));
        table.add_edge(1, Arc::clone(&child));
        table.add_edge(1, Arc::new(ScopeDesc::new(3, "top.b")));

        let children = table.children(1);
        assert_eq!(children.len(), 3);
        assert_eq!(children[0].name(), "top.a");
        assert_eq!(children[1].name(), "top.a");
        assert_eq!(children[2].name(), "top.b");
        assert!(table.children(9).is_empty());
    }

    #[test]
    fn test_dumps_list_contents() {
        let scopes = ScopeTable::new();
        scopes.register(Arc::new(ScopeDesc::new(1, "top.alu")));

        let mut out = Vec::new();
        scopes.dump(&mut out).unwrap();
        assert!(String::from_utf8(out).unwrap().contains("top.alu"));

        let users = UserDataTable::new();
        users.set(1, 5, json!("probe"));
        let mut out = Vec::new();
        users.dump(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("scope 1 key 5"));
        assert!(text.contains("probe"));
    }
}
