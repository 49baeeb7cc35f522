// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The per-module record (C5) plus its owning arena.

use std::rc::Rc;

use ahash::AHashMap;

use crate::error::JsError;
use crate::promise::capability::PromiseCapability;
use crate::statement::{Activation, CompiledStatementList, StatementEvaluator};
use crate::value::Value;

use super::{ExportEntry, ImportEntry, ModuleId, ModuleStatus};

/// The bindings a linked module exposes to its own body and importers.
///
/// A real Module Environment Record sits in the general environment-record
/// hierarchy (with an outer scope, TDZ per-binding state, etc.); this crate
/// only needs the flat slice of it that C6/C7 actually touch — creating a
/// named binding at link time and reading/writing it during evaluation — so
/// that's all this models.
#[derive(Debug, Default)]
pub struct ModuleEnvironment {
    bindings: AHashMap<Rc<str>, Option<Value>>,
}

impl ModuleEnvironment {
    /// [9.1.1.5.1 CreateImmutableBinding](https://tc39.es/ecma262/#sec-module-environment-records-createimmutablebinding-n-s)
    /// and its mutable counterpart, collapsed: this crate doesn't enforce
    /// the immutable/mutable distinction, only that a binding exists.
    pub fn create_binding(&mut self, name: Rc<str>) {
        self.bindings.entry(name).or_insert(None);
    }

    /// `None` = binding exists but is still in its TDZ (uninitialized).
    pub fn get_binding(&self, name: &str) -> Option<&Value> {
        self.bindings.get(name).and_then(|v| v.as_ref())
    }

    pub fn initialize_binding(&mut self, name: &str, value: Value) {
        if let Some(slot) = self.bindings.get_mut(name) {
            *slot = Some(value);
        }
    }

    pub fn has_binding(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }
}

/// C5 + C6 + C7's per-module state, merging `AbstractModuleRecord` and
/// `CyclicModuleRecord` the way `nova_vm`'s `SourceTextModule` effectively
/// does once you follow its delegation — there is exactly one kind of
/// module record in this crate, so the split nova makes for extensibility
/// (plain/Cyclic/SourceText) collapses into one struct.
pub struct ModuleRecord {
    pub status: ModuleStatus,
    pub evaluation_error: Option<JsError>,

    // Link/Evaluate-only DFS bookkeeping (C6).
    pub dfs_index: Option<u32>,
    pub dfs_ancestor_index: Option<u32>,

    pub requested_modules: Vec<Rc<str>>,
    pub resolved_modules: AHashMap<Rc<str>, ModuleId>,
    pub import_entries: Vec<ImportEntry>,
    pub export_entries: Vec<ExportEntry>,

    pub environment: Option<ModuleEnvironment>,
    pub namespace: Option<crate::value::ObjectHandle>,

    // C7: top-level-await bookkeeping.
    pub has_tla: bool,
    pub cycle_root: Option<ModuleId>,
    pub async_evaluation_order: Option<AsyncEvaluationOrder>,
    pub top_level_capability: Option<PromiseCapability>,
    pub async_parent_modules: Vec<ModuleId>,
    pub pending_async_dependencies: u32,

    /// The module body, compiled once at construction time; taken (leaving
    /// `None`) the moment evaluation actually starts, since a module's body
    /// runs exactly once.
    pub body: Option<(CompiledStatementList, Box<dyn StatementEvaluator>)>,
}

/// `[[AsyncEvaluationOrder]]`: unset (`None` on the field), an integer, or
/// done. Modeled as its own small enum rather than `Option<Option<u32>>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum AsyncEvaluationOrder {
    Order(u32),
    Done,
}

impl ModuleRecord {
    pub fn new(
        has_tla: bool,
        requested_modules: Vec<Rc<str>>,
        import_entries: Vec<ImportEntry>,
        export_entries: Vec<ExportEntry>,
        body: CompiledStatementList,
        evaluator: Box<dyn StatementEvaluator>,
    ) -> Self {
        Self {
            status: ModuleStatus::Unlinked,
            evaluation_error: None,
            dfs_index: None,
            dfs_ancestor_index: None,
            requested_modules,
            resolved_modules: AHashMap::new(),
            import_entries,
            export_entries,
            environment: None,
            namespace: None,
            has_tla,
            cycle_root: None,
            async_evaluation_order: None,
            top_level_capability: None,
            async_parent_modules: Vec::new(),
            pending_async_dependencies: 0,
            body: Some((body, evaluator)),
        }
    }

    pub fn set_dfs_index(&mut self, index: u32) {
        self.dfs_index = Some(index);
        self.dfs_ancestor_index = Some(index);
    }

    pub fn set_dfs_ancestor_index(&mut self, value: u32) {
        let current = self
            .dfs_ancestor_index
            .expect("set_dfs_ancestor_index on a module with no DFSIndex yet");
        self.dfs_ancestor_index = Some(current.min(value));
    }

    pub fn dfs_index(&self) -> u32 {
        self.dfs_index.expect("module has no [[DFSIndex]] yet")
    }

    pub fn dfs_ancestor_index(&self) -> u32 {
        self.dfs_ancestor_index
            .expect("module has no [[DFSAncestorIndex]] yet")
    }
}

#[derive(Default)]
pub struct ModuleArena {
    records: Vec<Option<ModuleRecord>>,
}

impl ModuleArena {
    pub fn insert(&mut self, record: ModuleRecord) -> ModuleId {
        let id = ModuleId(self.records.len() as u32);
        self.records.push(Some(record));
        id
    }

    pub fn get(&self, id: ModuleId) -> &ModuleRecord {
        self.records[id.0 as usize]
            .as_ref()
            .expect("module slot empty")
    }

    pub fn get_mut(&mut self, id: ModuleId) -> &mut ModuleRecord {
        self.records[id.0 as usize]
            .as_mut()
            .expect("module slot empty")
    }

    /// Take ownership of the compiled body + evaluator for execution. Only
    /// ever called once per module, when evaluation actually begins running
    /// its statements (as opposed to just traversing it during the DFS).
    pub fn take_body(
        &mut self,
        id: ModuleId,
    ) -> Option<(CompiledStatementList, Box<dyn StatementEvaluator>)> {
        self.get_mut(id).body.take()
    }
}

/// Build the [`Activation`] for a module body, wired to settle `capability`
/// once the body completes or throws.
pub(crate) fn activation_for_module(
    list: CompiledStatementList,
    evaluator: Box<dyn StatementEvaluator>,
    capability: PromiseCapability,
) -> Activation {
    Activation::new(list, evaluator, capability)
}
