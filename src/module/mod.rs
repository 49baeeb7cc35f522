// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ## [16.2.1.5 Abstract Module Records](https://tc39.es/ecma262/#sec-abstract-module-records) / [16.2.1.6 Cyclic Module Records](https://tc39.es/ecma262/#sec-cyclic-module-records)
//!
//! C5 (data model) + C6 (the two-phase DFS linker) + C7 (the async module
//! driver) all live under this module, split the way `nova_vm` splits
//! `abstract_module_records.rs` / `cyclic_module_records.rs` /
//! `source_text_module_records.rs` into one file per concern.

pub mod async_driver;
pub mod cyclic;
pub mod record;

use std::rc::Rc;

pub use record::{ModuleArena, ModuleEnvironment, ModuleRecord};

/// An index into the engine's module arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleId(pub u32);

/// ### \[\[Status]]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum ModuleStatus {
    #[default]
    Unlinked,
    Linking,
    Linked,
    Evaluating,
    EvaluatingAsync,
    Evaluated,
}

/// An entry of `[[ImportEntries]]`: a single named or namespace import.
#[derive(Debug, Clone)]
pub struct ImportEntry {
    pub module_request: Rc<str>,
    pub imported_name: ImportName,
    pub local_name: Rc<str>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportName {
    Named(Rc<str>),
    NamespaceObject,
}

/// An entry of `[[ExportEntries]]`, covering local, indirect, and
/// `export * from` forms uniformly the way the spec's ExportEntry Record
/// does.
#[derive(Debug, Clone)]
pub struct ExportEntry {
    /// `[[ExportName]]` — `None` only for a plain `export * from "x"` entry.
    pub export_name: Option<Rc<str>>,
    /// `[[ModuleRequest]]` — `Some` for re-exports (`export { x } from "y"`),
    /// `None` for a local export (`export { x }` / `export const x = ...`).
    pub module_request: Option<Rc<str>>,
    pub import_name: Option<ExportImportName>,
    /// `[[LocalName]]` — `Some` only when this export binds to a name in
    /// this module's own environment.
    pub local_name: Option<Rc<str>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportImportName {
    Named(Rc<str>),
    All,
    AllButDefault,
}

/// [ResolvedBinding Record](https://tc39.es/ecma262/#sec-resolvedbinding-record)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedBinding {
    Ambiguous,
    Resolved {
        module: ModuleId,
        /// `None` means the binding resolved to the module's namespace
        /// object rather than a single local binding.
        binding_name: Option<Rc<str>>,
    },
}
