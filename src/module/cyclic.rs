// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ## C6 — Cyclic Module Linker
//!
//! [16.2.1.6.1.1 Link ( )](https://tc39.es/ecma262/#sec-moduledeclarationlinking)
//! and its two-phase-DFS core, `InnerModuleLinking`, grounded directly on
//! `nova_vm`'s `inner_module_linking` — this crate recurses on
//! `required_module` (the per-iteration dependency), matching nova's own
//! code rather than the transcription bug some derivative engines carry
//! where the recursive call is made on `module` instead.

use std::rc::Rc;

use ahash::AHashSet;

use crate::agent::Agent;
use crate::error::{EngineError, EngineResult, ExceptionType};
use crate::module::record::ModuleEnvironment;
use crate::module::{ExportImportName, ModuleId, ModuleStatus, ResolvedBinding};

/// Discovers every module transitively reachable from `root` via
/// `HostHooks::resolve_imported_module` and caches the result on each
/// module's `resolved_modules` map.
///
/// Not part of the ECMA-262 Link algorithm proper — it stands in for the
/// `LoadRequestedModules`/`HostLoadImportedModule` asynchronous loading
/// phase, which this crate doesn't implement (module graphs are assumed to
/// already be host-resident; see `crate::host::HostHooks`). Doing this
/// up front keeps `get_imported_module` infallible during Link/Evaluate,
/// exactly as it is in `nova_vm` once loading has completed.
pub fn resolve_all(agent: &mut Agent, root: ModuleId) -> EngineResult<()> {
    let mut seen = AHashSet::new();
    resolve_all_inner(agent, root, &mut seen)
}

fn resolve_all_inner(
    agent: &mut Agent,
    module: ModuleId,
    seen: &mut AHashSet<ModuleId>,
) -> EngineResult<()> {
    if !seen.insert(module) {
        return Ok(());
    }
    let requested = agent.modules.get(module).requested_modules.clone();
    for specifier in &requested {
        let resolved = agent
            .host_hooks
            .resolve_imported_module(module, specifier)
            .ok_or(EngineError::Invariant(
                "HostHooks::resolve_imported_module returned None for a requested specifier",
            ))?;
        agent
            .modules
            .get_mut(module)
            .resolved_modules
            .insert(specifier.clone(), resolved);
        resolve_all_inner(agent, resolved, seen)?;
    }
    Ok(())
}

pub(crate) fn get_imported_module(agent: &Agent, module: ModuleId, specifier: &str) -> ModuleId {
    *agent
        .modules
        .get(module)
        .resolved_modules
        .get(specifier)
        .expect("get_imported_module called before resolve_all completed")
}

/// [16.2.1.6.1.1 Link ( )](https://tc39.es/ecma262/#sec-moduledeclarationlinking)
pub fn link(agent: &mut Agent, module: ModuleId) -> EngineResult<()> {
    let status = agent.modules.get(module).status;
    if !matches!(
        status,
        ModuleStatus::Unlinked | ModuleStatus::Linked | ModuleStatus::Evaluated
    ) {
        return Err(EngineError::Invariant(
            "Link() called on a module that is not Unlinked/Linked/Evaluated (reentrant Link)",
        ));
    }
    resolve_all(agent, module)?;
    let mut stack = Vec::new();
    let result = inner_module_linking(agent, module, &mut stack, 0);
    match result {
        Ok(_) => {
            debug_assert!(stack.is_empty());
            Ok(())
        }
        Err(err) => {
            for m in stack {
                let record = agent.modules.get_mut(m);
                record.status = ModuleStatus::Unlinked;
                record.dfs_index = None;
                record.dfs_ancestor_index = None;
            }
            Err(err.into())
        }
    }
}

/// [16.2.1.6.1.2.1 InnerModuleLinking](https://tc39.es/ecma262/#sec-InnerModuleLinking)
fn inner_module_linking(
    agent: &mut Agent,
    module: ModuleId,
    stack: &mut Vec<ModuleId>,
    index: u32,
) -> crate::error::JsResult<u32> {
    let status = agent.modules.get(module).status;
    if matches!(
        status,
        ModuleStatus::Linking
            | ModuleStatus::Linked
            | ModuleStatus::EvaluatingAsync
            | ModuleStatus::Evaluated
    ) {
        return Ok(index);
    }
    debug_assert!(matches!(status, ModuleStatus::Unlinked));

    agent.modules.get_mut(module).status = ModuleStatus::Linking;
    agent.modules.get_mut(module).set_dfs_index(index);
    let mut index = index + 1;
    stack.push(module);

    let requested = agent.modules.get(module).requested_modules.clone();
    for specifier in &requested {
        let required_module = get_imported_module(agent, module, specifier);
        index = inner_module_linking(agent, required_module, stack, index)?;

        let required_status = agent.modules.get(required_module).status;
        debug_assert!(matches!(
            required_status,
            ModuleStatus::Linking
                | ModuleStatus::Linked
                | ModuleStatus::EvaluatingAsync
                | ModuleStatus::Evaluated
        ));
        if matches!(required_status, ModuleStatus::Linking) {
            debug_assert!(stack.contains(&required_module));
            let ancestor = agent.modules.get(required_module).dfs_ancestor_index();
            agent
                .modules
                .get_mut(module)
                .set_dfs_ancestor_index(ancestor);
        }
    }

    initialize_environment(agent, module)?;

    debug_assert_eq!(stack.iter().filter(|m| **m == module).count(), 1);
    debug_assert!(agent.modules.get(module).dfs_ancestor_index() <= agent.modules.get(module).dfs_index());
    if agent.modules.get(module).dfs_ancestor_index() == agent.modules.get(module).dfs_index() {
        while let Some(required_module) = stack.pop() {
            agent.modules.get_mut(required_module).status = ModuleStatus::Linked;
            if required_module == module {
                break;
            }
        }
    }
    Ok(index)
}

/// [16.2.1.6.1.5 InitializeEnvironment ( )](https://tc39.es/ecma262/#sec-source-text-module-record-initialize-environment)
///
/// Narrowed to what C6 actually needs: resolve every named/namespace import
/// to a binding and create the module's own local bindings, without the
/// full indirect-export/ambiguity re-validation InitializeEnvironment also
/// performs over `[[ExportEntries]]` for every exported name (that
/// validation is a parse-time concern the host's own checker is expected to
/// have already run, per this crate's narrow-interface scope).
fn initialize_environment(agent: &mut Agent, module: ModuleId) -> crate::error::JsResult<()> {
    let export_entries = agent.modules.get(module).export_entries.clone();
    for entry in &export_entries {
        if entry.module_request.is_some() && entry.export_name.is_some() {
            if matches!(entry.import_name, Some(ExportImportName::Named(_))) {
                let ExportImportName::Named(imported) = entry.import_name.clone().unwrap() else {
                    unreachable!()
                };
                let from = get_imported_module(
                    agent,
                    module,
                    entry.module_request.as_ref().unwrap(),
                );
                let mut resolve_set = Vec::new();
                let resolution = resolve_export(agent, from, &imported, &mut resolve_set);
                if !matches!(resolution, Some(ResolvedBinding::Resolved { .. })) {
                    let message = format!(
                        "indirect export '{}' could not be resolved",
                        entry.export_name.as_ref().unwrap()
                    );
                    return Err(make_syntax_error(agent, &message));
                }
            }
        }
    }

    let mut env = ModuleEnvironment::default();
    let import_entries = agent.modules.get(module).import_entries.clone();
    for entry in &import_entries {
        match &entry.imported_name {
            super::ImportName::NamespaceObject => {
                env.create_binding(entry.local_name.clone());
            }
            super::ImportName::Named(imported_name) => {
                let from = get_imported_module(agent, module, &entry.module_request);
                let mut resolve_set = Vec::new();
                let resolution = resolve_export(agent, from, imported_name, &mut resolve_set);
                match resolution {
                    None => {
                        let message =
                            format!("module has no export named '{imported_name}'");
                        return Err(make_syntax_error(agent, &message));
                    }
                    Some(ResolvedBinding::Ambiguous) => {
                        let message =
                            format!("ambiguous import for '{imported_name}'");
                        return Err(make_syntax_error(agent, &message));
                    }
                    Some(ResolvedBinding::Resolved { .. }) => {
                        env.create_binding(entry.local_name.clone());
                    }
                }
            }
        }
    }
    for entry in agent.modules.get(module).export_entries.clone() {
        if entry.module_request.is_none() {
            if let Some(local_name) = &entry.local_name {
                env.create_binding(local_name.clone());
            }
        }
    }
    agent.modules.get_mut(module).environment = Some(env);
    Ok(())
}

fn make_syntax_error(agent: &Agent, message: &str) -> crate::error::JsError {
    crate::error::JsError::new(agent.host_hooks.make_error(ExceptionType::SyntaxError, message))
}

/// [16.2.1.6.3 GetExportedNames ( \[ exportStarSet \] )](https://tc39.es/ecma262/#sec-getexportednames)
pub fn get_exported_names(
    agent: &Agent,
    module: ModuleId,
    export_star_set: &mut Vec<ModuleId>,
) -> Vec<Rc<str>> {
    if export_star_set.contains(&module) {
        return Vec::new();
    }
    export_star_set.push(module);

    let mut exported_names = Vec::new();
    let entries = agent.modules.get(module).export_entries.clone();
    for entry in &entries {
        if entry.module_request.is_none() {
            exported_names.push(entry.export_name.clone().expect("local export has a name"));
        }
    }
    for entry in &entries {
        if matches!(entry.import_name, Some(ExportImportName::All)) && entry.export_name.is_none()
        {
            let from = get_imported_module(agent, module, entry.module_request.as_ref().unwrap());
            let star_names = get_exported_names(agent, from, export_star_set);
            for name in star_names {
                if name.as_ref() != "default" && !exported_names.contains(&name) {
                    exported_names.push(name);
                }
            }
        }
    }
    exported_names
}

/// [16.2.1.6.4 ResolveExport ( exportName \[ , resolveSet \] )](https://tc39.es/ecma262/#sec-resolveexport)
pub fn resolve_export(
    agent: &Agent,
    module: ModuleId,
    export_name: &str,
    resolve_set: &mut Vec<(ModuleId, Rc<str>)>,
) -> Option<ResolvedBinding> {
    let key = (module, Rc::from(export_name));
    if resolve_set.contains(&key) {
        // A circular import request: per spec this is not found, rather
        // than ambiguous (16.2.1.6.4 step 2).
        return None;
    }
    resolve_set.push(key);

    let entries = agent.modules.get(module).export_entries.clone();
    for entry in &entries {
        if entry.export_name.as_deref() == Some(export_name) {
            match (&entry.module_request, &entry.import_name) {
                (None, _) => {
                    return Some(ResolvedBinding::Resolved {
                        module,
                        binding_name: entry.local_name.clone(),
                    });
                }
                (Some(request), Some(ExportImportName::All)) => {
                    // `export * as ns from "x"` — binds to the namespace.
                    let from = get_imported_module(agent, module, request);
                    return Some(ResolvedBinding::Resolved {
                        module: from,
                        binding_name: None,
                    });
                }
                (Some(request), Some(ExportImportName::Named(imported))) => {
                    let from = get_imported_module(agent, module, request);
                    return resolve_export(agent, from, imported, resolve_set);
                }
                (Some(_), _) => return None,
            }
        }
    }

    if export_name == "default" {
        return None;
    }

    let mut star_resolution: Option<ResolvedBinding> = None;
    for entry in &entries {
        if matches!(entry.import_name, Some(ExportImportName::All)) && entry.export_name.is_none()
        {
            let from = get_imported_module(agent, module, entry.module_request.as_ref().unwrap());
            let resolution = resolve_export(agent, from, export_name, resolve_set);
            match resolution {
                Some(ResolvedBinding::Ambiguous) => return Some(ResolvedBinding::Ambiguous),
                Some(resolved) => match &star_resolution {
                    None => star_resolution = Some(resolved),
                    Some(existing) if *existing == resolved => {}
                    Some(_) => return Some(ResolvedBinding::Ambiguous),
                },
                None => {}
            }
        }
    }
    star_resolution
}
