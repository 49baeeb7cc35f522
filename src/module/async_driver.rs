// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ## C7 — Evaluate / Async Module Driver
//!
//! `nova_vm`'s `inner_module_evaluation` leaves `[[CycleRoot]]`,
//! `[[AsyncEvaluationOrder]]`, `[[AsyncParentModules]]`, and
//! `[[PendingAsyncDependencies]]` as unit-typed placeholders, with the
//! surrounding algorithm steps (11.c.v, 12, 13, 16.viii) written as comments
//! rather than code. This module is where this crate implements them for
//! real: `ExecuteAsyncModule`, `AsyncModuleExecutionFulfilled`, and
//! `AsyncModuleExecutionRejected`, including the ancestor
//! gather-sort-by-order fan-out (16.2.1.6.1.3.4).

use crate::agent::Agent;
use crate::completion::CompletionKind;
use crate::error::{EngineResult, JsResult};
use crate::module::cyclic::get_imported_module;
use crate::module::record::AsyncEvaluationOrder;
use crate::module::{ModuleId, ModuleStatus};
use crate::promise::capability::PromiseCapability;
use crate::promise::reaction::{ReactionHandler, ReactionRecord, ReactionType};
use crate::promise::PromiseId;
use crate::statement::{self, Activation, FoldOutcome};
use crate::value::Value;

/// [16.2.1.6.1.2 Evaluate ( )](https://tc39.es/ecma262/#sec-moduleevaluation)
pub fn evaluate(agent: &mut Agent, module: ModuleId) -> EngineResult<PromiseId> {
    let status = agent.modules.get(module).status;
    if !matches!(
        status,
        ModuleStatus::Linked | ModuleStatus::EvaluatingAsync | ModuleStatus::Evaluated
    ) {
        return Err(crate::error::EngineError::Invariant(
            "Evaluate() called on a module that is not Linked (not linked, or reentrant Evaluate)",
        ));
    }

    // Re-evaluating an already-evaluated cycle just returns its settled
    // capability (16.2.1.6.1.2 steps 5-7): find the root and reuse it.
    let root = find_cycle_root(agent, module);
    if let Some(capability) = agent.modules.get(root).top_level_capability {
        return Ok(capability.promise());
    }

    let capability = PromiseCapability::new(agent);
    agent.modules.get_mut(root).top_level_capability = Some(capability);

    let mut stack = Vec::new();
    match inner_module_evaluation(agent, module, &mut stack, 0) {
        Ok(_) => {
            debug_assert!(stack.is_empty());
            // 9. If module.[[AsyncEvaluationOrder]] is unset, then
            let still_sync = matches!(
                agent.modules.get(module).async_evaluation_order,
                None
            ) && !matches!(
                agent.modules.get(module).status,
                ModuleStatus::EvaluatingAsync
            );
            if still_sync {
                capability.resolve(agent, Value::Undefined);
            }
        }
        Err(err) => {
            for m in stack {
                agent.modules.get_mut(m).status = ModuleStatus::Evaluated;
                agent.modules.get_mut(m).evaluation_error = Some(err.clone());
            }
            capability.reject(agent, err.into_value());
        }
    }
    Ok(capability.promise())
}

fn find_cycle_root(agent: &Agent, module: ModuleId) -> ModuleId {
    agent.modules.get(module).cycle_root.unwrap_or(module)
}

/// [16.2.1.6.1.3.1 InnerModuleEvaluation](https://tc39.es/ecma262/#sec-innermoduleevaluation)
fn inner_module_evaluation(
    agent: &mut Agent,
    module: ModuleId,
    stack: &mut Vec<ModuleId>,
    index: u32,
) -> JsResult<u32> {
    let status = agent.modules.get(module).status;
    if matches!(
        status,
        ModuleStatus::EvaluatingAsync | ModuleStatus::Evaluated
    ) {
        return match &agent.modules.get(module).evaluation_error {
            Some(err) => Err(err.clone()),
            None => Ok(index),
        };
    }
    if matches!(status, ModuleStatus::Evaluating) {
        return Ok(index);
    }
    assert!(matches!(status, ModuleStatus::Linked));

    agent.modules.get_mut(module).status = ModuleStatus::Evaluating;
    agent.modules.get_mut(module).set_dfs_index(index);
    agent.modules.get_mut(module).pending_async_dependencies = 0;
    let mut index = index + 1;
    stack.push(module);

    let requested = agent.modules.get(module).requested_modules.clone();
    for specifier in &requested {
        let required_module = get_imported_module(agent, module, specifier);
        index = inner_module_evaluation(agent, required_module, stack, index)?;

        let required_status = agent.modules.get(required_module).status;
        debug_assert!(matches!(
            required_status,
            ModuleStatus::Evaluating
                | ModuleStatus::EvaluatingAsync
                | ModuleStatus::Evaluated
        ));
        if matches!(required_status, ModuleStatus::Evaluating) {
            debug_assert!(stack.contains(&required_module));
            let ancestor = agent.modules.get(required_module).dfs_ancestor_index();
            agent
                .modules
                .get_mut(module)
                .set_dfs_ancestor_index(ancestor);
        } else {
            let cycle_root = find_cycle_root(agent, required_module);
            debug_assert!(matches!(
                agent.modules.get(cycle_root).status,
                ModuleStatus::EvaluatingAsync | ModuleStatus::Evaluated
            ));
            if let Some(err) = agent.modules.get(cycle_root).evaluation_error.clone() {
                return Err(err);
            }
            // v. If requiredModule.[[AsyncEvaluationOrder]] is an integer, then
            if matches!(
                agent.modules.get(required_module).async_evaluation_order,
                Some(AsyncEvaluationOrder::Order(_))
            ) {
                agent.modules.get_mut(module).pending_async_dependencies += 1;
                agent
                    .modules
                    .get_mut(required_module)
                    .async_parent_modules
                    .push(module);
            }
        }
    }

    // 12. If module.[[PendingAsyncDependencies]] > 0 or module.[[HasTLA]], then
    let pending = agent.modules.get(module).pending_async_dependencies;
    let has_tla = agent.modules.get(module).has_tla;
    if pending > 0 || has_tla {
        debug_assert!(matches!(
            agent.modules.get(module).async_evaluation_order,
            None
        ));
        let order = agent.next_async_evaluation_order();
        agent.modules.get_mut(module).async_evaluation_order =
            Some(AsyncEvaluationOrder::Order(order));
        if pending == 0 {
            execute_async_module(agent, module);
        }
    } else {
        execute_module(agent, module)?;
    }

    debug_assert_eq!(stack.iter().filter(|m| **m == module).count(), 1);
    debug_assert!(agent.modules.get(module).dfs_ancestor_index() <= agent.modules.get(module).dfs_index());
    if agent.modules.get(module).dfs_ancestor_index() == agent.modules.get(module).dfs_index() {
        while let Some(required_module) = stack.pop() {
            if matches!(
                agent.modules.get(required_module).async_evaluation_order,
                None
            ) {
                agent.modules.get_mut(required_module).status = ModuleStatus::Evaluated;
            } else {
                agent.modules.get_mut(required_module).status = ModuleStatus::EvaluatingAsync;
            }
            agent.modules.get_mut(required_module).cycle_root = Some(module);
            if required_module == module {
                break;
            }
        }
    }
    Ok(index)
}

/// [16.2.1.6.1.3.2 ExecuteModule](https://tc39.es/ecma262/#sec-source-text-module-record-execute-module)
/// for a module with no TLA and no pending async dependencies: run its body
/// to completion synchronously (an `await` inside it can still suspend —
/// "synchronous" here means "not itself gated on other modules' async
/// completion", matching nova's naming).
fn execute_module(agent: &mut Agent, module: ModuleId) -> JsResult<()> {
    let Some((list, evaluator)) = agent.modules.take_body(module) else {
        return Ok(());
    };
    let capability = PromiseCapability::new(agent);
    let mut activation = Activation::new(list.clone(), evaluator, capability);
    let fold_outcome = {
        let evaluator = activation.evaluator.as_mut();
        statement::fold(agent, &list, evaluator, 0, None, None)
    };
    match fold_outcome {
        FoldOutcome::Done(completion) => {
            if completion.kind == CompletionKind::Throw {
                let err = completion.value.unwrap_or(Value::Undefined);
                agent.modules.get_mut(module).evaluation_error =
                    Some(crate::error::JsError::new(err.clone()));
                return Err(crate::error::JsError::new(err));
            }
            Ok(())
        }
        FoldOutcome::Suspended {
            resume_index,
            last_value,
            operand,
        } => {
            // A synchronous module that awaits mid-body without itself
            // having [[HasTLA]] set is a host/linker invariant violation
            // (`[[HasTLA]]` must be true whenever the body can suspend).
            // We still honor the suspension rather than panicking, routing
            // it through the same reaction machinery ExecuteAsync uses, so
            // a host that mis-set has_tla degrades gracefully.
            activation.next_index = resume_index;
            activation.last_value = last_value;
            let id = agent.alloc_activation();
            agent.put_activation(id, activation);
            crate::await_bridge::evaluate_await(agent, id, operand);
            Ok(())
        }
    }
}

/// [16.2.1.6.1.3.2 ExecuteAsyncModule](https://tc39.es/ecma262/#sec-execute-async-module)
fn execute_async_module(agent: &mut Agent, module: ModuleId) {
    let capability = PromiseCapability::new(agent);
    agent.perform_promise_then(
        capability.promise(),
        ReactionRecord::new(ReactionHandler::AsyncModule(module), ReactionType::Fulfill),
        ReactionRecord::new(ReactionHandler::AsyncModule(module), ReactionType::Reject),
    );

    let Some((list, evaluator)) = agent.modules.take_body(module) else {
        capability.resolve(agent, Value::Undefined);
        return;
    };
    let activation = Activation::new(list, evaluator, capability);
    statement::start_activation(agent, activation);
}

/// [16.2.1.6.1.3.3 AsyncModuleExecutionFulfilled](https://tc39.es/ecma262/#sec-async-module-execution-fulfilled)
pub(crate) fn async_module_execution_fulfilled(agent: &mut Agent, module: ModuleId) {
    if agent.modules.get(module).status == ModuleStatus::Evaluated {
        debug_assert!(agent.modules.get(module).evaluation_error.is_some());
        return;
    }
    debug_assert_eq!(
        agent.modules.get(module).status,
        ModuleStatus::EvaluatingAsync
    );
    agent.modules.get_mut(module).async_evaluation_order = Some(AsyncEvaluationOrder::Done);
    agent.modules.get_mut(module).status = ModuleStatus::Evaluated;

    if let Some(capability) = agent.modules.get(module).top_level_capability {
        capability.resolve(agent, Value::Undefined);
    }

    let mut exec_list = Vec::new();
    gather_available_ancestors(agent, module, &mut exec_list);
    exec_list.sort_by_key(|m| match agent.modules.get(*m).async_evaluation_order {
        Some(AsyncEvaluationOrder::Order(n)) => n,
        _ => u32::MAX,
    });

    // Dispatch every module GatherAvailableAncestors found ready: a TLA
    // module suspends again behind its own ExecuteAsync reactions, while a
    // non-TLA one runs synchronously right here and has its own fan-out
    // (fulfilled or rejected) applied immediately, in the same batch.
    for m in exec_list {
        if agent.modules.get(m).has_tla {
            execute_async_module(agent, m);
            continue;
        }
        match execute_module(agent, m) {
            Ok(()) => {
                agent.modules.get_mut(m).status = ModuleStatus::Evaluated;
                if let Some(capability) = agent.modules.get(m).top_level_capability {
                    capability.resolve(agent, Value::Undefined);
                }
            }
            Err(err) => {
                agent.modules.get_mut(m).status = ModuleStatus::Evaluated;
                let error = err.into_value();
                let parents = agent.modules.get(m).async_parent_modules.clone();
                for parent in parents {
                    async_module_execution_rejected(agent, parent, error.clone());
                }
                if let Some(capability) = agent.modules.get(m).top_level_capability {
                    capability.reject(agent, error);
                }
            }
        }
    }
}

/// [16.2.1.6.1.3.4 AsyncModuleExecutionRejected](https://tc39.es/ecma262/#sec-async-module-execution-rejected)
pub(crate) fn async_module_execution_rejected(agent: &mut Agent, module: ModuleId, error: Value) {
    if agent.modules.get(module).status == ModuleStatus::Evaluated {
        debug_assert!(agent.modules.get(module).evaluation_error.is_some());
        return;
    }
    debug_assert_eq!(
        agent.modules.get(module).status,
        ModuleStatus::EvaluatingAsync
    );
    agent.modules.get_mut(module).evaluation_error =
        Some(crate::error::JsError::new(error.clone()));
    agent.modules.get_mut(module).status = ModuleStatus::Evaluated;

    if let Some(capability) = agent.modules.get(module).top_level_capability {
        capability.reject(agent, error.clone());
    }

    let ancestors = agent.modules.get(module).async_parent_modules.clone();
    for ancestor in ancestors {
        async_module_execution_rejected(agent, ancestor, error.clone());
    }
}

/// [GatherAvailableAncestors](https://tc39.es/ecma262/#sec-gather-available-ancestors):
/// for each async parent of `module` not already in `exec_list`, decrement
/// its `pendingAsyncDependencies`; once that reaches zero (and the parent
/// hasn't errored), append it — and if the parent itself has no top-level
/// await, recurse into its own ancestors too, since it will run to
/// completion synchronously in this same dispatch pass.
fn gather_available_ancestors(agent: &mut Agent, module: ModuleId, exec_list: &mut Vec<ModuleId>) {
    let parents = agent.modules.get(module).async_parent_modules.clone();
    for m in parents {
        if exec_list.contains(&m) || agent.modules.get(m).evaluation_error.is_some() {
            continue;
        }
        debug_assert!(agent.modules.get(m).pending_async_dependencies > 0);
        agent.modules.get_mut(m).pending_async_dependencies -= 1;
        if agent.modules.get(m).pending_async_dependencies == 0 {
            exec_list.push(m);
            if !agent.modules.get(m).has_tla {
                gather_available_ancestors(agent, m, exec_list);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::promise::PromiseState;
    use crate::test_util::{build_module, new_engine, TestOp};

    /// L has a top-level `await p`; M imports L but has no TLA of its own.
    fn diamond_with_tla(engine: &mut crate::agent::Engine) -> (ModuleId, ModuleId, PromiseId) {
        let p = engine.register_promise();
        let (l_record, _sink) = build_module(
            vec![TestOp::Await(Value::Promise(p))],
            true,
            vec![],
            vec![],
            vec![],
            false,
        );
        let (m_record, _sink) = build_module(vec![TestOp::Empty], false, vec!["l"], vec![], vec![], false);
        let l = engine.create_module(l_record);
        let m = engine.create_module(m_record);
        (l, m, p)
    }

    #[test]
    fn tla_propagation_fulfills_the_dependent_once_the_await_settles() {
        let (mut engine, host) = new_engine(false);
        let (l, m, p) = diamond_with_tla(&mut engine);
        host.link(m, "l", l);
        engine.link(m).unwrap();

        let promise_m = engine.evaluate(m).expect("linked module");
        assert_eq!(engine.promise_state(promise_m), PromiseState::Pending);

        engine.resolve_promise(p, Value::Undefined);
        engine.run_jobs();

        assert_eq!(engine.agent_mut().modules.get(l).status, ModuleStatus::Evaluated);
        assert_eq!(engine.agent_mut().modules.get(m).status, ModuleStatus::Evaluated);
        assert_eq!(engine.promise_state(promise_m), PromiseState::Fulfilled);
        assert_eq!(engine.promise_value(promise_m), &Value::Undefined);
    }

    #[test]
    fn tla_rejection_drains_async_parent_modules_rejecting_the_root() {
        let (mut engine, host) = new_engine(false);
        let (l, m, p) = diamond_with_tla(&mut engine);
        host.link(m, "l", l);
        engine.link(m).unwrap();

        let promise_m = engine.evaluate(m).expect("linked module");
        let error = Value::from("boom");
        engine.reject_promise(p, error.clone());
        engine.run_jobs();

        assert!(engine.agent_mut().modules.get(l).evaluation_error.is_some());
        assert_eq!(engine.agent_mut().modules.get(m).status, ModuleStatus::Evaluated);
        assert_eq!(engine.promise_state(promise_m), PromiseState::Rejected);
        assert_eq!(engine.promise_value(promise_m), &error);

        // Re-evaluating the same cycle returns the already-settled promise
        // (found via [[CycleRoot]]) rather than re-running anything.
        let promise_m_again = engine.evaluate(m).expect("already-evaluated cycle");
        assert_eq!(promise_m_again, promise_m);
    }

    /// L has a top-level `await p`; N imports L but has no TLA of its own;
    /// M imports N, two hops away from the module that actually awaits.
    fn chain_with_tla(engine: &mut crate::agent::Engine) -> (ModuleId, ModuleId, ModuleId, PromiseId) {
        let p = engine.register_promise();
        let (l_record, _sink) = build_module(
            vec![TestOp::Await(Value::Promise(p))],
            true,
            vec![],
            vec![],
            vec![],
            false,
        );
        let (n_record, _sink) = build_module(vec![TestOp::Empty], false, vec!["l"], vec![], vec![], false);
        let (m_record, _sink) = build_module(vec![TestOp::Empty], false, vec!["n"], vec![], vec![], false);
        let l = engine.create_module(l_record);
        let n = engine.create_module(n_record);
        let m = engine.create_module(m_record);
        (l, n, m, p)
    }

    #[test]
    fn tla_propagates_through_a_non_tla_importer_two_hops_away_in_one_batch() {
        let (mut engine, host) = new_engine(false);
        let (l, n, m, p) = chain_with_tla(&mut engine);
        host.link(n, "l", l);
        host.link(m, "n", n);
        engine.link(m).unwrap();

        let promise_m = engine.evaluate(m).expect("linked module");
        assert_eq!(engine.promise_state(promise_m), PromiseState::Pending);

        engine.resolve_promise(p, Value::Undefined);

        // One tick settles L's own await and enqueues its AsyncModule job;
        // the second tick runs that job, which gathers N and M in the same
        // AsyncModuleExecutionFulfilled call (GatherAvailableAncestors
        // recurses into N's own ancestors instead of waiting for N to get
        // its own job-queue turn), so both are Evaluated and promise_m is
        // already settled without a third tick.
        assert!(engine.run_one_job());
        assert!(engine.run_one_job());
        assert_eq!(engine.agent_mut().modules.get(n).status, ModuleStatus::Evaluated);
        assert_eq!(engine.agent_mut().modules.get(m).status, ModuleStatus::Evaluated);
        assert_eq!(engine.promise_state(promise_m), PromiseState::Fulfilled);
        assert!(!engine.run_one_job());
    }

    #[test]
    fn top_level_capability_is_assigned_and_settled_exactly_once() {
        let (mut engine, _host) = new_engine(false);
        let (record, _sink) = build_module(vec![TestOp::Empty], false, vec![], vec![], vec![], false);
        let m = engine.create_module(record);
        engine.link(m).unwrap();

        let first = engine.evaluate(m).unwrap();
        let second = engine.evaluate(m).unwrap();
        assert_eq!(first, second);
        assert_eq!(engine.promise_state(first), PromiseState::Fulfilled);
    }
}
