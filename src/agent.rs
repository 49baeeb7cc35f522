// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ## Agent / Engine
//!
//! `Agent` is the internal execution-context owner threaded as `&mut Agent`
//! through every algorithm in this crate (the module linker, the statement
//! executor, the promise jobs) — mirroring `nova_vm::ecmascript::execution::Agent`.
//! [`Engine`] is the public, owning wrapper embedders actually construct,
//! the way `nova_vm::ecmascript::execution::GcAgent` wraps `Agent` to add
//! the realm-rooting API on top of the bare execution context. There is no
//! garbage collector here, so `Engine` only adds the public API surface
//! (§6), not a `gc()` method.

use std::collections::VecDeque;

use crate::error::EngineResult;
use crate::host::HostHooks;
use crate::module::record::ModuleRecord;
use crate::module::{async_driver, cyclic, ModuleArena, ModuleId};
use crate::promise::jobs::Job;
use crate::promise::reaction::ReactionRecord;
use crate::promise::{PromiseArena, PromiseId, PromiseState};
use crate::statement::{Activation, ActivationId};
use crate::value::Value;

/// Runtime configuration, mirroring `nova_vm::ecmascript::execution::agent::Options`.
#[derive(Debug, Clone, Copy, Default)]
pub struct EngineOptions {
    /// Disables FastResolve (§4.3/§4.4): every `await`, even one on an
    /// already-settled promise, takes the full suspend-and-requeue path, so
    /// statement execution order never depends on incidental settlement
    /// timing. Intended for host-side step debuggers and for tests that
    /// assert on job-queue ordering.
    pub debug_mode: bool,
}

/// The engine's execution-context owner: module registry, promise arena,
/// activation arena, continuation queue, and the host boundary.
pub struct Agent {
    pub(crate) modules: ModuleArena,
    pub(crate) promises: PromiseArena,
    pub(crate) activations: Vec<Option<Activation>>,
    pub(crate) job_queue: VecDeque<Job>,
    pub(crate) host_hooks: &'static dyn HostHooks,
    pub(crate) options: EngineOptions,
    async_evaluation_counter: u32,
}

impl Agent {
    fn new(options: EngineOptions, host_hooks: &'static dyn HostHooks) -> Self {
        Self {
            modules: ModuleArena::default(),
            promises: PromiseArena::default(),
            activations: Vec::new(),
            job_queue: VecDeque::new(),
            host_hooks,
            options,
            async_evaluation_counter: 0,
        }
    }

    pub(crate) fn enqueue_job(&mut self, job: Job) {
        self.job_queue.push_back(job);
    }

    /// The host boundary, for a [`crate::statement::StatementEvaluator`]
    /// that needs to construct an intrinsic error or inspect a value's
    /// `then` without reaching back into an [`Engine`] it doesn't have a
    /// handle to.
    pub fn host_hooks(&self) -> &'static dyn HostHooks {
        self.host_hooks
    }

    pub fn options(&self) -> EngineOptions {
        self.options
    }

    /// [27.2.5.4 PerformPromiseThen ( promise, onFulfilled, onRejected \[, resultCapability \] )](https://tc39.es/ecma262/#sec-performpromisethen)
    /// narrowed to the reaction-record registration this crate needs (no
    /// `resultCapability` chaining — nothing here builds a derived promise
    /// off of `.then()`, only the engine's own internal consumers do:
    /// the await bridge and the async module driver).
    pub(crate) fn perform_promise_then(
        &mut self,
        promise: PromiseId,
        on_fulfilled: ReactionRecord,
        on_rejected: ReactionRecord,
    ) {
        match self.promises.state(promise) {
            PromiseState::Pending => {
                self.promises.add_reactions(promise, on_fulfilled, on_rejected);
            }
            PromiseState::Fulfilled => {
                let value = self.promises.value(promise).clone();
                self.enqueue_job(Job::Reaction {
                    record: on_fulfilled,
                    argument: value,
                });
            }
            PromiseState::Rejected => {
                self.promises.mark_handled(promise);
                let value = self.promises.value(promise).clone();
                self.enqueue_job(Job::Reaction {
                    record: on_rejected,
                    argument: value,
                });
            }
        }
    }

    pub(crate) fn alloc_activation(&mut self) -> ActivationId {
        let id = ActivationId(self.activations.len() as u32);
        self.activations.push(None);
        id
    }

    pub(crate) fn put_activation(&mut self, id: ActivationId, activation: Activation) {
        self.activations[id.0 as usize] = Some(activation);
    }

    pub(crate) fn take_activation(&mut self, id: ActivationId) -> Option<Activation> {
        self.activations[id.0 as usize].take()
    }

    pub(crate) fn next_async_evaluation_order(&mut self) -> u32 {
        let order = self.async_evaluation_counter;
        self.async_evaluation_counter += 1;
        order
    }

    /// Registers a module that the host has already parsed/compiled,
    /// returning the id the rest of this crate's API addresses it by.
    pub(crate) fn create_module(&mut self, record: ModuleRecord) -> ModuleId {
        self.modules.insert(record)
    }

    fn run_one_job(&mut self) -> bool {
        match self.job_queue.pop_front() {
            Some(job) => {
                job.run(self);
                true
            }
            None => false,
        }
    }

    fn run_jobs(&mut self) {
        while self.run_one_job() {}
    }
}

/// Wraps [`Agent`] with the public, embedder-facing API (§6).
pub struct Engine {
    agent: Agent,
}

impl Engine {
    pub fn new(options: EngineOptions, host_hooks: &'static dyn HostHooks) -> Self {
        Self {
            agent: Agent::new(options, host_hooks),
        }
    }

    /// Direct access to the internal `Agent`, for callers (typically the
    /// host's own statement evaluator) that need to drive completions,
    /// register activations, or otherwise reach below the narrow §6
    /// surface while still building on top of this crate.
    pub fn agent_mut(&mut self) -> &mut Agent {
        &mut self.agent
    }

    pub fn create_module(&mut self, record: ModuleRecord) -> ModuleId {
        self.agent.create_module(record)
    }

    /// [16.2.1.6.1.1 Link ( )](https://tc39.es/ecma262/#sec-moduledeclarationlinking)
    pub fn link(&mut self, module: ModuleId) -> EngineResult<()> {
        cyclic::link(&mut self.agent, module)
    }

    /// [16.2.1.6.1.2 Evaluate ( )](https://tc39.es/ecma262/#sec-moduleevaluation)
    ///
    /// Always produces a `PromiseId` on success, even for a module with no
    /// top-level await anywhere in its dependency graph, per §6; an
    /// `EngineError::Invariant` is only possible when `evaluate` is called
    /// out of order (before `link`, or reentrantly).
    pub fn evaluate(&mut self, module: ModuleId) -> EngineResult<PromiseId> {
        async_driver::evaluate(&mut self.agent, module)
    }

    /// Mints a fresh pending promise, for hosts that need to hand a promise
    /// to JS-visible code without going through module evaluation (e.g. a
    /// host-native async API). Settle it later with [`Engine::resolve_promise`]
    /// / [`Engine::reject_promise`].
    pub fn register_promise(&mut self) -> PromiseId {
        crate::promise::capability::PromiseCapability::new(&mut self.agent).promise()
    }

    /// Resolve a promise minted by [`Engine::register_promise`]. A no-op if
    /// it has already settled or has already had `resolve`/`reject` called
    /// on it (27.2.1.3.2's `AlreadyResolved` guard).
    pub fn resolve_promise(&mut self, promise: PromiseId, value: Value) {
        crate::promise::capability::PromiseCapability::from_promise(promise, true)
            .resolve(&mut self.agent, value);
    }

    /// Reject a promise minted by [`Engine::register_promise`]. See
    /// [`Engine::resolve_promise`].
    pub fn reject_promise(&mut self, promise: PromiseId, reason: Value) {
        crate::promise::capability::PromiseCapability::from_promise(promise, true)
            .reject(&mut self.agent, reason);
    }

    /// The host's own resolve/reject function for a thenable's `then` call
    /// eventually got invoked (see [`crate::host::ThenableOutcome::Pending`]);
    /// report the outcome back so the corresponding promise can settle.
    pub fn settle_thenable(&mut self, promise: PromiseId, outcome: Result<Value, Value>) {
        let capability =
            crate::promise::capability::PromiseCapability::from_promise(promise, false);
        match outcome {
            Ok(value) => capability.resolve(&mut self.agent, value),
            Err(reason) => capability.reject(&mut self.agent, reason),
        }
    }

    /// The namespace object for a linked module, minted lazily and cached on
    /// first request.
    pub fn module_namespace(&mut self, module: ModuleId) -> crate::value::ObjectHandle {
        if let Some(existing) = self.agent.modules.get(module).namespace {
            return existing;
        }
        let mut export_star_set = Vec::new();
        let names = cyclic::get_exported_names(&self.agent, module, &mut export_star_set);
        let handle = self.agent.host_hooks.make_module_namespace(module, &names);
        self.agent.modules.get_mut(module).namespace = Some(handle);
        handle
    }

    pub fn promise_state(&self, promise: PromiseId) -> PromiseState {
        self.agent.promises.state(promise)
    }

    pub fn promise_value(&self, promise: PromiseId) -> &Value {
        self.agent.promises.value(promise)
    }

    /// Drains the continuation queue until empty (§4.2's "executed only
    /// when the engine's continuation queue drains").
    pub fn run_jobs(&mut self) {
        self.agent.run_jobs();
    }

    /// Runs a single queued job, if any. Returns `false` once the queue is
    /// empty. Exposed for hosts that want to interleave job draining with
    /// their own event loop instead of draining to exhaustion in one call.
    pub fn run_one_job(&mut self) -> bool {
        self.agent.run_one_job()
    }
}
