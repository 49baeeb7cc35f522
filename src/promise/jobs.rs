// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ## [9.5 Jobs](https://tc39.es/ecma262/#sec-jobs) — the engine's continuation queue
//!
//! Everything that the promise state machine and the await bridge defer
//! until "the engine's continuation queue drains" lives here as a [`Job`].
//! `Agent::run_one_job`/`run_jobs` (see [`crate::agent`]) are the only things
//! that ever pop from this queue; nothing else observes job ordering.

use crate::host::{ThenCallback, ThenableOutcome};
use crate::promise::{PromiseId, capability::PromiseCapability};
use crate::promise::reaction::{ReactionHandler, ReactionRecord, ReactionType};
use crate::value::Value;

/// A single pending continuation.
#[derive(Debug, Clone)]
pub enum Job {
    /// [27.2.1.3.2 NewPromiseResolveThenableJob](https://tc39.es/ecma262/#sec-newpromiseresolvethenablejob)
    ResolveThenable {
        promise_to_resolve: PromiseId,
        thenable: Value,
        then: ThenCallback,
    },
    /// [27.2.2.1 NewPromiseReactionJob](https://tc39.es/ecma262/#sec-newpromisereactionjob)
    Reaction {
        record: ReactionRecord,
        argument: Value,
    },
}

impl Job {
    /// Run this job against `agent`, driving whatever side effect it
    /// represents (settling a promise, resuming a suspended activation,
    /// resuming an async module's dependents).
    pub(crate) fn run(self, agent: &mut crate::agent::Agent) {
        match self {
            Job::ResolveThenable {
                promise_to_resolve,
                thenable,
                then,
            } => {
                // A fresh, independent resolving-functions pair per spec:
                // `must_be_unresolved = false` means this guard tracks the
                // *promise's* actual settlement, not the outer capability's
                // already-resolved flag, which is what lets a thenable chain
                // (a thenable that itself resolves with another thenable)
                // keep working after the outer capability's own guard has
                // already tripped.
                let inner = PromiseCapability::from_promise(promise_to_resolve, false);
                match agent.host_hooks.call_then(then, thenable) {
                    ThenableOutcome::Settled(Ok(value)) => inner.resolve(agent, value),
                    ThenableOutcome::Settled(Err(err)) => inner.reject(agent, err.into_value()),
                    ThenableOutcome::Pending => {
                        // The host will call `Engine::settle_thenable` later;
                        // nothing to do until then.
                    }
                }
            }
            Job::Reaction { record, argument } => run_reaction(agent, record, argument),
        }
    }
}

fn run_reaction(agent: &mut crate::agent::Agent, record: ReactionRecord, argument: Value) {
    match record.handler {
        ReactionHandler::Callback(then) => {
            // A bare host callback reaction (not currently produced by this
            // crate's own API surface, but kept for parity with nova's
            // `PromiseReactionHandler::JobCallback` — a host that builds its
            // own `.then()` on top of this engine registers these).
            let _ = agent.host_hooks.call_then(then, argument);
        }
        ReactionHandler::Await(activation_id) => {
            let outcome = match record.reaction_type {
                ReactionType::Fulfill => Ok(argument),
                ReactionType::Reject => Err(argument),
            };
            crate::statement::resume_activation(agent, activation_id, outcome);
        }
        ReactionHandler::AsyncModule(module_id) => {
            let outcome = match record.reaction_type {
                ReactionType::Fulfill => Ok(()),
                ReactionType::Reject => Err(argument),
            };
            match outcome {
                Ok(()) => crate::module::async_driver::async_module_execution_fulfilled(
                    agent, module_id,
                ),
                Err(reason) => crate::module::async_driver::async_module_execution_rejected(
                    agent, module_id, reason,
                ),
            }
        }
    }
}
