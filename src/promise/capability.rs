// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ## [27.2.1.1 PromiseCapability Records](https://tc39.es/ecma262/#sec-promisecapability-records)

use crate::{
    agent::Agent,
    error::ExceptionType,
    value::Value,
};

use super::{PromiseId, PromiseRecord, jobs::Job, reaction::ReactionRecord};

/// A promise paired with its single-use resolve/reject behavior.
///
/// Mirrors `nova_vm`'s `PromiseCapability`: rather than storing real
/// `resolve`/`reject` function objects (there are none here — functions are
/// host territory), we only store the promise id plus the
/// `must_be_unresolved` discriminant nova uses to track `AlreadyResolved`
/// independently of `[[PromiseState]]` itself (needed because the thenable
/// path can mark a capability "already resolved" before the wrapped promise
/// actually leaves `Pending`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromiseCapability {
    promise: PromiseId,
    must_be_unresolved: bool,
}

impl PromiseCapability {
    /// [27.2.1.5 NewPromiseCapability ( C )](https://tc39.es/ecma262/#sec-newpromisecapability)
    pub fn new(agent: &mut Agent) -> Self {
        Self::from_promise(agent.promises.new_pending(), true)
    }

    pub fn from_promise(promise: PromiseId, must_be_unresolved: bool) -> Self {
        Self {
            promise,
            must_be_unresolved,
        }
    }

    pub fn promise(&self) -> PromiseId {
        self.promise
    }

    fn is_already_resolved(&self, agent: &Agent) -> bool {
        match agent.promises.record(self.promise) {
            PromiseRecord::Pending { is_resolved, .. } => {
                if self.must_be_unresolved {
                    *is_resolved
                } else {
                    false
                }
            }
            _ => true,
        }
    }

    /// [27.2.1.4 FulfillPromise ( promise, value )](https://tc39.es/ecma262/#sec-fulfillpromise)
    fn internal_fulfill(&self, agent: &mut Agent, value: Value) {
        let record = agent.promises.record_mut(self.promise);
        let fulfill_reactions = match record {
            PromiseRecord::Pending {
                fulfill_reactions, ..
            } => std::mem::take(fulfill_reactions),
            _ => unreachable!("FulfillPromise on a non-pending promise"),
        };
        *record = PromiseRecord::Fulfilled {
            value: value.clone(),
        };
        trigger_reactions(agent, fulfill_reactions, value);
    }

    /// [27.2.1.7 RejectPromise ( promise, reason )](https://tc39.es/ecma262/#sec-rejectpromise)
    fn internal_reject(&self, agent: &mut Agent, reason: Value) {
        let record = agent.promises.record_mut(self.promise);
        let reject_reactions = match record {
            PromiseRecord::Pending {
                reject_reactions, ..
            } => std::mem::take(reject_reactions),
            _ => unreachable!("RejectPromise on a non-pending promise"),
        };
        let is_handled = !reject_reactions.is_empty();
        *record = PromiseRecord::Rejected {
            value: reason.clone(),
            is_handled,
        };
        if !is_handled {
            agent.host_hooks.promise_rejection_tracker(self.promise);
        }
        trigger_reactions(agent, reject_reactions, reason);
    }

    /// [27.2.1.3.2 Promise Resolve Functions](https://tc39.es/ecma262/#sec-promise-resolve-functions)
    pub fn resolve(&self, agent: &mut Agent, resolution: Value) {
        if self.is_already_resolved(agent) {
            return;
        }
        if let PromiseRecord::Pending { is_resolved, .. } =
            agent.promises.record_mut(self.promise)
        {
            *is_resolved = true;
        }

        // Resolving a promise with itself is a TypeError (a promise can
        // never depend on its own settlement).
        if resolution == Value::Promise(self.promise) {
            let exception = agent.host_hooks.make_error(
                ExceptionType::TypeError,
                "cannot resolve a promise with itself",
            );
            self.internal_reject(agent, exception);
            return;
        }

        if !resolution.is_object_like() {
            self.internal_fulfill(agent, resolution);
            return;
        }

        // Thenable unwrap (§4.2): the object model lives with the host, so
        // we only ask whether `resolution` exposes a callable `then`.
        let Some(then) = agent.host_hooks.get_then(&resolution) else {
            self.internal_fulfill(agent, resolution);
            return;
        };

        agent.enqueue_job(Job::ResolveThenable {
            promise_to_resolve: self.promise,
            thenable: resolution,
            then,
        });
    }

    /// [27.2.1.3.1 Promise Reject Functions](https://tc39.es/ecma262/#sec-promise-reject-functions)
    pub fn reject(&self, agent: &mut Agent, reason: Value) {
        if self.is_already_resolved(agent) {
            return;
        }
        if let PromiseRecord::Pending { is_resolved, .. } =
            agent.promises.record_mut(self.promise)
        {
            *is_resolved = true;
        }
        self.internal_reject(agent, reason);
    }
}

fn trigger_reactions(agent: &mut Agent, reactions: Vec<ReactionRecord>, argument: Value) {
    for reaction in reactions {
        agent.enqueue_job(Job::Reaction {
            record: reaction,
            argument: argument.clone(),
        });
    }
}

/// ### [27.2.1.1.1 IfAbruptRejectPromise ( value, capability )](https://tc39.es/ecma262/#sec-ifabruptrejectpromise)
pub fn if_abrupt_reject_promise<T>(
    agent: &mut Agent,
    value: crate::error::JsResult<T>,
    capability: PromiseCapability,
) -> crate::error::JsResult<T> {
    value.map_err(|err| {
        capability.reject(agent, err.value().clone());
        crate::error::JsError::new(Value::Promise(capability.promise()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::promise::PromiseState;
    use crate::test_util::new_engine;

    #[test]
    fn resolve_is_idempotent() {
        let (mut engine, _host) = new_engine(false);
        let capability = PromiseCapability::new(engine.agent_mut());
        capability.resolve(engine.agent_mut(), Value::Number(1.0));
        // P4: resolve/reject invoked exactly once — a second call is a no-op.
        capability.resolve(engine.agent_mut(), Value::Number(2.0));
        assert_eq!(engine.promise_state(capability.promise()), PromiseState::Fulfilled);
        assert_eq!(engine.promise_value(capability.promise()), &Value::Number(1.0));
    }

    #[test]
    fn reject_after_resolve_is_a_no_op() {
        let (mut engine, _host) = new_engine(false);
        let capability = PromiseCapability::new(engine.agent_mut());
        capability.resolve(engine.agent_mut(), Value::Number(1.0));
        capability.reject(engine.agent_mut(), Value::from("late"));
        // P7: once Fulfilled, never changes.
        assert_eq!(engine.promise_state(capability.promise()), PromiseState::Fulfilled);
        assert_eq!(engine.promise_value(capability.promise()), &Value::Number(1.0));
    }

    #[test]
    fn resolving_a_promise_with_itself_is_a_type_error() {
        let (mut engine, _host) = new_engine(false);
        let capability = PromiseCapability::new(engine.agent_mut());
        let promise = capability.promise();
        capability.resolve(engine.agent_mut(), Value::Promise(promise));
        assert_eq!(engine.promise_state(promise), PromiseState::Rejected);
    }

    #[test]
    fn resolving_with_a_plain_value_fulfills_synchronously() {
        let (mut engine, _host) = new_engine(false);
        let capability = PromiseCapability::new(engine.agent_mut());
        capability.resolve(engine.agent_mut(), Value::Boolean(true));
        assert_eq!(engine.promise_state(capability.promise()), PromiseState::Fulfilled);
    }
}
