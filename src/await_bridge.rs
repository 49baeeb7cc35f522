// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ## C4 — Await Bridge
//!
//! Bridges a single `await` expression to the promise state machine: coerce
//! the operand to a promise (§25.7.5.1 `Await`), register the suspended
//! activation as that promise's fulfill/reject reaction, and report back to
//! [`crate::statement`] whether the statement list can keep running
//! synchronously (FastResolve) or must suspend until the job queue drains.

use crate::agent::Agent;
use crate::promise::capability::PromiseCapability;
use crate::promise::reaction::{ReactionHandler, ReactionRecord, ReactionType};
use crate::promise::{PromiseId, PromiseState};
use crate::statement::ActivationId;
use crate::value::Value;

/// The result of attempting to evaluate an `await <operand>`.
pub enum AwaitOutcome {
    /// The awaited value settled without needing the job queue: either it
    /// wasn't a promise/thenable at all, or it was already-settled promise
    /// and FastResolve is enabled. The statement list can keep folding in
    /// the same call stack.
    Ready(Result<Value, Value>),
    /// The operand is still pending; the activation has been registered as
    /// a reaction and will be resumed by [`crate::statement::resume_activation`]
    /// once the job queue drains it.
    Suspended,
}

/// [25.7.5.1 Await ( value )](https://tc39.es/ecma262/#await)
pub fn evaluate_await(agent: &mut Agent, activation: ActivationId, operand: Value) -> AwaitOutcome {
    // FastResolve (§4.3/§4.4): when debugging is off, skip the suspend/job
    // round-trip for operands that are provably already settled or aren't
    // promise-shaped at all. `debug_mode` forces every `await` through the
    // full path so statement-by-statement execution order never depends on
    // whether a value happened to already be settled.
    if !agent.options.debug_mode {
        match &operand {
            Value::Promise(id) => {
                if let Some(outcome) = already_settled(agent, *id) {
                    return AwaitOutcome::Ready(outcome);
                }
            }
            other if !other.is_object_like() => {
                return AwaitOutcome::Ready(Ok(operand));
            }
            _ => {}
        }
    }

    let promise = coerce_to_promise(agent, operand);
    agent.perform_promise_then(
        promise,
        ReactionRecord::new(ReactionHandler::Await(activation), ReactionType::Fulfill),
        ReactionRecord::new(ReactionHandler::Await(activation), ReactionType::Reject),
    );
    AwaitOutcome::Suspended
}

fn already_settled(agent: &mut Agent, id: PromiseId) -> Option<Result<Value, Value>> {
    match agent.promises.state(id) {
        PromiseState::Fulfilled => Some(Ok(agent.promises.value(id).clone())),
        PromiseState::Rejected => {
            agent.promises.mark_handled(id);
            Some(Err(agent.promises.value(id).clone()))
        }
        PromiseState::Pending => None,
    }
}

/// [27.2.4.7.1 PromiseResolve ( C, x )](https://tc39.es/ecma262/#sec-promise-resolve)
/// narrowed to the engine's own promise constructor (there is no user-level
/// `C` here — `await` always coerces against this engine's own `Promise`).
fn coerce_to_promise(agent: &mut Agent, value: Value) -> PromiseId {
    if let Value::Promise(id) = value {
        return id;
    }
    let capability = PromiseCapability::new(agent);
    capability.resolve(agent, value);
    capability.promise()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::statement::ActivationId;
    use crate::test_util::new_engine;

    #[test]
    fn fast_resolve_skips_suspension_on_an_already_fulfilled_promise() {
        let (mut engine, _host) = new_engine(false);
        let capability = PromiseCapability::new(engine.agent_mut());
        capability.resolve(engine.agent_mut(), Value::Number(42.0));
        let operand = Value::Promise(capability.promise());
        let outcome = evaluate_await(engine.agent_mut(), ActivationId(0), operand);
        match outcome {
            AwaitOutcome::Ready(Ok(v)) => assert_eq!(v, Value::Number(42.0)),
            _ => panic!("expected FastResolve to settle immediately"),
        }
    }

    #[test]
    fn debug_mode_forces_suspension_even_when_already_settled() {
        let (mut engine, _host) = new_engine(true);
        let capability = PromiseCapability::new(engine.agent_mut());
        capability.resolve(engine.agent_mut(), Value::Number(42.0));
        let operand = Value::Promise(capability.promise());
        let outcome = evaluate_await(engine.agent_mut(), ActivationId(0), operand);
        assert!(matches!(outcome, AwaitOutcome::Suspended));
    }

    #[test]
    fn a_non_object_like_operand_resolves_immediately_outside_debug_mode() {
        let (mut engine, _host) = new_engine(false);
        let outcome = evaluate_await(engine.agent_mut(), ActivationId(0), Value::Boolean(true));
        assert!(matches!(outcome, AwaitOutcome::Ready(Ok(Value::Boolean(true)))));
    }

    #[test]
    fn a_pending_promise_suspends_and_later_resumes_via_the_job_queue() {
        let (mut engine, _host) = new_engine(false);
        let capability = PromiseCapability::new(engine.agent_mut());
        let operand = Value::Promise(capability.promise());
        let outcome = evaluate_await(engine.agent_mut(), ActivationId(0), operand.clone());
        assert!(matches!(outcome, AwaitOutcome::Suspended));
        // Resolve later; the registered reaction becomes a queued job rather
        // than running inline.
        capability.resolve(engine.agent_mut(), Value::Number(7.0));
        assert_eq!(
            engine.promise_state(capability.promise()),
            crate::promise::PromiseState::Fulfilled
        );
    }
}
