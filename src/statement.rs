// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ## C3 — Statement List Executor
//!
//! Folds a list of statements into a single [`Completion`], in source order,
//! short-circuiting on the first abrupt completion, operating over an
//! opaque, host-implemented statement rather than a compiled instruction
//! stream (parsing and expression evaluation are the host's job; see
//! [`crate::host`]).
//!
//! `nova_vm`'s `cyclic_module_records.rs` leaves `ExecuteModule` as an empty
//! stub at the point where a module body's completion should be produced
//! and settled; this module is the real implementation of that step.
//! [`CompiledStatementList::build`] runs once per function/module body;
//! [`execute`] (the fold) runs it, resumably, including resuming mid-list
//! after an `await` suspension (§4.4).

use oxc_span::Span;

use crate::agent::Agent;
use crate::completion::Completion;
use crate::promise::capability::PromiseCapability;
use crate::value::Value;

/// An index into the engine's activation arena — one entry per suspended or
/// running statement-list execution (a function call, a module body).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActivationId(pub u32);

/// What the host's AST/bytecode needs to expose per statement for this crate
/// to compile a [`CompiledStatementList`] from it.
pub trait StatementSource {
    fn span(&self) -> Span;

    /// `Some(v)` if this statement is a bare literal expression statement
    /// (its completion value is always `v`, unconditionally); enables
    /// FastResolve (§4.3) to skip re-invoking the host evaluator for it.
    fn literal_value(&self) -> Option<Value>;
}

#[derive(Debug, Clone)]
pub struct CompiledStatement {
    pub span: Span,
    pub fast_value: Option<Value>,
}

/// A statement list, compiled once and executed (possibly many times, or
/// resumed after suspension) against a [`StatementEvaluator`].
#[derive(Debug, Clone, Default)]
pub struct CompiledStatementList {
    statements: Vec<CompiledStatement>,
}

impl CompiledStatementList {
    /// `debug_mode` disables FastResolve precomputation so every statement,
    /// literal or not, is re-evaluated by the host on every pass — useful
    /// for host-side step debuggers that want to break on every statement.
    pub fn build<S: StatementSource>(statements: &[S], debug_mode: bool) -> Self {
        let statements = statements
            .iter()
            .map(|s| CompiledStatement {
                span: s.span(),
                fast_value: if debug_mode { None } else { s.literal_value() },
            })
            .collect();
        Self { statements }
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }
}

/// What evaluating a single statement produced.
pub enum RawOutcome {
    /// The statement ran to completion (possibly abrupt).
    Completion(Completion),
    /// The statement issued an `await` on `operand`; evaluation of this list
    /// must stop here and resume later at the same index (§4.4).
    Await(Value),
}

/// Host hook invoked once per non-fast-pathed statement.
///
/// `resume` carries the settled await outcome (`Ok` = fulfilled, `Err` =
/// rejected) the one time this statement is re-entered after a previous
/// [`RawOutcome::Await`] from the same index; `None` on every other call.
pub trait StatementEvaluator {
    fn evaluate(
        &mut self,
        agent: &mut Agent,
        index: usize,
        resume: Option<Result<Value, Value>>,
    ) -> RawOutcome;
}

/// A suspended or running statement-list execution.
///
/// Mirrors a nova `ExecutionContext` paired with its `Vm`, narrowed to what
/// C3/C4 need: where we are (`next_index`), what we've folded so far
/// (`last_value`), and the promise the whole body settles (`body_capability`
/// — every activation has one, per §6's "`evaluate` always returns a
/// promise id").
pub struct Activation {
    pub(crate) list: CompiledStatementList,
    pub(crate) evaluator: Box<dyn StatementEvaluator>,
    pub(crate) next_index: usize,
    pub(crate) last_value: Option<Value>,
    pub(crate) body_capability: PromiseCapability,
}

impl Activation {
    pub fn new(
        list: CompiledStatementList,
        evaluator: Box<dyn StatementEvaluator>,
        body_capability: PromiseCapability,
    ) -> Self {
        Self {
            list,
            evaluator,
            next_index: 0,
            last_value: None,
            body_capability,
        }
    }
}

/// The completion-folding core of C3: execute `list` against `evaluator`
/// starting at `start_index`, carrying `last_value` forward as the running
/// completion value, and feeding `resume` into exactly the statement at
/// `start_index` (the one that previously suspended, if any).
///
/// Per §4.4's suspension contract, a `RawOutcome::Await` stops the fold
/// immediately and the caller is expected to later call this again with
/// `start_index` unchanged and `resume` populated.
pub fn fold(
    agent: &mut Agent,
    list: &CompiledStatementList,
    evaluator: &mut dyn StatementEvaluator,
    start_index: usize,
    mut last_value: Option<Value>,
    mut resume: Option<Result<Value, Value>>,
) -> FoldOutcome {
    let mut index = start_index;
    while index < list.len() {
        let stmt = &list.statements[index];
        let outcome = match (&stmt.fast_value, resume.take()) {
            (Some(value), None) => RawOutcome::Completion(Completion::normal(Some(value.clone()))),
            (_, resume_arg) => evaluator.evaluate(agent, index, resume_arg),
        };
        match outcome {
            RawOutcome::Completion(completion) => {
                if completion.is_abrupt() {
                    return FoldOutcome::Done(completion);
                }
                if completion.value.is_some() {
                    last_value = completion.value;
                }
                index += 1;
            }
            RawOutcome::Await(operand) => {
                return FoldOutcome::Suspended {
                    resume_index: index,
                    last_value,
                    operand,
                };
            }
        }
    }
    FoldOutcome::Done(Completion::normal(last_value))
}

pub enum FoldOutcome {
    Done(Completion),
    Suspended {
        resume_index: usize,
        last_value: Option<Value>,
        operand: Value,
    },
}

/// Start a freshly-built activation running for the first time (a module or
/// function body that has never executed a statement yet).
pub fn start_activation(agent: &mut Agent, activation: Activation) -> ActivationId {
    let id = agent.alloc_activation();
    drive(agent, id, activation, None);
    id
}

/// Resume the activation at `id` with the settled await outcome `outcome`,
/// driving it either to a further suspension (re-registered with the await
/// bridge) or to completion (settling `body_capability`).
pub fn resume_activation(agent: &mut Agent, id: ActivationId, outcome: Result<Value, Value>) {
    let Some(activation) = agent.take_activation(id) else {
        return;
    };
    drive(agent, id, activation, Some(outcome));
}

/// Runs `activation` (already removed from, or not yet placed in, the
/// arena) until it either completes or suspends on another `await`, storing
/// it back under `id` in the latter case.
fn drive(
    agent: &mut Agent,
    id: ActivationId,
    mut activation: Activation,
    resume: Option<Result<Value, Value>>,
) {
    let index = activation.next_index;
    let last_value = activation.last_value.take();

    let fold_outcome = {
        // The evaluator never touches `activation` itself, only `agent`, so
        // holding `&mut activation.evaluator` alongside `&mut agent` here is
        // fine even though they're logically related.
        let list = activation.list.clone();
        let evaluator = activation.evaluator.as_mut();
        fold(agent, &list, evaluator, index, last_value, resume)
    };

    match fold_outcome {
        FoldOutcome::Done(completion) => settle_body(agent, activation, completion),
        FoldOutcome::Suspended {
            resume_index,
            last_value,
            operand,
        } => {
            activation.next_index = resume_index;
            activation.last_value = last_value;
            agent.put_activation(id, activation);
            match crate::await_bridge::evaluate_await(agent, id, operand) {
                crate::await_bridge::AwaitOutcome::Ready(result) => {
                    resume_activation(agent, id, result);
                }
                crate::await_bridge::AwaitOutcome::Suspended => {}
            }
        }
    }
}

fn settle_body(agent: &mut Agent, activation: Activation, completion: Completion) {
    use crate::completion::CompletionKind;
    match completion.kind {
        CompletionKind::Throw => {
            activation
                .body_capability
                .reject(agent, completion.value.unwrap_or(Value::Undefined));
        }
        _ => {
            activation
                .body_capability
                .resolve(agent, completion.value.unwrap_or(Value::Undefined));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::promise::capability::PromiseCapability;
    use crate::promise::PromiseState;
    use crate::test_util::{new_engine, TestEvaluator, TestOp, TestStmtSource};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn build(ops: Vec<TestOp>, debug_mode: bool) -> (CompiledStatementList, TestEvaluator, Rc<RefCell<Vec<Value>>>) {
        let sources: Vec<TestStmtSource> = ops.iter().cloned().map(TestStmtSource).collect();
        let list = CompiledStatementList::build(&sources, debug_mode);
        let sink = Rc::new(RefCell::new(Vec::new()));
        let evaluator = TestEvaluator {
            ops,
            sink: sink.clone(),
        };
        (list, evaluator, sink)
    }

    #[test]
    fn fold_value_is_the_last_non_empty_normal_completion() {
        let (mut engine, _host) = new_engine(false);
        let (list, mut evaluator, _sink) = build(
            vec![
                TestOp::Literal(Value::Number(1.0)),
                TestOp::Empty,
                TestOp::Literal(Value::Number(2.0)),
            ],
            false,
        );
        let outcome = fold(engine.agent_mut(), &list, &mut evaluator, 0, None, None);
        match outcome {
            FoldOutcome::Done(completion) => {
                assert_eq!(completion.value, Some(Value::Number(2.0)));
            }
            _ => panic!("expected the fold to complete"),
        }
    }

    #[test]
    fn fold_value_is_undefined_when_nothing_produced_a_value() {
        let (mut engine, _host) = new_engine(false);
        let (list, mut evaluator, _sink) = build(vec![TestOp::Empty, TestOp::Empty], false);
        let outcome = fold(engine.agent_mut(), &list, &mut evaluator, 0, None, None);
        match outcome {
            FoldOutcome::Done(completion) => assert_eq!(completion.value, None),
            _ => panic!("expected the fold to complete"),
        }
    }

    #[test]
    fn await_on_a_non_object_value_resolves_inline_under_fast_resolve() {
        let (mut engine, _host) = new_engine(false);
        let (list, evaluator, sink) = build(
            vec![
                TestOp::Literal(Value::Number(1.0)),
                TestOp::Await(Value::Number(99.0)),
                TestOp::Literal(Value::Number(3.0)),
            ],
            false,
        );
        let capability = PromiseCapability::new(engine.agent_mut());
        let body_promise = capability.promise();
        let activation = Activation::new(list, Box::new(evaluator), capability);
        let id = start_activation(engine.agent_mut(), activation);
        // `await 99` is non-object-like, so FastResolve settles it inline:
        // the whole body runs to completion without ever suspending.
        assert!(engine.agent_mut().take_activation(id).is_none());
        assert_eq!(*sink.borrow(), vec![Value::Number(99.0)]);
        assert_eq!(engine.promise_state(body_promise), PromiseState::Fulfilled);
        assert_eq!(engine.promise_value(body_promise), &Value::Number(3.0));
    }

    #[test]
    fn await_on_a_pending_promise_suspends_until_the_job_queue_resolves_it() {
        let (mut engine, _host) = new_engine(false);
        let awaited = PromiseCapability::new(engine.agent_mut());
        let awaited_promise = awaited.promise();
        let (list, evaluator, sink) = build(
            vec![
                TestOp::Await(Value::Promise(awaited_promise)),
                TestOp::Literal(Value::Number(3.0)),
            ],
            false,
        );
        let capability = PromiseCapability::new(engine.agent_mut());
        let body_promise = capability.promise();
        let activation = Activation::new(list, Box::new(evaluator), capability);
        let id = start_activation(engine.agent_mut(), activation);
        // Still pending: the activation is parked in the arena.
        assert!(sink.borrow().is_empty());
        assert_eq!(engine.promise_state(body_promise), PromiseState::Pending);

        awaited.resolve(engine.agent_mut(), Value::Number(5.0));
        engine.run_jobs();

        assert_eq!(*sink.borrow(), vec![Value::Number(5.0)]);
        assert_eq!(engine.promise_state(body_promise), PromiseState::Fulfilled);
        assert_eq!(engine.promise_value(body_promise), &Value::Number(3.0));
        assert!(engine.agent_mut().take_activation(id).is_none());
    }
}
