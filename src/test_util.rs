// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Test doubles shared by this crate's own unit tests: a minimal
//! [`HostHooks`] and a [`StatementEvaluator`]/[`StatementSource`] pair
//! driven by a plain list of synthetic operations, standing in for a real
//! parser and object model.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use oxc_span::Span;

use crate::agent::{Agent, Engine, EngineOptions};
use crate::completion::Completion;
use crate::error::ExceptionType;
use crate::host::{HostHooks, ThenCallback, ThenableOutcome};
use crate::module::record::ModuleRecord;
use crate::module::{ExportEntry, ImportEntry, ModuleId};
use crate::statement::{CompiledStatementList, RawOutcome, StatementEvaluator, StatementSource};
use crate::value::{ObjectHandle, Value};

#[derive(Debug, Clone)]
pub(crate) enum TestOp {
    /// A bare literal expression statement.
    Literal(Value),
    /// A statement with no completion value, e.g. a declaration.
    Empty,
    /// `await <value>`.
    Await(Value),
}

pub(crate) struct TestStmtSource(pub TestOp);

impl StatementSource for TestStmtSource {
    fn span(&self) -> Span {
        Span::default()
    }

    fn literal_value(&self) -> Option<Value> {
        match &self.0 {
            TestOp::Literal(v) => Some(v.clone()),
            TestOp::Empty | TestOp::Await(_) => None,
        }
    }
}

pub(crate) struct TestEvaluator {
    pub(crate) ops: Vec<TestOp>,
    /// Records every value an `await` resumed with, in order, for tests to
    /// assert on (stands in for a host-side assignment like `result.v = x`).
    pub(crate) sink: Rc<RefCell<Vec<Value>>>,
}

impl StatementEvaluator for TestEvaluator {
    fn evaluate(
        &mut self,
        _agent: &mut Agent,
        index: usize,
        resume: Option<Result<Value, Value>>,
    ) -> RawOutcome {
        match resume {
            Some(Ok(value)) => {
                self.sink.borrow_mut().push(value.clone());
                RawOutcome::Completion(Completion::normal(Some(value)))
            }
            Some(Err(reason)) => RawOutcome::Completion(Completion::throw(reason, Span::default())),
            None => match &self.ops[index] {
                TestOp::Literal(v) => {
                    self.sink.borrow_mut().push(v.clone());
                    RawOutcome::Completion(Completion::normal(Some(v.clone())))
                }
                TestOp::Empty => RawOutcome::Completion(Completion::normal(None)),
                TestOp::Await(v) => RawOutcome::Await(v.clone()),
            },
        }
    }
}

pub(crate) fn build_module(
    ops: Vec<TestOp>,
    has_tla: bool,
    requested_modules: Vec<&str>,
    import_entries: Vec<ImportEntry>,
    export_entries: Vec<ExportEntry>,
    debug_mode: bool,
) -> (ModuleRecord, Rc<RefCell<Vec<Value>>>) {
    let sink = Rc::new(RefCell::new(Vec::new()));
    let record = build_module_with_sink(
        ops,
        has_tla,
        requested_modules,
        import_entries,
        export_entries,
        debug_mode,
        sink.clone(),
    );
    (record, sink)
}

/// Like [`build_module`], but shares a caller-supplied sink — for tests that
/// need a single execution log across several modules (e.g. asserting
/// evaluation order in a diamond import graph).
pub(crate) fn build_module_with_sink(
    ops: Vec<TestOp>,
    has_tla: bool,
    requested_modules: Vec<&str>,
    import_entries: Vec<ImportEntry>,
    export_entries: Vec<ExportEntry>,
    debug_mode: bool,
    sink: Rc<RefCell<Vec<Value>>>,
) -> ModuleRecord {
    let sources: Vec<TestStmtSource> = ops.iter().cloned().map(TestStmtSource).collect();
    let list = CompiledStatementList::build(&sources, debug_mode);
    let evaluator: Box<dyn StatementEvaluator> = Box::new(TestEvaluator { ops, sink });
    ModuleRecord::new(
        has_tla,
        requested_modules.into_iter().map(Rc::from).collect(),
        import_entries,
        export_entries,
        list,
        evaluator,
    )
}

#[derive(Debug, Default)]
pub(crate) struct TestHost {
    resolutions: RefCell<HashMap<(ModuleId, String), ModuleId>>,
}

impl TestHost {
    pub(crate) fn link(&self, from: ModuleId, specifier: &str, to: ModuleId) {
        self.resolutions
            .borrow_mut()
            .insert((from, specifier.to_string()), to);
    }
}

impl HostHooks for TestHost {
    fn resolve_imported_module(&self, referrer: ModuleId, specifier: &str) -> Option<ModuleId> {
        self.resolutions
            .borrow()
            .get(&(referrer, specifier.to_string()))
            .copied()
    }

    fn make_error(&self, kind: ExceptionType, message: &str) -> Value {
        Value::String(Rc::from(format!("{kind:?}: {message}").as_str()))
    }

    fn get_then(&self, _value: &Value) -> Option<ThenCallback> {
        None
    }

    fn call_then(&self, _then: ThenCallback, _thenable: Value) -> ThenableOutcome {
        unreachable!("test host never registers a thenable")
    }

    fn make_module_namespace(&self, _module: ModuleId, _exports: &[Rc<str>]) -> ObjectHandle {
        ObjectHandle(0)
    }
}

/// Leaks a fresh `TestHost` (fine for short-lived test processes) and wraps
/// it in an `Engine`, returning both so tests can register module
/// resolutions on the host after construction.
pub(crate) fn new_engine(debug_mode: bool) -> (Engine, &'static TestHost) {
    let host: &'static TestHost = Box::leak(Box::new(TestHost::default()));
    (Engine::new(EngineOptions { debug_mode }, host), host)
}
