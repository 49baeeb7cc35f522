// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error and result types threaded through the engine (§7).

use crate::value::Value;

/// A JS-visible thrown value, already evaluated.
///
/// Deliberately just a `Value` wrapper, mirroring
/// `nova_vm::ecmascript::execution::agent::JsError`: the TypeError /
/// RangeError / SyntaxError distinction lives in *which*
/// [`crate::host::HostHooks`] constructor produced the carried value, not in
/// a separate Rust-level variant.
#[derive(Debug, Clone, PartialEq)]
pub struct JsError(Value);

impl JsError {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }
}

pub type JsResult<T> = Result<T, JsError>;

/// Kinds of intrinsic error the host must be able to construct (§6, §7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExceptionType {
    TypeError,
    RangeError,
    SyntaxError,
}

/// Top-level engine error: either a JS-visible exception or an internal
/// invariant violation.
///
/// Per §7, an `InvariantViolation` must abort the operation with a distinct
/// fatal error that is never confused with an ordinary JS exception and
/// never silently recovered.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineError {
    Js(JsError),
    /// An internal invariant failed (e.g. a module was found in a status the
    /// algorithm asserts cannot occur). The `&'static str` names the
    /// violated invariant for diagnostics; this is a host/engine bug, never
    /// a JS program bug.
    Invariant(&'static str),
}

impl From<JsError> for EngineError {
    fn from(err: JsError) -> Self {
        EngineError::Js(err)
    }
}

impl EngineError {
    pub fn invariant(message: &'static str) -> Self {
        EngineError::Invariant(message)
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
