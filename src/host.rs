// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ## C8 — Host Interface
//!
//! The narrow contract this crate needs from whatever owns the object model,
//! parser, and realm: resolving module specifiers, constructing intrinsic
//! errors, reading a `then` property off an object, and calling a function
//! value. Everything else (properties, prototypes, garbage collection) is the
//! host's problem.
//!
//! Mirrors the shape of `nova_vm::engine::context::HostHooks`, trimmed to
//! just the operations the module linker, await bridge, and promise jobs
//! actually call.

use std::rc::Rc;

use crate::error::{ExceptionType, JsResult};
use crate::module::ModuleId;
use crate::promise::PromiseId;
use crate::value::{ObjectHandle, Value};

/// A callable value captured off a thenable, ready to be invoked by
/// [`crate::promise::jobs::Job::ResolveThenable`].
pub type ThenCallback = ObjectHandle;

/// Host-provided capabilities this crate cannot implement on its own.
///
/// Implementations are expected to be zero-sized or cheaply `Copy`-able
/// (nova's own `DefaultHostHooks` is a unit struct); any actual state the
/// host needs lives behind interior mutability, since [`crate::agent::Agent`]
/// only ever holds a `&'static dyn HostHooks`.
pub trait HostHooks: std::fmt::Debug {
    /// Resolve `specifier` as imported by `referrer` to a module the host has
    /// already parsed and registered with [`crate::agent::Engine::create_module`].
    ///
    /// Per §4.5/§6, this must be synchronous and must not fail for a
    /// specifier the host itself listed in the referrer's requested-modules
    /// list; an unresolvable specifier here is a host bug, surfaced as an
    /// [`crate::error::EngineError::Invariant`] by the caller.
    fn resolve_imported_module(&self, referrer: ModuleId, specifier: &str) -> Option<ModuleId>;

    /// Construct an intrinsic error object of the given kind, wrapping
    /// `message`. Used for `TypeError`s the engine itself must raise (a
    /// promise resolved with itself, a module requested that never resolved).
    fn make_error(&self, kind: ExceptionType, message: &str) -> Value;

    /// If `value` has a callable own-or-inherited `then`, return a handle to
    /// it; otherwise `None`. Drives the thenable-unwrap branch of
    /// [`crate::promise::capability::PromiseCapability::resolve`].
    fn get_then(&self, value: &Value) -> Option<ThenCallback>;

    /// Invoke a previously captured `then` against `thenable`, the way
    /// [`NewPromiseResolveThenableJob`](https://tc39.es/ecma262/#sec-newpromiseresolvethenablejob)
    /// does, minted with a pair of resolving functions the host doesn't need
    /// to understand — it only needs to report back what happened.
    ///
    /// Most hosts' `then` implementations that call their resolve/reject
    /// argument synchronously (the overwhelmingly common case — `Promise`
    /// subclasses, thenables built from already-settled promises) should
    /// return `ThenableOutcome::Settled` directly. A thenable that defers
    /// the call (e.g. schedules it on a host timer) returns `Pending`; the
    /// host is then responsible for eventually calling
    /// [`crate::agent::Engine::settle_thenable`] with `promise_to_resolve`
    /// once its own resolve/reject function is actually invoked.
    fn call_then(&self, then: ThenCallback, thenable: Value) -> ThenableOutcome;

    /// Called once a promise transitions to `Rejected` with no reaction
    /// registered at settlement time (27.2.1.7 step 8). Default: no-op: most
    /// embedders only care about this for devtools-style reporting.
    fn promise_rejection_tracker(&self, _promise: PromiseId) {}

    /// Build the [Module Namespace Exotic Object](https://tc39.es/ecma262/#sec-module-namespace-exotic-objects)
    /// for a linked module, given its resolved `[[Exports]]` list. Called at
    /// most once per module, the first time something asks for it.
    fn make_module_namespace(&self, module: ModuleId, exports: &[Rc<str>]) -> ObjectHandle;
}

/// What happened when the host ran a thenable's `then` method.
#[derive(Debug, Clone, PartialEq)]
pub enum ThenableOutcome {
    /// `then`'s resolve or reject argument was called synchronously — `Ok`
    /// for resolve, `Err` for reject — or `then` itself threw (also `Err`).
    Settled(JsResult<Value>),
    /// Neither resolving function was called before `call_then` returned;
    /// the host will report the eventual outcome via `Engine::settle_thenable`.
    Pending,
}
