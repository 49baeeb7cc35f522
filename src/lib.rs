// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! An embeddable core for an ECMAScript runtime: completion records,
//! the promise state machine, a resumable statement-list executor with
//! an `await` suspension bridge, and the cyclic module linker and async
//! module evaluation driver of [ECMA-262](https://tc39.es/ecma262/).
//!
//! This crate deliberately stops short of a full engine. The lexer,
//! parser, object model, and non-control-flow expression evaluation are
//! all a host's responsibility, reached through the narrow [`host::HostHooks`]
//! trait and the [`statement::StatementEvaluator`]/[`statement::StatementSource`]
//! traits — this crate only owns control flow, suspension, and module
//! linkage.

pub mod agent;
pub mod await_bridge;
pub mod completion;
pub mod error;
pub mod host;
pub mod module;
pub mod promise;
pub mod statement;
pub mod value;

#[cfg(test)]
mod test_util;

pub use agent::{Agent, Engine, EngineOptions};
pub use completion::{Completion, CompletionKind};
pub use error::{EngineError, EngineResult, ExceptionType, JsError, JsResult};
pub use host::{HostHooks, ThenableOutcome};
pub use module::record::ModuleRecord;
pub use module::{ExportEntry, ExportImportName, ImportEntry, ImportName, ModuleId, ModuleStatus};
pub use promise::capability::PromiseCapability;
pub use promise::{PromiseId, PromiseState};
pub use statement::{
    ActivationId, CompiledStatementList, StatementEvaluator, StatementSource,
};
pub use value::{ObjectHandle, Value};
