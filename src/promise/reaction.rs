// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! [27.2.1.2 PromiseReaction Records](https://tc39.es/ecma262/#sec-promisereaction-records)

use crate::host::ThenCallback;
use crate::module::ModuleId;
use crate::statement::ActivationId;

/// Which direction of the promise's settlement this reaction fires on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactionType {
    Fulfill,
    Reject,
}

/// What running a reaction actually does once its promise settles.
///
/// Mirrors nova's `PromiseReactionHandler`: a reaction is either plain
/// handler-callback dispatch (`JobCallback`, not needed here since this
/// crate has no user-facing `.then()` surface of its own), a suspended
/// `await` waiting to resume an activation (C4), or a module whose top-level
/// evaluation is waiting on one of its async dependencies (C7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactionHandler {
    /// A host-visible `.then()`-style callback captured on a thenable.
    Callback(ThenCallback),
    /// Resume the statement-list executor for this suspended activation.
    Await(ActivationId),
    /// Resume evaluating this module's dependents (§4.7).
    AsyncModule(ModuleId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReactionRecord {
    pub handler: ReactionHandler,
    pub reaction_type: ReactionType,
}

impl ReactionRecord {
    pub fn new(handler: ReactionHandler, reaction_type: ReactionType) -> Self {
        Self {
            handler,
            reaction_type,
        }
    }
}
