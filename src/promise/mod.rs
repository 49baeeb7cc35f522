// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ## [27.2 Promise Objects](https://tc39.es/ecma262/#sec-promise-objects)
//!
//! The promise state machine (C2): Pending → Fulfilled/Rejected transitions,
//! reaction queues, and capability (resolve/reject) creation. Arena-indexed
//! the way `nova_vm`'s heap records are, without carrying nova's
//! garbage-collected heap — promises here just live in a `Vec` owned by the
//! `Engine` for the lifetime of the process (GC is delegated to the host per
//! the crate's non-goals).

pub mod capability;
pub mod jobs;
pub mod reaction;

use crate::value::Value;
use reaction::ReactionRecord;

/// An index into the engine's promise arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PromiseId(pub u32);

/// ### \[\[PromiseState\]\]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromiseState {
    Pending,
    Fulfilled,
    Rejected,
}

#[derive(Debug)]
pub(crate) enum PromiseRecord {
    Pending {
        fulfill_reactions: Vec<ReactionRecord>,
        reject_reactions: Vec<ReactionRecord>,
        /// Tracks `NewPromiseCapability`'s `AlreadyResolved.[[Value]]`: true
        /// once `resolve`/`reject` has been called, even while the promise
        /// itself is still technically pending (the thenable-unwrap path
        /// settles asynchronously).
        is_resolved: bool,
    },
    Fulfilled {
        value: Value,
    },
    Rejected {
        value: Value,
        is_handled: bool,
    },
}

/// Owns every [`PromiseId`] this engine has ever minted.
///
/// Once non-pending, `state`/`value` are immutable (P7): nothing in this
/// module ever mutates a `Fulfilled`/`Rejected` record back to `Pending` or
/// changes its settled value.
#[derive(Debug, Default)]
pub struct PromiseArena {
    records: Vec<PromiseRecord>,
}

impl PromiseArena {
    pub(crate) fn new_pending(&mut self) -> PromiseId {
        let id = PromiseId(self.records.len() as u32);
        self.records.push(PromiseRecord::Pending {
            fulfill_reactions: Vec::new(),
            reject_reactions: Vec::new(),
            is_resolved: false,
        });
        id
    }

    fn record(&self, id: PromiseId) -> &PromiseRecord {
        &self.records[id.0 as usize]
    }

    fn record_mut(&mut self, id: PromiseId) -> &mut PromiseRecord {
        &mut self.records[id.0 as usize]
    }

    pub fn state(&self, id: PromiseId) -> PromiseState {
        match self.record(id) {
            PromiseRecord::Pending { .. } => PromiseState::Pending,
            PromiseRecord::Fulfilled { .. } => PromiseState::Fulfilled,
            PromiseRecord::Rejected { .. } => PromiseState::Rejected,
        }
    }

    /// Precondition: `state(id) != Pending`.
    pub fn value(&self, id: PromiseId) -> &Value {
        match self.record(id) {
            PromiseRecord::Fulfilled { value } | PromiseRecord::Rejected { value, .. } => value,
            PromiseRecord::Pending { .. } => {
                panic!("PromiseArena::value called on a still-pending promise")
            }
        }
    }

    pub(crate) fn is_handled(&self, id: PromiseId) -> bool {
        matches!(
            self.record(id),
            PromiseRecord::Rejected {
                is_handled: true,
                ..
            }
        )
    }

    pub(crate) fn mark_handled(&mut self, id: PromiseId) {
        if let PromiseRecord::Rejected { is_handled, .. } = self.record_mut(id) {
            *is_handled = true;
        }
    }

    /// Appends reactions to a still-pending promise's queues. Callers are
    /// responsible for handling the already-settled case themselves (see
    /// `Agent::perform_promise_then`), since that path needs the job queue,
    /// which this arena doesn't own.
    pub(crate) fn add_reactions(
        &mut self,
        id: PromiseId,
        fulfill: ReactionRecord,
        reject: ReactionRecord,
    ) {
        if let PromiseRecord::Pending {
            fulfill_reactions,
            reject_reactions,
            ..
        } = self.record_mut(id)
        {
            fulfill_reactions.push(fulfill);
            reject_reactions.push(reject);
        }
    }
}
