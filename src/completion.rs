// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ## Completion Records
//!
//! Uniform result carrier for statement execution. Every executor in this
//! crate returns one of these instead of using host-language exceptions for
//! ordinary JS control flow (`break`/`continue`/`return`); real exceptions
//! are reserved for [`crate::error::EngineError::Invariant`].

use oxc_span::Span;

use crate::value::Value;

/// A label attached to a labelled `break`/`continue`, if any.
pub type Label = std::rc::Rc<str>;

#[derive(Debug, Clone, PartialEq)]
pub enum CompletionKind {
    Normal,
    Break(Option<Label>),
    Continue(Option<Label>),
    Return,
    Throw,
}

/// The result of executing a piece of code.
///
/// Invariant: a `Throw` completion always carries a value (the thrown
/// error). There's no separate "suspended" completion kind: a mid-fold
/// parked-on-`await` state is reported by [`crate::statement::FoldOutcome::Suspended`]
/// instead, since it needs to carry the resume point (`ActivationId`) that a
/// plain `Completion` has nowhere to put.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub kind: CompletionKind,
    pub value: Option<Value>,
    pub source: Option<Span>,
}

impl Completion {
    pub fn normal(value: Option<Value>) -> Self {
        Self {
            kind: CompletionKind::Normal,
            value,
            source: None,
        }
    }

    pub fn throw(value: Value, source: Span) -> Self {
        Self {
            kind: CompletionKind::Throw,
            value: Some(value),
            source: Some(source),
        }
    }

    pub fn brk(label: Option<Label>, value: Option<Value>) -> Self {
        Self {
            kind: CompletionKind::Break(label),
            value,
            source: None,
        }
    }

    pub fn cont(label: Option<Label>, value: Option<Value>) -> Self {
        Self {
            kind: CompletionKind::Continue(label),
            value,
            source: None,
        }
    }

    pub fn ret(value: Value) -> Self {
        Self {
            kind: CompletionKind::Return,
            value: Some(value),
            source: None,
        }
    }

    pub fn is_abrupt(&self) -> bool {
        !matches!(self.kind, CompletionKind::Normal)
    }

    pub fn is_throw(&self) -> bool {
        matches!(self.kind, CompletionKind::Throw)
    }
}
