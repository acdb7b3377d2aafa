//! Change notification payload and dispatcher.
//!
//! # Responsibility
//! - Tell every live view that persisted state changed.
//! - Carry enough of a tag (kind, mutation, id) for observers to skip
//!   irrelevant refreshes; observers still re-query for the data itself.

pub mod bus;

use crate::model::entity::{Entity, EntityId, EntityKind};
use std::fmt::{Display, Formatter};

/// What happened to the entity named by a `ChangeEvent`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mutation {
    Created,
    Updated,
    Deleted,
}

impl Mutation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Deleted => "deleted",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChangeEvent {
    pub kind: EntityKind,
    pub mutation: Mutation,
    pub id: EntityId,
}

impl ChangeEvent {
    pub fn new(kind: EntityKind, mutation: Mutation, id: EntityId) -> Self {
        Self { kind, mutation, id }
    }

    /// Event for a completed save; `was_draft` selects Created vs Updated.
    pub fn saved<T: Entity>(saved: &T, was_draft: bool) -> Self {
        let mutation = if was_draft {
            Mutation::Created
        } else {
            Mutation::Updated
        };
        Self::new(T::KIND, mutation, saved.id())
    }

    pub fn deleted<T: Entity>(id: EntityId) -> Self {
        Self::new(T::KIND, Mutation::Deleted, id)
    }
}

impl Display for ChangeEvent {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.kind, self.mutation.as_str(), self.id)
    }
}
