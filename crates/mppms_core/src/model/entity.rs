//! Entity identity and capability contract.
//!
//! # Responsibility
//! - Define the integer identity shared by every entity kind.
//! - Define identity equality used by association sets and selection.
//!
//! # Invariants
//! - `id < 1` denotes a draft that has never been persisted.
//! - Two entities are equal iff same kind and same persisted id.
//! - A draft is equal only to itself (same reference), never to a copy.

use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Display, Formatter};

/// Integer identity assigned by the data-access collaborator.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct EntityId(pub i64);

impl EntityId {
    /// Identity carried by every entity constructed client-side.
    pub const DRAFT: EntityId = EntityId(0);

    pub fn new(value: i64) -> Self {
        Self(value)
    }

    pub fn value(self) -> i64 {
        self.0
    }

    /// Returns whether this identity was never assigned by persistence.
    pub fn is_draft(self) -> bool {
        self.0 < 1
    }
}

impl Display for EntityId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for EntityId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

/// Concrete entity kind, used as change payload tag and in errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Project,
    Task,
    Component,
    Asset,
    User,
}

impl EntityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Project => "project",
            Self::Task => "task",
            Self::Component => "component",
            Self::Asset => "asset",
            Self::User => "user",
        }
    }
}

impl Display for EntityKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Capability shared by every entity record.
///
/// Resolved at compile time per entity type; generic collection, chooser and
/// refresh code is written once against this trait.
pub trait Entity: Clone + Debug {
    const KIND: EntityKind;

    fn id(&self) -> EntityId;

    /// Short human-readable label used by list/tree rendering.
    fn label(&self) -> String;

    fn is_draft(&self) -> bool {
        self.id().is_draft()
    }

    /// Identity equality: same reference, or same persisted id.
    ///
    /// Kind equality is guaranteed by the type parameter.
    fn same_identity(&self, other: &Self) -> bool {
        std::ptr::eq(self, other) || (!self.is_draft() && self.id() == other.id())
    }
}

/// Implements `PartialEq`/`Eq` as identity equality for an entity type.
macro_rules! identity_eq {
    ($ty:ty) => {
        impl PartialEq for $ty {
            fn eq(&self, other: &Self) -> bool {
                $crate::model::entity::Entity::same_identity(self, other)
            }
        }

        impl Eq for $ty {}
    };
}

pub(crate) use identity_eq;
