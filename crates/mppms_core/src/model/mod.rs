//! Relational domain model for projects, tasks, components, assets and users.
//!
//! # Responsibility
//! - Define canonical entity records and their association sets.
//! - Define identity equality shared by sets, choosers and selection.
//!
//! # Invariants
//! - Every entity is identified by an `EntityId`; `id < 1` is a draft.
//! - Edits build new entity values; displayed snapshots are never mutated
//!   in place.

pub mod asset;
pub mod component;
pub mod entity;
pub mod priority;
pub mod project;
pub mod set;
pub mod task;
pub mod user;
