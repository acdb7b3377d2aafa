//! Project domain model.
//!
//! # Invariants
//! - `tasks` and `components` hold full snapshots as of the last load; they
//!   go stale as soon as a task or component is saved elsewhere.
//! - `deadline`, when set, is not earlier than `created_at`.

use crate::model::component::Component;
use crate::model::entity::{identity_eq, Entity, EntityId, EntityKind};
use crate::model::priority::Priority;
use crate::model::set::EntitySet;
use crate::model::task::Task;
use crate::model::user::User;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: EntityId,
    pub title: String,
    /// Unix epoch milliseconds.
    pub created_at: i64,
    /// Unix epoch milliseconds.
    pub deadline: Option<i64>,
    pub priority: Priority,
    pub manager: Option<User>,
    pub coordinator: Option<User>,
    pub team: EntitySet<User>,
    pub tasks: EntitySet<Task>,
    pub components: EntitySet<Component>,
}

identity_eq!(Project);

impl Project {
    pub fn draft() -> Self {
        Self {
            id: EntityId::DRAFT,
            title: String::new(),
            created_at: 0,
            deadline: None,
            priority: Priority::default(),
            manager: None,
            coordinator: None,
            team: EntitySet::new(),
            tasks: EntitySet::new(),
            components: EntitySet::new(),
        }
    }

    pub fn new(title: impl Into<String>, created_at: i64) -> Self {
        Self {
            title: title.into(),
            created_at,
            ..Self::draft()
        }
    }

    /// Checks scalar invariants before persistence.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(deadline) = self.deadline {
            if deadline < self.created_at {
                return Err(format!(
                    "deadline ({deadline}) must be >= created_at ({})",
                    self.created_at
                ));
            }
        }
        Ok(())
    }

    /// Returns whether `user` fills any project slot.
    pub fn involves(&self, user: &User) -> bool {
        self.manager.as_ref().is_some_and(|m| m.same_identity(user))
            || self
                .coordinator
                .as_ref()
                .is_some_and(|c| c.same_identity(user))
            || self.team.contains(user)
    }

    pub fn with_team(&self, team: EntitySet<User>) -> Self {
        Self {
            team,
            ..self.clone()
        }
    }

    pub fn with_tasks(&self, tasks: EntitySet<Task>) -> Self {
        Self {
            tasks,
            ..self.clone()
        }
    }

    pub fn with_components(&self, components: EntitySet<Component>) -> Self {
        Self {
            components,
            ..self.clone()
        }
    }
}

impl Entity for Project {
    const KIND: EntityKind = EntityKind::Project;

    fn id(&self) -> EntityId {
        self.id
    }

    fn label(&self) -> String {
        self.title.clone()
    }
}
