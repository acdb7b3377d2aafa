//! Task domain model.

use crate::model::asset::Asset;
use crate::model::entity::{identity_eq, Entity, EntityId, EntityKind};
use crate::model::priority::Priority;
use crate::model::set::EntitySet;
use crate::model::user::User;
use serde::{Deserialize, Serialize};

/// Task lifecycle state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Created but not started.
    #[default]
    Todo,
    /// Work is in progress.
    InProgress,
    /// Completed successfully.
    Done,
    /// No longer actionable.
    Cancelled,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Todo => "todo",
            Self::InProgress => "in_progress",
            Self::Done => "done",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "todo" => Some(Self::Todo),
            "in_progress" => Some(Self::InProgress),
            "done" => Some(Self::Done),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

/// Unit of work with assignees and the assets it touches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: EntityId,
    pub title: String,
    pub status: TaskStatus,
    pub priority: Priority,
    /// Free-form report body.
    pub report: String,
    pub assigned_to: EntitySet<User>,
    pub assets: EntitySet<Asset>,
}

identity_eq!(Task);

impl Task {
    pub fn draft() -> Self {
        Self {
            id: EntityId::DRAFT,
            title: String::new(),
            status: TaskStatus::default(),
            priority: Priority::default(),
            report: String::new(),
            assigned_to: EntitySet::new(),
            assets: EntitySet::new(),
        }
    }

    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::draft()
        }
    }

    /// Returns a copy with `assets` replaced wholesale.
    pub fn with_assets(&self, assets: EntitySet<Asset>) -> Self {
        Self {
            assets,
            ..self.clone()
        }
    }

    /// Returns a copy with `assigned_to` replaced wholesale.
    pub fn with_assignees(&self, assigned_to: EntitySet<User>) -> Self {
        Self {
            assigned_to,
            ..self.clone()
        }
    }
}

impl Entity for Task {
    const KIND: EntityKind = EntityKind::Task;

    fn id(&self) -> EntityId {
        self.id
    }

    fn label(&self) -> String {
        self.title.clone()
    }
}
