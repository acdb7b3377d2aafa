//! User domain model and role permissions.
//!
//! # Invariants
//! - `role` is the only input to permission checks.

use crate::model::entity::{identity_eq, Entity, EntityId, EntityKind};
use serde::{Deserialize, Serialize};

/// Organizational role of a user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    ProjectManager,
    ProjectCoordinator,
    #[serde(rename = "qc_team_leader")]
    QcTeamLeader,
    #[default]
    Other,
}

impl UserRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ProjectManager => "project_manager",
            Self::ProjectCoordinator => "project_coordinator",
            Self::QcTeamLeader => "qc_team_leader",
            Self::Other => "other",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "project_manager" => Some(Self::ProjectManager),
            "project_coordinator" => Some(Self::ProjectCoordinator),
            "qc_team_leader" => Some(Self::QcTeamLeader),
            "other" => Some(Self::Other),
            _ => None,
        }
    }
}

/// Application user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: EntityId,
    pub name: String,
    pub role: UserRole,
}

identity_eq!(User);

impl User {
    /// Creates a draft user with default fields.
    pub fn draft() -> Self {
        Self {
            id: EntityId::DRAFT,
            name: String::new(),
            role: UserRole::Other,
        }
    }

    pub fn new(name: impl Into<String>, role: UserRole) -> Self {
        Self {
            name: name.into(),
            role,
            ..Self::draft()
        }
    }

    /// Project creation and project field edits.
    pub fn can_manage_projects(&self) -> bool {
        self.role == UserRole::ProjectManager
    }

    /// Task creation and task field edits.
    pub fn can_edit_tasks(&self) -> bool {
        matches!(
            self.role,
            UserRole::ProjectManager | UserRole::ProjectCoordinator | UserRole::QcTeamLeader
        )
    }

    /// Access to the project hierarchy view.
    pub fn can_view_hierarchy(&self) -> bool {
        self.role == UserRole::ProjectManager
    }
}

impl Entity for User {
    const KIND: EntityKind = EntityKind::User;

    fn id(&self) -> EntityId {
        self.id
    }

    fn label(&self) -> String {
        self.name.clone()
    }
}
