//! Normalized persistence records and backend contract.
//!
//! # Responsibility
//! - Describe entities as they are stored: scalars plus association ids.
//! - Define the record-level CRUD surface every storage backend provides.
//!
//! # Invariants
//! - Association id lists preserve insertion order and contain no duplicates.
//! - `put_*` with a draft id inserts and assigns a fresh id; otherwise it
//!   replaces the row and returns `NotFound` when absent.
//! - `delete` removes the row and every association referencing it.

use crate::model::asset::Asset;
use crate::model::component::Component;
use crate::model::entity::{Entity, EntityId, EntityKind};
use crate::model::priority::Priority;
use crate::model::project::Project;
use crate::model::set::EntitySet;
use crate::model::task::{Task, TaskStatus};
use crate::model::user::{User, UserRole};
use crate::repo::store::{RepoError, RepoResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub id: EntityId,
    pub name: String,
    pub role: UserRole,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetRecord {
    pub id: EntityId,
    pub name: String,
    pub asset_type: String,
    pub location: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentRecord {
    pub id: EntityId,
    pub description: String,
    pub asset_ids: Vec<EntityId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRecord {
    pub id: EntityId,
    pub title: String,
    pub status: TaskStatus,
    pub priority: Priority,
    pub report: String,
    pub assignee_ids: Vec<EntityId>,
    pub asset_ids: Vec<EntityId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectRecord {
    pub id: EntityId,
    pub title: String,
    pub created_at: i64,
    pub deadline: Option<i64>,
    pub priority: Priority,
    pub manager_id: Option<EntityId>,
    pub coordinator_id: Option<EntityId>,
    pub team_ids: Vec<EntityId>,
    pub task_ids: Vec<EntityId>,
    pub component_ids: Vec<EntityId>,
}

/// Record-level storage surface implemented by each backend.
///
/// All methods take `&self`; backends use interior mutability or
/// connection-level transactions.
pub trait RecordBackend {
    /// Ids of every row of `kind`, ascending.
    fn list_ids(&self, kind: EntityKind) -> RepoResult<Vec<EntityId>>;
    fn exists(&self, kind: EntityKind, id: EntityId) -> RepoResult<bool>;

    fn user(&self, id: EntityId) -> RepoResult<Option<UserRecord>>;
    fn asset(&self, id: EntityId) -> RepoResult<Option<AssetRecord>>;
    fn component(&self, id: EntityId) -> RepoResult<Option<ComponentRecord>>;
    fn task(&self, id: EntityId) -> RepoResult<Option<TaskRecord>>;
    fn project(&self, id: EntityId) -> RepoResult<Option<ProjectRecord>>;

    fn put_user(&self, record: &UserRecord) -> RepoResult<EntityId>;
    fn put_asset(&self, record: &AssetRecord) -> RepoResult<EntityId>;
    fn put_component(&self, record: &ComponentRecord) -> RepoResult<EntityId>;
    fn put_task(&self, record: &TaskRecord) -> RepoResult<EntityId>;
    fn put_project(&self, record: &ProjectRecord) -> RepoResult<EntityId>;

    fn delete(&self, kind: EntityKind, id: EntityId) -> RepoResult<()>;
}

impl From<&User> for UserRecord {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            role: user.role,
        }
    }
}

impl From<UserRecord> for User {
    fn from(record: UserRecord) -> Self {
        Self {
            id: record.id,
            name: record.name,
            role: record.role,
        }
    }
}

impl From<&Asset> for AssetRecord {
    fn from(asset: &Asset) -> Self {
        Self {
            id: asset.id,
            name: asset.name.clone(),
            asset_type: asset.asset_type.clone(),
            location: asset.location.clone(),
        }
    }
}

impl From<AssetRecord> for Asset {
    fn from(record: AssetRecord) -> Self {
        Self {
            id: record.id,
            name: record.name,
            asset_type: record.asset_type,
            location: record.location,
        }
    }
}

impl ComponentRecord {
    pub fn from_entity(component: &Component) -> RepoResult<Self> {
        Ok(Self {
            id: component.id,
            description: component.description.clone(),
            asset_ids: association_ids(&component.assets)?,
        })
    }
}

impl TaskRecord {
    pub fn from_entity(task: &Task) -> RepoResult<Self> {
        Ok(Self {
            id: task.id,
            title: task.title.clone(),
            status: task.status,
            priority: task.priority,
            report: task.report.clone(),
            assignee_ids: association_ids(&task.assigned_to)?,
            asset_ids: association_ids(&task.assets)?,
        })
    }
}

impl ProjectRecord {
    pub fn from_entity(project: &Project) -> RepoResult<Self> {
        project.validate().map_err(RepoError::Validation)?;
        Ok(Self {
            id: project.id,
            title: project.title.clone(),
            created_at: project.created_at,
            deadline: project.deadline,
            priority: project.priority,
            manager_id: optional_reference(project.manager.as_ref())?,
            coordinator_id: optional_reference(project.coordinator.as_ref())?,
            team_ids: association_ids(&project.team)?,
            task_ids: association_ids(&project.tasks)?,
            component_ids: association_ids(&project.components)?,
        })
    }
}

/// Converts an association set to stored ids, rejecting drafts.
fn association_ids<T: Entity>(set: &EntitySet<T>) -> RepoResult<Vec<EntityId>> {
    set.iter()
        .map(|entity| {
            if entity.is_draft() {
                Err(RepoError::DraftReference { kind: T::KIND })
            } else {
                Ok(entity.id())
            }
        })
        .collect()
}

fn optional_reference<T: Entity>(entity: Option<&T>) -> RepoResult<Option<EntityId>> {
    match entity {
        Some(entity) if entity.is_draft() => Err(RepoError::DraftReference { kind: T::KIND }),
        Some(entity) => Ok(Some(entity.id())),
        None => Ok(None),
    }
}
