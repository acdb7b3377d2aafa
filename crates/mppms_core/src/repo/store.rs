//! Data-access contracts and the materializing entity store.
//!
//! # Responsibility
//! - Define `Repository<T>` per entity type and the `DataAccess` bundle the
//!   controllers depend on.
//! - Turn normalized backend records into full entity snapshots, and
//!   entity values back into records on save.
//!
//! # Invariants
//! - `save` never persists an association pointing at a draft or a missing
//!   row.
//! - `save` returns the entity re-loaded by id, never the caller's value.
//! - `load_all` is ordered by ascending id.

use crate::db::DbError;
use crate::model::asset::Asset;
use crate::model::component::Component;
use crate::model::entity::{Entity, EntityId, EntityKind};
use crate::model::project::Project;
use crate::model::set::EntitySet;
use crate::model::task::Task;
use crate::model::user::{User, UserRole};
use crate::repo::access;
use crate::repo::records::{
    AssetRecord, ComponentRecord, ProjectRecord, RecordBackend, TaskRecord, UserRecord,
};
use log::{error, info};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RepoResult<T> = Result<T, RepoError>;

/// Data-access error surfaced to controllers.
#[derive(Debug)]
pub enum RepoError {
    /// Requested id does not exist in the backing store.
    NotFound { kind: EntityKind, id: EntityId },
    /// Association or to-one slot references an unpersisted entity.
    DraftReference { kind: EntityKind },
    /// Entity scalar invariants rejected.
    Validation(String),
    /// Persisted state cannot be converted to a valid entity.
    InvalidData(String),
    Db(DbError),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound { kind, id } => write!(f, "{kind} not found: {id}"),
            Self::DraftReference { kind } => {
                write!(f, "association references an unsaved {kind}")
            }
            Self::Validation(message) => write!(f, "validation failed: {message}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
            Self::Db(err) => write!(f, "{err}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl RepoError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Per-type data-access contract.
pub trait Repository<T: Entity> {
    /// Every entity of this type, ascending by id.
    fn load_all(&self) -> RepoResult<Vec<T>>;
    /// Fails with `RepoError::NotFound` when `id` is unknown.
    fn load_by_id(&self, id: EntityId) -> RepoResult<T>;
    /// Persists `entity` and returns the re-loaded value with its id.
    fn save(&self, entity: &T) -> RepoResult<T>;
    /// Removes the row and every association referencing it.
    fn delete(&self, id: EntityId) -> RepoResult<()>;
}

/// Everything a controller needs from the data-access collaborator.
pub trait DataAccess:
    Repository<Project> + Repository<Task> + Repository<Component> + Repository<Asset> + Repository<User>
{
    /// Projects visible to `user`, in store order.
    fn projects_for_user(&self, user: &User) -> RepoResult<Vec<Project>> {
        let all = Repository::<Project>::load_all(self)?;
        Ok(access::visible_projects(all, user))
    }

    /// Tasks of visible projects plus tasks assigned to `user`.
    fn tasks_for_user(&self, user: &User) -> RepoResult<Vec<Task>> {
        let projects = self.projects_for_user(user)?;
        let all = Repository::<Task>::load_all(self)?;
        Ok(access::visible_tasks(all, &projects, user))
    }

    fn users_by_role(&self, role: UserRole) -> RepoResult<Vec<User>> {
        let all = Repository::<User>::load_all(self)?;
        Ok(all.into_iter().filter(|user| user.role == role).collect())
    }
}

/// Entity store over a record backend.
pub struct Store<B: RecordBackend> {
    backend: B,
}

impl<B: RecordBackend> Store<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn materialize_user(&self, id: EntityId) -> RepoResult<User> {
        self.backend
            .user(id)?
            .map(User::from)
            .ok_or(RepoError::NotFound {
                kind: EntityKind::User,
                id,
            })
    }

    fn materialize_asset(&self, id: EntityId) -> RepoResult<Asset> {
        self.backend
            .asset(id)?
            .map(Asset::from)
            .ok_or(RepoError::NotFound {
                kind: EntityKind::Asset,
                id,
            })
    }

    fn materialize_component(&self, id: EntityId) -> RepoResult<Component> {
        let record = self.backend.component(id)?.ok_or(RepoError::NotFound {
            kind: EntityKind::Component,
            id,
        })?;
        Ok(Component {
            id: record.id,
            description: record.description,
            assets: self.referenced(&record.asset_ids, Self::materialize_asset)?,
        })
    }

    fn materialize_task(&self, id: EntityId) -> RepoResult<Task> {
        let record = self.backend.task(id)?.ok_or(RepoError::NotFound {
            kind: EntityKind::Task,
            id,
        })?;
        Ok(Task {
            id: record.id,
            title: record.title,
            status: record.status,
            priority: record.priority,
            report: record.report,
            assigned_to: self.referenced(&record.assignee_ids, Self::materialize_user)?,
            assets: self.referenced(&record.asset_ids, Self::materialize_asset)?,
        })
    }

    fn materialize_project(&self, id: EntityId) -> RepoResult<Project> {
        let record = self.backend.project(id)?.ok_or(RepoError::NotFound {
            kind: EntityKind::Project,
            id,
        })?;
        Ok(Project {
            id: record.id,
            title: record.title,
            created_at: record.created_at,
            deadline: record.deadline,
            priority: record.priority,
            manager: record
                .manager_id
                .map(|id| self.dangling_checked(self.materialize_user(id)))
                .transpose()?,
            coordinator: record
                .coordinator_id
                .map(|id| self.dangling_checked(self.materialize_user(id)))
                .transpose()?,
            team: self.referenced(&record.team_ids, Self::materialize_user)?,
            tasks: self.referenced(&record.task_ids, Self::materialize_task)?,
            components: self.referenced(&record.component_ids, Self::materialize_component)?,
        })
    }

    /// Loads every referenced id; a missing row means the backend broke
    /// referential integrity.
    fn referenced<T: Entity>(
        &self,
        ids: &[EntityId],
        load: fn(&Self, EntityId) -> RepoResult<T>,
    ) -> RepoResult<EntitySet<T>> {
        ids.iter()
            .map(|id| self.dangling_checked(load(self, *id)))
            .collect()
    }

    fn dangling_checked<T: Entity>(&self, loaded: RepoResult<T>) -> RepoResult<T> {
        loaded.map_err(|err| match err {
            RepoError::NotFound { kind, id } => {
                RepoError::InvalidData(format!("dangling {kind} reference {id}"))
            }
            other => other,
        })
    }

    fn ensure_exists(&self, kind: EntityKind, ids: &[EntityId]) -> RepoResult<()> {
        for id in ids {
            if !self.backend.exists(kind, *id)? {
                return Err(RepoError::NotFound { kind, id: *id });
            }
        }
        Ok(())
    }

    fn load_every<T: Entity>(
        &self,
        kind: EntityKind,
        load: fn(&Self, EntityId) -> RepoResult<T>,
    ) -> RepoResult<Vec<T>> {
        self.backend
            .list_ids(kind)?
            .into_iter()
            .map(|id| load(self, id))
            .collect()
    }

    fn logged_save<T: Entity>(
        &self,
        entity: &T,
        put: impl FnOnce() -> RepoResult<EntityId>,
        reload: fn(&Self, EntityId) -> RepoResult<T>,
    ) -> RepoResult<T> {
        let created = entity.is_draft();
        match put().and_then(|id| reload(self, id)) {
            Ok(saved) => {
                info!(
                    "event=store_save module=repo status=ok kind={} id={} created={}",
                    T::KIND,
                    saved.id(),
                    created
                );
                Ok(saved)
            }
            Err(err) => {
                error!(
                    "event=store_save module=repo status=error kind={} id={} error={}",
                    T::KIND,
                    entity.id(),
                    err
                );
                Err(err)
            }
        }
    }

    fn logged_delete(&self, kind: EntityKind, id: EntityId) -> RepoResult<()> {
        let result = self.backend.delete(kind, id);
        match &result {
            Ok(()) => info!("event=store_delete module=repo status=ok kind={kind} id={id}"),
            Err(err) => error!(
                "event=store_delete module=repo status=error kind={kind} id={id} error={err}"
            ),
        }
        result
    }
}

impl<B: RecordBackend> Repository<User> for Store<B> {
    fn load_all(&self) -> RepoResult<Vec<User>> {
        self.load_every(EntityKind::User, Self::materialize_user)
    }

    fn load_by_id(&self, id: EntityId) -> RepoResult<User> {
        self.materialize_user(id)
    }

    fn save(&self, entity: &User) -> RepoResult<User> {
        self.logged_save(
            entity,
            || self.backend.put_user(&UserRecord::from(entity)),
            Self::materialize_user,
        )
    }

    fn delete(&self, id: EntityId) -> RepoResult<()> {
        self.logged_delete(EntityKind::User, id)
    }
}

impl<B: RecordBackend> Repository<Asset> for Store<B> {
    fn load_all(&self) -> RepoResult<Vec<Asset>> {
        self.load_every(EntityKind::Asset, Self::materialize_asset)
    }

    fn load_by_id(&self, id: EntityId) -> RepoResult<Asset> {
        self.materialize_asset(id)
    }

    fn save(&self, entity: &Asset) -> RepoResult<Asset> {
        self.logged_save(
            entity,
            || self.backend.put_asset(&AssetRecord::from(entity)),
            Self::materialize_asset,
        )
    }

    fn delete(&self, id: EntityId) -> RepoResult<()> {
        self.logged_delete(EntityKind::Asset, id)
    }
}

impl<B: RecordBackend> Repository<Component> for Store<B> {
    fn load_all(&self) -> RepoResult<Vec<Component>> {
        self.load_every(EntityKind::Component, Self::materialize_component)
    }

    fn load_by_id(&self, id: EntityId) -> RepoResult<Component> {
        self.materialize_component(id)
    }

    fn save(&self, entity: &Component) -> RepoResult<Component> {
        self.logged_save(
            entity,
            || {
                let record = ComponentRecord::from_entity(entity)?;
                self.ensure_exists(EntityKind::Asset, &record.asset_ids)?;
                self.backend.put_component(&record)
            },
            Self::materialize_component,
        )
    }

    fn delete(&self, id: EntityId) -> RepoResult<()> {
        self.logged_delete(EntityKind::Component, id)
    }
}

impl<B: RecordBackend> Repository<Task> for Store<B> {
    fn load_all(&self) -> RepoResult<Vec<Task>> {
        self.load_every(EntityKind::Task, Self::materialize_task)
    }

    fn load_by_id(&self, id: EntityId) -> RepoResult<Task> {
        self.materialize_task(id)
    }

    fn save(&self, entity: &Task) -> RepoResult<Task> {
        self.logged_save(
            entity,
            || {
                let record = TaskRecord::from_entity(entity)?;
                self.ensure_exists(EntityKind::User, &record.assignee_ids)?;
                self.ensure_exists(EntityKind::Asset, &record.asset_ids)?;
                self.backend.put_task(&record)
            },
            Self::materialize_task,
        )
    }

    fn delete(&self, id: EntityId) -> RepoResult<()> {
        self.logged_delete(EntityKind::Task, id)
    }
}

impl<B: RecordBackend> Repository<Project> for Store<B> {
    fn load_all(&self) -> RepoResult<Vec<Project>> {
        self.load_every(EntityKind::Project, Self::materialize_project)
    }

    fn load_by_id(&self, id: EntityId) -> RepoResult<Project> {
        self.materialize_project(id)
    }

    fn save(&self, entity: &Project) -> RepoResult<Project> {
        self.logged_save(
            entity,
            || {
                let record = ProjectRecord::from_entity(entity)?;
                let slots: Vec<EntityId> = record
                    .manager_id
                    .into_iter()
                    .chain(record.coordinator_id)
                    .collect();
                self.ensure_exists(EntityKind::User, &slots)?;
                self.ensure_exists(EntityKind::User, &record.team_ids)?;
                self.ensure_exists(EntityKind::Task, &record.task_ids)?;
                self.ensure_exists(EntityKind::Component, &record.component_ids)?;
                self.backend.put_project(&record)
            },
            Self::materialize_project,
        )
    }

    fn delete(&self, id: EntityId) -> RepoResult<()> {
        self.logged_delete(EntityKind::Project, id)
    }
}

impl<B: RecordBackend> DataAccess for Store<B> {}
