//! In-process record backend.
//!
//! # Responsibility
//! - Back tests and demos with the same record semantics as SQLite.
//!
//! # Invariants
//! - Ids are assigned per kind, starting at 1, never reused.
//! - Deleting a row scrubs it from every association list and to-one slot.

use crate::model::entity::{EntityId, EntityKind};
use crate::repo::records::{
    AssetRecord, ComponentRecord, ProjectRecord, RecordBackend, TaskRecord, UserRecord,
};
use crate::repo::store::{RepoError, RepoResult};
use std::cell::RefCell;
use std::collections::BTreeMap;

#[derive(Debug, Default)]
struct Tables {
    users: BTreeMap<EntityId, UserRecord>,
    assets: BTreeMap<EntityId, AssetRecord>,
    components: BTreeMap<EntityId, ComponentRecord>,
    tasks: BTreeMap<EntityId, TaskRecord>,
    projects: BTreeMap<EntityId, ProjectRecord>,
    next_ids: BTreeMap<EntityKind, i64>,
}

/// `RefCell`-backed tables; single-threaded by construction.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    tables: RefCell<Tables>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Inserts a draft record under a fresh id or replaces an existing one.
fn upsert<R: Clone>(
    table: &mut BTreeMap<EntityId, R>,
    kind: EntityKind,
    id: EntityId,
    record: &R,
    assign: impl FnOnce() -> EntityId,
    with_id: impl FnOnce(&R, EntityId) -> R,
) -> RepoResult<EntityId> {
    if id.is_draft() {
        let id = assign();
        table.insert(id, with_id(record, id));
        return Ok(id);
    }
    match table.get_mut(&id) {
        Some(row) => {
            *row = record.clone();
            Ok(id)
        }
        None => Err(RepoError::NotFound { kind, id }),
    }
}

fn scrub(ids: &mut Vec<EntityId>, removed: EntityId) {
    ids.retain(|id| *id != removed);
}

impl RecordBackend for MemoryBackend {
    fn list_ids(&self, kind: EntityKind) -> RepoResult<Vec<EntityId>> {
        let tables = self.tables.borrow();
        let ids = match kind {
            EntityKind::User => tables.users.keys().copied().collect(),
            EntityKind::Asset => tables.assets.keys().copied().collect(),
            EntityKind::Component => tables.components.keys().copied().collect(),
            EntityKind::Task => tables.tasks.keys().copied().collect(),
            EntityKind::Project => tables.projects.keys().copied().collect(),
        };
        Ok(ids)
    }

    fn exists(&self, kind: EntityKind, id: EntityId) -> RepoResult<bool> {
        let tables = self.tables.borrow();
        let found = match kind {
            EntityKind::User => tables.users.contains_key(&id),
            EntityKind::Asset => tables.assets.contains_key(&id),
            EntityKind::Component => tables.components.contains_key(&id),
            EntityKind::Task => tables.tasks.contains_key(&id),
            EntityKind::Project => tables.projects.contains_key(&id),
        };
        Ok(found)
    }

    fn user(&self, id: EntityId) -> RepoResult<Option<UserRecord>> {
        Ok(self.tables.borrow().users.get(&id).cloned())
    }

    fn asset(&self, id: EntityId) -> RepoResult<Option<AssetRecord>> {
        Ok(self.tables.borrow().assets.get(&id).cloned())
    }

    fn component(&self, id: EntityId) -> RepoResult<Option<ComponentRecord>> {
        Ok(self.tables.borrow().components.get(&id).cloned())
    }

    fn task(&self, id: EntityId) -> RepoResult<Option<TaskRecord>> {
        Ok(self.tables.borrow().tasks.get(&id).cloned())
    }

    fn project(&self, id: EntityId) -> RepoResult<Option<ProjectRecord>> {
        Ok(self.tables.borrow().projects.get(&id).cloned())
    }

    fn put_user(&self, record: &UserRecord) -> RepoResult<EntityId> {
        let mut guard = self.tables.borrow_mut();
        let tables = &mut *guard;
        let next_ids = &mut tables.next_ids;
        upsert(
            &mut tables.users,
            EntityKind::User,
            record.id,
            record,
            || allocate_in(next_ids, EntityKind::User),
            |r, id| UserRecord { id, ..r.clone() },
        )
    }

    fn put_asset(&self, record: &AssetRecord) -> RepoResult<EntityId> {
        let mut guard = self.tables.borrow_mut();
        let tables = &mut *guard;
        let next_ids = &mut tables.next_ids;
        upsert(
            &mut tables.assets,
            EntityKind::Asset,
            record.id,
            record,
            || allocate_in(next_ids, EntityKind::Asset),
            |r, id| AssetRecord { id, ..r.clone() },
        )
    }

    fn put_component(&self, record: &ComponentRecord) -> RepoResult<EntityId> {
        let mut guard = self.tables.borrow_mut();
        let tables = &mut *guard;
        let next_ids = &mut tables.next_ids;
        upsert(
            &mut tables.components,
            EntityKind::Component,
            record.id,
            record,
            || allocate_in(next_ids, EntityKind::Component),
            |r, id| ComponentRecord { id, ..r.clone() },
        )
    }

    fn put_task(&self, record: &TaskRecord) -> RepoResult<EntityId> {
        let mut guard = self.tables.borrow_mut();
        let tables = &mut *guard;
        let next_ids = &mut tables.next_ids;
        upsert(
            &mut tables.tasks,
            EntityKind::Task,
            record.id,
            record,
            || allocate_in(next_ids, EntityKind::Task),
            |r, id| TaskRecord { id, ..r.clone() },
        )
    }

    fn put_project(&self, record: &ProjectRecord) -> RepoResult<EntityId> {
        let mut guard = self.tables.borrow_mut();
        let tables = &mut *guard;
        let next_ids = &mut tables.next_ids;
        upsert(
            &mut tables.projects,
            EntityKind::Project,
            record.id,
            record,
            || allocate_in(next_ids, EntityKind::Project),
            |r, id| ProjectRecord { id, ..r.clone() },
        )
    }

    fn delete(&self, kind: EntityKind, id: EntityId) -> RepoResult<()> {
        let mut tables = self.tables.borrow_mut();
        let removed = match kind {
            EntityKind::User => tables.users.remove(&id).is_some(),
            EntityKind::Asset => tables.assets.remove(&id).is_some(),
            EntityKind::Component => tables.components.remove(&id).is_some(),
            EntityKind::Task => tables.tasks.remove(&id).is_some(),
            EntityKind::Project => tables.projects.remove(&id).is_some(),
        };
        if !removed {
            return Err(RepoError::NotFound { kind, id });
        }

        match kind {
            EntityKind::User => {
                for task in tables.tasks.values_mut() {
                    scrub(&mut task.assignee_ids, id);
                }
                for project in tables.projects.values_mut() {
                    scrub(&mut project.team_ids, id);
                    if project.manager_id == Some(id) {
                        project.manager_id = None;
                    }
                    if project.coordinator_id == Some(id) {
                        project.coordinator_id = None;
                    }
                }
            }
            EntityKind::Asset => {
                for task in tables.tasks.values_mut() {
                    scrub(&mut task.asset_ids, id);
                }
                for component in tables.components.values_mut() {
                    scrub(&mut component.asset_ids, id);
                }
            }
            EntityKind::Component => {
                for project in tables.projects.values_mut() {
                    scrub(&mut project.component_ids, id);
                }
            }
            EntityKind::Task => {
                for project in tables.projects.values_mut() {
                    scrub(&mut project.task_ids, id);
                }
            }
            EntityKind::Project => {}
        }
        Ok(())
    }
}

fn allocate_in(next_ids: &mut BTreeMap<EntityKind, i64>, kind: EntityKind) -> EntityId {
    let next = next_ids.entry(kind).or_insert(1);
    let id = EntityId(*next);
    *next += 1;
    id
}
