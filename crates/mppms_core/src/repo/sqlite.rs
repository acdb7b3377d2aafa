//! SQLite record backend.
//!
//! # Responsibility
//! - Persist normalized records in entity tables plus junction tables.
//! - Keep SQL details inside the persistence boundary.
//!
//! # Invariants
//! - Connections must be migrated (`open_db`/`open_db_in_memory`).
//! - Each `put_*` rewrites the row and its junction rows in one transaction.
//! - Junction rows are read back ordered by `position`.

use crate::db::migrations::ensure_current;
use crate::model::entity::{EntityId, EntityKind};
use crate::model::priority::Priority;
use crate::model::task::TaskStatus;
use crate::model::user::UserRole;
use crate::repo::records::{
    AssetRecord, ComponentRecord, ProjectRecord, RecordBackend, TaskRecord, UserRecord,
};
use crate::repo::store::{RepoError, RepoResult};
use rusqlite::{params, Connection, OptionalExtension, Row};

/// One association table: owner column, member column.
struct Junction {
    table: &'static str,
    owner: &'static str,
    member: &'static str,
}

const PROJECT_TEAM: Junction = Junction {
    table: "project_team",
    owner: "project_id",
    member: "user_id",
};
const PROJECT_TASKS: Junction = Junction {
    table: "project_tasks",
    owner: "project_id",
    member: "task_id",
};
const PROJECT_COMPONENTS: Junction = Junction {
    table: "project_components",
    owner: "project_id",
    member: "component_id",
};
const TASK_ASSIGNEES: Junction = Junction {
    table: "task_assignees",
    owner: "task_id",
    member: "user_id",
};
const TASK_ASSETS: Junction = Junction {
    table: "task_assets",
    owner: "task_id",
    member: "asset_id",
};
const COMPONENT_ASSETS: Junction = Junction {
    table: "component_assets",
    owner: "component_id",
    member: "asset_id",
};

/// SQLite-backed record storage owning its connection.
pub struct SqliteBackend {
    conn: Connection,
}

impl SqliteBackend {
    /// Wraps a migrated connection.
    ///
    /// Fails with `DbError::SchemaMismatch` when the connection is not at
    /// the latest schema version.
    pub fn try_new(conn: Connection) -> RepoResult<Self> {
        ensure_current(&conn)?;
        Ok(Self { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    fn members(&self, junction: &Junction, owner: EntityId) -> RepoResult<Vec<EntityId>> {
        let sql = format!(
            "SELECT {member} FROM {table} WHERE {owner} = ?1 ORDER BY position ASC;",
            member = junction.member,
            table = junction.table,
            owner = junction.owner,
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query([owner.value()])?;
        let mut ids = Vec::new();
        while let Some(row) = rows.next()? {
            ids.push(EntityId(row.get(0)?));
        }
        Ok(ids)
    }

    fn replace_members(
        &self,
        junction: &Junction,
        owner: EntityId,
        members: &[EntityId],
    ) -> RepoResult<()> {
        self.conn.execute(
            &format!(
                "DELETE FROM {table} WHERE {owner} = ?1;",
                table = junction.table,
                owner = junction.owner,
            ),
            [owner.value()],
        )?;
        let insert = format!(
            "INSERT INTO {table} ({owner}, {member}, position) VALUES (?1, ?2, ?3);",
            table = junction.table,
            owner = junction.owner,
            member = junction.member,
        );
        let mut stmt = self.conn.prepare(&insert)?;
        for (position, member) in members.iter().enumerate() {
            stmt.execute(params![owner.value(), member.value(), position as i64])?;
        }
        Ok(())
    }

    /// Runs an insert (draft) or update (persisted) and returns the row id.
    fn upsert_row(
        &self,
        kind: EntityKind,
        id: EntityId,
        insert: impl FnOnce(&Connection) -> rusqlite::Result<usize>,
        update: impl FnOnce(&Connection) -> rusqlite::Result<usize>,
    ) -> RepoResult<EntityId> {
        if id.is_draft() {
            insert(&self.conn)?;
            return Ok(EntityId(self.conn.last_insert_rowid()));
        }
        if update(&self.conn)? == 0 {
            return Err(RepoError::NotFound { kind, id });
        }
        Ok(id)
    }
}

fn table_for(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::User => "users",
        EntityKind::Asset => "assets",
        EntityKind::Component => "components",
        EntityKind::Task => "tasks",
        EntityKind::Project => "projects",
    }
}

fn parse_text<T>(row: &Row<'_>, column: &str, parse: fn(&str) -> Option<T>) -> RepoResult<T> {
    let text: String = row.get(column)?;
    parse(&text).ok_or_else(|| RepoError::InvalidData(format!("invalid {column} value `{text}`")))
}

impl RecordBackend for SqliteBackend {
    fn list_ids(&self, kind: EntityKind) -> RepoResult<Vec<EntityId>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT id FROM {} ORDER BY id ASC;", table_for(kind)))?;
        let mut rows = stmt.query([])?;
        let mut ids = Vec::new();
        while let Some(row) = rows.next()? {
            ids.push(EntityId(row.get(0)?));
        }
        Ok(ids)
    }

    fn exists(&self, kind: EntityKind, id: EntityId) -> RepoResult<bool> {
        let found: i64 = self.conn.query_row(
            &format!(
                "SELECT EXISTS(SELECT 1 FROM {} WHERE id = ?1);",
                table_for(kind)
            ),
            [id.value()],
            |row| row.get(0),
        )?;
        Ok(found == 1)
    }

    fn user(&self, id: EntityId) -> RepoResult<Option<UserRecord>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, role FROM users WHERE id = ?1;")?;
        let mut rows = stmt.query([id.value()])?;
        let Some(row) = rows.next()? else {
            return Ok(None);
        };
        Ok(Some(UserRecord {
            id,
            name: row.get("name")?,
            role: parse_text(row, "role", UserRole::parse)?,
        }))
    }

    fn asset(&self, id: EntityId) -> RepoResult<Option<AssetRecord>> {
        let record = self
            .conn
            .query_row(
                "SELECT name, asset_type, location FROM assets WHERE id = ?1;",
                [id.value()],
                |row| {
                    Ok(AssetRecord {
                        id,
                        name: row.get("name")?,
                        asset_type: row.get("asset_type")?,
                        location: row.get("location")?,
                    })
                },
            )
            .optional()?;
        Ok(record)
    }

    fn component(&self, id: EntityId) -> RepoResult<Option<ComponentRecord>> {
        let description: Option<String> = self
            .conn
            .query_row(
                "SELECT description FROM components WHERE id = ?1;",
                [id.value()],
                |row| row.get(0),
            )
            .optional()?;
        let Some(description) = description else {
            return Ok(None);
        };
        Ok(Some(ComponentRecord {
            id,
            description,
            asset_ids: self.members(&COMPONENT_ASSETS, id)?,
        }))
    }

    fn task(&self, id: EntityId) -> RepoResult<Option<TaskRecord>> {
        let mut stmt = self
            .conn
            .prepare("SELECT title, status, priority, report FROM tasks WHERE id = ?1;")?;
        let mut rows = stmt.query([id.value()])?;
        let Some(row) = rows.next()? else {
            return Ok(None);
        };
        Ok(Some(TaskRecord {
            id,
            title: row.get("title")?,
            status: parse_text(row, "status", TaskStatus::parse)?,
            priority: parse_text(row, "priority", Priority::parse)?,
            report: row.get("report")?,
            assignee_ids: self.members(&TASK_ASSIGNEES, id)?,
            asset_ids: self.members(&TASK_ASSETS, id)?,
        }))
    }

    fn project(&self, id: EntityId) -> RepoResult<Option<ProjectRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT title, created_at, deadline, priority, manager_id, coordinator_id
             FROM projects
             WHERE id = ?1;",
        )?;
        let mut rows = stmt.query([id.value()])?;
        let Some(row) = rows.next()? else {
            return Ok(None);
        };
        Ok(Some(ProjectRecord {
            id,
            title: row.get("title")?,
            created_at: row.get("created_at")?,
            deadline: row.get("deadline")?,
            priority: parse_text(row, "priority", Priority::parse)?,
            manager_id: row.get::<_, Option<i64>>("manager_id")?.map(EntityId),
            coordinator_id: row.get::<_, Option<i64>>("coordinator_id")?.map(EntityId),
            team_ids: self.members(&PROJECT_TEAM, id)?,
            task_ids: self.members(&PROJECT_TASKS, id)?,
            component_ids: self.members(&PROJECT_COMPONENTS, id)?,
        }))
    }

    fn put_user(&self, record: &UserRecord) -> RepoResult<EntityId> {
        self.upsert_row(
            EntityKind::User,
            record.id,
            |conn| {
                conn.execute(
                    "INSERT INTO users (name, role) VALUES (?1, ?2);",
                    params![record.name, record.role.as_str()],
                )
            },
            |conn| {
                conn.execute(
                    "UPDATE users SET name = ?1, role = ?2 WHERE id = ?3;",
                    params![record.name, record.role.as_str(), record.id.value()],
                )
            },
        )
    }

    fn put_asset(&self, record: &AssetRecord) -> RepoResult<EntityId> {
        self.upsert_row(
            EntityKind::Asset,
            record.id,
            |conn| {
                conn.execute(
                    "INSERT INTO assets (name, asset_type, location) VALUES (?1, ?2, ?3);",
                    params![record.name, record.asset_type, record.location],
                )
            },
            |conn| {
                conn.execute(
                    "UPDATE assets SET name = ?1, asset_type = ?2, location = ?3 WHERE id = ?4;",
                    params![
                        record.name,
                        record.asset_type,
                        record.location,
                        record.id.value()
                    ],
                )
            },
        )
    }

    fn put_component(&self, record: &ComponentRecord) -> RepoResult<EntityId> {
        let tx = self.conn.unchecked_transaction()?;
        let id = self.upsert_row(
            EntityKind::Component,
            record.id,
            |conn| {
                conn.execute(
                    "INSERT INTO components (description) VALUES (?1);",
                    [record.description.as_str()],
                )
            },
            |conn| {
                conn.execute(
                    "UPDATE components SET description = ?1 WHERE id = ?2;",
                    params![record.description, record.id.value()],
                )
            },
        )?;
        self.replace_members(&COMPONENT_ASSETS, id, &record.asset_ids)?;
        tx.commit()?;
        Ok(id)
    }

    fn put_task(&self, record: &TaskRecord) -> RepoResult<EntityId> {
        let tx = self.conn.unchecked_transaction()?;
        let id = self.upsert_row(
            EntityKind::Task,
            record.id,
            |conn| {
                conn.execute(
                    "INSERT INTO tasks (title, status, priority, report) VALUES (?1, ?2, ?3, ?4);",
                    params![
                        record.title,
                        record.status.as_str(),
                        record.priority.as_str(),
                        record.report
                    ],
                )
            },
            |conn| {
                conn.execute(
                    "UPDATE tasks SET title = ?1, status = ?2, priority = ?3, report = ?4
                     WHERE id = ?5;",
                    params![
                        record.title,
                        record.status.as_str(),
                        record.priority.as_str(),
                        record.report,
                        record.id.value()
                    ],
                )
            },
        )?;
        self.replace_members(&TASK_ASSIGNEES, id, &record.assignee_ids)?;
        self.replace_members(&TASK_ASSETS, id, &record.asset_ids)?;
        tx.commit()?;
        Ok(id)
    }

    fn put_project(&self, record: &ProjectRecord) -> RepoResult<EntityId> {
        let tx = self.conn.unchecked_transaction()?;
        let manager_id = record.manager_id.map(EntityId::value);
        let coordinator_id = record.coordinator_id.map(EntityId::value);
        let id = self.upsert_row(
            EntityKind::Project,
            record.id,
            |conn| {
                conn.execute(
                    "INSERT INTO projects (
                        title, created_at, deadline, priority, manager_id, coordinator_id
                     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
                    params![
                        record.title,
                        record.created_at,
                        record.deadline,
                        record.priority.as_str(),
                        manager_id,
                        coordinator_id
                    ],
                )
            },
            |conn| {
                conn.execute(
                    "UPDATE projects
                     SET title = ?1, created_at = ?2, deadline = ?3, priority = ?4,
                         manager_id = ?5, coordinator_id = ?6
                     WHERE id = ?7;",
                    params![
                        record.title,
                        record.created_at,
                        record.deadline,
                        record.priority.as_str(),
                        manager_id,
                        coordinator_id,
                        record.id.value()
                    ],
                )
            },
        )?;
        self.replace_members(&PROJECT_TEAM, id, &record.team_ids)?;
        self.replace_members(&PROJECT_TASKS, id, &record.task_ids)?;
        self.replace_members(&PROJECT_COMPONENTS, id, &record.component_ids)?;
        tx.commit()?;
        Ok(id)
    }

    fn delete(&self, kind: EntityKind, id: EntityId) -> RepoResult<()> {
        let changed = self.conn.execute(
            &format!("DELETE FROM {} WHERE id = ?1;", table_for(kind)),
            [id.value()],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound { kind, id });
        }
        Ok(())
    }
}
