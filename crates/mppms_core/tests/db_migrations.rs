use mppms_core::db::migrations::latest_version;
use mppms_core::db::{open_db, open_db_in_memory, DbError};
use mppms_core::repo::sqlite::SqliteBackend;
use mppms_core::RepoError;
use rusqlite::Connection;

const TABLES: [&str; 11] = [
    "users",
    "assets",
    "components",
    "tasks",
    "projects",
    "project_team",
    "project_tasks",
    "project_components",
    "task_assignees",
    "task_assets",
    "component_assets",
];

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    for table in TABLES {
        assert_table_exists(&conn, table);
    }
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mppms.db");

    let conn_first = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_first), latest_version());
    drop(conn_first);

    let conn_second = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_second), latest_version());
    assert_table_exists(&conn_second, "project_tasks");
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let err = open_db(&path).unwrap_err();
    match err {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn reversed_project_deadline_is_rejected_by_schema() {
    let conn = open_db_in_memory().unwrap();

    let result = conn.execute(
        "INSERT INTO projects (title, created_at, deadline, priority)
         VALUES ('late', 2000, 1000, 'medium');",
        [],
    );

    assert!(result.is_err());
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "table {table_name} does not exist");
}

#[test]
fn record_backend_refuses_unmigrated_connection() {
    let conn = Connection::open_in_memory().unwrap();

    let err = match SqliteBackend::try_new(conn) {
        Ok(_) => panic!("unmigrated connection accepted"),
        Err(err) => err,
    };
    match err {
        RepoError::Db(DbError::SchemaMismatch { found, expected }) => {
            assert_eq!(found, 0);
            assert_eq!(expected, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}
