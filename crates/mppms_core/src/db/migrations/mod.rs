//! Ordered schema migrations.
//!
//! Versions are strictly increasing; all pending steps run inside one
//! transaction and each step bumps `PRAGMA user_version`.

use crate::db::{DbError, DbResult};
use log::{error, info};
use rusqlite::Connection;

#[derive(Debug, Clone, Copy)]
struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "entities",
        sql: include_str!("0001_entities.sql"),
    },
    Migration {
        version: 2,
        name: "associations",
        sql: include_str!("0002_associations.sql"),
    },
];

pub fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |migration| migration.version)
}

/// Current `PRAGMA user_version` of the connection.
pub fn schema_version(conn: &Connection) -> DbResult<u32> {
    let version = conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?;
    Ok(version)
}

/// Versions that [`apply_migrations`] would run, ascending.
pub fn pending_versions(conn: &Connection) -> DbResult<Vec<u32>> {
    let current = checked_version(conn)?;
    Ok(MIGRATIONS
        .iter()
        .filter(|migration| migration.version > current)
        .map(|migration| migration.version)
        .collect())
}

/// Fails unless the connection is at exactly [`latest_version`].
pub fn ensure_current(conn: &Connection) -> DbResult<()> {
    let found = schema_version(conn)?;
    let expected = latest_version();
    if found != expected {
        return Err(DbError::SchemaMismatch { found, expected });
    }
    Ok(())
}

/// Applies all pending migrations on the provided connection.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    let current = checked_version(conn)?;
    let latest = latest_version();
    if current == latest {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for migration in MIGRATIONS.iter().filter(|m| m.version > current) {
        let step = tx.execute_batch(migration.sql).and_then(|()| {
            tx.execute_batch(&format!("PRAGMA user_version = {};", migration.version))
        });
        if let Err(source) = step {
            error!(
                "event=db_migrate module=db status=error version={} name={} error={source}",
                migration.version, migration.name
            );
            return Err(DbError::Migration {
                version: migration.version,
                name: migration.name,
                source,
            });
        }
        info!(
            "event=db_migrate module=db status=applied version={} name={}",
            migration.version, migration.name
        );
    }
    tx.commit()?;

    info!("event=db_migrate module=db status=ok from_version={current} to_version={latest}");
    Ok(())
}

fn checked_version(conn: &Connection) -> DbResult<u32> {
    let current = schema_version(conn)?;
    let latest = latest_version();
    if current > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: current,
            latest_supported: latest,
        });
    }
    Ok(current)
}

#[cfg(test)]
mod tests {
    use super::{apply_migrations, ensure_current, latest_version, pending_versions};
    use crate::db::DbError;
    use rusqlite::Connection;

    #[test]
    fn fresh_connection_has_every_version_pending() {
        let conn = Connection::open_in_memory().unwrap();
        assert_eq!(pending_versions(&conn).unwrap(), vec![1, 2]);
        assert!(matches!(
            ensure_current(&conn).unwrap_err(),
            DbError::SchemaMismatch {
                found: 0,
                expected: 2
            }
        ));
    }

    #[test]
    fn partially_migrated_connection_only_runs_remaining_steps() {
        let mut conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(include_str!("0001_entities.sql"))
            .unwrap();
        conn.execute_batch("PRAGMA user_version = 1;").unwrap();

        assert_eq!(pending_versions(&conn).unwrap(), vec![2]);
        apply_migrations(&mut conn).unwrap();
        assert!(pending_versions(&conn).unwrap().is_empty());
        ensure_current(&conn).unwrap();
        assert_eq!(latest_version(), 2);
    }
}
