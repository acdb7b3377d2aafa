//! Data-access collaborator: contracts, record backends and access policy.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts (`Repository<T>`,
//!   `DataAccess`).
//! - Isolate storage details (SQLite or in-memory) behind `RecordBackend`.
//!
//! # Invariants
//! - Repository APIs return semantic errors (`NotFound`, `DraftReference`) in
//!   addition to storage transport errors.
//! - Every load returns a fresh snapshot; no entity cache is shared between
//!   callers.

pub mod access;
pub mod memory;
pub mod records;
pub mod sqlite;
pub mod store;

use crate::db::{open_db, open_db_in_memory};
use memory::MemoryBackend;
use sqlite::SqliteBackend;
use std::path::Path;
use store::{RepoResult, Store};

pub type MemoryStore = Store<MemoryBackend>;
pub type SqliteStore = Store<SqliteBackend>;

impl MemoryStore {
    pub fn in_memory() -> Self {
        Store::new(MemoryBackend::new())
    }
}

impl SqliteStore {
    /// Opens (and migrates) a SQLite file store.
    pub fn open(path: impl AsRef<Path>) -> RepoResult<Self> {
        Ok(Store::new(SqliteBackend::try_new(open_db(path)?)?))
    }

    /// Opens a migrated in-memory SQLite store.
    pub fn open_in_memory() -> RepoResult<Self> {
        Ok(Store::new(SqliteBackend::try_new(open_db_in_memory()?)?))
    }
}
