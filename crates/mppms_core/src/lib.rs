//! Core domain logic for MPPMS, the multi-project management system.
//! This crate is the single source of truth for business invariants.

pub mod config;
pub mod controller;
pub mod db;
pub mod events;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod session;

pub use config::{ConfigError, CoreConfig};
pub use controller::{ControllerError, ControllerResult};
pub use events::bus::{ChangeBus, ChangeObserver, DeliveryReport, PublishOutcome, SubscriptionId};
pub use events::{ChangeEvent, Mutation};
pub use logging::{
    default_log_level, init_logging, init_logging_from, logging_status, LogLevel, LoggingError,
};
pub use model::asset::Asset;
pub use model::component::Component;
pub use model::entity::{Entity, EntityId, EntityKind};
pub use model::priority::Priority;
pub use model::project::Project;
pub use model::set::EntitySet;
pub use model::task::{Task, TaskStatus};
pub use model::user::{User, UserRole};
pub use repo::store::{DataAccess, RepoError, RepoResult, Repository, Store};
pub use repo::{MemoryStore, SqliteStore};
pub use service::hierarchy::{HierarchyTree, NodeKey};
pub use session::AppSession;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
