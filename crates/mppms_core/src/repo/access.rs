//! Permission-filtered project and task scopes.
//!
//! # Invariants
//! - Input order is preserved; filters never re-sort.
//! - Project managers see every project.

use crate::model::entity::Entity;
use crate::model::project::Project;
use crate::model::set::EntitySet;
use crate::model::task::Task;
use crate::model::user::{User, UserRole};

/// Projects `user` may open.
pub fn visible_projects(all: Vec<Project>, user: &User) -> Vec<Project> {
    if user.role == UserRole::ProjectManager {
        return all;
    }
    all.into_iter()
        .filter(|project| project.involves(user))
        .collect()
}

/// Tasks belonging to `projects` or assigned to `user`, in `all` order.
pub fn visible_tasks(all: Vec<Task>, projects: &[Project], user: &User) -> Vec<Task> {
    let scoped: EntitySet<Task> = projects
        .iter()
        .flat_map(|project| project.tasks.iter().cloned())
        .collect();
    all.into_iter()
        .filter(|task| scoped.contains_id(task.id()) || task.assigned_to.contains(user))
        .collect()
}
