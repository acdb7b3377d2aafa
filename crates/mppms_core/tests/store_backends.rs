mod common;

use common::{assets, component_with, project_with, save, task_with, try_save, user};
use mppms_core::{
    Asset, Component, DataAccess, EntityId, EntityKind, MemoryStore, Project, RepoError,
    Repository, SqliteStore, Task, User, UserRole,
};

/// Runs `scenario` against a fresh store of every backend.
macro_rules! on_every_backend {
    ($scenario:ident) => {
        $scenario(&MemoryStore::in_memory());
        $scenario(&SqliteStore::open_in_memory().unwrap());
    };
}

fn saves_assign_ids_and_return_reloaded_values<S: DataAccess>(store: &S) {
    let pool = assets(store, "valve", 2);
    assert_eq!(pool[0].id, EntityId(1));
    assert_eq!(pool[1].id, EntityId(2));

    let mut renamed = pool[0].clone();
    renamed.location = "bay 9".to_string();
    let saved = save(store, &renamed);
    assert_eq!(saved.id, pool[0].id);
    assert_eq!(
        Repository::<Asset>::load_by_id(store, pool[0].id)
            .unwrap()
            .location,
        "bay 9"
    );
}

fn unknown_ids_are_not_found<S: DataAccess>(store: &S) {
    let err = Repository::<Task>::load_by_id(store, EntityId(41)).unwrap_err();
    assert!(matches!(
        err,
        RepoError::NotFound {
            kind: EntityKind::Task,
            id: EntityId(41)
        }
    ));

    let mut ghost = Task::new("ghost");
    ghost.id = EntityId(41);
    assert!(try_save(store, &ghost).unwrap_err().is_not_found());
    assert!(Repository::<Task>::delete(store, EntityId(41))
        .unwrap_err()
        .is_not_found());
}

fn association_order_survives_reload<S: DataAccess>(store: &S) {
    let pool = assets(store, "gauge", 3);
    let ordered = [pool[2].clone(), pool[0].clone(), pool[1].clone()];
    let task = task_with(store, "calibrate", &ordered);

    let reloaded = Repository::<Task>::load_by_id(store, task.id).unwrap();
    assert_eq!(
        reloaded.assets.ids(),
        vec![pool[2].id, pool[0].id, pool[1].id]
    );
}

fn references_to_drafts_or_missing_rows_are_rejected<S: DataAccess>(store: &S) {
    let mut task = Task::new("inspect");
    task.assets.add(Asset::new("unsaved", "mechanical", "bay"));
    assert!(matches!(
        try_save(store, &task).unwrap_err(),
        RepoError::DraftReference {
            kind: EntityKind::Asset
        }
    ));

    let mut missing = Asset::new("gone", "mechanical", "bay");
    missing.id = EntityId(77);
    let mut component = Component::new("skid");
    component.assets.add(missing);
    assert!(try_save(store, &component).unwrap_err().is_not_found());
    assert!(Repository::<Component>::load_all(store).unwrap().is_empty());
}

fn deletes_scrub_every_association<S: DataAccess>(store: &S) {
    let pm = user(store, "pm", UserRole::ProjectManager);
    let pool = assets(store, "pump", 2);
    let task = task_with(store, "inspect", &pool);
    let component = component_with(store, "skid", &pool[..1]);
    let mut project = Project::new("plant", 1_000);
    project.manager = Some(pm.clone());
    project.team.add(pm.clone());
    project.tasks.add(task.clone());
    project.components.add(component.clone());
    let project = save(store, &project);

    Repository::<Asset>::delete(store, pool[0].id).unwrap();
    Repository::<User>::delete(store, pm.id).unwrap();
    Repository::<Task>::delete(store, task.id).unwrap();

    let component = Repository::<Component>::load_by_id(store, component.id).unwrap();
    assert!(component.assets.is_empty());
    let project = Repository::<Project>::load_by_id(store, project.id).unwrap();
    assert!(project.manager.is_none());
    assert!(project.team.is_empty());
    assert!(project.tasks.is_empty());
    assert_eq!(project.components.ids(), vec![component.id]);
}

fn project_loads_carry_nested_snapshots<S: DataAccess>(store: &S) {
    let pool = assets(store, "meter", 1);
    let task = task_with(store, "read", &pool);
    let project = project_with(store, "grid", None, &[task.clone()], &[]);

    let mut renamed = pool[0].clone();
    renamed.name = "meter (new)".to_string();
    save(store, &renamed);

    let project = Repository::<Project>::load_by_id(store, project.id).unwrap();
    let nested = &project.tasks.as_slice()[0].assets.as_slice()[0];
    assert_eq!(nested.name, "meter (new)");
}

fn access_policy_filters_by_role<S: DataAccess>(store: &S) {
    let pm = user(store, "pm", UserRole::ProjectManager);
    let qc = user(store, "qc", UserRole::QcTeamLeader);
    let first = project_with(store, "first", None, &[], &[]);
    let mut second = Project::new("second", 1_000);
    second.team.add(qc.clone());
    let second = save(store, &second);

    let all: Vec<_> = store.projects_for_user(&pm).unwrap().into_iter().map(|p| p.id).collect();
    let mine: Vec<_> = store.projects_for_user(&qc).unwrap().into_iter().map(|p| p.id).collect();
    assert_eq!(all, vec![first.id, second.id]);
    assert_eq!(mine, vec![second.id]);

    let roles: Vec<_> = store
        .users_by_role(UserRole::QcTeamLeader)
        .unwrap()
        .into_iter()
        .map(|u| u.id)
        .collect();
    assert_eq!(roles, vec![qc.id]);
}

fn invalid_project_dates_are_rejected<S: DataAccess>(store: &S) {
    let mut project = Project::new("late", 2_000);
    project.deadline = Some(1_000);
    assert!(matches!(
        try_save(store, &project).unwrap_err(),
        RepoError::Validation(_)
    ));
}

#[test]
fn saves_assign_ids_and_return_reloaded_values_on_every_backend() {
    on_every_backend!(saves_assign_ids_and_return_reloaded_values);
}

#[test]
fn unknown_ids_are_not_found_on_every_backend() {
    on_every_backend!(unknown_ids_are_not_found);
}

#[test]
fn association_order_survives_reload_on_every_backend() {
    on_every_backend!(association_order_survives_reload);
}

#[test]
fn bad_references_are_rejected_on_every_backend() {
    on_every_backend!(references_to_drafts_or_missing_rows_are_rejected);
}

#[test]
fn deletes_scrub_associations_on_every_backend() {
    on_every_backend!(deletes_scrub_every_association);
}

#[test]
fn nested_snapshots_are_fresh_on_every_backend() {
    on_every_backend!(project_loads_carry_nested_snapshots);
}

#[test]
fn access_policy_on_every_backend() {
    on_every_backend!(access_policy_filters_by_role);
}

#[test]
fn invalid_dates_are_rejected_on_every_backend() {
    on_every_backend!(invalid_project_dates_are_rejected);
}

#[test]
fn sqlite_file_store_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mppms.db");

    let task_id = {
        let store = SqliteStore::open(&path).unwrap();
        let pool = assets(&store, "valve", 2);
        task_with(&store, "inspect", &pool).id
    };

    let store = SqliteStore::open(&path).unwrap();
    let task = Repository::<Task>::load_by_id(&store, task_id).unwrap();
    assert_eq!(task.title, "inspect");
    assert_eq!(task.assets.len(), 2);
}
