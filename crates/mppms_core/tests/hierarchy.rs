mod common;

use common::{assets, component_with, project_with, save, task_with, user};
use mppms_core::controller::hierarchy::TreeSelectionOutcome;
use mppms_core::service::hierarchy::{AssetOwner, BranchKind};
use mppms_core::{
    AppSession, ChangeBus, ChangeEvent, EntityId, HierarchyTree, MemoryStore, NodeKey,
    Repository, Task, UserRole,
};
use std::rc::Rc;

fn leaf_ids(tree: &HierarchyTree, key: NodeKey) -> Vec<EntityId> {
    let node = tree.find(&key).expect("node present");
    tree.children(node)
        .iter()
        .filter_map(|child| tree.node(*child)?.asset().map(|asset| asset.id))
        .collect()
}

#[test]
fn tree_holds_a_node_per_task_component_and_asset_leaf() {
    let store = MemoryStore::in_memory();
    let pool = assets(&store, "a", 8);
    let tasks: Vec<Task> = (0..3)
        .map(|i| task_with(&store, &format!("task-{i}"), &pool[i..i + 2]))
        .collect();
    let components = vec![
        component_with(&store, "skid", &pool[0..4]),
        component_with(&store, "rack", &pool[4..8]),
    ];
    let project = project_with(&store, "plant", None, &tasks, &components);

    let tree = HierarchyTree::build(&[project.clone()]);

    let task_branch = tree.branch(project.id, BranchKind::Tasks).unwrap();
    let component_branch = tree.branch(project.id, BranchKind::Components).unwrap();
    assert_eq!(tree.children(task_branch).len(), 3);
    assert_eq!(tree.children(component_branch).len(), 2);
    for task in tree.children(task_branch) {
        assert_eq!(tree.children(*task).len(), 2);
    }
    for component in tree.children(component_branch) {
        assert_eq!(tree.children(*component).len(), 4);
    }
    // root + project + 2 branches + 3 tasks + 6 leaves + 2 components + 8 leaves
    assert_eq!(tree.len(), 1 + 1 + 2 + 3 + 6 + 2 + 8);
}

#[test]
fn shared_asset_leaves_resolve_to_their_own_project() {
    let store = MemoryStore::in_memory();
    let shared = assets(&store, "shared", 1);
    let first_task = task_with(&store, "first", &shared);
    let second_task = task_with(&store, "second", &shared);
    let first = project_with(&store, "north", None, &[first_task.clone()], &[]);
    let second = project_with(&store, "south", None, &[second_task.clone()], &[]);

    let tree = HierarchyTree::build(&[first.clone(), second.clone()]);

    let leaf = tree
        .find(&NodeKey::Asset {
            project: second.id,
            owner: AssetOwner::Task(second_task.id),
            asset: shared[0].id,
        })
        .unwrap();
    assert_eq!(tree.owning_project(leaf).unwrap().id, second.id);
    assert_eq!(tree.project_nodes().len(), 2);
}

struct Plant {
    store: Rc<MemoryStore>,
    session: AppSession<MemoryStore>,
    project_id: EntityId,
    task_id: EntityId,
    component_id: EntityId,
    assets: Vec<mppms_core::Asset>,
}

/// Project P with task 7 holding {A1, A2} and a component holding {A2, A3}.
fn plant() -> Plant {
    let store = Rc::new(MemoryStore::in_memory());
    let pm = user(&*store, "pm", UserRole::ProjectManager);
    for i in 1..=6 {
        save(&*store, &Task::new(format!("filler {i}")));
    }
    let pool = assets(&*store, "A", 3);
    let task = task_with(&*store, "T", &pool[0..2]);
    assert_eq!(task.id, EntityId(7));
    let component = component_with(&*store, "C", &pool[1..3]);
    let project = project_with(&*store, "P", Some(&pm), &[task.clone()], &[component.clone()]);
    let session = AppSession::sign_in(Rc::clone(&store), ChangeBus::new(), pm.id).unwrap();
    Plant {
        store,
        session,
        project_id: project.id,
        task_id: task.id,
        component_id: component.id,
        assets: pool,
    }
}

impl Plant {
    fn task_key(&self) -> NodeKey {
        NodeKey::Task {
            project: self.project_id,
            task: self.task_id,
        }
    }

    fn task_leaf(&self, asset: usize) -> NodeKey {
        NodeKey::Asset {
            project: self.project_id,
            owner: AssetOwner::Task(self.task_id),
            asset: self.assets[asset].id,
        }
    }

    fn component_leaf(&self, asset: usize) -> NodeKey {
        NodeKey::Asset {
            project: self.project_id,
            owner: AssetOwner::Component(self.component_id),
            asset: self.assets[asset].id,
        }
    }
}

#[test]
fn saved_task_edit_reaches_every_open_hierarchy() {
    let plant = plant();
    let first = plant.session.open_hierarchy().unwrap();
    let second = plant.session.open_hierarchy().unwrap();
    let (a1, a2, a3) = (&plant.assets[0], &plant.assets[1], &plant.assets[2]);

    let mut task: Task = plant.store.load_by_id(plant.task_id).unwrap();
    task.assets.remove(a1);
    task.assets.add(a3.clone());
    let saved = plant.store.save(&task).unwrap();
    plant.session.bus().publish(ChangeEvent::saved(&saved, false));

    assert_eq!(saved.assets.ids(), vec![a2.id, a3.id]);
    for view in [&first, &second] {
        assert_eq!(leaf_ids(&view.tree(), plant.task_key()), vec![a2.id, a3.id]);
    }
}

#[test]
fn placement_actions_update_task_and_peers() {
    let plant = plant();
    let view = plant.session.open_hierarchy().unwrap();
    let peer = plant.session.open_hierarchy().unwrap();

    assert!(view.select(Some(plant.task_leaf(0))));
    assert!(view.controls_enabled());
    assert!(view.remove_from_task(plant.task_id).unwrap());
    assert_eq!(view.selected_key(), None);
    assert!(!view.controls_enabled());

    assert!(view.select(Some(plant.component_leaf(2))));
    let selection = view.selection().unwrap();
    assert_eq!(selection.placement.addable_tasks.ids(), vec![plant.task_id]);
    assert!(view.add_to_task(plant.task_id).unwrap());
    assert!(!view.add_to_task(plant.task_id).unwrap());

    let expected = vec![plant.assets[1].id, plant.assets[2].id];
    assert_eq!(leaf_ids(&peer.tree(), plant.task_key()), expected);
    let stored: Task = plant.store.load_by_id(plant.task_id).unwrap();
    assert_eq!(stored.assets.ids(), expected);
}

#[test]
fn vanished_leaf_falls_back_to_same_asset_elsewhere_in_project() {
    let plant = plant();
    let view = plant.session.open_hierarchy().unwrap();
    view.set_expanded(plant.task_key(), true);
    assert!(view.select(Some(plant.task_leaf(1))));

    assert!(view.remove_from_task(plant.task_id).unwrap());

    assert_eq!(view.selected_key(), Some(plant.component_leaf(1)));
    assert!(view.is_expanded(&plant.task_key()));
    assert_eq!(
        view.refresh().unwrap(),
        TreeSelectionOutcome::Kept(plant.component_leaf(1))
    );
}

#[test]
fn placement_outside_selected_project_is_rejected() {
    let plant = plant();
    let outsider = task_with(&*plant.store, "elsewhere", &[]);
    let view = plant.session.open_hierarchy().unwrap();

    assert!(view.add_to_task(plant.task_id).is_err());
    view.select(Some(plant.task_leaf(0)));
    assert!(matches!(
        view.add_to_task(outsider.id),
        Err(mppms_core::ControllerError::NotInScope { .. })
    ));
}

#[test]
fn only_project_managers_open_the_hierarchy() {
    let store = Rc::new(MemoryStore::in_memory());
    let coordinator = user(&*store, "pc", UserRole::ProjectCoordinator);
    let session = AppSession::sign_in(store, ChangeBus::new(), coordinator.id).unwrap();

    assert!(matches!(
        session.open_hierarchy(),
        Err(mppms_core::ControllerError::PermissionDenied(_))
    ));
}

#[test]
fn node_selection_and_expansion_follow_keys_across_rebuilds() {
    let plant = plant();
    let view = plant.session.open_hierarchy().unwrap();

    let branch = view
        .tree()
        .branch(plant.project_id, BranchKind::Components)
        .unwrap();
    assert!(view.select_node(branch));
    assert!(!view.controls_enabled());
    let leaf = view.tree().find(&plant.component_leaf(2)).unwrap();
    assert!(view.select_node(leaf));
    assert!(view.controls_enabled());

    view.set_expanded(plant.task_key(), true);
    view.set_expanded(NodeKey::Project(plant.project_id), true);
    view.set_expanded(NodeKey::Project(EntityId(99)), true);
    assert_eq!(
        view.expanded(),
        vec![NodeKey::Project(plant.project_id), plant.task_key()]
    );

    Repository::<Task>::delete(&*plant.store, plant.task_id).unwrap();
    plant
        .session
        .bus()
        .publish(ChangeEvent::deleted::<Task>(plant.task_id));

    assert_eq!(view.expanded(), vec![NodeKey::Project(plant.project_id)]);
    assert_eq!(view.selected_key(), Some(plant.component_leaf(2)));
}

#[test]
fn component_placement_is_scoped_to_selected_project() {
    let plant = plant();
    let outsider = component_with(&*plant.store, "spare", &[]);
    let view = plant.session.open_hierarchy().unwrap();
    view.select(Some(plant.task_leaf(0)));

    assert!(matches!(
        view.add_to_component(outsider.id),
        Err(mppms_core::ControllerError::NotInScope {
            kind: mppms_core::EntityKind::Component,
            ..
        })
    ));
    assert!(view.add_to_component(plant.component_id).unwrap());
}
