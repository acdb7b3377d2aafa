//! Live project hierarchy with asset placement actions.
//!
//! # Responsibility
//! - Rebuild the hierarchy for the signed-in user on every change.
//! - Carry selection and expansion across rebuilds by structural key.
//! - Add or remove the selected asset to or from tasks and components of
//!   its owning project.
//!
//! # Invariants
//! - Placement controls are enabled only while an asset leaf is selected.
//! - A vanished asset leaf falls back to another leaf of the same asset in
//!   the same project; otherwise the selection is cleared.
//! - Actions load the target fresh by id before modifying it.

use crate::controller::{ControllerError, ControllerResult};
use crate::events::bus::{ChangeBus, ChangeObserver, ObserverError, SubscriptionId};
use crate::events::ChangeEvent;
use crate::model::asset::Asset;
use crate::model::component::Component;
use crate::model::entity::{Entity, EntityId};
use crate::model::project::Project;
use crate::model::set::EntitySet;
use crate::model::task::Task;
use crate::model::user::User;
use crate::repo::store::{DataAccess, Repository};
use crate::service::hierarchy::{HierarchyTree, NodeId, NodeKey};
use crate::service::membership::AssetPlacement;
use log::info;
use std::cell::{Cell, Ref, RefCell};
use std::collections::BTreeSet;
use std::rc::Rc;

/// Selected asset leaf resolved against its owning project.
#[derive(Debug, Clone)]
pub struct AssetSelection {
    pub key: NodeKey,
    pub project: Project,
    pub asset: Asset,
    pub placement: AssetPlacement,
}

/// Fate of the selected node across one rebuild.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeSelectionOutcome {
    Unselected,
    Kept(NodeKey),
    /// Same asset, same project, different leaf.
    Moved { from: NodeKey, to: NodeKey },
    Lost(NodeKey),
}

struct HierarchyState {
    tree: HierarchyTree,
    selected: Option<NodeKey>,
    expanded: BTreeSet<NodeKey>,
}

pub struct HierarchyController<S: DataAccess + 'static> {
    store: Rc<S>,
    bus: Rc<ChangeBus>,
    user: User,
    state: RefCell<HierarchyState>,
    subscription: Cell<Option<SubscriptionId>>,
}

impl<S: DataAccess + 'static> HierarchyController<S> {
    pub fn open(store: Rc<S>, bus: Rc<ChangeBus>, user: User) -> ControllerResult<Rc<Self>> {
        if !user.can_view_hierarchy() {
            return Err(ControllerError::PermissionDenied("view hierarchy"));
        }
        let projects = store.projects_for_user(&user)?;
        let controller = Rc::new(Self {
            store,
            bus,
            user,
            state: RefCell::new(HierarchyState {
                tree: HierarchyTree::build(&projects),
                selected: None,
                expanded: BTreeSet::new(),
            }),
            subscription: Cell::new(None),
        });
        let id = controller.bus.subscribe(&controller);
        controller.subscription.set(Some(id));
        Ok(controller)
    }

    pub fn tree(&self) -> Ref<'_, HierarchyTree> {
        Ref::map(self.state.borrow(), |state| &state.tree)
    }

    pub fn selected_key(&self) -> Option<NodeKey> {
        self.state.borrow().selected
    }

    /// Selects the node with `key`; returns false and clears when absent.
    pub fn select(&self, key: Option<NodeKey>) -> bool {
        let mut state = self.state.borrow_mut();
        let found = key.filter(|key| state.tree.find(key).is_some());
        state.selected = found;
        found.is_some() || key.is_none()
    }

    pub fn select_node(&self, node: NodeId) -> bool {
        let key = self.tree().node(node).map(|node| node.key());
        key.is_some() && self.select(key)
    }

    pub fn set_expanded(&self, key: NodeKey, expanded: bool) {
        let mut state = self.state.borrow_mut();
        if expanded {
            if state.tree.find(&key).is_some() {
                state.expanded.insert(key);
            }
        } else {
            state.expanded.remove(&key);
        }
    }

    pub fn is_expanded(&self, key: &NodeKey) -> bool {
        self.state.borrow().expanded.contains(key)
    }

    pub fn expanded(&self) -> Vec<NodeKey> {
        self.state.borrow().expanded.iter().copied().collect()
    }

    pub fn controls_enabled(&self) -> bool {
        self.selected_key().is_some_and(|key| key.is_asset())
    }

    /// Selected asset with its project-scoped placement; `None` unless an
    /// asset leaf is selected.
    pub fn selection(&self) -> Option<AssetSelection> {
        let state = self.state.borrow();
        let key = state.selected?;
        let node_id = state.tree.find(&key)?;
        let node = state.tree.node(node_id)?;
        let asset = node.asset()?.clone();
        let project = state.tree.owning_project(node_id)?.clone();
        let placement = AssetPlacement::within_project(&asset, &project);
        Some(AssetSelection {
            key,
            project,
            asset,
            placement,
        })
    }

    pub fn refresh(&self) -> ControllerResult<TreeSelectionOutcome> {
        let projects = self.store.projects_for_user(&self.user)?;
        let tree = HierarchyTree::build(&projects);

        let mut state = self.state.borrow_mut();
        let outcome = match state.selected {
            None => TreeSelectionOutcome::Unselected,
            Some(key) if tree.find(&key).is_some() => TreeSelectionOutcome::Kept(key),
            Some(key) => match fallback_leaf(&tree, key) {
                Some(to) => TreeSelectionOutcome::Moved { from: key, to },
                None => TreeSelectionOutcome::Lost(key),
            },
        };
        state.selected = match outcome {
            TreeSelectionOutcome::Kept(key) => Some(key),
            TreeSelectionOutcome::Moved { to, .. } => Some(to),
            TreeSelectionOutcome::Unselected | TreeSelectionOutcome::Lost(_) => None,
        };
        state.expanded.retain(|key| tree.find(key).is_some());
        state.tree = tree;

        if let TreeSelectionOutcome::Lost(key) = outcome {
            info!("event=selection_lost module=controller status=ok view=hierarchy key={key:?}");
        }
        info!(
            "event=refresh module=controller status=ok view=hierarchy projects={} nodes={}",
            projects.len(),
            state.tree.len()
        );
        Ok(outcome)
    }

    /// Adds the selected asset to `task_id`. Returns false when already held.
    pub fn add_to_task(&self, task_id: EntityId) -> ControllerResult<bool> {
        self.place(task_id, true, |project| &project.tasks, |task: &mut Task| {
            &mut task.assets
        })
    }

    pub fn remove_from_task(&self, task_id: EntityId) -> ControllerResult<bool> {
        self.place(task_id, false, |project| &project.tasks, |task: &mut Task| {
            &mut task.assets
        })
    }

    pub fn add_to_component(&self, component_id: EntityId) -> ControllerResult<bool> {
        self.place(
            component_id,
            true,
            |project| &project.components,
            |component: &mut Component| &mut component.assets,
        )
    }

    pub fn remove_from_component(&self, component_id: EntityId) -> ControllerResult<bool> {
        self.place(
            component_id,
            false,
            |project| &project.components,
            |component: &mut Component| &mut component.assets,
        )
    }

    fn place<T>(
        &self,
        target: EntityId,
        add: bool,
        scope: fn(&Project) -> &EntitySet<T>,
        assets: fn(&mut T) -> &mut EntitySet<Asset>,
    ) -> ControllerResult<bool>
    where
        T: Entity,
        S: Repository<T>,
    {
        let selection = self.selection().ok_or(ControllerError::NoSelection)?;
        if !scope(&selection.project).contains_id(target) {
            return Err(ControllerError::NotInScope {
                kind: T::KIND,
                id: target,
            });
        }

        let mut fresh: T = Repository::<T>::load_by_id(&*self.store, target)?;
        let changed = if add {
            assets(&mut fresh).add(selection.asset.clone())
        } else {
            assets(&mut fresh).remove(&selection.asset)
        };
        if !changed {
            return Ok(false);
        }

        let saved = Repository::<T>::save(&*self.store, &fresh)?;
        info!(
            "event=asset_placement module=controller status=ok kind={} id={} asset_id={} action={}",
            T::KIND,
            saved.id(),
            selection.asset.id(),
            if add { "add" } else { "remove" }
        );
        self.bus.publish(ChangeEvent::saved(&saved, false));
        Ok(true)
    }

    pub fn dispose(&self) {
        if let Some(id) = self.subscription.take() {
            self.bus.unsubscribe(id);
        }
    }
}

/// Another leaf of the same asset within the same project.
fn fallback_leaf(tree: &HierarchyTree, lost: NodeKey) -> Option<NodeKey> {
    let NodeKey::Asset { project, asset, .. } = lost else {
        return None;
    };
    let node = tree.first_asset_leaf(project, asset)?;
    tree.node(node).map(|node| node.key())
}

impl<S: DataAccess + 'static> ChangeObserver for HierarchyController<S> {
    fn on_change(&self, _event: &ChangeEvent) -> Result<(), ObserverError> {
        self.refresh()?;
        Ok(())
    }

    fn observer_name(&self) -> &'static str {
        "hierarchy"
    }
}

impl<S: DataAccess + 'static> Drop for HierarchyController<S> {
    fn drop(&mut self) {
        self.dispose();
    }
}
