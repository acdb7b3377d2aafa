//! Main index: four live tables, an active tab and one detail panel.
//!
//! # Responsibility
//! - Keep the project, task, component and asset tables current while
//!   preserving each table's selection.
//! - Show a detail panel for the active tab's selection, or for a draft
//!   opened through "create new".
//!
//! # Invariants
//! - A selection panel always matches the active tab's selected row.
//! - A creation panel survives refreshes until discarded, replaced by a
//!   selection on its tab, or left by switching tabs. Once its entity is
//!   saved and visible, it becomes that row's selection panel.

use crate::controller::asset_detail::AssetDetailController;
use crate::controller::component_detail::ComponentDetailController;
use crate::controller::hierarchy::HierarchyController;
use crate::controller::project_detail::ProjectDetailController;
use crate::controller::selection::{refresh_preserving_selection, SelectionOutcome, TableModel};
use crate::controller::task_detail::TaskDetailController;
use crate::controller::{ControllerError, ControllerResult};
use crate::events::bus::{ChangeBus, ChangeObserver, ObserverError, SubscriptionId};
use crate::events::ChangeEvent;
use crate::model::asset::Asset;
use crate::model::component::Component;
use crate::model::entity::{EntityId, EntityKind};
use crate::model::project::Project;
use crate::model::task::Task;
use crate::model::user::User;
use crate::repo::store::{DataAccess, Repository};
use log::{debug, info};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tab {
    Projects,
    Tasks,
    Components,
    Assets,
}

impl Tab {
    pub const ALL: [Tab; 4] = [Tab::Projects, Tab::Tasks, Tab::Components, Tab::Assets];

    pub fn kind(self) -> EntityKind {
        match self {
            Self::Projects => EntityKind::Project,
            Self::Tasks => EntityKind::Task,
            Self::Components => EntityKind::Component,
            Self::Assets => EntityKind::Asset,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Projects => "Projects",
            Self::Tasks => "Tasks",
            Self::Components => "Components",
            Self::Assets => "Assets",
        }
    }
}

/// How the current detail panel was opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelOrigin {
    Selection,
    Creation,
}

/// Role-derived switches for index actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexPermissions {
    pub create_project: bool,
    pub create_task: bool,
    pub view_hierarchy: bool,
}

impl IndexPermissions {
    pub fn for_user(user: &User) -> Self {
        Self {
            create_project: user.can_manage_projects(),
            create_task: user.can_edit_tasks(),
            view_hierarchy: user.can_view_hierarchy(),
        }
    }

    pub fn can_create(&self, tab: Tab) -> bool {
        match tab {
            Tab::Projects => self.create_project,
            Tab::Tasks => self.create_task,
            Tab::Components | Tab::Assets => true,
        }
    }
}

pub enum DetailPanel<S: DataAccess + 'static> {
    Project(Rc<ProjectDetailController<S>>),
    Task(Rc<TaskDetailController<S>>),
    Component(Rc<ComponentDetailController<S>>),
    Asset(Rc<AssetDetailController<S>>),
}

impl<S: DataAccess + 'static> Clone for DetailPanel<S> {
    fn clone(&self) -> Self {
        match self {
            Self::Project(c) => Self::Project(Rc::clone(c)),
            Self::Task(c) => Self::Task(Rc::clone(c)),
            Self::Component(c) => Self::Component(Rc::clone(c)),
            Self::Asset(c) => Self::Asset(Rc::clone(c)),
        }
    }
}

impl<S: DataAccess + 'static> DetailPanel<S> {
    pub fn tab(&self) -> Tab {
        match self {
            Self::Project(_) => Tab::Projects,
            Self::Task(_) => Tab::Tasks,
            Self::Component(_) => Tab::Components,
            Self::Asset(_) => Tab::Assets,
        }
    }

    pub fn entity_id(&self) -> EntityId {
        match self {
            Self::Project(c) => c.project().id,
            Self::Task(c) => c.task().id,
            Self::Component(c) => c.component().id,
            Self::Asset(c) => c.asset().id,
        }
    }

    pub fn is_new(&self) -> bool {
        match self {
            Self::Project(c) => c.is_new(),
            Self::Task(c) => c.is_new(),
            Self::Component(c) => c.is_new(),
            Self::Asset(c) => c.is_new(),
        }
    }

    pub fn is_stale(&self) -> bool {
        match self {
            Self::Project(c) => c.is_stale(),
            Self::Task(c) => c.is_stale(),
            Self::Component(c) => c.is_stale(),
            Self::Asset(c) => c.is_stale(),
        }
    }

    fn dispose(&self) {
        match self {
            Self::Project(c) => c.dispose(),
            Self::Task(c) => c.dispose(),
            Self::Component(c) => c.dispose(),
            Self::Asset(c) => c.dispose(),
        }
    }
}

/// Per-table selection outcomes of one refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexRefresh {
    pub projects: SelectionOutcome,
    pub tasks: SelectionOutcome,
    pub components: SelectionOutcome,
    pub assets: SelectionOutcome,
}

#[derive(Default)]
struct Tables {
    projects: TableModel<Project>,
    tasks: TableModel<Task>,
    components: TableModel<Component>,
    assets: TableModel<Asset>,
}

impl Tables {
    fn selected_id(&self, tab: Tab) -> Option<EntityId> {
        match tab {
            Tab::Projects => self.projects.selected_id(),
            Tab::Tasks => self.tasks.selected_id(),
            Tab::Components => self.components.selected_id(),
            Tab::Assets => self.assets.selected_id(),
        }
    }

    fn select(&mut self, tab: Tab, id: EntityId) -> bool {
        match tab {
            Tab::Projects => self.projects.select_id(id),
            Tab::Tasks => self.tasks.select_id(id),
            Tab::Components => self.components.select_id(id),
            Tab::Assets => self.assets.select_id(id),
        }
    }

    fn clear(&mut self, tab: Tab) {
        match tab {
            Tab::Projects => self.projects.clear_selection(),
            Tab::Tasks => self.tasks.clear_selection(),
            Tab::Components => self.components.clear_selection(),
            Tab::Assets => self.assets.clear_selection(),
        }
    }
}

/// Entity opened in a new detail panel.
enum PanelSubject {
    Project(Project),
    Task(Task),
    Component(Component),
    Asset(Asset),
}

struct Fresh {
    projects: Vec<Project>,
    tasks: Vec<Task>,
    components: Vec<Component>,
    assets: Vec<Asset>,
}

struct IndexState<S: DataAccess + 'static> {
    tables: Tables,
    tab: Tab,
    panel: Option<(DetailPanel<S>, PanelOrigin)>,
}

pub struct IndexController<S: DataAccess + 'static> {
    store: Rc<S>,
    bus: Rc<ChangeBus>,
    user: User,
    permissions: IndexPermissions,
    state: RefCell<IndexState<S>>,
    subscription: Cell<Option<SubscriptionId>>,
}

impl<S: DataAccess + 'static> IndexController<S> {
    pub fn launch(store: Rc<S>, bus: Rc<ChangeBus>, user: User) -> ControllerResult<Rc<Self>> {
        let permissions = IndexPermissions::for_user(&user);
        let controller = Rc::new(Self {
            store,
            bus,
            user,
            permissions,
            state: RefCell::new(IndexState {
                tables: Tables::default(),
                tab: Tab::Projects,
                panel: None,
            }),
            subscription: Cell::new(None),
        });
        controller.refresh()?;
        let id = controller.bus.subscribe(&controller);
        controller.subscription.set(Some(id));
        info!(
            "event=index_launch module=controller status=ok user_id={} role={}",
            controller.user.id,
            controller.user.role.as_str()
        );
        Ok(controller)
    }

    pub fn user(&self) -> &User {
        &self.user
    }

    pub fn permissions(&self) -> IndexPermissions {
        self.permissions
    }

    pub fn tab(&self) -> Tab {
        self.state.borrow().tab
    }

    pub fn project_rows(&self) -> Vec<Project> {
        self.state.borrow().tables.projects.rows().to_vec()
    }

    pub fn task_rows(&self) -> Vec<Task> {
        self.state.borrow().tables.tasks.rows().to_vec()
    }

    pub fn component_rows(&self) -> Vec<Component> {
        self.state.borrow().tables.components.rows().to_vec()
    }

    pub fn asset_rows(&self) -> Vec<Asset> {
        self.state.borrow().tables.assets.rows().to_vec()
    }

    pub fn selected_id(&self, tab: Tab) -> Option<EntityId> {
        self.state.borrow().tables.selected_id(tab)
    }

    pub fn panel(&self) -> Option<DetailPanel<S>> {
        self.state
            .borrow()
            .panel
            .as_ref()
            .map(|(panel, _)| panel.clone())
    }

    pub fn panel_origin(&self) -> Option<PanelOrigin> {
        self.state.borrow().panel.as_ref().map(|(_, origin)| *origin)
    }

    /// Reloads every table, restores selections and re-syncs the panel.
    pub fn refresh(&self) -> ControllerResult<IndexRefresh> {
        let fresh = self.load()?;
        let outcome = {
            let mut state = self.state.borrow_mut();
            let tables = &mut state.tables;
            IndexRefresh {
                projects: refresh_preserving_selection(&mut tables.projects, &fresh.projects),
                tasks: refresh_preserving_selection(&mut tables.tasks, &fresh.tasks),
                components: refresh_preserving_selection(
                    &mut tables.components,
                    &fresh.components,
                ),
                assets: refresh_preserving_selection(&mut tables.assets, &fresh.assets),
            }
        };
        self.adopt_saved_creation();
        self.sync_panel()?;
        info!(
            "event=refresh module=controller status=ok view=index projects={} tasks={} components={} assets={}",
            fresh.projects.len(),
            fresh.tasks.len(),
            fresh.components.len(),
            fresh.assets.len()
        );
        Ok(outcome)
    }

    /// Selects a row on `tab`, or clears with `None`.
    ///
    /// Returns false when `id` is not a row of that table.
    pub fn select(&self, tab: Tab, id: Option<EntityId>) -> ControllerResult<bool> {
        let (found, replaced) = {
            let mut state = self.state.borrow_mut();
            let found = match id {
                Some(id) => state.tables.select(tab, id),
                None => {
                    state.tables.clear(tab);
                    true
                }
            };
            let replaces_creation = found
                && id.is_some()
                && state.tab == tab
                && matches!(state.panel, Some((_, PanelOrigin::Creation)));
            let replaced = if replaces_creation {
                state.panel.take()
            } else {
                None
            };
            (found, replaced)
        };
        if let Some((panel, _)) = replaced {
            panel.dispose();
        }
        if self.tab() == tab {
            self.sync_panel()?;
        }
        Ok(found)
    }

    pub fn set_tab(&self, tab: Tab) -> ControllerResult<()> {
        self.state.borrow_mut().tab = tab;
        self.sync_panel()
    }

    /// Selects `id` on `tab` and switches to it.
    pub fn navigate(&self, tab: Tab, id: EntityId) -> ControllerResult<bool> {
        let found = self.select(tab, Some(id))?;
        self.set_tab(tab)?;
        debug!(
            "event=navigate module=controller status=ok tab={} id={} found={}",
            tab.label(),
            id,
            found
        );
        Ok(found)
    }

    /// Opens a draft of `tab`'s kind in a creation panel.
    pub fn create_new(&self, tab: Tab) -> ControllerResult<DetailPanel<S>> {
        if !self.permissions.can_create(tab) {
            return Err(ControllerError::PermissionDenied("create entity"));
        }
        let replaced = {
            let mut state = self.state.borrow_mut();
            state.tables.clear(tab);
            state.tab = tab;
            state.panel.take()
        };
        if let Some((panel, _)) = replaced {
            panel.dispose();
        }

        let subject = match tab {
            Tab::Projects => {
                let mut project = Project::new("", unix_now());
                if self.user.can_manage_projects() {
                    project.manager = Some(self.user.clone());
                }
                PanelSubject::Project(project)
            }
            Tab::Tasks => PanelSubject::Task(Task::draft()),
            Tab::Components => PanelSubject::Component(Component::draft()),
            Tab::Assets => PanelSubject::Asset(Asset::draft()),
        };
        let panel = self.open_panel(subject)?;
        self.state.borrow_mut().panel = Some((panel.clone(), PanelOrigin::Creation));
        info!(
            "event=panel_open module=controller status=ok kind={} origin=creation",
            tab.kind()
        );
        Ok(panel)
    }

    /// Closes a creation panel. Returns false when none is open.
    pub fn discard_new(&self) -> bool {
        let closed = {
            let mut state = self.state.borrow_mut();
            if matches!(state.panel, Some((_, PanelOrigin::Creation))) {
                state.panel.take()
            } else {
                None
            }
        };
        match closed {
            Some((panel, _)) => {
                panel.dispose();
                true
            }
            None => false,
        }
    }

    pub fn open_hierarchy(&self) -> ControllerResult<Rc<HierarchyController<S>>> {
        if !self.permissions.view_hierarchy {
            return Err(ControllerError::PermissionDenied("view hierarchy"));
        }
        HierarchyController::open(
            Rc::clone(&self.store),
            Rc::clone(&self.bus),
            self.user.clone(),
        )
    }

    pub fn dispose(&self) {
        if let Some(id) = self.subscription.take() {
            self.bus.unsubscribe(id);
        }
        let panel = self.state.borrow_mut().panel.take();
        if let Some((panel, _)) = panel {
            panel.dispose();
        }
    }

    fn load(&self) -> ControllerResult<Fresh> {
        let store = &*self.store;
        Ok(Fresh {
            projects: store.projects_for_user(&self.user)?,
            tasks: store.tasks_for_user(&self.user)?,
            components: Repository::<Component>::load_all(store)?,
            assets: Repository::<Asset>::load_all(store)?,
        })
    }

    /// Turns a saved creation panel into the selection panel of its row.
    fn adopt_saved_creation(&self) {
        let mut state = self.state.borrow_mut();
        let IndexState { tables, panel, .. } = &mut *state;
        if let Some((panel, origin)) = panel.as_mut() {
            if *origin == PanelOrigin::Creation
                && !panel.is_new()
                && tables.select(panel.tab(), panel.entity_id())
            {
                *origin = PanelOrigin::Selection;
            }
        }
    }

    /// Makes the panel match the active tab's selection.
    fn sync_panel(&self) -> ControllerResult<()> {
        let (tab, selected, current) = {
            let state = self.state.borrow();
            let current = state
                .panel
                .as_ref()
                .map(|(panel, origin)| (panel.tab(), panel.entity_id(), *origin));
            (state.tab, state.tables.selected_id(state.tab), current)
        };

        if let Some((panel_tab, panel_id, origin)) = current {
            let keep = panel_tab == tab
                && match origin {
                    PanelOrigin::Creation => true,
                    PanelOrigin::Selection => selected == Some(panel_id),
                };
            if keep {
                return Ok(());
            }
        }

        let replaced = self.state.borrow_mut().panel.take();
        if let Some((panel, _)) = replaced {
            panel.dispose();
        }
        let Some(id) = selected else {
            return Ok(());
        };

        let subject = {
            let state = self.state.borrow();
            let tables = &state.tables;
            let subject = match tab {
                Tab::Projects => tables.projects.row(id).cloned().map(PanelSubject::Project),
                Tab::Tasks => tables.tasks.row(id).cloned().map(PanelSubject::Task),
                Tab::Components => tables
                    .components
                    .row(id)
                    .cloned()
                    .map(PanelSubject::Component),
                Tab::Assets => tables.assets.row(id).cloned().map(PanelSubject::Asset),
            };
            subject.ok_or(ControllerError::NotInScope {
                kind: tab.kind(),
                id,
            })?
        };
        let panel = self.open_panel(subject)?;
        self.state.borrow_mut().panel = Some((panel, PanelOrigin::Selection));
        debug!(
            "event=panel_open module=controller status=ok kind={} id={} origin=selection",
            tab.kind(),
            id
        );
        Ok(())
    }

    fn open_panel(&self, subject: PanelSubject) -> ControllerResult<DetailPanel<S>> {
        let store = Rc::clone(&self.store);
        let bus = Rc::clone(&self.bus);
        let user = self.user.clone();
        let panel = match subject {
            PanelSubject::Project(project) => {
                DetailPanel::Project(ProjectDetailController::open(store, bus, user, project))
            }
            PanelSubject::Task(task) => {
                DetailPanel::Task(TaskDetailController::open(store, bus, user, task))
            }
            PanelSubject::Component(component) => DetailPanel::Component(
                ComponentDetailController::open(store, bus, user, component),
            ),
            PanelSubject::Asset(asset) => {
                DetailPanel::Asset(AssetDetailController::open(store, bus, user, asset)?)
            }
        };
        Ok(panel)
    }
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as i64)
        .unwrap_or(0)
}

impl<S: DataAccess + 'static> ChangeObserver for IndexController<S> {
    fn on_change(&self, _event: &ChangeEvent) -> Result<(), ObserverError> {
        self.refresh()?;
        Ok(())
    }

    fn observer_name(&self) -> &'static str {
        "index"
    }
}

impl<S: DataAccess + 'static> Drop for IndexController<S> {
    fn drop(&mut self) {
        self.dispose();
    }
}
