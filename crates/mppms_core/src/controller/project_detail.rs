//! Project detail panel.
//!
//! Field edits and the team/components associations need
//! `can_manage_projects`; the tasks association needs `can_edit_tasks`.

use crate::controller::detail::{DetailCore, ReloadOutcome};
use crate::controller::{ControllerError, ControllerResult};
use crate::events::bus::{ChangeBus, ChangeObserver, ObserverError};
use crate::events::ChangeEvent;
use crate::model::component::Component;
use crate::model::project::Project;
use crate::model::task::Task;
use crate::model::user::{User, UserRole};
use crate::repo::store::{DataAccess, Repository};
use crate::service::relationship::ChoiceEditor;
use std::rc::Rc;

pub struct ProjectDetailController<S: DataAccess + 'static> {
    core: DetailCore<S, Project>,
}

impl<S: DataAccess + 'static> ProjectDetailController<S> {
    pub fn open(store: Rc<S>, bus: Rc<ChangeBus>, user: User, project: Project) -> Rc<Self> {
        let controller = Rc::new(Self {
            core: DetailCore::new(store, bus, user, project),
        });
        controller.core.attach(&controller);
        controller
    }

    pub fn project(&self) -> Project {
        self.core.snapshot()
    }

    pub fn working(&self) -> Option<Project> {
        self.core.state().working().cloned()
    }

    pub fn is_new(&self) -> bool {
        self.core.state().is_new()
    }

    pub fn is_editing(&self) -> bool {
        self.core.state().is_editing()
    }

    pub fn is_stale(&self) -> bool {
        self.core.state().is_stale()
    }

    pub fn can_edit(&self) -> bool {
        self.core.user().can_manage_projects()
    }

    pub fn can_edit_tasks(&self) -> bool {
        self.core.user().can_edit_tasks()
    }

    pub fn begin_edit(&self) -> ControllerResult<()> {
        self.require_manage()?;
        self.core.begin_edit()
    }

    pub fn discard(&self) {
        self.core.discard();
    }

    /// Edits title, dates, priority, manager or coordinator.
    pub fn update(&self, apply: impl FnOnce(&mut Project)) -> ControllerResult<()> {
        self.require_manage()?;
        self.core.edit(apply)
    }

    pub fn save(&self) -> ControllerResult<Project> {
        self.require_manage()?;
        self.core.save()
    }

    /// Candidates for the manager slot.
    pub fn manager_options(&self) -> ControllerResult<Vec<User>> {
        Ok(self.core.store().users_by_role(UserRole::ProjectManager)?)
    }

    /// Candidates for the coordinator slot.
    pub fn coordinator_options(&self) -> ControllerResult<Vec<User>> {
        Ok(self
            .core
            .store()
            .users_by_role(UserRole::ProjectCoordinator)?)
    }

    pub fn choose_team(&self) -> ControllerResult<ChoiceEditor<User>> {
        self.require_manage()?;
        let universe = Repository::<User>::load_all(self.core.store())?;
        self.core.chooser(universe, |project| &project.team)
    }

    pub fn apply_team(&self, editor: &ChoiceEditor<User>) -> ControllerResult<Project> {
        self.require_manage()?;
        self.core.apply_association("team", editor, Project::with_team)
    }

    pub fn choose_tasks(&self) -> ControllerResult<ChoiceEditor<Task>> {
        self.require_task_edit()?;
        let universe = Repository::<Task>::load_all(self.core.store())?;
        self.core.chooser(universe, |project| &project.tasks)
    }

    pub fn apply_tasks(&self, editor: &ChoiceEditor<Task>) -> ControllerResult<Project> {
        self.require_task_edit()?;
        self.core.apply_association("tasks", editor, Project::with_tasks)
    }

    pub fn choose_components(&self) -> ControllerResult<ChoiceEditor<Component>> {
        self.require_manage()?;
        let universe = Repository::<Component>::load_all(self.core.store())?;
        self.core.chooser(universe, |project| &project.components)
    }

    pub fn apply_components(
        &self,
        editor: &ChoiceEditor<Component>,
    ) -> ControllerResult<Project> {
        self.require_manage()?;
        self.core
            .apply_association("components", editor, Project::with_components)
    }

    pub fn refresh(&self) -> ControllerResult<ReloadOutcome> {
        self.core.refresh()
    }

    pub fn dispose(&self) {
        self.core.dispose();
    }

    fn require_manage(&self) -> ControllerResult<()> {
        if self.can_edit() {
            Ok(())
        } else {
            Err(ControllerError::PermissionDenied("edit project"))
        }
    }

    fn require_task_edit(&self) -> ControllerResult<()> {
        if self.can_edit_tasks() {
            Ok(())
        } else {
            Err(ControllerError::PermissionDenied("edit project tasks"))
        }
    }
}

impl<S: DataAccess + 'static> ChangeObserver for ProjectDetailController<S> {
    fn on_change(&self, _event: &ChangeEvent) -> Result<(), ObserverError> {
        self.refresh()?;
        Ok(())
    }

    fn observer_name(&self) -> &'static str {
        "project_detail"
    }
}
