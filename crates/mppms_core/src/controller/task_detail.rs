//! Task detail panel. Every edit needs `can_edit_tasks`.

use crate::controller::detail::{DetailCore, ReloadOutcome};
use crate::controller::{ControllerError, ControllerResult};
use crate::events::bus::{ChangeBus, ChangeObserver, ObserverError};
use crate::events::ChangeEvent;
use crate::model::asset::Asset;
use crate::model::entity::EntityKind;
use crate::model::task::Task;
use crate::model::user::User;
use crate::repo::store::{DataAccess, Repository};
use crate::service::relationship::ChoiceEditor;
use std::rc::Rc;

pub struct TaskDetailController<S: DataAccess + 'static> {
    core: DetailCore<S, Task>,
}

impl<S: DataAccess + 'static> TaskDetailController<S> {
    pub fn open(store: Rc<S>, bus: Rc<ChangeBus>, user: User, task: Task) -> Rc<Self> {
        let controller = Rc::new(Self {
            core: DetailCore::new(store, bus, user, task),
        });
        controller.core.attach(&controller);
        controller
    }

    pub fn task(&self) -> Task {
        self.core.snapshot()
    }

    pub fn working(&self) -> Option<Task> {
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
        self.core.user().can_edit_tasks()
    }

    pub fn begin_edit(&self) -> ControllerResult<()> {
        self.require_edit()?;
        self.core.begin_edit()
    }

    pub fn discard(&self) {
        self.core.discard();
    }

    /// Edits title, status, priority or report.
    pub fn update(&self, apply: impl FnOnce(&mut Task)) -> ControllerResult<()> {
        self.require_edit()?;
        self.core.edit(apply)
    }

    pub fn save(&self) -> ControllerResult<Task> {
        self.require_edit()?;
        self.core.save()
    }

    pub fn choose_assignees(&self) -> ControllerResult<ChoiceEditor<User>> {
        self.require_edit()?;
        let universe = Repository::<User>::load_all(self.core.store())?;
        self.core.chooser(universe, |task| &task.assigned_to)
    }

    pub fn apply_assignees(&self, editor: &ChoiceEditor<User>) -> ControllerResult<Task> {
        self.require_edit()?;
        self.core
            .apply_association("assigned_to", editor, Task::with_assignees)
    }

    pub fn choose_assets(&self) -> ControllerResult<ChoiceEditor<Asset>> {
        self.require_edit()?;
        let universe = Repository::<Asset>::load_all(self.core.store())?;
        self.core.chooser(universe, |task| &task.assets)
    }

    pub fn apply_assets(&self, editor: &ChoiceEditor<Asset>) -> ControllerResult<Task> {
        self.require_edit()?;
        self.core.apply_association("assets", editor, Task::with_assets)
    }

    pub fn refresh(&self) -> ControllerResult<ReloadOutcome> {
        self.core.refresh()
    }

    pub fn dispose(&self) {
        self.core.dispose();
    }

    fn require_edit(&self) -> ControllerResult<()> {
        if self.can_edit() {
            Ok(())
        } else {
            Err(ControllerError::PermissionDenied("edit task"))
        }
    }
}

impl<S: DataAccess + 'static> ChangeObserver for TaskDetailController<S> {
    fn on_change(&self, _event: &ChangeEvent) -> Result<(), ObserverError> {
        self.refresh()?;
        Ok(())
    }

    fn is_interested(&self, event: &ChangeEvent) -> bool {
        matches!(
            event.kind,
            EntityKind::Task | EntityKind::Asset | EntityKind::User
        )
    }

    fn observer_name(&self) -> &'static str {
        "task_detail"
    }
}
