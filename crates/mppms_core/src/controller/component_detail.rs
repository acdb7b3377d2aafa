//! Component detail panel.

use crate::controller::detail::{DetailCore, ReloadOutcome};
use crate::controller::ControllerResult;
use crate::events::bus::{ChangeBus, ChangeObserver, ObserverError};
use crate::events::ChangeEvent;
use crate::model::asset::Asset;
use crate::model::component::Component;
use crate::model::entity::EntityKind;
use crate::model::user::User;
use crate::repo::store::{DataAccess, Repository};
use crate::service::relationship::ChoiceEditor;
use std::rc::Rc;

pub struct ComponentDetailController<S: DataAccess + 'static> {
    core: DetailCore<S, Component>,
}

impl<S: DataAccess + 'static> ComponentDetailController<S> {
    pub fn open(store: Rc<S>, bus: Rc<ChangeBus>, user: User, component: Component) -> Rc<Self> {
        let controller = Rc::new(Self {
            core: DetailCore::new(store, bus, user, component),
        });
        controller.core.attach(&controller);
        controller
    }

    pub fn component(&self) -> Component {
        self.core.snapshot()
    }

    pub fn working(&self) -> Option<Component> {
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

    pub fn begin_edit(&self) -> ControllerResult<()> {
        self.core.begin_edit()
    }

    pub fn discard(&self) {
        self.core.discard();
    }

    pub fn update(&self, apply: impl FnOnce(&mut Component)) -> ControllerResult<()> {
        self.core.edit(apply)
    }

    pub fn save(&self) -> ControllerResult<Component> {
        self.core.save()
    }

    pub fn choose_assets(&self) -> ControllerResult<ChoiceEditor<Asset>> {
        let universe = Repository::<Asset>::load_all(self.core.store())?;
        self.core.chooser(universe, |component| &component.assets)
    }

    pub fn apply_assets(&self, editor: &ChoiceEditor<Asset>) -> ControllerResult<Component> {
        self.core
            .apply_association("assets", editor, Component::with_assets)
    }

    pub fn refresh(&self) -> ControllerResult<ReloadOutcome> {
        self.core.refresh()
    }

    pub fn dispose(&self) {
        self.core.dispose();
    }
}

impl<S: DataAccess + 'static> ChangeObserver for ComponentDetailController<S> {
    fn on_change(&self, _event: &ChangeEvent) -> Result<(), ObserverError> {
        self.refresh()?;
        Ok(())
    }

    fn is_interested(&self, event: &ChangeEvent) -> bool {
        matches!(event.kind, EntityKind::Component | EntityKind::Asset)
    }

    fn observer_name(&self) -> &'static str {
        "component_detail"
    }
}
