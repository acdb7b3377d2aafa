//! Asset detail panel with derived membership.
//!
//! Membership is recomputed from all tasks and components on every refresh;
//! it is never edited here.

use crate::controller::detail::{DetailCore, ReloadOutcome};
use crate::controller::ControllerResult;
use crate::events::bus::{ChangeBus, ChangeObserver, ObserverError};
use crate::events::ChangeEvent;
use crate::model::asset::Asset;
use crate::model::component::Component;
use crate::model::entity::EntityKind;
use crate::model::task::Task;
use crate::model::user::User;
use crate::repo::store::{DataAccess, Repository};
use crate::service::membership::AssetMembership;
use std::cell::RefCell;
use std::rc::Rc;

pub struct AssetDetailController<S: DataAccess + 'static> {
    core: DetailCore<S, Asset>,
    membership: RefCell<AssetMembership>,
}

impl<S: DataAccess + 'static> AssetDetailController<S> {
    pub fn open(
        store: Rc<S>,
        bus: Rc<ChangeBus>,
        user: User,
        asset: Asset,
    ) -> ControllerResult<Rc<Self>> {
        let controller = Rc::new(Self {
            core: DetailCore::new(store, bus, user, asset),
            membership: RefCell::new(AssetMembership::default()),
        });
        controller.recompute_membership()?;
        controller.core.attach(&controller);
        Ok(controller)
    }

    pub fn asset(&self) -> Asset {
        self.core.snapshot()
    }

    pub fn working(&self) -> Option<Asset> {
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

    /// Tasks and components currently holding this asset.
    pub fn membership(&self) -> AssetMembership {
        self.membership.borrow().clone()
    }

    pub fn begin_edit(&self) -> ControllerResult<()> {
        self.core.begin_edit()
    }

    pub fn discard(&self) {
        self.core.discard();
    }

    /// Edits name, type or location.
    pub fn update(&self, apply: impl FnOnce(&mut Asset)) -> ControllerResult<()> {
        self.core.edit(apply)
    }

    pub fn save(&self) -> ControllerResult<Asset> {
        self.core.save()
    }

    pub fn refresh(&self) -> ControllerResult<ReloadOutcome> {
        let outcome = self.core.refresh()?;
        self.recompute_membership()?;
        Ok(outcome)
    }

    pub fn dispose(&self) {
        self.core.dispose();
    }

    fn recompute_membership(&self) -> ControllerResult<()> {
        let state = self.core.state();
        let membership = if state.is_new() || state.is_stale() {
            AssetMembership::default()
        } else {
            let tasks = Repository::<Task>::load_all(self.core.store())?;
            let components = Repository::<Component>::load_all(self.core.store())?;
            AssetMembership::scan(state.snapshot(), &tasks, &components)
        };
        drop(state);
        *self.membership.borrow_mut() = membership;
        Ok(())
    }
}

impl<S: DataAccess + 'static> ChangeObserver for AssetDetailController<S> {
    fn on_change(&self, _event: &ChangeEvent) -> Result<(), ObserverError> {
        self.refresh()?;
        Ok(())
    }

    fn is_interested(&self, event: &ChangeEvent) -> bool {
        event.kind != EntityKind::User
    }

    fn observer_name(&self) -> &'static str {
        "asset_detail"
    }
}
