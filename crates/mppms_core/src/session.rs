//! Signed-in application session.
//!
//! Owns the change bus for its lifetime; every controller launched from a
//! session shares that bus and store.

use crate::controller::hierarchy::HierarchyController;
use crate::controller::index::IndexController;
use crate::controller::ControllerResult;
use crate::events::bus::ChangeBus;
use crate::model::entity::EntityId;
use crate::model::user::User;
use crate::repo::store::{DataAccess, Repository};
use log::info;
use std::rc::Rc;

pub struct AppSession<S: DataAccess + 'static> {
    store: Rc<S>,
    bus: Rc<ChangeBus>,
    user: User,
}

impl<S: DataAccess + 'static> AppSession<S> {
    /// Loads `user_id` and starts a session around `bus`.
    pub fn sign_in(store: Rc<S>, bus: ChangeBus, user_id: EntityId) -> ControllerResult<Self> {
        let user = Repository::<User>::load_by_id(&*store, user_id)?;
        info!(
            "event=session_sign_in module=session status=ok user_id={} role={}",
            user.id,
            user.role.as_str()
        );
        Ok(Self {
            store,
            bus: Rc::new(bus),
            user,
        })
    }

    pub fn store(&self) -> &Rc<S> {
        &self.store
    }

    pub fn bus(&self) -> &Rc<ChangeBus> {
        &self.bus
    }

    pub fn user(&self) -> &User {
        &self.user
    }

    pub fn launch_index(&self) -> ControllerResult<Rc<IndexController<S>>> {
        IndexController::launch(
            Rc::clone(&self.store),
            Rc::clone(&self.bus),
            self.user.clone(),
        )
    }

    pub fn open_hierarchy(&self) -> ControllerResult<Rc<HierarchyController<S>>> {
        HierarchyController::open(
            Rc::clone(&self.store),
            Rc::clone(&self.bus),
            self.user.clone(),
        )
    }
}
