//! State shared by the entity detail controllers.
//!
//! # Invariants
//! - The displayed snapshot is never mutated by edits; edits go to a
//!   separate working value built from it.
//! - A draft opens in edit mode and has nothing to re-load.
//! - A snapshot whose row disappeared is marked stale and leaves edit mode.

use crate::controller::{ControllerError, ControllerResult};
use crate::events::bus::{ChangeBus, ChangeObserver, SubscriptionId};
use crate::events::ChangeEvent;
use crate::model::entity::Entity;
use crate::model::set::EntitySet;
use crate::model::user::User;
use crate::repo::store::{RepoError, Repository};
use crate::service::relationship::ChoiceEditor;
use log::info;
use std::cell::{Cell, Ref, RefCell};
use std::rc::Rc;

/// Result of re-loading a detail snapshot by id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadOutcome {
    /// Draft snapshot; nothing persisted to re-load.
    Draft,
    Reloaded,
    /// The row no longer exists; the panel is stale.
    Vanished,
}

#[derive(Debug, Clone)]
pub struct DetailState<T: Entity> {
    snapshot: T,
    working: Option<T>,
    stale: bool,
}

impl<T: Entity> DetailState<T> {
    pub fn open(entity: T) -> Self {
        let working = entity.is_draft().then(|| entity.clone());
        Self {
            snapshot: entity,
            working,
            stale: false,
        }
    }

    pub fn snapshot(&self) -> &T {
        &self.snapshot
    }

    /// Working value while editing.
    pub fn working(&self) -> Option<&T> {
        self.working.as_ref()
    }

    pub fn is_new(&self) -> bool {
        self.snapshot.is_draft()
    }

    pub fn is_editing(&self) -> bool {
        self.working.is_some()
    }

    pub fn is_stale(&self) -> bool {
        self.stale
    }

    pub fn begin_edit(&mut self) -> ControllerResult<()> {
        self.ensure_live()?;
        if self.working.is_none() {
            self.working = Some(self.snapshot.clone());
        }
        Ok(())
    }

    /// Drops pending edits. A draft resets to its opening value.
    pub fn discard(&mut self) {
        self.working = self.is_new().then(|| self.snapshot.clone());
    }

    pub fn edit(&mut self, apply: impl FnOnce(&mut T)) -> ControllerResult<()> {
        self.ensure_live()?;
        let working = self.working.as_mut().ok_or(ControllerError::NotEditing)?;
        apply(working);
        Ok(())
    }

    /// Value a save would persist.
    pub fn pending(&self) -> ControllerResult<T> {
        self.ensure_live()?;
        self.working.clone().ok_or(ControllerError::NotEditing)
    }

    /// Applies `apply` to the working value too, so a later save keeps it.
    pub fn mirror_into_working(&mut self, apply: impl FnOnce(&mut T)) {
        if let Some(working) = self.working.as_mut() {
            apply(working);
        }
    }

    /// Replaces the snapshot and keeps any working value.
    pub fn replace_snapshot(&mut self, saved: T) {
        self.snapshot = saved;
        self.stale = false;
    }

    pub fn adopt_saved(&mut self, saved: T) {
        self.snapshot = saved;
        self.working = None;
        self.stale = false;
    }

    pub fn reload<R>(&mut self, repo: &R) -> ControllerResult<ReloadOutcome>
    where
        R: Repository<T> + ?Sized,
    {
        if self.is_new() {
            return Ok(ReloadOutcome::Draft);
        }
        match repo.load_by_id(self.snapshot.id()) {
            Ok(fresh) => {
                self.snapshot = fresh;
                self.stale = false;
                Ok(ReloadOutcome::Reloaded)
            }
            Err(RepoError::NotFound { kind, id }) => {
                if !self.stale {
                    info!("event=detail_stale module=controller status=ok kind={kind} id={id}");
                }
                self.stale = true;
                self.working = None;
                Ok(ReloadOutcome::Vanished)
            }
            Err(err) => Err(err.into()),
        }
    }

    pub fn ensure_live(&self) -> ControllerResult<()> {
        if self.stale {
            return Err(ControllerError::Stale {
                kind: T::KIND,
                id: self.snapshot.id(),
            });
        }
        Ok(())
    }
}

/// Saves `value`, re-loads it by id, and returns it with the event to publish.
pub fn persist<T, R>(repo: &R, value: &T) -> ControllerResult<(T, ChangeEvent)>
where
    T: Entity,
    R: Repository<T> + ?Sized,
{
    let was_draft = value.is_draft();
    let saved = repo.save(value)?;
    let reloaded = repo.load_by_id(saved.id())?;
    let event = ChangeEvent::saved(&reloaded, was_draft);
    Ok((reloaded, event))
}

/// Store, bus and state plumbing behind every detail controller.
pub struct DetailCore<S, T: Entity> {
    store: Rc<S>,
    bus: Rc<ChangeBus>,
    user: User,
    state: RefCell<DetailState<T>>,
    subscription: Cell<Option<SubscriptionId>>,
}

impl<S, T> DetailCore<S, T>
where
    S: Repository<T> + 'static,
    T: Entity,
{
    pub fn new(store: Rc<S>, bus: Rc<ChangeBus>, user: User, entity: T) -> Self {
        Self {
            store,
            bus,
            user,
            state: RefCell::new(DetailState::open(entity)),
            subscription: Cell::new(None),
        }
    }

    /// Subscribes the owning controller.
    pub fn attach<O: ChangeObserver + 'static>(&self, owner: &Rc<O>) {
        let id = self.bus.subscribe(owner);
        self.subscription.set(Some(id));
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn user(&self) -> &User {
        &self.user
    }

    pub fn state(&self) -> Ref<'_, DetailState<T>> {
        self.state.borrow()
    }

    pub fn snapshot(&self) -> T {
        self.state.borrow().snapshot().clone()
    }

    pub fn begin_edit(&self) -> ControllerResult<()> {
        self.state.borrow_mut().begin_edit()
    }

    pub fn discard(&self) {
        self.state.borrow_mut().discard();
    }

    pub fn edit(&self, apply: impl FnOnce(&mut T)) -> ControllerResult<()> {
        self.state.borrow_mut().edit(apply)
    }

    /// Persists the working value, re-loads it and publishes.
    pub fn save(&self) -> ControllerResult<T> {
        let pending = self.state.borrow().pending()?;
        let (saved, event) = persist(&*self.store, &pending)?;
        self.state.borrow_mut().adopt_saved(saved.clone());
        self.bus.publish(event);
        Ok(saved)
    }

    pub fn refresh(&self) -> ControllerResult<ReloadOutcome> {
        let mut state = self.state.borrow_mut();
        state.reload(&*self.store)
    }

    /// Opens a chooser over `universe` with `current` members checked.
    pub fn chooser<A: Entity>(
        &self,
        universe: Vec<A>,
        current: impl FnOnce(&T) -> &EntitySet<A>,
    ) -> ControllerResult<ChoiceEditor<A>> {
        let state = self.state.borrow();
        state.ensure_live()?;
        let shown = state.working().unwrap_or(state.snapshot());
        Ok(ChoiceEditor::new(universe, current(shown)))
    }

    /// Replaces one association wholesale with the editor's chosen set.
    ///
    /// `rebuild` returns a copy of the entity holding the new set. A persisted
    /// entity is saved, re-loaded and published at once; a draft only has its
    /// working value replaced.
    pub fn apply_association<A: Entity>(
        &self,
        field: &'static str,
        editor: &ChoiceEditor<A>,
        rebuild: fn(&T, EntitySet<A>) -> T,
    ) -> ControllerResult<T> {
        let chosen = editor.chosen();
        let diff = editor.diff();
        let next = {
            let mut state = self.state.borrow_mut();
            state.ensure_live()?;
            if state.is_new() {
                state.mirror_into_working(|working| *working = rebuild(working, chosen));
                return state.pending();
            }
            rebuild(state.snapshot(), chosen.clone())
        };

        let (saved, event) = persist(&*self.store, &next)?;
        {
            let mut state = self.state.borrow_mut();
            state.replace_snapshot(saved.clone());
            state.mirror_into_working(|working| *working = rebuild(working, chosen));
        }
        info!(
            "event=association_edit module=controller status=ok kind={} id={} field={} added={} removed={}",
            T::KIND,
            saved.id(),
            field,
            diff.added.len(),
            diff.removed.len()
        );
        self.bus.publish(event);
        Ok(saved)
    }

    pub fn dispose(&self) {
        if let Some(id) = self.subscription.take() {
            self.bus.unsubscribe(id);
        }
    }
}

impl<S, T: Entity> Drop for DetailCore<S, T> {
    fn drop(&mut self) {
        if let Some(id) = self.subscription.take() {
            self.bus.unsubscribe(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{DetailState, ReloadOutcome};
    use crate::controller::ControllerError;
    use crate::model::asset::Asset;
    use crate::model::entity::{Entity, EntityId};
    use crate::repo::store::Repository;
    use crate::repo::MemoryStore;

    #[test]
    fn draft_opens_in_edit_mode() {
        let state = DetailState::open(Asset::draft());
        assert!(state.is_new());
        assert!(state.is_editing());
    }

    #[test]
    fn edits_leave_snapshot_untouched_until_saved() {
        let mut asset = Asset::new("pump", "", "");
        asset.id = EntityId(3);
        let mut state = DetailState::open(asset);
        assert!(matches!(
            state.edit(|a| a.name = "x".to_string()),
            Err(ControllerError::NotEditing)
        ));

        state.begin_edit().unwrap();
        state.edit(|a| a.name = "valve".to_string()).unwrap();
        assert_eq!(state.snapshot().name, "pump");
        assert_eq!(state.pending().unwrap().name, "valve");

        state.discard();
        assert!(!state.is_editing());
    }

    #[test]
    fn reload_of_deleted_row_marks_stale() {
        let store = MemoryStore::in_memory();
        let saved = store.save(&Asset::new("pump", "", "")).unwrap();
        let mut state = DetailState::open(saved.clone());
        Repository::<Asset>::delete(&store, saved.id()).unwrap();

        assert_eq!(state.reload(&store).unwrap(), ReloadOutcome::Vanished);
        assert!(state.is_stale());
        assert!(matches!(
            state.begin_edit(),
            Err(ControllerError::Stale { .. })
        ));
    }
}
