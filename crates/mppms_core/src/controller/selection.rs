//! Selection-preserving refresh.
//!
//! # Responsibility
//! - Capture a view's selection by identity, re-render fresh data, and
//!   re-apply the selection to the equal entity in the fresh data.
//!
//! # Invariants
//! - A selection survives a refresh iff an entity with the same id is in
//!   the fresh data; field changes do not matter.
//! - A vanished selection is cleared, never moved to a neighbour.

use crate::model::entity::{Entity, EntityId};
use log::info;

/// Presentation contract for one live collection.
pub trait CollectionView<T: Entity> {
    fn render_collection(&mut self, items: &[T]);
    fn selected(&self) -> Option<&T>;
    fn set_selected(&mut self, entity: Option<&T>);
}

/// What happened to the selection across one refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionOutcome {
    Unselected,
    Kept(EntityId),
    Lost(EntityId),
}

impl SelectionOutcome {
    pub fn selected_id(self) -> Option<EntityId> {
        match self {
            Self::Kept(id) => Some(id),
            Self::Unselected | Self::Lost(_) => None,
        }
    }

    pub fn is_lost(self) -> bool {
        matches!(self, Self::Lost(_))
    }
}

/// Re-renders `view` from `fresh` and restores its selection by identity.
pub fn refresh_preserving_selection<T, V>(view: &mut V, fresh: &[T]) -> SelectionOutcome
where
    T: Entity,
    V: CollectionView<T> + ?Sized,
{
    let captured = view.selected().map(Entity::id);
    view.render_collection(fresh);

    let Some(id) = captured else {
        view.set_selected(None);
        return SelectionOutcome::Unselected;
    };
    match fresh.iter().find(|entity| !id.is_draft() && entity.id() == id) {
        Some(entity) => {
            view.set_selected(Some(entity));
            SelectionOutcome::Kept(id)
        }
        None => {
            view.set_selected(None);
            info!(
                "event=selection_lost module=controller status=ok kind={} id={}",
                T::KIND,
                id
            );
            SelectionOutcome::Lost(id)
        }
    }
}

/// Row-backed table view model.
#[derive(Debug, Clone)]
pub struct TableModel<T: Entity> {
    rows: Vec<T>,
    selected: Option<usize>,
}

impl<T: Entity> Default for TableModel<T> {
    fn default() -> Self {
        Self {
            rows: Vec::new(),
            selected: None,
        }
    }
}

impl<T: Entity> TableModel<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(&self) -> &[T] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, id: EntityId) -> Option<&T> {
        self.rows.iter().find(|row| !id.is_draft() && row.id() == id)
    }

    pub fn selected_id(&self) -> Option<EntityId> {
        self.selected().map(Entity::id)
    }

    /// Selects the row with `id`; returns false and clears when absent.
    pub fn select_id(&mut self, id: EntityId) -> bool {
        self.selected = self
            .rows
            .iter()
            .position(|row| !id.is_draft() && row.id() == id);
        self.selected.is_some()
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }
}

impl<T: Entity> CollectionView<T> for TableModel<T> {
    fn render_collection(&mut self, items: &[T]) {
        self.rows = items.to_vec();
        self.selected = None;
    }

    fn selected(&self) -> Option<&T> {
        self.selected.and_then(|index| self.rows.get(index))
    }

    fn set_selected(&mut self, entity: Option<&T>) {
        self.selected = entity.and_then(|wanted| {
            self.rows
                .iter()
                .position(|row| row.same_identity(wanted))
        });
    }
}
