//! Choose-from-universe association editing.
//!
//! # Responsibility
//! - Present a universe of entities with current members pre-checked.
//! - Return the full chosen set on confirm, plus the diff for logging.
//!
//! # Invariants
//! - Drafts never appear in the universe.
//! - `chosen()` is ordered by universe order.
//! - Members of the current set that are absent from the universe are not
//!   offered and therefore drop out of `chosen()`.

use crate::model::entity::{Entity, EntityId};
use crate::model::set::EntitySet;

/// One row of the chooser.
#[derive(Debug, Clone)]
pub struct Choice<T: Entity> {
    pub entity: T,
    pub checked: bool,
}

/// Entities added and removed relative to the set the editor was opened with.
#[derive(Debug, Clone)]
pub struct AssociationDiff<T: Entity> {
    pub added: EntitySet<T>,
    pub removed: EntitySet<T>,
}

impl<T: Entity> AssociationDiff<T> {
    pub fn between(before: &EntitySet<T>, after: &EntitySet<T>) -> Self {
        Self {
            added: after.difference(before),
            removed: before.difference(after),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct ChoiceEditor<T: Entity> {
    choices: Vec<Choice<T>>,
    initial: EntitySet<T>,
}

impl<T: Entity> ChoiceEditor<T> {
    pub fn new(universe: impl IntoIterator<Item = T>, current: &EntitySet<T>) -> Self {
        let offered: EntitySet<T> = universe
            .into_iter()
            .filter(|entity| !entity.is_draft())
            .collect();
        let choices = offered
            .into_iter()
            .map(|entity| {
                let checked = current.contains_id(entity.id());
                Choice { entity, checked }
            })
            .collect();
        Self {
            choices,
            initial: current.clone(),
        }
    }

    pub fn choices(&self) -> &[Choice<T>] {
        &self.choices
    }

    pub fn is_checked(&self, id: EntityId) -> bool {
        self.choices
            .iter()
            .any(|choice| choice.checked && choice.entity.id() == id)
    }

    /// Sets one row. Returns false when `id` is not offered.
    pub fn set_checked(&mut self, id: EntityId, checked: bool) -> bool {
        match self.choices.iter_mut().find(|choice| choice.entity.id() == id) {
            Some(choice) => {
                choice.checked = checked;
                true
            }
            None => false,
        }
    }

    /// Flips one row and returns its new state.
    pub fn toggle(&mut self, id: EntityId) -> Option<bool> {
        let choice = self
            .choices
            .iter_mut()
            .find(|choice| choice.entity.id() == id)?;
        choice.checked = !choice.checked;
        Some(choice.checked)
    }

    /// Checks exactly the rows whose ids are in `ids`.
    pub fn select_only(&mut self, ids: &[EntityId]) {
        for choice in &mut self.choices {
            choice.checked = ids.contains(&choice.entity.id());
        }
    }

    /// Full replacement set for the association.
    pub fn chosen(&self) -> EntitySet<T> {
        self.choices
            .iter()
            .filter(|choice| choice.checked)
            .map(|choice| choice.entity.clone())
            .collect()
    }

    /// Offered entities not currently checked.
    pub fn unchosen(&self) -> EntitySet<T> {
        self.choices
            .iter()
            .filter(|choice| !choice.checked)
            .map(|choice| choice.entity.clone())
            .collect()
    }

    pub fn diff(&self) -> AssociationDiff<T> {
        AssociationDiff::between(&self.initial, &self.chosen())
    }

    /// True when confirming would change membership; reordering alone does not.
    pub fn is_dirty(&self) -> bool {
        !self.chosen().same_members(&self.initial)
    }
}

#[cfg(test)]
mod tests {
    use super::ChoiceEditor;
    use crate::model::entity::EntityId;
    use crate::model::set::EntitySet;
    use crate::model::user::{User, UserRole};

    fn user(id: i64) -> User {
        let mut user = User::new(format!("user-{id}"), UserRole::Other);
        user.id = EntityId(id);
        user
    }

    #[test]
    fn current_members_start_checked() {
        let current: EntitySet<User> = [user(2)].into_iter().collect();
        let editor = ChoiceEditor::new(vec![user(1), user(2), user(3)], &current);
        assert!(!editor.is_checked(EntityId(1)));
        assert!(editor.is_checked(EntityId(2)));
        assert!(!editor.is_dirty());
    }

    #[test]
    fn drafts_are_not_offered() {
        let editor = ChoiceEditor::new(vec![User::draft(), user(4)], &EntitySet::new());
        assert_eq!(editor.choices().len(), 1);
        assert_eq!(editor.choices()[0].entity.id, EntityId(4));
    }

    #[test]
    fn diff_reports_both_directions() {
        let current: EntitySet<User> = [user(1), user(2)].into_iter().collect();
        let mut editor = ChoiceEditor::new(vec![user(1), user(2), user(3)], &current);
        editor.toggle(EntityId(1));
        editor.set_checked(EntityId(3), true);

        let diff = editor.diff();
        assert_eq!(diff.added.ids(), vec![EntityId(3)]);
        assert_eq!(diff.removed.ids(), vec![EntityId(1)]);
        assert_eq!(editor.chosen().ids(), vec![EntityId(2), EntityId(3)]);
    }

    #[test]
    fn toggle_unknown_id_is_none() {
        let mut editor = ChoiceEditor::new(vec![user(1)], &EntitySet::new());
        assert_eq!(editor.toggle(EntityId(99)), None);
        assert!(!editor.set_checked(EntityId(99), true));
    }
}
