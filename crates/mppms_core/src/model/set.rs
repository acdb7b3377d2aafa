//! Typed, ordered, duplicate-free association set.
//!
//! # Responsibility
//! - Hold one side of a many-to-many association for display and persistence.
//!
//! # Invariants
//! - No two elements share identity (see `Entity::same_identity`).
//! - Iteration order is insertion order.
//! - Membership cost is linear; sets hold tens to low hundreds of entities.

use crate::model::entity::{Entity, EntityId};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Ordered set of entities of one type.
#[derive(Debug, Clone)]
pub struct EntitySet<T: Entity> {
    items: Vec<T>,
}

impl<T: Entity> Default for EntitySet<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T: Entity> EntitySet<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `entity` unless an equal element is already present.
    ///
    /// Returns whether the set changed.
    pub fn add(&mut self, entity: T) -> bool {
        if self.contains(&entity) {
            return false;
        }
        self.items.push(entity);
        true
    }

    /// Equivalent to repeated `add`.
    pub fn add_all(&mut self, entities: impl IntoIterator<Item = T>) {
        for entity in entities {
            self.add(entity);
        }
    }

    /// Removes the element equal to `entity`, if any.
    ///
    /// Returns whether the set changed.
    pub fn remove(&mut self, entity: &T) -> bool {
        match self.items.iter().position(|item| item.same_identity(entity)) {
            Some(index) => {
                self.items.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, entity: &T) -> bool {
        self.items.iter().any(|item| item.same_identity(entity))
    }

    /// Membership test by persisted id. Drafts never match.
    pub fn contains_id(&self, id: EntityId) -> bool {
        !id.is_draft() && self.items.iter().any(|item| item.id() == id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    /// Ids of every element, in insertion order.
    pub fn ids(&self) -> Vec<EntityId> {
        self.items.iter().map(Entity::id).collect()
    }

    /// Ordered export for list/table binding.
    pub fn to_vec(&self) -> Vec<T> {
        self.items.clone()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    /// Elements of `self` that are absent from `other`, in `self` order.
    pub fn difference(&self, other: &EntitySet<T>) -> EntitySet<T> {
        self.iter()
            .filter(|item| !other.contains(item))
            .cloned()
            .collect()
    }

    /// Same membership regardless of order.
    pub fn same_members(&self, other: &EntitySet<T>) -> bool {
        self.len() == other.len() && self.iter().all(|item| other.contains(item))
    }
}

impl<T: Entity> FromIterator<T> for EntitySet<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut set = Self::new();
        set.add_all(iter);
        set
    }
}

impl<T: Entity> IntoIterator for EntitySet<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a, T: Entity> IntoIterator for &'a EntitySet<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl<T: Entity + Serialize> Serialize for EntitySet<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.items.serialize(serializer)
    }
}

impl<'de, T: Entity + Deserialize<'de>> Deserialize<'de> for EntitySet<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // Re-applies dedup so wire input cannot break the set invariant.
        Vec::<T>::deserialize(deserializer).map(Self::from_iter)
    }
}

#[cfg(test)]
mod tests {
    use super::EntitySet;
    use crate::model::asset::Asset;
    use crate::model::entity::EntityId;

    fn asset(id: i64, name: &str) -> Asset {
        let mut asset = Asset::draft();
        asset.id = EntityId(id);
        asset.name = name.to_string();
        asset
    }

    #[test]
    fn add_ignores_equal_identity_even_with_changed_fields() {
        let mut set = EntitySet::new();
        assert!(set.add(asset(1, "before")));
        assert!(!set.add(asset(1, "after")));
        assert_eq!(set.len(), 1);
        assert_eq!(set.as_slice()[0].name, "before");
    }

    #[test]
    fn remove_is_idempotent() {
        let mut set: EntitySet<Asset> = [asset(1, "a"), asset(2, "b")].into_iter().collect();
        assert!(set.remove(&asset(1, "a")));
        assert!(!set.remove(&asset(1, "a")));
        assert!(!set.contains(&asset(1, "a")));
        assert_eq!(set.ids(), vec![EntityId(2)]);
    }

    #[test]
    fn difference_keeps_left_order() {
        let left: EntitySet<Asset> = [asset(3, "c"), asset(1, "a"), asset(2, "b")]
            .into_iter()
            .collect();
        let right: EntitySet<Asset> = [asset(1, "a")].into_iter().collect();
        assert_eq!(left.difference(&right).ids(), vec![EntityId(3), EntityId(2)]);
    }

    #[test]
    fn drafts_are_never_deduplicated_against_copies() {
        let draft = Asset::draft();
        let mut set = EntitySet::new();
        set.add(draft.clone());
        set.add(draft.clone());
        assert_eq!(set.len(), 2);
        assert!(!set.contains(&draft));
        assert!(!set.contains_id(EntityId::DRAFT));
    }
}
