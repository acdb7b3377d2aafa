//! Component domain model.

use crate::model::asset::Asset;
use crate::model::entity::{identity_eq, Entity, EntityId, EntityKind};
use crate::model::set::EntitySet;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Component {
    pub id: EntityId,
    pub description: String,
    pub assets: EntitySet<Asset>,
}

identity_eq!(Component);

impl Component {
    pub fn draft() -> Self {
        Self {
            id: EntityId::DRAFT,
            description: String::new(),
            assets: EntitySet::new(),
        }
    }

    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            ..Self::draft()
        }
    }

    /// Returns a copy with `assets` replaced wholesale.
    pub fn with_assets(&self, assets: EntitySet<Asset>) -> Self {
        Self {
            assets,
            ..self.clone()
        }
    }
}

impl Entity for Component {
    const KIND: EntityKind = EntityKind::Component;

    fn id(&self) -> EntityId {
        self.id
    }

    fn label(&self) -> String {
        self.description.clone()
    }
}
