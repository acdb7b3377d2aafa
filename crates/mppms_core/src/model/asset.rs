//! Asset domain model.
//!
//! Assets carry no association fields. Which tasks or components an asset
//! belongs to is derived from their association sets, see
//! `service::membership`.

use crate::model::entity::{identity_eq, Entity, EntityId, EntityKind};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Asset {
    pub id: EntityId,
    pub name: String,
    /// Serialized as `type` to match external schema naming.
    #[serde(rename = "type")]
    pub asset_type: String,
    pub location: String,
}

identity_eq!(Asset);

impl Asset {
    pub fn draft() -> Self {
        Self {
            id: EntityId::DRAFT,
            name: String::new(),
            asset_type: String::new(),
            location: String::new(),
        }
    }

    pub fn new(
        name: impl Into<String>,
        asset_type: impl Into<String>,
        location: impl Into<String>,
    ) -> Self {
        Self {
            id: EntityId::DRAFT,
            name: name.into(),
            asset_type: asset_type.into(),
            location: location.into(),
        }
    }
}

impl Entity for Asset {
    const KIND: EntityKind = EntityKind::Asset;

    fn id(&self) -> EntityId {
        self.id
    }

    fn label(&self) -> String {
        if self.asset_type.is_empty() {
            self.name.clone()
        } else {
            format!("{} ({})", self.name, self.asset_type)
        }
    }
}
