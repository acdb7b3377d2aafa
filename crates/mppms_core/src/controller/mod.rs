//! Live, selection-preserving controllers.
//!
//! # Responsibility
//! - Keep each view model in step with the store after every change.
//! - Gate edits on the signed-in user's role.
//!
//! # Invariants
//! - Controllers are shared as `Rc<Self>` and mutate through `&self`.
//! - No `RefCell` borrow is held across `ChangeBus::publish`; a publish may
//!   call straight back into the controller that issued it.
//! - A controller unsubscribes on `dispose` and on drop.

pub mod asset_detail;
pub mod component_detail;
pub mod detail;
pub mod hierarchy;
pub mod index;
pub mod project_detail;
pub mod selection;
pub mod task_detail;

use crate::model::entity::{EntityId, EntityKind};
use crate::repo::store::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ControllerResult<T> = Result<T, ControllerError>;

/// Errors from controller actions.
#[derive(Debug)]
pub enum ControllerError {
    Repo(RepoError),
    /// The signed-in user's role does not allow the action.
    PermissionDenied(&'static str),
    /// The action needs a selection and none is active.
    NoSelection,
    /// Edit action called outside edit mode.
    NotEditing,
    /// Target entity is outside the scope the action applies to.
    NotInScope { kind: EntityKind, id: EntityId },
    /// The entity shown by the controller no longer exists.
    Stale { kind: EntityKind, id: EntityId },
}

impl Display for ControllerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Repo(err) => write!(f, "{err}"),
            Self::PermissionDenied(action) => write!(f, "permission denied: {action}"),
            Self::NoSelection => write!(f, "no selection"),
            Self::NotEditing => write!(f, "not in edit mode"),
            Self::NotInScope { kind, id } => write!(f, "{kind} {id} is not in scope"),
            Self::Stale { kind, id } => write!(f, "{kind} {id} no longer exists"),
        }
    }
}

impl Error for ControllerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for ControllerError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}
