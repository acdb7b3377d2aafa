//! Derived asset membership.
//!
//! An asset stores no back-references; its tasks and components are found
//! by scanning the authoritative association sets of a scope.

use crate::model::asset::Asset;
use crate::model::component::Component;
use crate::model::entity::Entity;
use crate::model::project::Project;
use crate::model::set::EntitySet;
use crate::model::task::Task;

/// Tasks and components of a scope that currently hold an asset.
#[derive(Debug, Clone, Default)]
pub struct AssetMembership {
    pub tasks: EntitySet<Task>,
    pub components: EntitySet<Component>,
}

impl AssetMembership {
    pub fn scan<'a>(
        asset: &Asset,
        tasks: impl IntoIterator<Item = &'a Task>,
        components: impl IntoIterator<Item = &'a Component>,
    ) -> Self {
        let id = asset.id();
        Self {
            tasks: tasks
                .into_iter()
                .filter(|task| task.assets.contains_id(id))
                .cloned()
                .collect(),
            components: components
                .into_iter()
                .filter(|component| component.assets.contains_id(id))
                .cloned()
                .collect(),
        }
    }

    /// Membership within one project's tasks and components.
    pub fn within_project(asset: &Asset, project: &Project) -> Self {
        Self::scan(asset, &project.tasks, &project.components)
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty() && self.components.is_empty()
    }
}

/// Split of a project's tasks and components around one asset.
#[derive(Debug, Clone, Default)]
pub struct AssetPlacement {
    /// Tasks holding the asset; targets for "remove from task".
    pub removable_tasks: EntitySet<Task>,
    /// Tasks without the asset; targets for "add to task".
    pub addable_tasks: EntitySet<Task>,
    pub removable_components: EntitySet<Component>,
    pub addable_components: EntitySet<Component>,
}

impl AssetPlacement {
    pub fn within_project(asset: &Asset, project: &Project) -> Self {
        let id = asset.id();
        let (removable_tasks, addable_tasks): (Vec<Task>, Vec<Task>) = project
            .tasks
            .iter()
            .cloned()
            .partition(|task| task.assets.contains_id(id));
        let (removable_components, addable_components): (Vec<Component>, Vec<Component>) =
            project
                .components
                .iter()
                .cloned()
                .partition(|component| component.assets.contains_id(id));
        Self {
            removable_tasks: removable_tasks.into_iter().collect(),
            addable_tasks: addable_tasks.into_iter().collect(),
            removable_components: removable_components.into_iter().collect(),
            addable_components: addable_components.into_iter().collect(),
        }
    }
}
