//! Project hierarchy derivation.
//!
//! # Responsibility
//! - Derive `root -> project -> {Tasks, Components} -> task/component -> asset`
//!   from flat association sets.
//!
//! # Invariants
//! - Projects appear in input order; nothing is re-sorted.
//! - Every project node has exactly two branch nodes, Tasks then
//!   Components, even when the underlying set is empty.
//! - Every non-root node carries a direct reference to its owning project
//!   node; callers never walk ancestors by depth.
//! - Node keys are structural and survive a rebuild from fresh data.

use crate::model::asset::Asset;
use crate::model::component::Component;
use crate::model::entity::{Entity, EntityId};
use crate::model::project::Project;
use crate::model::task::Task;
use log::debug;
use std::collections::BTreeMap;
use std::time::Instant;

/// Arena index of one node. Valid only for the tree that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// Named grouping under a project node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BranchKind {
    Tasks,
    Components,
}

impl BranchKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Tasks => "Tasks",
            Self::Components => "Components",
        }
    }
}

/// Parent of an asset leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AssetOwner {
    Task(EntityId),
    Component(EntityId),
}

/// Identity of a node across rebuilds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeKey {
    Root,
    Project(EntityId),
    Branch {
        project: EntityId,
        branch: BranchKind,
    },
    Task {
        project: EntityId,
        task: EntityId,
    },
    Component {
        project: EntityId,
        component: EntityId,
    },
    Asset {
        project: EntityId,
        owner: AssetOwner,
        asset: EntityId,
    },
}

impl NodeKey {
    /// Owning project id; `None` only for the root.
    pub fn project_id(&self) -> Option<EntityId> {
        match *self {
            Self::Root => None,
            Self::Project(project)
            | Self::Branch { project, .. }
            | Self::Task { project, .. }
            | Self::Component { project, .. }
            | Self::Asset { project, .. } => Some(project),
        }
    }

    pub fn is_asset(&self) -> bool {
        matches!(self, Self::Asset { .. })
    }
}

/// Entity snapshot carried by a node.
#[derive(Debug, Clone)]
pub enum NodePayload {
    Root,
    Project(Project),
    Branch(BranchKind),
    Task(Task),
    Component(Component),
    Asset { asset: Asset, owner: AssetOwner },
}

#[derive(Debug, Clone)]
pub struct HierarchyNode {
    key: NodeKey,
    payload: NodePayload,
    parent: Option<NodeId>,
    project: Option<NodeId>,
    children: Vec<NodeId>,
}

impl HierarchyNode {
    pub fn key(&self) -> NodeKey {
        self.key
    }

    pub fn payload(&self) -> &NodePayload {
        &self.payload
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Owning project node; a project node points at itself.
    pub fn project_node(&self) -> Option<NodeId> {
        self.project
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn asset(&self) -> Option<&Asset> {
        match &self.payload {
            NodePayload::Asset { asset, .. } => Some(asset),
            _ => None,
        }
    }

    pub fn label(&self) -> String {
        match &self.payload {
            NodePayload::Root => "Projects".to_string(),
            NodePayload::Project(project) => project.label(),
            NodePayload::Branch(branch) => branch.label().to_string(),
            NodePayload::Task(task) => task.label(),
            NodePayload::Component(component) => component.label(),
            NodePayload::Asset { asset, .. } => asset.label(),
        }
    }
}

/// Arena-backed hierarchy built from one snapshot of projects.
#[derive(Debug, Clone)]
pub struct HierarchyTree {
    nodes: Vec<HierarchyNode>,
    index: BTreeMap<NodeKey, NodeId>,
}

impl HierarchyTree {
    /// Builds the tree for `projects`, in the order given.
    pub fn build(projects: &[Project]) -> Self {
        let started = Instant::now();
        let mut tree = Self {
            nodes: Vec::new(),
            index: BTreeMap::new(),
        };
        let root = tree.push(NodeKey::Root, NodePayload::Root, None, None);

        for project in projects {
            tree.attach_project(root, project);
        }

        debug!(
            "event=hierarchy_build module=service status=ok projects={} nodes={} duration_ms={}",
            projects.len(),
            tree.nodes.len(),
            started.elapsed().as_millis()
        );
        tree
    }

    fn attach_project(&mut self, root: NodeId, project: &Project) {
        let project_id = project.id();
        let node = self.push(
            NodeKey::Project(project_id),
            NodePayload::Project(project.clone()),
            Some(root),
            None,
        );
        self.nodes[node.0].project = Some(node);

        let tasks = self.push(
            NodeKey::Branch {
                project: project_id,
                branch: BranchKind::Tasks,
            },
            NodePayload::Branch(BranchKind::Tasks),
            Some(node),
            Some(node),
        );
        for task in &project.tasks {
            let task_node = self.push(
                NodeKey::Task {
                    project: project_id,
                    task: task.id(),
                },
                NodePayload::Task(task.clone()),
                Some(tasks),
                Some(node),
            );
            self.attach_assets(
                task_node,
                node,
                project_id,
                AssetOwner::Task(task.id()),
                &task.assets,
            );
        }

        let components = self.push(
            NodeKey::Branch {
                project: project_id,
                branch: BranchKind::Components,
            },
            NodePayload::Branch(BranchKind::Components),
            Some(node),
            Some(node),
        );
        for component in &project.components {
            let component_node = self.push(
                NodeKey::Component {
                    project: project_id,
                    component: component.id(),
                },
                NodePayload::Component(component.clone()),
                Some(components),
                Some(node),
            );
            self.attach_assets(
                component_node,
                node,
                project_id,
                AssetOwner::Component(component.id()),
                &component.assets,
            );
        }
    }

    fn attach_assets<'a>(
        &mut self,
        parent: NodeId,
        project_node: NodeId,
        project_id: EntityId,
        owner: AssetOwner,
        assets: impl IntoIterator<Item = &'a Asset>,
    ) {
        for asset in assets {
            self.push(
                NodeKey::Asset {
                    project: project_id,
                    owner,
                    asset: asset.id(),
                },
                NodePayload::Asset {
                    asset: asset.clone(),
                    owner,
                },
                Some(parent),
                Some(project_node),
            );
        }
    }

    fn push(
        &mut self,
        key: NodeKey,
        payload: NodePayload,
        parent: Option<NodeId>,
        project: Option<NodeId>,
    ) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(HierarchyNode {
            key,
            payload,
            parent,
            project,
            children: Vec::new(),
        });
        if let Some(parent) = parent {
            self.nodes[parent.0].children.push(id);
        }
        // Draft entities share id 0, so their keys can collide; first wins.
        self.index.entry(key).or_insert(id);
        id
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn node(&self, id: NodeId) -> Option<&HierarchyNode> {
        self.nodes.get(id.0)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map(HierarchyNode::children).unwrap_or(&[])
    }

    pub fn find(&self, key: &NodeKey) -> Option<NodeId> {
        self.index.get(key).copied()
    }

    /// Number of nodes, root included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True when no project is shown.
    pub fn is_empty(&self) -> bool {
        self.children(self.root()).is_empty()
    }

    /// Project snapshot owning `id`, resolved through the stored back-reference.
    pub fn owning_project(&self, id: NodeId) -> Option<&Project> {
        let project_node = self.node(id)?.project_node()?;
        match &self.node(project_node)?.payload {
            NodePayload::Project(project) => Some(project),
            _ => None,
        }
    }

    pub fn project_nodes(&self) -> &[NodeId] {
        self.children(self.root())
    }

    /// Named branch node of a project.
    pub fn branch(&self, project: EntityId, branch: BranchKind) -> Option<NodeId> {
        self.find(&NodeKey::Branch { project, branch })
    }

    /// First leaf for `asset` inside `project`, tasks before components.
    pub fn first_asset_leaf(&self, project: EntityId, asset: EntityId) -> Option<NodeId> {
        self.depth_first().into_iter().find_map(|(_, id)| {
            let key = self.nodes[id.0].key;
            match key {
                NodeKey::Asset {
                    project: p,
                    asset: a,
                    ..
                } if p == project && a == asset => Some(id),
                _ => None,
            }
        })
    }

    /// Pre-order walk with depth, root at depth 0.
    pub fn depth_first(&self) -> Vec<(usize, NodeId)> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![(0usize, self.root())];
        while let Some((depth, id)) = stack.pop() {
            out.push((depth, id));
            for child in self.children(id).iter().rev() {
                stack.push((depth + 1, *child));
            }
        }
        out
    }

    /// Indented text outline, two spaces per level.
    pub fn outline(&self) -> Vec<String> {
        self.depth_first()
            .into_iter()
            .map(|(depth, id)| format!("{}{}", "  ".repeat(depth), self.nodes[id.0].label()))
            .collect()
    }
}
