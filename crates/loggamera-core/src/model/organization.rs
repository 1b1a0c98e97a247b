// ── Organization hierarchy ──

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use loggamera_api::OrganizationId;
use loggamera_api::models::Organization;
use serde::Serialize;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrganizationNode {
    pub id: OrganizationId,
    pub name: String,
    /// `None` for roots.
    pub parent: Option<OrganizationId>,
    pub children: Vec<OrganizationId>,
}

/// Read-only tree of the organizations an API key can see.
///
/// Organizations whose parent is not visible become roots. Parent links
/// that form a cycle are cut, so every node is reachable from exactly one
/// root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OrganizationTree {
    nodes: BTreeMap<OrganizationId, OrganizationNode>,
    roots: Vec<OrganizationId>,
}

impl OrganizationTree {
    pub fn build(organizations: impl IntoIterator<Item = Organization>) -> Self {
        let mut nodes: BTreeMap<OrganizationId, OrganizationNode> = BTreeMap::new();
        for org in organizations {
            let parent = org.parent().filter(|&p| p != org.id);
            nodes.entry(org.id).or_insert(OrganizationNode {
                id: org.id,
                name: org.name,
                parent,
                children: Vec::new(),
            });
        }

        // Dangling parents make roots.
        let ids: BTreeSet<OrganizationId> = nodes.keys().copied().collect();
        for node in nodes.values_mut() {
            if node.parent.is_some_and(|p| !ids.contains(&p)) {
                node.parent = None;
            }
        }

        let mut tree = Self {
            nodes,
            roots: Vec::new(),
        };
        let mut reached = BTreeSet::new();
        let initial_roots: Vec<OrganizationId> = tree
            .nodes
            .values()
            .filter(|n| n.parent.is_none())
            .map(|n| n.id)
            .collect();
        for root in initial_roots {
            tree.attach_root(root, &mut reached);
        }

        // Whatever is left sits on a parent cycle.
        while let Some(&orphan) = ids.iter().find(|id| !reached.contains(*id)) {
            warn!(organization = %orphan, "organization parent cycle, treating as root");
            if let Some(node) = tree.nodes.get_mut(&orphan) {
                node.parent = None;
            }
            tree.attach_root(orphan, &mut reached);
        }
        tree.roots.sort_unstable();
        tree
    }

    /// Register `root` and link every node reachable below it.
    fn attach_root(&mut self, root: OrganizationId, reached: &mut BTreeSet<OrganizationId>) {
        self.roots.push(root);
        reached.insert(root);
        let mut queue = VecDeque::from([root]);
        while let Some(current) = queue.pop_front() {
            let children: Vec<OrganizationId> = self
                .nodes
                .values()
                .filter(|n| n.parent == Some(current) && !reached.contains(&n.id))
                .map(|n| n.id)
                .collect();
            for &child in &children {
                reached.insert(child);
                queue.push_back(child);
            }
            if let Some(node) = self.nodes.get_mut(&current) {
                node.children = children;
            }
        }
    }

    pub fn roots(&self) -> &[OrganizationId] {
        &self.roots
    }

    pub fn find(&self, id: OrganizationId) -> Option<&OrganizationNode> {
        self.nodes.get(&id)
    }

    pub fn contains(&self, id: OrganizationId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Ids from the root down to `id`, inclusive. `None` if `id` is unknown.
    pub fn path_to(&self, id: OrganizationId) -> Option<Vec<OrganizationId>> {
        let mut path = vec![id];
        let mut current = self.nodes.get(&id)?;
        while let Some(parent) = current.parent {
            if path.contains(&parent) {
                break;
            }
            path.push(parent);
            match self.nodes.get(&parent) {
                Some(node) => current = node,
                None => break,
            }
        }
        path.reverse();
        Some(path)
    }

    /// Every id, breadth-first from the roots (parents before children).
    pub fn walk(&self) -> Vec<OrganizationId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut queue: VecDeque<OrganizationId> = self.roots.iter().copied().collect();
        while let Some(id) = queue.pop_front() {
            order.push(id);
            if let Some(node) = self.nodes.get(&id) {
                queue.extend(node.children.iter().copied());
            }
        }
        order
    }

    pub fn iter(&self) -> impl Iterator<Item = &OrganizationNode> {
        self.nodes.values()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
