use serde::{Deserialize, Serialize};
use slotmap::SecondaryMap;
use tracing::{debug, trace, warn};

use crate::common::config::TreeConfig;
use crate::model::container::{Container, ContainerKind, Containers};
use crate::model::error::TreeError;
use crate::model::focus::FocusHistory;
use crate::model::tree::{self, NodeId, NodeMap, Tree, TreeEvent};

/// Hierarchy of workspaces, split panes and windows.
///
/// Containers are addressed by [`NodeId`] handles. Parent and focus pointers
/// are plain handles into the same arena, so nothing here is reference
/// counted. A handle to a destroyed container is never reused; queries on it
/// return [`TreeError::NodeNotFound`] or empty results.
#[derive(Serialize, Deserialize)]
pub struct ContainerTree {
    tree: Tree<Components>,
    config: TreeConfig,
}

impl Default for ContainerTree {
    fn default() -> Self { Self::new() }
}

impl ContainerTree {
    pub fn new() -> Self { Self::with_config(TreeConfig::default()) }

    pub fn with_config(config: TreeConfig) -> Self {
        ContainerTree {
            tree: Tree::with_observer(Components::new(&config)),
            config,
        }
    }

    pub fn config(&self) -> &TreeConfig { &self.config }

    fn map(&self) -> &NodeMap { &self.tree.map }

    fn live(&self, node: NodeId) -> Result<NodeId, TreeError> {
        if self.contains(node) {
            Ok(node)
        } else {
            Err(TreeError::NodeNotFound(node))
        }
    }

    /// Creates a container that is not attached to anything yet.
    pub fn create(&mut self, kind: ContainerKind) -> NodeId {
        let node = self.tree.mk_node();
        if let Some(container) = self.tree.data.containers.get_mut(node) {
            container.kind = kind;
        }
        trace!(?node, ?kind, "created container");
        node
    }

    /// Deletes `node` and its whole subtree. Returns false if `node` did not
    /// exist.
    pub fn destroy(&mut self, node: NodeId) -> bool {
        if !self.contains(node) {
            return false;
        }
        trace!(?node, "destroying container");
        self.tree.remove(node);
        true
    }

    pub fn contains(&self, node: NodeId) -> bool { self.map().contains(node) }

    /// Number of containers alive in the forest, attached or not.
    pub fn len(&self) -> usize { self.map().len() }

    pub fn is_empty(&self) -> bool { self.map().is_empty() }

    pub fn roots(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.map().ids().filter(|&id| id.parent(self.map()).is_none())
    }

    pub fn container(&self, node: NodeId) -> Option<&Container> {
        self.tree.data.containers.get(node)
    }

    pub fn container_mut(&mut self, node: NodeId) -> Option<&mut Container> {
        self.tree.data.containers.get_mut(node)
    }

    // Structure.

    pub fn parent(&self, node: NodeId) -> Option<NodeId> { node.parent(self.map()) }

    pub fn children(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        node.children(self.map())
    }

    pub fn children_rev(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        node.children_rev(self.map())
    }

    pub fn has_children(&self, node: NodeId) -> bool { !node.is_empty(self.map()) }

    pub fn next_sibling(&self, node: NodeId) -> Option<NodeId> { node.next_sibling(self.map()) }

    pub fn prev_sibling(&self, node: NodeId) -> Option<NodeId> { node.prev_sibling(self.map()) }

    /// `node` followed by its parent, grandparent, and so on up to the root.
    pub fn ancestors(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.contains(node).then(|| node.ancestors(self.map())).into_iter().flatten()
    }

    fn parent_of(&self, node: NodeId) -> Result<NodeId, TreeError> {
        self.live(node)?.parent(self.map()).ok_or(TreeError::NoParent(node))
    }

    /// All children of `node`'s parent, `node` included, in order.
    pub fn self_and_siblings(&self, node: NodeId) -> Result<Vec<NodeId>, TreeError> {
        let parent = self.parent_of(node)?;
        Ok(parent.children(self.map()).collect())
    }

    /// Children of `node`'s parent other than `node`, read lazily from the
    /// live tree.
    pub fn siblings(
        &self,
        node: NodeId,
    ) -> Result<impl Iterator<Item = NodeId> + '_, TreeError> {
        let parent = self.parent_of(node)?;
        Ok(parent.children(self.map()).filter(move |&child| child != node))
    }

    /// Position of `node` among its parent's children.
    pub fn index(&self, node: NodeId) -> Result<usize, TreeError> {
        self.parent_of(node)?;
        Ok(std::iter::successors(node.prev_sibling(self.map()), |n| n.prev_sibling(self.map()))
            .count())
    }

    /// `node` and all its descendants, depth-first, parents before children.
    pub fn flatten(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.contains(node).then(|| node.traverse_preorder(self.map())).into_iter().flatten()
    }

    /// `node` and all its descendants, children before parents.
    pub fn traverse_postorder(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.contains(node)
            .then(|| node.traverse_postorder(self.map()))
            .into_iter()
            .flatten()
    }

    /// Calls `visit` on `node` and then on each of its descendants in
    /// pre-order.
    ///
    /// The visitor may mutate the tree. A node's children are read right
    /// after the node itself is visited; of those, the ones still alive when
    /// their turn comes are visited, wherever they have moved to. Children
    /// added to a node after it was visited are not. No node is visited
    /// twice.
    pub fn traverse(&mut self, node: NodeId, mut visit: impl FnMut(&mut Self, NodeId)) {
        let mut visited: SecondaryMap<NodeId, ()> = SecondaryMap::new();
        let mut stack = vec![node];
        while let Some(next) = stack.pop() {
            if !self.contains(next) || visited.insert(next, ()).is_some() {
                continue;
            }
            visit(self, next);
            stack.extend(next.children_rev(self.map()));
        }
    }

    // Mutation.

    fn check_attach(&self, parent: NodeId, node: NodeId) -> Result<(), TreeError> {
        self.live(parent)?;
        self.live(node)?;
        if parent.ancestors(self.map()).any(|a| a == node) {
            debug!(?parent, ?node, "rejected attach that would create a cycle");
            return Err(TreeError::WouldCreateCycle { parent, child: node });
        }
        Ok(())
    }

    /// Appends `node` as the last child of `parent`.
    ///
    /// If `node` is attached elsewhere it is moved. Fails without touching
    /// the tree if `node` is `parent` or one of its ancestors.
    pub fn add_child(&mut self, parent: NodeId, node: NodeId) -> Result<NodeId, TreeError> {
        self.check_attach(parent, node)?;
        self.tree.push_back(node, parent);
        trace!(?parent, ?node, "added child");
        Ok(node)
    }

    /// Appends each of `nodes` to `parent` in order.
    ///
    /// Stops at the first node that cannot be attached; the ones before it
    /// stay attached.
    pub fn add_children(
        &mut self,
        parent: NodeId,
        nodes: impl IntoIterator<Item = NodeId>,
    ) -> Result<Vec<NodeId>, TreeError> {
        nodes.into_iter().map(|node| self.add_child(parent, node)).collect()
    }

    pub fn insert_before(&mut self, sibling: NodeId, node: NodeId) -> Result<NodeId, TreeError> {
        let parent = self.parent_of(sibling)?;
        self.check_attach(parent, node)?;
        if node != sibling {
            self.tree.insert_before(node, sibling);
            trace!(?sibling, ?node, "inserted before");
        }
        Ok(node)
    }

    pub fn insert_after(&mut self, sibling: NodeId, node: NodeId) -> Result<NodeId, TreeError> {
        let parent = self.parent_of(sibling)?;
        self.check_attach(parent, node)?;
        if node != sibling {
            self.tree.insert_after(node, sibling);
            trace!(?sibling, ?node, "inserted after");
        }
        Ok(node)
    }

    /// Detaches `node` from `parent`, keeping it and its subtree alive.
    ///
    /// Returns false, changing nothing, if `node` is not a child of `parent`.
    pub fn remove_child(&mut self, parent: NodeId, node: NodeId) -> bool {
        if !self.contains(parent) || node.parent(self.map()) != Some(parent) {
            debug!(?parent, ?node, "not removing a container that is not a child");
            return false;
        }
        self.tree.detach(node);
        trace!(?parent, ?node, "removed child");
        true
    }

    // Focus history.

    pub fn last_focused_child(&self, node: NodeId) -> Option<NodeId> {
        self.tree.data.focus.last_focused_child(node)
    }

    pub fn set_last_focused_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), TreeError> {
        self.live(parent)?;
        self.live(child)?;
        if child.parent(self.map()) != Some(parent) {
            return Err(TreeError::NotAChild { parent, child });
        }
        if self.tree.data.focus.focus_locally(&self.tree.map, child) {
            trace!(?parent, ?child, "last focused child changed");
        }
        Ok(())
    }

    pub fn clear_last_focused_child(&mut self, node: NodeId) -> Option<NodeId> {
        self.tree.data.focus.clear(node)
    }

    /// Marks `node` as focused along the whole path up to its root.
    pub fn focus(&mut self, node: NodeId) -> Result<(), TreeError> {
        self.live(node)?;
        self.tree.data.focus.focus(&self.tree.map, node);
        trace!(?node, "focused");
        Ok(())
    }

    /// End of the last-focused chain starting at `node`, or `None` if `node`
    /// has no focus history yet.
    pub fn last_focused_tail(&self, node: NodeId) -> Option<NodeId> {
        self.tree.data.focus.tail(node)
    }

    // Size shares.

    pub fn size_share_sum(&self, parent: NodeId) -> f64 {
        self.tree.data.containers.size_share_sum(self.map(), parent)
    }

    /// Checks the structural invariants and returns every violation found.
    pub fn validate(&self) -> Vec<String> {
        let map = self.map();
        let mut issues = Vec::new();

        for node in map.ids() {
            for child in node.children(map) {
                if child.parent(map) != Some(node) {
                    issues.push(format!("{child:?} is listed under {node:?} but points elsewhere"));
                }
            }
            if node.ancestors(map).skip(1).take(map.len()).any(|a| a == node) {
                issues.push(format!("{node:?} is its own ancestor"));
            }
            if self.container(node).is_none() {
                issues.push(format!("{node:?} has no container attributes"));
            }
        }

        for (parent, child) in self.tree.data.focus.entries() {
            if child.parent(map) != Some(parent) {
                issues.push(format!(
                    "last focused child of {parent:?} is {child:?}, which is not its child"
                ));
            }
        }

        if self.config.check_size_shares {
            for node in map.ids().filter(|&n| !n.is_empty(map)) {
                let sum = self.size_share_sum(node);
                if (sum - 1.0).abs() > self.config.size_share_tolerance {
                    issues.push(format!("size shares under {node:?} add up to {sum}, not 1"));
                }
            }
        }

        for issue in &issues {
            warn!("container tree: {issue}");
        }
        issues
    }

    /// Renders the subtree under `node`, marking each parent's last focused
    /// child with ☒.
    pub fn draw_tree(&self, node: NodeId) -> String {
        let mut out = String::new();
        if self.contains(node) {
            ascii_tree::write_tree(&mut out, &self.get_ascii_tree(node)).unwrap();
        }
        out
    }

    fn get_ascii_tree(&self, node: NodeId) -> ascii_tree::Tree {
        let status = match node.parent(self.map()) {
            None => "",
            Some(parent) if self.last_focused_child(parent) == Some(node) => "☒ ",
            _ => "☐ ",
        };
        let desc = match self.container(node) {
            Some(c) => format!(
                "{status}{node:?} {:?} {:.2} {:?}",
                c.kind, c.size_percentage, c.rect
            ),
            None => format!("{status}{node:?}"),
        };
        let children: Vec<_> = node.children(self.map()).map(|c| self.get_ascii_tree(c)).collect();
        if children.is_empty() {
            ascii_tree::Tree::Leaf(vec![desc])
        } else {
            ascii_tree::Tree::Node(desc, children)
        }
    }
}

#[derive(Serialize, Deserialize)]
struct Components {
    focus: FocusHistory,
    containers: Containers,
}

impl Components {
    fn new(config: &TreeConfig) -> Self {
        Components {
            focus: FocusHistory::default(),
            containers: Containers::new(config.default_size_percentage),
        }
    }

    fn dispatch_event(&mut self, map: &NodeMap, event: TreeEvent) {
        self.focus.handle_event(map, event);
        self.containers.handle_event(map, event);
    }
}

impl tree::Observer for Components {
    fn added_to_forest(&mut self, map: &NodeMap, node: NodeId) {
        self.dispatch_event(map, TreeEvent::AddedToForest(node))
    }

    fn added_to_parent(&mut self, map: &NodeMap, node: NodeId) {
        self.dispatch_event(map, TreeEvent::AddedToParent(node))
    }

    fn removing_from_parent(&mut self, map: &NodeMap, node: NodeId) {
        self.dispatch_event(map, TreeEvent::RemovingFromParent(node))
    }

    fn removed_from_forest(&mut self, map: &NodeMap, node: NodeId) {
        self.dispatch_event(map, TreeEvent::RemovedFromForest(node))
    }
}
