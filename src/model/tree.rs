use std::ops::{Index, IndexMut};

use serde::{Deserialize, Serialize};
use slotmap::SlotMap;

/// N-ary tree.
///
/// Structure lives in [`NodeMap`]; everything attached to a node (container
/// attributes, focus history) lives in the observer `O`, which is told about
/// every structural change.
#[derive(Serialize, Deserialize)]
pub struct Tree<O> {
    pub map: NodeMap,
    pub data: O,
}

impl<O: Observer> Tree<O> {
    pub fn with_observer(data: O) -> Self { Tree { map: NodeMap::new(), data } }

    /// Creates a node that is the root of its own one-node tree.
    pub fn mk_node(&mut self) -> NodeId {
        let id = self.map.map.insert(Node::default());
        self.data.added_to_forest(&self.map, id);
        id
    }

    /// Appends `node` as the last child of `parent`, detaching it from any
    /// previous parent first.
    #[track_caller]
    pub(crate) fn push_back(&mut self, node: NodeId, parent: NodeId) {
        self.attach_with(node, parent, |id, map| id.link_under_back(parent, map))
    }

    #[track_caller]
    pub(crate) fn insert_before(&mut self, node: NodeId, sibling: NodeId) {
        let parent = sibling.parent(&self.map).expect("cannot make a sibling of a root node");
        self.attach_with(node, parent, |id, map| id.link_before(sibling, map))
    }

    #[track_caller]
    pub(crate) fn insert_after(&mut self, node: NodeId, sibling: NodeId) {
        let parent = sibling.parent(&self.map).expect("cannot make a sibling of a root node");
        self.attach_with(node, parent, |id, map| id.link_after(sibling, map))
    }

    /// Unlinks `node` from its parent, leaving it (and its subtree) alive as
    /// a root. Returns the old parent.
    pub(crate) fn detach(&mut self, node: NodeId) -> Option<NodeId> {
        let parent = node.parent(&self.map)?;
        self.data.removing_from_parent(&self.map, node);
        self.map.unlink(node);
        Some(parent)
    }

    /// Detaches `node` and deletes it along with all of its descendants.
    pub(crate) fn remove(&mut self, node: NodeId) {
        if !self.map.contains(node) {
            return;
        }
        self.detach(node);
        let doomed: Vec<_> = node.traverse_preorder(&self.map).collect();
        for id in doomed {
            self.map.map.remove(id);
            self.data.removed_from_forest(&self.map, id);
        }
    }

    fn attach_with(
        &mut self,
        node: NodeId,
        new_parent: NodeId,
        link: impl FnOnce(NodeId, &mut NodeMap),
    ) {
        debug_assert!(
            !new_parent.ancestors(&self.map).any(|a| a == node),
            "attaching {node:?} under {new_parent:?} would create a cycle"
        );
        let old_parent = node.parent(&self.map);
        let moving = old_parent != Some(new_parent);
        if moving && old_parent.is_some() {
            self.data.removing_from_parent(&self.map, node);
        }
        self.map.unlink(node);
        link(node, &mut self.map);
        if moving {
            self.data.added_to_parent(&self.map, node);
        }
    }
}

/// Map that holds the structure of the tree.
///
/// Multiple trees can live in one map, which makes it cheap to move
/// branches between them.
#[derive(Serialize, Deserialize)]
pub struct NodeMap {
    map: SlotMap<NodeId, Node>,
}

impl NodeMap {
    fn new() -> NodeMap { NodeMap { map: SlotMap::default() } }

    pub fn contains(&self, id: NodeId) -> bool { self.map.contains_key(id) }

    pub fn len(&self) -> usize { self.map.len() }

    pub fn is_empty(&self) -> bool { self.map.is_empty() }

    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ { self.map.keys() }
}

impl Index<NodeId> for NodeMap {
    type Output = Node;

    fn index(&self, index: NodeId) -> &Self::Output { &self.map[index] }
}

impl IndexMut<NodeId> for NodeMap {
    fn index_mut(&mut self, index: NodeId) -> &mut Self::Output { &mut self.map[index] }
}

slotmap::new_key_type! {
    /// Represents a node somewhere in the tree.
    pub struct NodeId;
}

impl NodeId {
    pub fn parent(self, map: &NodeMap) -> Option<NodeId> {
        map.map.get(self).and_then(|n| n.parent)
    }

    pub fn children(self, map: &NodeMap) -> impl Iterator<Item = NodeId> + '_ {
        let mut cur = self.first_child(map);
        std::iter::from_fn(move || {
            let id = cur?;
            cur = id.next_sibling(map);
            Some(id)
        })
    }

    pub fn children_rev(self, map: &NodeMap) -> impl Iterator<Item = NodeId> + '_ {
        let mut cur = self.last_child(map);
        std::iter::from_fn(move || {
            let id = cur?;
            cur = id.prev_sibling(map);
            Some(id)
        })
    }

    pub fn traverse_postorder(self, map: &NodeMap) -> impl Iterator<Item = NodeId> + '_ {
        PostorderTraversal::new(map, self)
    }

    pub fn traverse_preorder(self, map: &NodeMap) -> impl Iterator<Item = NodeId> + '_ {
        PreorderTraversal::new(map, self)
    }

    /// Returns an iterator over all ancestors of the current node, including itself.
    pub fn ancestors(self, map: &NodeMap) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(Some(self), move |n| n.parent(map))
    }

    pub fn next_sibling(self, map: &NodeMap) -> Option<NodeId> {
        map.map.get(self).and_then(|n| n.next_sibling)
    }

    pub fn prev_sibling(self, map: &NodeMap) -> Option<NodeId> {
        map.map.get(self).and_then(|n| n.prev_sibling)
    }

    pub fn first_child(self, map: &NodeMap) -> Option<NodeId> {
        map.map.get(self).and_then(|n| n.first_child)
    }

    pub fn last_child(self, map: &NodeMap) -> Option<NodeId> {
        map.map.get(self).and_then(|n| n.last_child)
    }

    pub fn is_empty(self, map: &NodeMap) -> bool { self.first_child(map).is_none() }
}

/// Structural events, in the order a [`Tree`] reports them to its observer.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum TreeEvent {
    AddedToForest(NodeId),
    AddedToParent(NodeId),
    /// Sent while the node is still linked under its parent.
    RemovingFromParent(NodeId),
    /// Sent after the node is gone from the map.
    RemovedFromForest(NodeId),
}

pub trait Observer {
    fn added_to_forest(&mut self, map: &NodeMap, node: NodeId);
    fn added_to_parent(&mut self, map: &NodeMap, node: NodeId);
    fn removing_from_parent(&mut self, map: &NodeMap, node: NodeId);
    fn removed_from_forest(&mut self, map: &NodeMap, node: NodeId);
}

impl Observer for () {
    fn added_to_forest(&mut self, _map: &NodeMap, _node: NodeId) {}

    fn added_to_parent(&mut self, _map: &NodeMap, _node: NodeId) {}

    fn removing_from_parent(&mut self, _map: &NodeMap, _node: NodeId) {}

    fn removed_from_forest(&mut self, _map: &NodeMap, _node: NodeId) {}
}

#[derive(Default, PartialEq, Debug, Serialize, Deserialize)]
pub struct Node {
    parent: Option<NodeId>,
    prev_sibling: Option<NodeId>,
    next_sibling: Option<NodeId>,
    first_child: Option<NodeId>,
    last_child: Option<NodeId>,
}

// Linking assumes `self` is already unlinked.
impl NodeId {
    fn link_under_back(self, parent: NodeId, map: &mut NodeMap) {
        let prev = {
            let parent_node = &mut map[parent];
            parent_node.first_child.get_or_insert(self);
            parent_node.last_child.replace(self)
        };
        let node = &mut map[self];
        node.parent = Some(parent);
        node.prev_sibling = prev;
        if let Some(prev) = prev {
            map[prev].next_sibling = Some(self);
        }
    }

    fn link_before(self, next: NodeId, map: &mut NodeMap) {
        let Some(parent) = next.parent(map) else { return };
        let prev = map[next].prev_sibling.replace(self);
        let node = &mut map[self];
        node.parent = Some(parent);
        node.prev_sibling = prev;
        node.next_sibling = Some(next);
        match prev {
            Some(prev) => map[prev].next_sibling = Some(self),
            None => map[parent].first_child = Some(self),
        }
    }

    fn link_after(self, prev: NodeId, map: &mut NodeMap) {
        let Some(parent) = prev.parent(map) else { return };
        let next = map[prev].next_sibling.replace(self);
        let node = &mut map[self];
        node.parent = Some(parent);
        node.prev_sibling = Some(prev);
        node.next_sibling = next;
        match next {
            Some(next) => map[next].prev_sibling = Some(self),
            None => map[parent].last_child = Some(self),
        }
    }
}

impl NodeMap {
    fn unlink(&mut self, id: NodeId) {
        let Some(node) = self.map.get_mut(id) else { return };
        let prev = node.prev_sibling.take();
        let next = node.next_sibling.take();
        let Some(parent) = node.parent.take() else { return };

        match prev {
            Some(prev) => self[prev].next_sibling = next,
            None => self[parent].first_child = next,
        }
        match next {
            Some(next) => self[next].prev_sibling = prev,
            None => self[parent].last_child = prev,
        }
    }
}

struct PostorderTraversal<'a> {
    cur: Option<NodeId>,
    top: NodeId,
    map: &'a NodeMap,
}

impl<'a> PostorderTraversal<'a> {
    fn new(map: &'a NodeMap, root: NodeId) -> Self {
        Self {
            top: root,
            cur: Some(Self::descend_left(root, map)),
            map,
        }
    }

    fn descend_left(mut node: NodeId, map: &'a NodeMap) -> NodeId {
        while let Some(child) = node.first_child(map) {
            node = child;
        }
        node
    }
}

impl<'a> Iterator for PostorderTraversal<'a> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.cur.take()?;
        if node != self.top {
            self.cur = match node.next_sibling(self.map) {
                Some(next) => Some(Self::descend_left(next, self.map)),
                None => node.parent(self.map),
            };
        }
        Some(node)
    }
}

struct PreorderTraversal<'a> {
    top: NodeId,
    cur: Option<NodeId>,
    map: &'a NodeMap,
}

impl<'a> PreorderTraversal<'a> {
    fn new(map: &'a NodeMap, root: NodeId) -> Self {
        Self { top: root, cur: Some(root), map }
    }
}

impl<'a> Iterator for PreorderTraversal<'a> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.cur?;
        self.cur = node.first_child(self.map).or_else(|| {
            node.ancestors(self.map)
                .take_while(|&a| a != self.top)
                .find_map(|a| a.next_sibling(self.map))
        });
        Some(node)
    }
}
