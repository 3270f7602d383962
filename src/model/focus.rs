use serde::{Deserialize, Serialize};
use slotmap::SecondaryMap;

use crate::model::tree::{NodeId, NodeMap, TreeEvent};

/// Per-container focus history.
///
/// Each entry maps a container to the child that most recently held focus
/// among its children. Entries only ever point at a current child: they are
/// repaired when that child leaves its parent.
#[derive(Default, Serialize, Deserialize)]
pub struct FocusHistory {
    last_focused: SecondaryMap<NodeId, NodeId>,
}

impl FocusHistory {
    pub fn last_focused_child(&self, node: NodeId) -> Option<NodeId> {
        self.last_focused.get(node).copied()
    }

    /// Follows the chain of last focused children down from `node` and
    /// returns the deepest container reached.
    pub fn tail(&self, node: NodeId) -> Option<NodeId> {
        std::iter::successors(self.last_focused_child(node), |&n| self.last_focused_child(n))
            .last()
    }

    /// Records `child` as the last focused child of its parent. Returns
    /// whether anything changed.
    pub fn focus_locally(&mut self, map: &NodeMap, child: NodeId) -> bool {
        let Some(parent) = child.parent(map) else {
            return false;
        };
        self.last_focused.insert(parent, child).map(|old| old != child).unwrap_or(true)
    }

    /// Records the whole path from the root down to `node`. The root's tail
    /// then resolves to `node`, or to whatever `node` last focused below it.
    pub fn focus(&mut self, map: &NodeMap, node: NodeId) {
        for (child, parent) in node.ancestors(map).zip(node.ancestors(map).skip(1)) {
            self.last_focused.insert(parent, child);
        }
    }

    pub fn clear(&mut self, node: NodeId) -> Option<NodeId> { self.last_focused.remove(node) }

    pub fn handle_event(&mut self, map: &NodeMap, event: TreeEvent) {
        use TreeEvent::*;
        match event {
            AddedToForest(_) | AddedToParent(_) => {}
            RemovingFromParent(node) => {
                let Some(parent) = node.parent(map) else { return };
                if self.last_focused_child(parent) == Some(node) {
                    match node.next_sibling(map).or(node.prev_sibling(map)) {
                        Some(sibling) => {
                            self.last_focused.insert(parent, sibling);
                        }
                        None => {
                            self.last_focused.remove(parent);
                        }
                    }
                }
            }
            RemovedFromForest(node) => {
                self.last_focused.remove(node);
            }
        }
    }

    pub(crate) fn entries(&self) -> impl Iterator<Item = (NodeId, NodeId)> + '_ {
        self.last_focused.iter().map(|(parent, &child)| (parent, child))
    }
}
