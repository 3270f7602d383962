use serde::{Deserialize, Serialize};
use slotmap::SecondaryMap;

use crate::model::tree::{NodeId, NodeMap, TreeEvent};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    Horizontal,
    Vertical,
}

/// What a container stands for. Advisory only; the tree does not restrict
/// which kinds may be nested under which.
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerKind {
    Root,
    Workspace,
    Split(Orientation),
    #[default]
    Window,
}

/// Geometry assigned by the layout engine.
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self { Rect { x, y, width, height } }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Container {
    pub kind: ContainerKind,
    pub rect: Rect,
    /// Claim on the parent's space, nominally in `0.0..=1.0`.
    pub size_percentage: f64,
}

impl Container {
    pub fn new(kind: ContainerKind, size_percentage: f64) -> Self {
        Container { kind, rect: Rect::default(), size_percentage }
    }
}

/// Attribute storage for every container in the forest.
#[derive(Serialize, Deserialize)]
pub struct Containers {
    info: SecondaryMap<NodeId, Container>,
    default_size_percentage: f64,
}

impl Containers {
    pub fn new(default_size_percentage: f64) -> Self {
        Containers {
            info: SecondaryMap::new(),
            default_size_percentage,
        }
    }

    pub fn get(&self, node: NodeId) -> Option<&Container> { self.info.get(node) }

    pub fn get_mut(&mut self, node: NodeId) -> Option<&mut Container> { self.info.get_mut(node) }

    pub fn size_share_sum(&self, map: &NodeMap, parent: NodeId) -> f64 {
        parent
            .children(map)
            .filter_map(|child| self.info.get(child))
            .map(|c| c.size_percentage)
            .sum()
    }

    pub fn handle_event(&mut self, _map: &NodeMap, event: TreeEvent) {
        match event {
            TreeEvent::AddedToForest(node) => {
                self.info.insert(
                    node,
                    Container::new(ContainerKind::default(), self.default_size_percentage),
                );
            }
            TreeEvent::RemovedFromForest(node) => {
                self.info.remove(node);
            }
            TreeEvent::AddedToParent(_) | TreeEvent::RemovingFromParent(_) => {}
        }
    }
}
