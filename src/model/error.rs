use thiserror::Error;

use crate::model::tree::NodeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TreeError {
    #[error("Container {0:?} has no parent")]
    NoParent(NodeId),
    #[error("Container {0:?} does not exist")]
    NodeNotFound(NodeId),
    #[error("Attaching {child:?} under {parent:?} would make it its own ancestor")]
    WouldCreateCycle { parent: NodeId, child: NodeId },
    #[error("Container {child:?} is not a child of {parent:?}")]
    NotAChild { parent: NodeId, child: NodeId },
}
