pub mod container;
pub mod container_tree;
pub mod error;
pub mod focus;
pub mod tree;

pub use container::{Container, ContainerKind, Orientation, Rect};
pub use container_tree::ContainerTree;
pub use error::TreeError;
pub use tree::NodeId;
