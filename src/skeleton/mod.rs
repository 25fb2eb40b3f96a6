pub mod node;
pub mod tree;

pub use node::JointNode;
pub use tree::{SkeletonTree, WorldCorrection};
