//! Joint hierarchy and forward kinematics
//!
//! Nodes live in an arena indexed by `JointSet::index()`; parent links are
//! plain indices, so walking to the root never touches ownership.
//!
//! Per frame: `set_raw_pose` for each joint, then `calculate_all_offsets`
//! turns absolute sensor-space poses into parent-relative ones. World poses
//! are recomposed on demand by accumulating local poses from the root down.

use glam::{Quat, Vec3, Vec4};
use std::marker::PhantomData;

use super::node::JointNode;
use crate::error::{Result, TrackerError};
use crate::orientation::floor_rotation_correction;
use crate::types::JointSet;

/// World placement derived from the floor plane
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WorldCorrection {
    /// Added to every joint's position before offsets are taken
    pub offset: Vec3,
    /// Applied to raw samples upstream, before filtering
    pub rotation: Quat,
}

impl WorldCorrection {
    pub const IDENTITY: Self = Self {
        offset: Vec3::ZERO,
        rotation: Quat::IDENTITY,
    };

    pub fn new(offset: Vec3, rotation: Quat) -> Self {
        Self { offset, rotation }
    }

    /// Level against the floor normal and lift by the floor distance
    pub fn from_floor_plane(plane: Vec4) -> Self {
        Self {
            offset: Vec3::Y * plane.w,
            rotation: floor_rotation_correction(plane),
        }
    }
}

impl Default for WorldCorrection {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[derive(Clone, Debug)]
pub struct SkeletonTree<J: JointSet> {
    nodes: Vec<JointNode<J>>,
    correction: WorldCorrection,
    _joints: PhantomData<J>,
}

impl<J: JointSet> SkeletonTree<J> {
    pub fn new() -> Result<Self> {
        let mut tree = Self {
            nodes: Vec::new(),
            correction: WorldCorrection::IDENTITY,
            _joints: PhantomData,
        };
        tree.build_hierarchy()?;
        Ok(tree)
    }

    /// Create one node per joint and wire `J::BONES`. Rebuilds from scratch,
    /// discarding any pose data.
    pub fn build_hierarchy(&mut self) -> Result<()> {
        let mut nodes: Vec<JointNode<J>> = J::ALL.iter().map(|j| JointNode::new(*j)).collect();

        for (i, joint) in J::ALL.iter().enumerate() {
            if joint.index() != i {
                return Err(TrackerError::InvalidHierarchy(format!(
                    "{} has index {} but is listed at {}",
                    joint.name(),
                    joint.index(),
                    i
                )));
            }
        }

        for (parent, child) in J::BONES {
            if *child == J::ROOT {
                return Err(TrackerError::InvalidHierarchy(format!(
                    "root {} listed as a child of {}",
                    child.name(),
                    parent.name()
                )));
            }
            if let Some(existing) = nodes[child.index()].parent {
                return Err(TrackerError::InvalidHierarchy(format!(
                    "{} has two parents: {} and {}",
                    child.name(),
                    J::ALL[existing].name(),
                    parent.name()
                )));
            }
            nodes[child.index()].parent = Some(parent.index());
            nodes[parent.index()].children.push(child.index());
        }

        // every joint must hang off the root; this also rules out cycles
        let mut reached = vec![false; nodes.len()];
        let mut stack = vec![J::ROOT.index()];
        while let Some(i) = stack.pop() {
            reached[i] = true;
            stack.extend(nodes[i].children.iter().copied());
        }
        if let Some(orphan) = reached.iter().position(|r| !r) {
            return Err(TrackerError::InvalidHierarchy(format!(
                "{} is not connected to root {}",
                J::ALL[orphan].name(),
                J::ROOT.name()
            )));
        }

        log::debug!(
            "built skeleton: {} joints, {} bones, root {}",
            nodes.len(),
            J::BONES.len(),
            J::ROOT.name()
        );
        self.nodes = nodes;
        self.correction = WorldCorrection::IDENTITY;
        Ok(())
    }

    pub fn root(&self) -> J {
        J::ROOT
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, joint: J) -> &JointNode<J> {
        &self.nodes[joint.index()]
    }

    pub fn parent(&self, joint: J) -> Option<J> {
        self.node(joint).parent.map(|i| self.nodes[i].joint)
    }

    pub fn children(&self, joint: J) -> impl Iterator<Item = J> + '_ {
        self.node(joint).children.iter().map(|i| self.nodes[*i].joint)
    }

    /// Number of bones between the joint and the root
    pub fn depth(&self, joint: J) -> usize {
        let mut depth = 0;
        let mut current = self.node(joint).parent;
        while let Some(i) = current {
            depth += 1;
            current = self.nodes[i].parent;
        }
        depth
    }

    /// Joints in root-to-leaf visiting order (every parent before its children)
    pub fn pre_order(&self) -> Vec<J> {
        let mut order = Vec::with_capacity(self.nodes.len());
        self.visit(J::ROOT.index(), &mut order);
        order
    }

    fn visit(&self, index: usize, order: &mut Vec<J>) {
        let node = &self.nodes[index];
        order.push(node.joint);
        for child in &node.children {
            self.visit(*child, order);
        }
    }

    pub fn set_raw_pose(&mut self, joint: J, position: Vec3, orientation: Quat) {
        self.nodes[joint.index()].set_raw_pose(position, orientation);
    }

    /// Assign a parent-relative pose directly
    pub fn set_local_pose(&mut self, joint: J, position: Vec3, orientation: Quat) {
        let node = &mut self.nodes[joint.index()];
        node.local_position = position;
        node.local_orientation = orientation;
    }

    /// Last correction passed to `calculate_all_offsets`
    pub fn correction(&self) -> WorldCorrection {
        self.correction
    }

    /// Derive the joint's local pose from its raw pose and the parent's world
    /// pose. The parent must already be resolved for this frame.
    pub fn calculate_offset(&mut self, joint: J, correction: &WorldCorrection) {
        let index = joint.index();
        let (parent_position, parent_rotation) = match self.nodes[index].parent {
            Some(parent) => (self.world_position_at(parent), self.world_rotation_at(parent)),
            None => (Vec3::ZERO, Quat::IDENTITY),
        };

        let node = &mut self.nodes[index];
        node.local_position = node.raw_position + correction.offset - parent_position;
        node.local_orientation = parent_rotation.inverse() * node.raw_orientation;
    }

    /// `calculate_offset` for every joint, parents first
    pub fn calculate_all_offsets(&mut self, correction: &WorldCorrection) {
        self.correction = *correction;
        for joint in self.pre_order() {
            self.calculate_offset(joint, correction);
        }
    }

    pub fn world_position(&self, joint: J) -> Vec3 {
        self.world_position_at(joint.index())
    }

    pub fn world_rotation(&self, joint: J) -> Quat {
        self.world_rotation_at(joint.index())
    }

    fn world_position_at(&self, index: usize) -> Vec3 {
        let node = &self.nodes[index];
        match node.parent {
            Some(parent) => self.world_position_at(parent) + node.local_position,
            None => node.local_position,
        }
    }

    fn world_rotation_at(&self, index: usize) -> Quat {
        let node = &self.nodes[index];
        match node.parent {
            Some(parent) => self.world_rotation_at(parent) * node.local_orientation,
            None => node.local_orientation,
        }
    }

    /// Distance from the joint to its parent in world space (0 for the root)
    pub fn bone_length(&self, joint: J) -> f32 {
        if self.node(joint).is_root() {
            return 0.0;
        }
        self.node(joint).local_position.length()
    }
}
