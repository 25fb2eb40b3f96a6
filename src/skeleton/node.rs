use glam::{Quat, Vec3};

/// One joint of a skeleton tree
///
/// Parent and children are indices into the owning tree's node arena. The
/// raw pose is set from filtered sensor data each frame; the local pose is
/// derived from it relative to the parent.
#[derive(Clone, Debug, PartialEq)]
pub struct JointNode<J> {
    pub(crate) joint: J,
    pub(crate) parent: Option<usize>,
    pub(crate) children: Vec<usize>,
    pub raw_position: Vec3,
    pub raw_orientation: Quat,
    pub local_position: Vec3,
    pub local_orientation: Quat,
}

impl<J: Copy> JointNode<J> {
    pub(crate) fn new(joint: J) -> Self {
        Self {
            joint,
            parent: None,
            children: Vec::new(),
            raw_position: Vec3::ZERO,
            raw_orientation: Quat::IDENTITY,
            local_position: Vec3::ZERO,
            local_orientation: Quat::IDENTITY,
        }
    }

    pub fn joint(&self) -> J {
        self.joint
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn set_raw_pose(&mut self, position: Vec3, orientation: Quat) {
        self.raw_position = position;
        self.raw_orientation = orientation;
    }
}
