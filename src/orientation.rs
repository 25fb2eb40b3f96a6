//! Sensor-space conditioning for joint poses
//!
//! Mirroring, floor-plane leveling, and synthetic orientations for tip
//! joints the sensor reports without rotation.

use glam::{Mat3, Quat, Vec3, Vec4};

/// All-zero quaternion the sensor reports for joints without orientation
pub const QUAT_ZERO: Quat = Quat::from_xyzw(0.0, 0.0, 0.0, 0.0);

pub fn is_missing_orientation(orientation: Quat) -> bool {
    orientation == QUAT_ZERO
}

/// Reflect a pose across the sagittal plane: negate X of the position and
/// the Y/Z components of the orientation. Applying it twice is a no-op.
pub fn mirror(position: Vec3, orientation: Quat) -> (Vec3, Quat) {
    (
        Vec3::new(-position.x, position.y, position.z),
        Quat::from_xyzw(orientation.x, -orientation.y, -orientation.z, orientation.w),
    )
}

/// Rotation taking local +Z onto `forward` and local +Y as close to `up`
/// as possible. Returns identity when the two do not span a plane.
pub fn look_rotation(forward: Vec3, up: Vec3) -> Quat {
    let forward = forward.normalize_or_zero();
    let right = up.cross(forward).normalize_or_zero();
    if forward == Vec3::ZERO || right == Vec3::ZERO {
        return Quat::IDENTITY;
    }
    let up = forward.cross(right);
    Quat::from_mat3(&Mat3::from_cols(right, up, forward))
}

/// Rotation that levels the skeleton against the sensor's floor plane
/// (`xyz` normal, `w` distance)
pub fn floor_rotation_correction(plane: Vec4) -> Quat {
    let up = plane.truncate();
    let right = up.cross(Vec3::Z);
    let forward = right.cross(up);

    look_rotation(
        Vec3::new(forward.x, -forward.y, forward.z),
        Vec3::new(up.x, up.y, -up.z),
    )
}

/// Orientation for a tip joint: local +Y along the bone from the parent,
/// local +Z along the bone's vertical plane normal. Falls back to identity
/// when the bone is vertical or has no length.
pub fn leaf_orientation(position: Vec3, parent_position: Vec3) -> Quat {
    let direction = position - parent_position;
    let perpendicular = direction.cross(Vec3::Y);
    let normal = perpendicular.cross(direction);

    if normal.length() == 0.0 {
        log::trace!("degenerate leaf bone {direction:?}, using identity");
        return Quat::IDENTITY;
    }
    look_rotation(normal, direction)
}
