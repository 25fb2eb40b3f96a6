//! Pose value the smoothing filter operates on
//!
//! Position and orientation move together through one algebra:
//! - add:      position sum, orientation product `a * b`
//! - subtract: position difference, orientation `a * b⁻¹`
//! - scale:    position times `t`, orientation `slerp(identity, q, t)`
//!
//! Scaling an orientation is a slerp from identity rather than a quaternion
//! power; the filter's blends and trend updates are built on that.

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};
use std::ops::{Add, Sub};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SmoothPoint {
    pub position: Vec3,
    pub orientation: Quat,
}

impl SmoothPoint {
    /// Zero position, identity orientation
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        orientation: Quat::IDENTITY,
    };

    pub const fn new(position: Vec3, orientation: Quat) -> Self {
        Self {
            position,
            orientation,
        }
    }

    pub fn scale(self, t: f32) -> Self {
        Self {
            position: self.position * t,
            orientation: Quat::IDENTITY.slerp(self.orientation, t),
        }
    }

    /// Horizontal reflection: `(-x, y, z)`, `(x, -y, -z, w)`
    pub fn mirrored(self) -> Self {
        let (position, orientation) = crate::orientation::mirror(self.position, self.orientation);
        Self::new(position, orientation)
    }

    /// A sensor reports an all-zero position for joints it could not place
    pub fn is_valid(&self) -> bool {
        self.position != Vec3::ZERO
    }
}

impl Default for SmoothPoint {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Add for SmoothPoint {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self {
            position: self.position + rhs.position,
            orientation: self.orientation * rhs.orientation,
        }
    }
}

impl Sub for SmoothPoint {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self {
            position: self.position - rhs.position,
            orientation: self.orientation * rhs.orientation.inverse(),
        }
    }
}
