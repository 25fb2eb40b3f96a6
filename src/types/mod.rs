pub mod joints;

pub use joints::*;

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::filters::SmoothPoint;

/// Sensor confidence for one joint in one frame
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrackingState {
    #[default]
    NotTracked,
    Inferred,
    Tracked,
}

/// One sensor reading for one joint
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct JointSample<J> {
    pub joint: J,
    pub position: Vec3,
    pub orientation: Quat,
    pub tracking_state: TrackingState,
}

impl<J: JointSet> JointSample<J> {
    pub fn new(joint: J, position: Vec3, orientation: Quat, tracking_state: TrackingState) -> Self {
        Self {
            joint,
            position,
            orientation,
            tracking_state,
        }
    }

    /// Fully tracked sample
    pub fn tracked(joint: J, position: Vec3, orientation: Quat) -> Self {
        Self::new(joint, position, orientation, TrackingState::Tracked)
    }

    pub fn point(&self) -> SmoothPoint {
        SmoothPoint::new(self.position, self.orientation)
    }
}

/// All joint samples of the selected body for one frame
pub type Body<J> = BTreeMap<J, JointSample<J>>;

/// Build a body map from a list of samples (later duplicates win)
pub fn body_from_samples<J: JointSet>(samples: impl IntoIterator<Item = JointSample<J>>) -> Body<J> {
    samples.into_iter().map(|s| (s.joint, s)).collect()
}

/// One body slot reported by the sensor
#[derive(Clone, Debug, PartialEq)]
pub struct TrackedBody<J> {
    pub tracked: bool,
    pub joints: Body<J>,
}

impl<J: JointSet> TrackedBody<J> {
    pub fn new(tracked: bool, joints: Body<J>) -> Self {
        Self { tracked, joints }
    }

    /// Distance of the root joint from the sensor origin, if reported
    pub fn root_distance(&self) -> Option<f32> {
        self.joints.get(&J::ROOT).map(|s| s.position.length())
    }
}
