//! Per-frame orchestration: condition, filter, then resolve the skeleton
//!
//! Pure computation layer: takes already-acquired sensor samples and the
//! shared floor plane, returns nothing but updated state. Frame acquisition
//! and rendering live outside.

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{Result, TrackerError};
use crate::filters::{DoubleExponentialSmoother, SmoothPoint, SmoothingParameters, DEFAULT_INFERRED_SCALE};
use crate::floor::FloorPlane;
use crate::orientation::{is_missing_orientation, leaf_orientation, mirror};
use crate::skeleton::{SkeletonTree, WorldCorrection};
use crate::types::{Body, JointSample, JointSet, TrackedBody};

/// Pipeline configuration
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub smoothing: SmoothingParameters,
    /// Reflect samples horizontally (sensor faces the user)
    pub mirror: bool,
    /// Jitter/deviation radius multiplier for inferred joints
    pub inferred_radius_scale: f32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            smoothing: SmoothingParameters::default(),
            mirror: true,
            inferred_radius_scale: DEFAULT_INFERRED_SCALE,
        }
    }
}

impl PipelineConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        serde_json::from_str(&text).map_err(TrackerError::Config)
    }
}

/// What happened to a frame
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameOutcome {
    /// No body this frame; filters and tree kept their previous state
    Skipped,
    /// `joints` samples were filtered and the tree re-resolved
    Updated { joints: usize },
}

pub struct OrientationPipeline<J: JointSet> {
    config: PipelineConfig,
    smoother: DoubleExponentialSmoother<J>,
    tree: SkeletonTree<J>,
    floor: FloorPlane,
    conditioned: Body<J>,
    frames_processed: u64,
    frames_skipped: u64,
}

impl<J: JointSet> OrientationPipeline<J> {
    pub fn new(config: PipelineConfig, floor: FloorPlane) -> Result<Self> {
        let smoother =
            DoubleExponentialSmoother::new(config.smoothing).with_inferred_scale(config.inferred_radius_scale);
        Ok(Self {
            config,
            smoother,
            tree: SkeletonTree::new()?,
            floor,
            conditioned: Body::new(),
            frames_processed: 0,
            frames_skipped: 0,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run one frame. `None` means the sensor saw no body.
    pub fn process_frame(&mut self, body: Option<&Body<J>>) -> FrameOutcome {
        let Some(body) = body else {
            self.frames_skipped += 1;
            log::debug!("no body, frame skipped");
            return FrameOutcome::Skipped;
        };

        let correction = WorldCorrection::from_floor_plane(self.floor.get());
        self.conditioned.clear();

        let mut joints = 0;
        for joint in self.tree.pre_order() {
            let Some(sample) = body.get(&joint) else {
                continue;
            };

            let (mut position, mut orientation) = if self.config.mirror {
                mirror(sample.position, sample.orientation)
            } else {
                (sample.position, sample.orientation)
            };
            position = correction.rotation * position;
            if !is_missing_orientation(orientation) {
                orientation = correction.rotation * orientation;
            }

            // tip joints carry no rotation; aim them along the bone instead
            if is_missing_orientation(orientation) {
                orientation = match self.tree.parent(joint) {
                    Some(parent) => leaf_orientation(position, self.tree.node(parent).raw_position),
                    None => Quat::IDENTITY,
                };
            }

            let params = self
                .smoother
                .parameters()
                .for_tracking(sample.tracking_state, self.smoother.inferred_scale());
            let filtered = self
                .smoother
                .update_joint(joint, SmoothPoint::new(position, orientation), &params);
            self.tree.set_raw_pose(joint, filtered.position, filtered.orientation);

            self.conditioned.insert(
                joint,
                JointSample::new(joint, position, orientation, sample.tracking_state),
            );
            joints += 1;
        }

        self.tree.calculate_all_offsets(&correction);
        self.frames_processed += 1;
        FrameOutcome::Updated { joints }
    }

    /// Process the tracked body nearest the sensor, skipping when none is tracked
    pub fn process_bodies(&mut self, bodies: &[TrackedBody<J>]) -> FrameOutcome {
        let closest = closest_body(bodies);
        self.process_frame(closest.map(|b| &b.joints))
    }

    /// Latest filter output for a joint
    pub fn filtered(&self, joint: J) -> SmoothPoint {
        self.smoother.filtered(joint)
    }

    /// Samples of the last processed frame after mirroring, leveling and
    /// leaf derivation, exactly as they entered the filter
    pub fn conditioned(&self) -> &Body<J> {
        &self.conditioned
    }

    pub fn world_position(&self, joint: J) -> Vec3 {
        self.tree.world_position(joint)
    }

    pub fn world_rotation(&self, joint: J) -> Quat {
        self.tree.world_rotation(joint)
    }

    pub fn tree(&self) -> &SkeletonTree<J> {
        &self.tree
    }

    pub fn smoother(&self) -> &DoubleExponentialSmoother<J> {
        &self.smoother
    }

    /// Handle for the frame reader to publish floor planes through
    pub fn floor(&self) -> FloorPlane {
        self.floor.clone()
    }

    pub fn frames_processed(&self) -> u64 {
        self.frames_processed
    }

    pub fn frames_skipped(&self) -> u64 {
        self.frames_skipped
    }

    /// Drop filter history and pose data; configuration and floor are kept
    pub fn reset(&mut self) -> Result<()> {
        self.smoother.reset();
        self.tree.build_hierarchy()?;
        self.conditioned.clear();
        self.frames_processed = 0;
        self.frames_skipped = 0;
        Ok(())
    }
}

/// Tracked body whose root joint is nearest the sensor origin
pub fn closest_body<J: JointSet>(bodies: &[TrackedBody<J>]) -> Option<&TrackedBody<J>> {
    bodies
        .iter()
        .filter(|b| b.tracked)
        .filter_map(|b| b.root_distance().map(|d| (d, b)))
        .min_by(|(a, _), (b, _)| a.total_cmp(b))
        .map(|(_, body)| body)
}
