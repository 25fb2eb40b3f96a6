//! Skeleton joint smoothing and forward kinematics for body-tracking sensors
//!
//! Raw per-joint samples go through a Holt double exponential filter, then
//! into a joint hierarchy that stores parent-relative poses and recomposes
//! world poses on demand. `OrientationPipeline` wires the two together once
//! per frame.

pub mod error;
pub mod filters;
pub mod floor;
pub mod orientation;
pub mod pipeline;
pub mod recording;
pub mod skeleton;
pub mod types;

pub use error::{Result, TrackerError};
pub use filters::{DoubleExponentialSmoother, SmoothPoint, SmoothingParameters, SmoothingState};
pub use floor::FloorPlane;
pub use pipeline::{FrameOutcome, OrientationPipeline, PipelineConfig};
pub use skeleton::{JointNode, SkeletonTree, WorldCorrection};
pub use types::{Body, JointSample, JointSet, KinectJoint, TrackedBody, TrackingState};
