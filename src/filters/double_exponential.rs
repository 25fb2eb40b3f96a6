//! Holt double exponential smoothing for body joints
//!
//! Each joint keeps a smoothed value and a smoothed trend. Small moves inside
//! the jitter radius are damped, the output is extrapolated along the trend
//! to hide sensor latency, and the prediction is clamped so it never strays
//! more than `max_deviation_radius` from the raw sample.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::smooth_point::SmoothPoint;
use crate::error::{Result, TrackerError};
use crate::types::{Body, JointSet, TrackingState};

/// Jitter radius floor (a tenth of a millimeter), avoids dividing by zero
pub const JITTER_EPSILON: f32 = 1e-4;

/// Radius multiplier applied to inferred joints
pub const DEFAULT_INFERRED_SCALE: f32 = 2.0;

/// Filter tuning
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmoothingParameters {
    /// [0..1], higher lags more, lower stays closer to raw data
    pub smoothing: f32,
    /// [0..1], lower corrects towards raw data more slowly (springy when high)
    pub correction: f32,
    /// Frames to predict into the future, may exceed 1
    pub prediction: f32,
    /// Meters; moves smaller than this are treated as noise
    pub jitter_radius: f32,
    /// Meters; the output never deviates further than this from raw
    pub max_deviation_radius: f32,
}

impl Default for SmoothingParameters {
    fn default() -> Self {
        Self {
            smoothing: 0.25,
            correction: 0.25,
            prediction: 0.25,
            jitter_radius: 0.03,
            max_deviation_radius: 0.05,
        }
    }
}

impl SmoothingParameters {
    /// Inferred joints get wider jitter and deviation radii (smoothed harder)
    pub fn for_tracking(&self, state: TrackingState, scale: f32) -> Self {
        match state {
            TrackingState::Inferred => Self {
                jitter_radius: self.jitter_radius * scale,
                max_deviation_radius: self.max_deviation_radius * scale,
                ..*self
            },
            TrackingState::Tracked | TrackingState::NotTracked => *self,
        }
    }

    fn effective_jitter_radius(&self) -> f32 {
        self.jitter_radius.max(JITTER_EPSILON)
    }
}

/// Per-joint filter memory
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SmoothingState {
    pub raw: SmoothPoint,
    pub filtered: SmoothPoint,
    pub trend: SmoothPoint,
    pub frame_count: u32,
}

impl SmoothingState {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Advance the filter by one raw sample and return the predicted output
    pub fn advance(&mut self, raw: SmoothPoint, params: &SmoothingParameters) -> SmoothPoint {
        let prev_filtered = self.filtered;
        let prev_trend = self.trend;
        let prev_raw = self.raw;

        // invalid sample: re-bootstrap, but still run it through
        let valid = raw.is_valid();
        if !valid {
            self.frame_count = 0;
        }

        let (filtered, trend) = match self.frame_count {
            0 => (raw, SmoothPoint::IDENTITY),
            1 => {
                let filtered = (raw + prev_raw).scale(0.5);
                let trend = Self::next_trend(filtered, prev_filtered, prev_trend, params.correction);
                (filtered, trend)
            }
            _ => {
                let jitter_radius = params.effective_jitter_radius();
                let diff = (raw - prev_filtered).position.length();
                let blended = if diff <= jitter_radius {
                    let weight = diff / jitter_radius;
                    raw.scale(weight) + prev_filtered.scale(1.0 - weight)
                } else {
                    raw
                };

                let filtered = blended.scale(1.0 - params.smoothing)
                    + (prev_filtered + prev_trend).scale(params.smoothing);
                let trend = Self::next_trend(filtered, prev_filtered, prev_trend, params.correction);
                (filtered, trend)
            }
        };
        // an invalid sample is passed through but not counted, so the next
        // valid one bootstraps from scratch instead of averaging with zero
        if valid {
            self.frame_count = self.frame_count.saturating_add(1);
        }

        let mut predicted = filtered + trend.scale(params.prediction);

        // Keep the prediction within max_deviation_radius of the raw sample.
        // A zero radius snaps every deviating prediction onto raw.
        let deviation = (predicted - raw).position.length();
        if deviation > params.max_deviation_radius && deviation > 0.0 {
            let ratio = params.max_deviation_radius / deviation;
            predicted = predicted.scale(ratio) + raw.scale(1.0 - ratio);
        }

        self.raw = raw;
        self.filtered = filtered;
        self.trend = trend;

        predicted
    }

    fn next_trend(
        filtered: SmoothPoint,
        prev_filtered: SmoothPoint,
        prev_trend: SmoothPoint,
        correction: f32,
    ) -> SmoothPoint {
        (filtered - prev_filtered).scale(correction) + prev_trend.scale(1.0 - correction)
    }
}

/// One smoothing filter per joint of a skeleton
#[derive(Clone, Debug)]
pub struct DoubleExponentialSmoother<J: JointSet> {
    params: SmoothingParameters,
    inferred_scale: f32,
    states: Vec<SmoothingState>,
    outputs: Vec<SmoothPoint>,
    _joints: std::marker::PhantomData<J>,
}

impl<J: JointSet> DoubleExponentialSmoother<J> {
    pub fn new(params: SmoothingParameters) -> Self {
        Self {
            params,
            inferred_scale: DEFAULT_INFERRED_SCALE,
            states: vec![SmoothingState::default(); J::count()],
            outputs: vec![SmoothPoint::IDENTITY; J::count()],
            _joints: std::marker::PhantomData,
        }
    }

    pub fn with_inferred_scale(mut self, scale: f32) -> Self {
        self.inferred_scale = scale;
        self
    }

    pub fn parameters(&self) -> &SmoothingParameters {
        &self.params
    }

    pub fn set_parameters(&mut self, params: SmoothingParameters) {
        self.params = params;
    }

    pub fn inferred_scale(&self) -> f32 {
        self.inferred_scale
    }

    /// Forget all history; every joint bootstraps again
    pub fn reset(&mut self) {
        self.states.iter_mut().for_each(SmoothingState::reset);
        self.outputs.fill(SmoothPoint::IDENTITY);
    }

    pub fn reset_joint(&mut self, joint: J) {
        self.states[joint.index()].reset();
        self.outputs[joint.index()] = SmoothPoint::IDENTITY;
    }

    pub fn state(&self, joint: J) -> &SmoothingState {
        &self.states[joint.index()]
    }

    /// Latest output for a joint (identity until first filtered)
    pub fn filtered(&self, joint: J) -> SmoothPoint {
        self.outputs[joint.index()]
    }

    /// Filter one raw joint value with explicit parameters
    pub fn update_joint(&mut self, joint: J, raw: SmoothPoint, params: &SmoothingParameters) -> SmoothPoint {
        let state = &mut self.states[joint.index()];
        if !raw.is_valid() && state.frame_count > 0 {
            log::trace!("{}: zero position, filter reset", joint.name());
        }
        let output = state.advance(raw, params);
        self.outputs[joint.index()] = output;
        output
    }

    /// Filter every joint present in the body. Joints without a sample keep
    /// their state untouched.
    pub fn update(&mut self, body: &Body<J>) -> BTreeMap<J, SmoothPoint> {
        let mut result = BTreeMap::new();
        for (joint, sample) in body {
            let params = self.params.for_tracking(sample.tracking_state, self.inferred_scale);
            let output = self.update_joint(*joint, sample.point(), &params);
            result.insert(*joint, output);
        }
        result
    }

    /// Same as `update`, spreading joints across `workers` scoped threads.
    /// Joints share no state, so the outputs are identical.
    pub fn update_parallel(&mut self, body: &Body<J>, workers: usize) -> Result<BTreeMap<J, SmoothPoint>> {
        let params = self.params;
        let scale = self.inferred_scale;

        let mut work: Vec<(J, &mut SmoothingState, SmoothPoint, SmoothingParameters, SmoothPoint)> = J::ALL
            .iter()
            .zip(self.states.iter_mut())
            .filter_map(|(joint, state)| {
                body.get(joint).map(|sample| {
                    (
                        *joint,
                        state,
                        sample.point(),
                        params.for_tracking(sample.tracking_state, scale),
                        SmoothPoint::IDENTITY,
                    )
                })
            })
            .collect();

        if work.is_empty() {
            return Ok(BTreeMap::new());
        }

        let chunk_size = work.len().div_ceil(workers.max(1));
        crossbeam::thread::scope(|scope| {
            for chunk in work.chunks_mut(chunk_size) {
                scope.spawn(move |_| {
                    for (_, state, raw, joint_params, output) in chunk.iter_mut() {
                        *output = state.advance(*raw, joint_params);
                    }
                });
            }
        })
        .map_err(|_| TrackerError::WorkerPanicked)?;

        let result: BTreeMap<J, SmoothPoint> = work
            .into_iter()
            .map(|(joint, _, _, _, output)| (joint, output))
            .collect();
        for (joint, output) in &result {
            self.outputs[joint.index()] = *output;
        }
        Ok(result)
    }
}

impl<J: JointSet> Default for DoubleExponentialSmoother<J> {
    fn default() -> Self {
        Self::new(SmoothingParameters::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{body_from_samples, JointSample, KinectJoint};
    use approx::assert_abs_diff_eq;
    use glam::{Quat, Vec3};

    fn point(x: f32, y: f32, z: f32) -> SmoothPoint {
        SmoothPoint::new(Vec3::new(x, y, z), Quat::IDENTITY)
    }

    /// No extrapolation and no clamp, so outputs equal the filtered value
    fn no_prediction() -> SmoothingParameters {
        SmoothingParameters {
            prediction: 0.0,
            max_deviation_radius: 10.0,
            ..SmoothingParameters::default()
        }
    }

    #[test]
    fn test_first_frame_returns_raw() {
        let mut state = SmoothingState::default();
        let raw = SmoothPoint::new(Vec3::new(0.3, 0.9, 2.1), Quat::from_rotation_y(0.7));
        let out = state.advance(raw, &SmoothingParameters::default());
        assert_eq!(out, raw);
        assert_eq!(state.trend, SmoothPoint::IDENTITY);
        assert_eq!(state.frame_count, 1);
    }

    #[test]
    fn test_second_frame_averages_raw() {
        let mut state = SmoothingState::default();
        let params = no_prediction();
        let a = SmoothPoint::new(Vec3::new(0.0, 1.0, 2.0), Quat::from_rotation_y(0.2));
        let b = SmoothPoint::new(Vec3::new(0.2, 1.0, 2.4), Quat::from_rotation_y(0.6));
        state.advance(a, &params);
        let out = state.advance(b, &params);

        assert_abs_diff_eq!(state.filtered.position, Vec3::new(0.1, 1.0, 2.2), epsilon = 1e-6);
        assert_abs_diff_eq!(state.filtered.orientation, Quat::from_rotation_y(0.4), epsilon = 1e-5);
        assert_abs_diff_eq!(out.position, Vec3::new(0.1, 1.0, 2.2), epsilon = 1e-6);
        assert_eq!(state.frame_count, 2);
    }

    #[test]
    fn test_frame_counter_keeps_counting() {
        let mut state = SmoothingState::default();
        for _ in 0..5 {
            state.advance(point(0.0, 1.0, 2.0), &SmoothingParameters::default());
        }
        assert_eq!(state.frame_count, 5);
    }

    #[test]
    fn test_second_frame_trend() {
        let mut state = SmoothingState::default();
        let params = SmoothingParameters::default();
        state.advance(point(0.0, 1.0, 2.0), &params);
        state.advance(point(0.2, 1.0, 2.0), &params);
        // filtered moved 0.1 from the first sample; trend = correction * 0.1
        assert_abs_diff_eq!(state.trend.position, Vec3::new(0.025, 0.0, 0.0), epsilon = 1e-6);
    }

    #[test]
    fn test_deviation_bound() {
        let mut state = SmoothingState::default();
        let params = SmoothingParameters {
            prediction: 3.0,
            ..SmoothingParameters::default()
        };
        let mut x = 0.1;
        for frame in 0..40 {
            // accelerating motion builds a large trend
            x += 0.01 * frame as f32;
            let raw = point(x, 1.0, 2.0);
            let out = state.advance(raw, &params);
            if frame >= 1 {
                let d = (out.position - raw.position).length();
                assert!(d <= params.max_deviation_radius + 1e-5, "frame {frame}: {d}");
            }
        }
    }

    #[test]
    fn test_zero_max_deviation_snaps_to_raw() {
        let mut state = SmoothingState::default();
        let params = SmoothingParameters {
            max_deviation_radius: 0.0,
            ..SmoothingParameters::default()
        };
        state.advance(point(0.0, 1.0, 2.0), &params);
        state.advance(point(0.5, 1.0, 2.0), &params);
        let raw = point(1.0, 1.0, 2.0);
        let out = state.advance(raw, &params);
        assert_abs_diff_eq!(out.position, raw.position, epsilon = 1e-6);
    }

    #[test]
    fn test_jitter_is_damped() {
        let mut state = SmoothingState::default();
        let params = no_prediction();
        let rest = point(0.0, 1.0, 2.0);
        for _ in 0..5 {
            state.advance(rest, &params);
        }
        assert_abs_diff_eq!(state.trend.position, Vec3::ZERO, epsilon = 1e-7);

        let nudged = point(0.01, 1.0, 2.0);
        let out = state.advance(nudged, &params);
        assert!(out.position.x > rest.position.x);
        assert!(out.position.x < nudged.position.x);
    }

    #[test]
    fn test_large_move_passes_jitter_filter() {
        let mut state = SmoothingState::default();
        let params = SmoothingParameters {
            smoothing: 0.0,
            prediction: 0.0,
            ..SmoothingParameters::default()
        };
        for _ in 0..3 {
            state.advance(point(0.0, 1.0, 2.0), &params);
        }
        let out = state.advance(point(0.2, 1.0, 2.0), &params);
        assert_abs_diff_eq!(out.position, Vec3::new(0.2, 1.0, 2.0), epsilon = 1e-6);
    }

    #[test]
    fn test_zero_jitter_radius_is_floored() {
        let mut state = SmoothingState::default();
        let params = SmoothingParameters {
            jitter_radius: 0.0,
            ..SmoothingParameters::default()
        };
        for _ in 0..4 {
            let out = state.advance(point(0.0, 1.0, 2.0), &params);
            assert!(out.position.is_finite());
        }
    }

    #[test]
    fn test_invalid_sample_resets() {
        let mut state = SmoothingState::default();
        let params = SmoothingParameters::default();
        for i in 0..5 {
            state.advance(point(0.01 * i as f32, 1.0, 2.0), &params);
        }

        let passed = state.advance(SmoothPoint::IDENTITY, &params);
        assert_eq!(passed, SmoothPoint::IDENTITY);
        assert_eq!(state.frame_count, 0);

        let fresh = SmoothPoint::new(Vec3::new(0.5, 0.5, 1.5), Quat::from_rotation_x(0.3));
        let out = state.advance(fresh, &params);
        assert_eq!(out, fresh);
        assert_eq!(state.frame_count, 1);
    }

    #[test]
    fn test_identical_samples_converge() {
        let mut state = SmoothingState::default();
        let params = SmoothingParameters::default();
        let raw = point(0.0, 0.5, 0.0);
        for _ in 0..3 {
            state.advance(raw, &params);
        }
        assert_abs_diff_eq!(state.filtered.position, raw.position, epsilon = 1e-3);
        assert_abs_diff_eq!(state.trend.position, Vec3::ZERO, epsilon = 1e-3);
    }

    #[test]
    fn test_for_tracking_widens_inferred_only() {
        let params = SmoothingParameters::default();
        let inferred = params.for_tracking(TrackingState::Inferred, 2.0);
        assert_abs_diff_eq!(inferred.jitter_radius, 0.06, epsilon = 1e-7);
        assert_abs_diff_eq!(inferred.max_deviation_radius, 0.1, epsilon = 1e-7);
        assert_eq!(inferred.smoothing, params.smoothing);

        assert_eq!(params.for_tracking(TrackingState::Tracked, 2.0), params);
    }

    #[test]
    fn test_parameters_serde_defaults() {
        let params: SmoothingParameters = serde_json::from_str(r#"{"smoothing": 0.5}"#).unwrap();
        assert_eq!(params.smoothing, 0.5);
        assert_eq!(params.correction, 0.25);
        assert_eq!(params.jitter_radius, 0.03);
        assert_eq!(params.max_deviation_radius, 0.05);
    }

    fn moving_body(t: f32) -> Body<KinectJoint> {
        body_from_samples(KinectJoint::ALL.iter().enumerate().map(|(i, joint)| {
            let state = if i % 3 == 0 {
                TrackingState::Inferred
            } else {
                TrackingState::Tracked
            };
            JointSample::new(
                *joint,
                Vec3::new(0.1 * i as f32 + t, 0.02 * t * t, 2.0),
                Quat::from_rotation_y(0.1 * t),
                state,
            )
        }))
    }

    #[test]
    fn test_update_skips_missing_joints() {
        let mut smoother: DoubleExponentialSmoother<KinectJoint> = DoubleExponentialSmoother::default();
        let body = body_from_samples([JointSample::tracked(
            KinectJoint::Head,
            Vec3::new(0.0, 0.7, 2.0),
            Quat::IDENTITY,
        )]);
        let out = smoother.update(&body);
        assert_eq!(out.len(), 1);
        assert_eq!(smoother.state(KinectJoint::Head).frame_count, 1);
        assert_eq!(smoother.state(KinectJoint::Neck).frame_count, 0);
        assert_eq!(smoother.filtered(KinectJoint::Head).position, Vec3::new(0.0, 0.7, 2.0));
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let mut sequential: DoubleExponentialSmoother<KinectJoint> = DoubleExponentialSmoother::default();
        let mut parallel: DoubleExponentialSmoother<KinectJoint> = DoubleExponentialSmoother::default();

        for frame in 0..10 {
            let body = moving_body(frame as f32 * 0.05);
            let a = sequential.update(&body);
            let b = parallel.update_parallel(&body, 4).unwrap();
            assert_eq!(a, b);
        }
        for joint in KinectJoint::ALL {
            assert_eq!(sequential.state(*joint), parallel.state(*joint));
        }
    }

    #[test]
    fn test_reset_forgets_history() {
        let mut smoother: DoubleExponentialSmoother<KinectJoint> = DoubleExponentialSmoother::default();
        smoother.update(&moving_body(0.0));
        smoother.update(&moving_body(0.1));
        assert_eq!(smoother.state(KinectJoint::Head).frame_count, 2);

        smoother.reset_joint(KinectJoint::Head);
        assert_eq!(smoother.state(KinectJoint::Head).frame_count, 0);
        assert_eq!(smoother.state(KinectJoint::Neck).frame_count, 2);

        smoother.reset();
        assert!(KinectJoint::ALL
            .iter()
            .all(|j| smoother.state(*j).frame_count == 0));
    }
}
