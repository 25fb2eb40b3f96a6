//! Joint identifier sets
//!
//! A skeleton is keyed by a closed enumeration of joints. Each sensor
//! generation supplies its own set together with its anatomical wiring;
//! everything downstream (filter, tree, pipeline) is generic over it.

use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::hash::Hash;

use crate::error::{Result, TrackerError};

/// A closed set of joint identifiers with a fixed anatomy
pub trait JointSet: Copy + Eq + Ord + Hash + Debug + Send + Sync + 'static {
    /// Every member, ordered by `index()`
    const ALL: &'static [Self];

    /// Unique root of the hierarchy
    const ROOT: Self;

    /// `(parent, child)` edges. Children of one parent appear in the order
    /// they are listed here.
    const BONES: &'static [(Self, Self)];

    /// Dense index in `0..ALL.len()`
    fn index(self) -> usize;

    /// Display name, only for debug and tooling boundaries
    fn name(self) -> &'static str;

    fn count() -> usize {
        Self::ALL.len()
    }
}

/// Look up a joint by display name (case-insensitive)
pub fn parse_joint<J: JointSet>(name: &str) -> Result<J> {
    let wanted = name.trim();
    J::ALL
        .iter()
        .copied()
        .find(|j| j.name().eq_ignore_ascii_case(wanted))
        .ok_or_else(|| TrackerError::UnknownJoint(wanted.to_string()))
}

/// Kinect v2 body joints, in sensor index order
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum KinectJoint {
    SpineBase,
    SpineMid,
    Neck,
    Head,
    ShoulderLeft,
    ElbowLeft,
    WristLeft,
    HandLeft,
    ShoulderRight,
    ElbowRight,
    WristRight,
    HandRight,
    HipLeft,
    KneeLeft,
    AnkleLeft,
    FootLeft,
    HipRight,
    KneeRight,
    AnkleRight,
    FootRight,
    SpineShoulder,
    HandTipLeft,
    ThumbLeft,
    HandTipRight,
    ThumbRight,
}

impl JointSet for KinectJoint {
    const ALL: &'static [Self] = &[
        Self::SpineBase,
        Self::SpineMid,
        Self::Neck,
        Self::Head,
        Self::ShoulderLeft,
        Self::ElbowLeft,
        Self::WristLeft,
        Self::HandLeft,
        Self::ShoulderRight,
        Self::ElbowRight,
        Self::WristRight,
        Self::HandRight,
        Self::HipLeft,
        Self::KneeLeft,
        Self::AnkleLeft,
        Self::FootLeft,
        Self::HipRight,
        Self::KneeRight,
        Self::AnkleRight,
        Self::FootRight,
        Self::SpineShoulder,
        Self::HandTipLeft,
        Self::ThumbLeft,
        Self::HandTipRight,
        Self::ThumbRight,
    ];

    const ROOT: Self = Self::SpineBase;

    const BONES: &'static [(Self, Self)] = &[
        // spine to head
        (Self::SpineBase, Self::SpineMid),
        (Self::SpineMid, Self::SpineShoulder),
        (Self::SpineShoulder, Self::Neck),
        (Self::Neck, Self::Head),
        // left leg
        (Self::SpineBase, Self::HipLeft),
        (Self::HipLeft, Self::KneeLeft),
        (Self::KneeLeft, Self::AnkleLeft),
        (Self::AnkleLeft, Self::FootLeft),
        // right leg
        (Self::SpineBase, Self::HipRight),
        (Self::HipRight, Self::KneeRight),
        (Self::KneeRight, Self::AnkleRight),
        (Self::AnkleRight, Self::FootRight),
        // left arm
        (Self::SpineShoulder, Self::ShoulderLeft),
        (Self::ShoulderLeft, Self::ElbowLeft),
        (Self::ElbowLeft, Self::WristLeft),
        (Self::WristLeft, Self::HandLeft),
        (Self::HandLeft, Self::HandTipLeft),
        (Self::WristLeft, Self::ThumbLeft),
        // right arm
        (Self::SpineShoulder, Self::ShoulderRight),
        (Self::ShoulderRight, Self::ElbowRight),
        (Self::ElbowRight, Self::WristRight),
        (Self::WristRight, Self::HandRight),
        (Self::HandRight, Self::HandTipRight),
        (Self::WristRight, Self::ThumbRight),
    ];

    fn index(self) -> usize {
        self as usize
    }

    fn name(self) -> &'static str {
        match self {
            Self::SpineBase => "SpineBase",
            Self::SpineMid => "SpineMid",
            Self::Neck => "Neck",
            Self::Head => "Head",
            Self::ShoulderLeft => "ShoulderLeft",
            Self::ElbowLeft => "ElbowLeft",
            Self::WristLeft => "WristLeft",
            Self::HandLeft => "HandLeft",
            Self::ShoulderRight => "ShoulderRight",
            Self::ElbowRight => "ElbowRight",
            Self::WristRight => "WristRight",
            Self::HandRight => "HandRight",
            Self::HipLeft => "HipLeft",
            Self::KneeLeft => "KneeLeft",
            Self::AnkleLeft => "AnkleLeft",
            Self::FootLeft => "FootLeft",
            Self::HipRight => "HipRight",
            Self::KneeRight => "KneeRight",
            Self::AnkleRight => "AnkleRight",
            Self::FootRight => "FootRight",
            Self::SpineShoulder => "SpineShoulder",
            Self::HandTipLeft => "HandTipLeft",
            Self::ThumbLeft => "ThumbLeft",
            Self::HandTipRight => "HandTipRight",
            Self::ThumbRight => "ThumbRight",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_matches_position() {
        assert_eq!(KinectJoint::count(), 25);
        for (i, joint) in KinectJoint::ALL.iter().enumerate() {
            assert_eq!(joint.index(), i);
        }
    }

    #[test]
    fn test_every_non_root_joint_has_one_bone() {
        for joint in KinectJoint::ALL {
            let parents = KinectJoint::BONES
                .iter()
                .filter(|(_, child)| child == joint)
                .count();
            let expected = if *joint == KinectJoint::ROOT { 0 } else { 1 };
            assert_eq!(parents, expected, "{}", joint.name());
        }
    }

    #[test]
    fn test_parse_joint() {
        let joint: KinectJoint = parse_joint("handtipleft").unwrap();
        assert_eq!(joint, KinectJoint::HandTipLeft);

        let err = parse_joint::<KinectJoint>("Tail").unwrap_err();
        assert!(matches!(err, TrackerError::UnknownJoint(_)));
    }

    #[test]
    fn test_serde_uses_variant_names() {
        let json = serde_json::to_string(&KinectJoint::SpineShoulder).unwrap();
        assert_eq!(json, "\"SpineShoulder\"");
    }
}
