//! Pose shapes produced by the synthesizer.
//!
//! Two incompatible shapes exist: the limb-chain pose used by the style engine
//! and the 22-joint skeleton pose used by the move engine. [`Pose`] tags them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A joint position in avatar space, metres.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn distance(&self, other: &Vec3) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArmChain {
    pub shoulder: Vec3,
    pub elbow: Vec3,
    pub hand: Vec3,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LegChain {
    pub hip: Vec3,
    pub knee: Vec3,
    pub foot: Vec3,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LimbChainPose {
    pub head: Vec3,
    pub body: Vec3,
    pub left_arm: ArmChain,
    pub right_arm: ArmChain,
    pub left_leg: LegChain,
    pub right_leg: LegChain,
    pub style: String,
    pub timestamp: f32,
    pub color: String,
}

/// The 22 canonical humanoid joints, in hierarchy order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SkeletonJoint {
    Hips,
    Spine,
    Chest,
    UpperChest,
    Neck,
    Head,
    LeftShoulder,
    LeftUpperArm,
    LeftLowerArm,
    LeftHand,
    RightShoulder,
    RightUpperArm,
    RightLowerArm,
    RightHand,
    LeftUpperLeg,
    LeftLowerLeg,
    LeftFoot,
    LeftToes,
    RightUpperLeg,
    RightLowerLeg,
    RightFoot,
    RightToes,
}

impl SkeletonJoint {
    pub const ALL: [SkeletonJoint; 22] = [
        Self::Hips,
        Self::Spine,
        Self::Chest,
        Self::UpperChest,
        Self::Neck,
        Self::Head,
        Self::LeftShoulder,
        Self::LeftUpperArm,
        Self::LeftLowerArm,
        Self::LeftHand,
        Self::RightShoulder,
        Self::RightUpperArm,
        Self::RightLowerArm,
        Self::RightHand,
        Self::LeftUpperLeg,
        Self::LeftLowerLeg,
        Self::LeftFoot,
        Self::LeftToes,
        Self::RightUpperLeg,
        Self::RightLowerLeg,
        Self::RightFoot,
        Self::RightToes,
    ];
}

/// `[posX, posY, posZ, rotX, rotY, rotZ]`, rotations in degrees.
pub type JointVector = [f32; 6];

pub const POS_X: usize = 0;
pub const POS_Y: usize = 1;
pub const POS_Z: usize = 2;
pub const ROT_X: usize = 3;
pub const ROT_Y: usize = 4;
pub const ROT_Z: usize = 5;

pub const IDLE_MOVE: &str = "idle";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FullSkeletonPose {
    pub move_name: String,
    pub timestamp: f32,
    pub joints: BTreeMap<SkeletonJoint, JointVector>,
}

impl FullSkeletonPose {
    /// A pose with every joint at the neutral zero vector.
    pub fn neutral(move_name: impl Into<String>, timestamp: f32) -> Self {
        Self {
            move_name: move_name.into(),
            timestamp,
            joints: SkeletonJoint::ALL
                .iter()
                .map(|joint| (*joint, [0.0; 6]))
                .collect(),
        }
    }

    pub fn idle(timestamp: f32) -> Self {
        Self::neutral(IDLE_MOVE, timestamp)
    }

    pub fn joint(&self, joint: SkeletonJoint) -> JointVector {
        self.joints.get(&joint).copied().unwrap_or([0.0; 6])
    }

    pub(crate) fn set(&mut self, joint: SkeletonJoint, component: usize, value: f32) {
        if let Some(vector) = self.joints.get_mut(&joint) {
            vector[component] = value;
        }
    }

    pub fn is_neutral(&self) -> bool {
        self.joints
            .values()
            .all(|vector| vector.iter().all(|value| *value == 0.0))
    }
}

/// One synthesized frame in either shape.
///
/// Serialized untagged so viewers receive the bare shape; the field sets of
/// the two variants do not overlap apart from `timestamp`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Pose {
    LimbChain(LimbChainPose),
    Skeleton(FullSkeletonPose),
}

impl Pose {
    pub fn timestamp(&self) -> f32 {
        match self {
            Self::LimbChain(pose) => pose.timestamp,
            Self::Skeleton(pose) => pose.timestamp,
        }
    }

    /// The style or move that produced this pose.
    pub fn source_id(&self) -> &str {
        match self {
            Self::LimbChain(pose) => &pose.style,
            Self::Skeleton(pose) => &pose.move_name,
        }
    }
}

impl From<LimbChainPose> for Pose {
    fn from(value: LimbChainPose) -> Self {
        Self::LimbChain(value)
    }
}

impl From<FullSkeletonPose> for Pose {
    fn from(value: FullSkeletonPose) -> Self {
        Self::Skeleton(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_pose_has_all_joints_zeroed() {
        let idle = FullSkeletonPose::idle(0.0);
        assert_eq!(idle.joints.len(), 22);
        assert!(idle.is_neutral());
        assert_eq!(idle.move_name, IDLE_MOVE);
    }

    #[test]
    fn skeleton_pose_serializes_camel_case_joint_names() {
        let mut pose = FullSkeletonPose::neutral("spin", 0.5);
        pose.set(SkeletonJoint::UpperChest, ROT_Y, 12.0);

        let json = serde_json::to_value(Pose::from(pose)).unwrap();
        assert_eq!(json["moveName"], "spin");
        assert_eq!(json["joints"]["upperChest"][ROT_Y], 12.0);
        assert!(json["joints"].get("leftToes").is_some());
    }

    #[test]
    fn untagged_pose_deserializes_by_shape() {
        let pose = FullSkeletonPose::idle(1.0);
        let json = serde_json::to_string(&Pose::from(pose.clone())).unwrap();
        let back: Pose = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Pose::Skeleton(pose));
    }
}
