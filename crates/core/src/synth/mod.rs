//! Closed-form pose synthesis.
//!
//! Style ids drive the limb-chain engine: arms and legs are two-segment chains
//! solved by forward kinematics from a handful of periodic base signals. Move
//! ids drive the skeleton engine, which folds time into a two second loop and
//! perturbs a subset of the 22 joints per move.

mod noise;

use std::f32::consts::{FRAC_PI_4, PI};

pub use noise::{NoiseSource, RandomNoise, SeededNoise, SilentNoise, MAX_JITTER};

use crate::{
    catalog::{MoveCatalog, MoveKind, StyleCatalog, StyleProfile},
    pose::{
        ArmChain, FullSkeletonPose, LegChain, LimbChainPose, Pose, SkeletonJoint as J, Vec3,
        POS_X, POS_Z, ROT_X, ROT_Y, ROT_Z,
    },
};

pub const STANCE_HEIGHT: f32 = 1.2;
pub const HEAD_RISE: f32 = 0.5;
pub const SHOULDER_OFFSET_X: f32 = 0.45;
pub const SHOULDER_RISE: f32 = 0.2;
pub const HIP_OFFSET_X: f32 = 0.25;
pub const HIP_DROP: f32 = 0.4;
pub const UPPER_ARM_LENGTH: f32 = 0.35;
pub const LOWER_ARM_LENGTH: f32 = 0.30;
pub const UPPER_LEG_LENGTH: f32 = 0.45;
pub const LOWER_LEG_LENGTH: f32 = 0.45;

/// Length of the skeleton engine's loop, seconds.
pub const MOVE_LOOP_SECONDS: f32 = 2.0;

const RIGHT: f32 = 1.0;
const LEFT: f32 = -1.0;

/// Front door for pose synthesis. Owns the noise source so callers that
/// stream many frames reuse one generator.
#[derive(Debug, Clone, Default)]
pub struct PoseSynthesizer<N = RandomNoise> {
    noise: N,
}

impl PoseSynthesizer<RandomNoise> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<N: NoiseSource> PoseSynthesizer<N> {
    pub fn with_noise(noise: N) -> Self {
        Self { noise }
    }

    /// Synthesizes the pose for `id` at `elapsed` seconds.
    ///
    /// Move ids yield a skeleton pose scaled by `intensity`; every other id is
    /// treated as a style, unknown ones resolving to the default style.
    pub fn synthesize(&mut self, id: &str, elapsed: f32, intensity: f32) -> Pose {
        match MoveCatalog::find(id) {
            Some((kind, _)) => skeleton_pose(kind, elapsed, intensity).into(),
            None => limb_chain_pose(id, elapsed, &mut self.noise).into(),
        }
    }

    pub fn limb_chain(&mut self, style: &str, elapsed: f32) -> LimbChainPose {
        limb_chain_pose(style, elapsed, &mut self.noise)
    }
}

/// The four periodic signals every limb-chain pose is built from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BaseWaves {
    pub arm: f32,
    /// Offset by π so legs counter-move against arms.
    pub leg: f32,
    pub sway: f32,
    /// `|sin|`, peaks twice per cycle.
    pub bounce: f32,
}

impl BaseWaves {
    pub fn at(phase: f32) -> Self {
        Self {
            arm: phase.sin(),
            leg: (phase + PI).sin(),
            sway: (phase * 0.5).sin(),
            bounce: phase.sin().abs(),
        }
    }
}

/// Builds a limb-chain pose for `style`. Unknown styles use the default
/// profile but keep the requested name on the pose.
pub fn limb_chain_pose(style: &str, elapsed: f32, noise: &mut dyn NoiseSource) -> LimbChainPose {
    let profile = StyleCatalog::lookup(style);
    let phase = elapsed * profile.speed;
    let waves = BaseWaves::at(phase);

    let body = Vec3::new(
        waves.sway * profile.torso_sway,
        STANCE_HEIGHT + waves.bounce * profile.bounce,
        0.0,
    );
    let head = Vec3::new(
        body.x * 0.5 + noise.next_perturbation(),
        body.y + HEAD_RISE + noise.next_perturbation(),
        noise.next_perturbation(),
    );

    LimbChainPose {
        head,
        body,
        left_arm: arm_chain(LEFT, &profile, phase, &waves, body.y, noise),
        right_arm: arm_chain(RIGHT, &profile, phase, &waves, body.y, noise),
        left_leg: leg_chain(LEFT, &profile, &waves, body.y),
        right_leg: leg_chain(RIGHT, &profile, &waves, body.y),
        style: style.to_string(),
        timestamp: elapsed,
        color: profile.display_color.to_string(),
    }
}

fn arm_chain(
    side: f32,
    profile: &StyleProfile,
    phase: f32,
    waves: &BaseWaves,
    body_y: f32,
    noise: &mut dyn NoiseSource,
) -> ArmChain {
    let shoulder = Vec3::new(
        side * SHOULDER_OFFSET_X,
        body_y + SHOULDER_RISE,
        noise.next_perturbation(),
    );
    let shoulder_angle = waves.arm * profile.arm_amplitude * side;
    let elbow_angle = (phase + FRAC_PI_4).sin() * profile.arm_amplitude * 1.2;

    let (elbow_x, elbow_y) = chain_end(shoulder.x, shoulder.y, shoulder_angle, UPPER_ARM_LENGTH);
    let (hand_x, hand_y) = chain_end(
        elbow_x,
        elbow_y,
        shoulder_angle + elbow_angle,
        LOWER_ARM_LENGTH,
    );

    ArmChain {
        shoulder,
        elbow: Vec3::new(elbow_x, elbow_y, noise.next_perturbation()),
        hand: Vec3::new(hand_x, hand_y, noise.next_perturbation()),
    }
}

fn leg_chain(side: f32, profile: &StyleProfile, waves: &BaseWaves, body_y: f32) -> LegChain {
    let hip = Vec3::new(side * HIP_OFFSET_X, body_y - HIP_DROP, 0.0);
    let hip_angle = waves.leg * profile.leg_amplitude * side;
    let knee_angle = waves.bounce * profile.leg_amplitude * 1.5;

    let (knee_x, knee_y) = hanging_end(hip.x, hip.y, hip_angle, UPPER_LEG_LENGTH);
    let (foot_x, foot_y) = hanging_end(knee_x, knee_y, hip_angle + knee_angle, LOWER_LEG_LENGTH);

    LegChain {
        hip,
        knee: Vec3::new(knee_x, knee_y, 0.0),
        foot: Vec3::new(foot_x, foot_y, 0.0),
    }
}

/// Segment endpoint with the angle measured from the horizontal.
fn chain_end(x: f32, y: f32, angle: f32, length: f32) -> (f32, f32) {
    (x + angle.cos() * length, y - angle.sin() * length)
}

/// Segment endpoint with the angle measured from straight down.
fn hanging_end(x: f32, y: f32, angle: f32, length: f32) -> (f32, f32) {
    (x + angle.sin() * length, y - angle.cos() * length)
}

/// Builds the skeleton pose for a catalog move.
///
/// Time is folded into a [`MOVE_LOOP_SECONDS`] loop so the result is periodic.
/// The pose timestamp is the unfolded `elapsed` value.
pub fn skeleton_pose(kind: MoveKind, elapsed: f32, intensity: f32) -> FullSkeletonPose {
    let speed = MoveCatalog::definition(kind).speed;
    let t = elapsed.rem_euclid(MOVE_LOOP_SECONDS);
    let phase = t * PI * speed;
    let s = intensity;

    let mut pose = FullSkeletonPose::neutral(kind.id(), elapsed);

    match kind {
        MoveKind::Moonwalk => {
            pose.set(J::Hips, POS_Z, phase.sin() * 0.1 * s);
            for (upper, lower, foot, leg_phase) in [
                (J::LeftUpperLeg, J::LeftLowerLeg, J::LeftFoot, phase + PI),
                (J::RightUpperLeg, J::RightLowerLeg, J::RightFoot, phase),
            ] {
                let wave = leg_phase.sin();
                pose.set(upper, ROT_Y, wave * 45.0 * s);
                pose.set(lower, ROT_Y, wave * 30.0 * s);
                pose.set(foot, ROT_X, wave * 25.0 * s);
            }
        }
        MoveKind::CrotchGrab => {
            let grab = phase.sin() * s;
            pose.set(J::Hips, POS_X, grab * 0.1);
            pose.set(J::Spine, ROT_X, -grab * 20.0);
            pose.set(J::LeftUpperArm, ROT_X, -grab * 60.0);
            pose.set(J::RightUpperArm, ROT_X, -grab * 60.0);
            pose.set(J::LeftLowerArm, ROT_Y, grab * 45.0);
            pose.set(J::RightLowerArm, ROT_Y, grab * 45.0);
        }
        MoveKind::Spin => {
            let angle = (t * 180.0 * speed) % 360.0;
            pose.set(J::Hips, ROT_Y, angle * s);
            pose.set(J::Spine, ROT_Y, angle * 0.7 * s);
            pose.set(J::Chest, ROT_Y, angle * 0.5 * s);
        }
        MoveKind::Kick => {
            let kick = (phase * 2.0).sin().max(0.0) * s;
            pose.set(J::RightUpperLeg, ROT_X, kick * 90.0);
            pose.set(J::RightLowerLeg, ROT_Y, -kick * 45.0);
            pose.set(J::RightFoot, ROT_Y, kick * 30.0);
            pose.set(J::Hips, POS_X, -kick * 0.1);
        }
        MoveKind::Lean => {
            let lean = phase.sin() * s;
            pose.set(J::Hips, POS_X, lean * 0.15);
            pose.set(J::Spine, ROT_X, lean * 30.0);
            pose.set(J::LeftFoot, ROT_X, -lean * 15.0);
            pose.set(J::RightFoot, ROT_X, -lean * 15.0);
            pose.set(J::Neck, ROT_X, lean * 10.0);
        }
        MoveKind::ArmWave => {
            for (shoulder, elbow, wrist, offset) in [
                (J::LeftShoulder, J::LeftLowerArm, J::LeftHand, 0.0),
                (J::RightShoulder, J::RightLowerArm, J::RightHand, PI),
            ] {
                pose.set(shoulder, ROT_Z, (phase + offset).sin() * 40.0 * s);
                pose.set(elbow, ROT_Z, (phase + offset + 0.5).sin() * 30.0 * s);
                pose.set(wrist, ROT_Z, (phase + offset + 1.0).sin() * 20.0 * s);
            }
        }
    }

    pose
}

/// Skeleton pose for a move id; unknown ids fall back to the first move.
pub fn skeleton_pose_for(id: &str, elapsed: f32, intensity: f32) -> FullSkeletonPose {
    let (kind, _) = MoveCatalog::lookup(id);
    skeleton_pose(kind, elapsed, intensity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::SkeletonJoint;

    const EPS: f32 = 1e-5;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < EPS
    }

    #[test]
    fn salsa_at_zero_has_straight_upper_arm() {
        let pose = limb_chain_pose("salsa", 0.0, &mut SilentNoise);

        // bounce = |sin 0| = 0, sway = 0
        assert!(close(pose.body.x, 0.0));
        assert!(close(pose.body.y, STANCE_HEIGHT));

        let right = pose.right_arm;
        assert!(close(right.shoulder.x, 0.45));
        assert!(close(right.shoulder.y, 1.4));
        assert!(close(right.elbow.x, 0.45 + 0.35));
        assert!(close(right.elbow.y, 1.4));

        let elbow_angle = FRAC_PI_4.sin() * 1.2 * 1.2;
        assert!(close(right.hand.x, 0.80 + elbow_angle.cos() * 0.30));
        assert!(close(right.hand.y, 1.4 - elbow_angle.sin() * 0.30));

        let left = pose.left_arm;
        assert!(close(left.shoulder.x, -0.45));
        assert!(close(left.elbow.x, -0.45 + 0.35));
        assert_eq!(pose.color, "#06D6A0");
    }

    #[test]
    fn legs_hang_below_hips_at_rest() {
        let pose = limb_chain_pose("salsa", 0.0, &mut SilentNoise);
        let leg = pose.right_leg;
        assert!(close(leg.hip.y, 0.8));
        assert!(close(leg.knee.x, leg.hip.x));
        assert!(close(leg.knee.y, 0.8 - 0.45));
        assert!(close(leg.foot.y, 0.8 - 0.9));
    }

    #[test]
    fn legs_counter_move_against_arms() {
        let profile = StyleCatalog::lookup("hiphop");
        // arm wave peaks where phase = π/2
        let t = (PI / 2.0) / profile.speed;
        let waves = BaseWaves::at(t * profile.speed);
        assert!(close(waves.arm, 1.0));
        assert!(close(waves.leg, -1.0));
        assert!(waves.bounce >= 0.0);
    }

    #[test]
    fn jitter_is_bounded_and_everything_else_is_deterministic() {
        let quiet = limb_chain_pose("electro", 1.3, &mut SilentNoise);
        for seed in 0..8 {
            let noisy = limb_chain_pose("electro", 1.3, &mut SeededNoise::new(seed));
            assert!(noisy.head.distance(&quiet.head) <= MAX_JITTER * 3f32.sqrt() + EPS);
            assert!((noisy.right_arm.hand.z - quiet.right_arm.hand.z).abs() <= MAX_JITTER);
            assert_eq!(noisy.right_arm.hand.x, quiet.right_arm.hand.x);
            assert_eq!(noisy.body, quiet.body);
            assert_eq!(noisy.left_leg, quiet.left_leg);
        }
    }

    #[test]
    fn unknown_style_uses_default_profile() {
        let pose = limb_chain_pose("tango", 0.7, &mut SilentNoise);
        let reference = limb_chain_pose("afrobeats", 0.7, &mut SilentNoise);
        assert_eq!(pose.style, "tango");
        assert_eq!(pose.body, reference.body);
        assert_eq!(pose.color, reference.color);
    }

    #[test]
    fn skeleton_moves_repeat_every_two_seconds() {
        for (kind, _) in MoveCatalog::moves() {
            for t in [0.0_f32, 0.25, 0.5, 1.25, 1.75] {
                let a = skeleton_pose(*kind, t, 1.0);
                let b = skeleton_pose(*kind, t + 2.0, 1.0);
                assert_eq!(a.joints, b.joints, "{} at {t}", kind.id());
            }
        }
    }

    #[test]
    fn skeleton_poses_are_exactly_reproducible() {
        let a = skeleton_pose(MoveKind::ArmWave, 0.9, 0.8);
        let b = skeleton_pose(MoveKind::ArmWave, 0.9, 0.8);
        assert_eq!(a, b);
    }

    #[test]
    fn moonwalk_legs_move_in_anti_phase() {
        let pose = skeleton_pose(MoveKind::Moonwalk, 0.5, 1.0);
        let left = pose.joint(SkeletonJoint::LeftUpperLeg)[ROT_Y];
        let right = pose.joint(SkeletonJoint::RightUpperLeg)[ROT_Y];
        assert!(close(right, 45.0));
        assert!(close(left, -45.0));
        assert!(pose.joint(SkeletonJoint::Head).iter().all(|v| *v == 0.0));
    }

    #[test]
    fn spin_strength_decreases_up_the_spine() {
        let pose = skeleton_pose(MoveKind::Spin, 0.25, 1.0);
        let hips = pose.joint(SkeletonJoint::Hips)[ROT_Y];
        assert!(close(hips, 90.0));
        assert!(close(pose.joint(SkeletonJoint::Spine)[ROT_Y], 63.0));
        assert!(close(pose.joint(SkeletonJoint::Chest)[ROT_Y], 45.0));
    }

    #[test]
    fn kick_is_never_negative() {
        for step in 0..40 {
            let pose = skeleton_pose(MoveKind::Kick, step as f32 * 0.05, 1.0);
            assert!(pose.joint(SkeletonJoint::RightUpperLeg)[ROT_X] >= 0.0);
            assert!(pose.joint(SkeletonJoint::Hips)[POS_X] <= 0.0);
        }
    }

    #[test]
    fn intensity_scales_the_perturbation() {
        let full = skeleton_pose(MoveKind::Lean, 0.5, 1.0);
        let half = skeleton_pose(MoveKind::Lean, 0.5, 0.5);
        let a = full.joint(SkeletonJoint::Spine)[ROT_X];
        let b = half.joint(SkeletonJoint::Spine)[ROT_X];
        assert!(close(a * 0.5, b));
    }

    #[test]
    fn synthesizer_dispatches_on_id() {
        let mut synth = PoseSynthesizer::with_noise(SilentNoise);
        assert!(matches!(synth.synthesize("spin", 0.1, 1.0), Pose::Skeleton(_)));
        assert!(matches!(synth.synthesize("robot", 0.1, 1.0), Pose::LimbChain(_)));
        assert!(matches!(synth.synthesize("nope", 0.1, 1.0), Pose::LimbChain(_)));
        assert_eq!(skeleton_pose_for("nope", 0.0, 1.0).move_name, "moonwalk");
    }
}
