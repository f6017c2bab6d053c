use serde::{Deserialize, Serialize};

use crate::{
    catalog::{MoveCatalog, MoveDefinition, MoveKind},
    pose::FullSkeletonPose,
    synth,
};

pub const TIMELINE_FRAME_RATE: f32 = 30.0;
pub const DEFAULT_MOVE_DURATION: f32 = 2.0;

/// Shared playhead. Never runs backwards past zero.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlaybackClock {
    pub time_seconds: f32,
}

impl PlaybackClock {
    pub fn reset(&mut self) {
        self.time_seconds = 0.0;
    }

    pub fn advance(&mut self, delta: f32) {
        self.time_seconds = (self.time_seconds + delta).max(0.0);
    }
}

/// Picks the active move for a timestamp by cycling through a fixed list,
/// one move per slot of `move_duration` seconds.
#[derive(Debug, Clone)]
pub struct MoveSchedule {
    moves: Vec<(MoveKind, MoveDefinition)>,
    move_duration: f32,
}

impl MoveSchedule {
    pub fn new(moves: Vec<(MoveKind, MoveDefinition)>, move_duration: f32) -> Self {
        Self {
            moves,
            move_duration,
        }
    }

    /// Cycles the whole move catalog in catalog order.
    pub fn catalog(move_duration: f32) -> Self {
        Self::new(MoveCatalog::moves().to_vec(), move_duration)
    }

    pub fn move_duration(&self) -> f32 {
        self.move_duration
    }

    pub fn active(&self, timestamp: f32) -> Option<(MoveKind, MoveDefinition)> {
        if self.moves.is_empty() {
            return None;
        }
        let slot = (timestamp / self.move_duration).floor().max(0.0) as usize;
        Some(self.moves[slot % self.moves.len()])
    }
}

impl Default for MoveSchedule {
    fn default() -> Self {
        Self::catalog(DEFAULT_MOVE_DURATION)
    }
}

/// Pre-baked, loopable sequence of skeleton poses sampled at a fixed rate.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Timeline {
    frame_rate: f32,
    frames: Vec<FullSkeletonPose>,
}

impl Timeline {
    /// Bakes `total_duration` seconds of the catalog schedule at 30 fps.
    pub fn build(total_duration: f32) -> Self {
        Self::build_with(total_duration, &MoveSchedule::default(), TIMELINE_FRAME_RATE)
    }

    pub fn build_with(total_duration: f32, schedule: &MoveSchedule, frame_rate: f32) -> Self {
        let frame_count = (total_duration.max(0.0) * frame_rate).round() as usize;
        let mut frames = Vec::with_capacity(frame_count);

        for index in 0..frame_count {
            let timestamp = index as f32 / frame_rate;
            let Some((kind, definition)) = schedule.active(timestamp) else {
                break;
            };
            frames.push(synth::skeleton_pose(kind, timestamp, definition.intensity));
        }

        tracing::debug!(frames = frames.len(), frame_rate, "baked sequence timeline");

        Self { frame_rate, frames }
    }

    pub fn frame_rate(&self) -> f32 {
        self.frame_rate
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Length of one loop, seconds.
    pub fn duration(&self) -> f32 {
        if self.frame_rate > 0.0 {
            self.frames.len() as f32 / self.frame_rate
        } else {
            0.0
        }
    }

    pub fn frames(&self) -> &[FullSkeletonPose] {
        &self.frames
    }

    /// Pose for `timestamp`, looping forever. Negative timestamps and empty
    /// timelines give the idle pose.
    pub fn pose_at(&self, timestamp: f32) -> FullSkeletonPose {
        if timestamp < 0.0 || self.frames.is_empty() {
            return FullSkeletonPose::idle(timestamp.max(0.0));
        }
        let index = (timestamp * self.frame_rate).floor() as usize;
        self.frames[index % self.frames.len()].clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_never_goes_negative() {
        let mut clock = PlaybackClock::default();
        clock.advance(0.5);
        clock.advance(-2.0);
        assert_eq!(clock.time_seconds, 0.0);
        clock.advance(1.25);
        clock.reset();
        assert_eq!(clock.time_seconds, 0.0);
    }

    #[test]
    fn frame_timestamps_follow_the_frame_rate() {
        let timeline = Timeline::build(4.0);
        assert_eq!(timeline.len(), 120);
        for (index, frame) in timeline.frames().iter().enumerate() {
            assert_eq!(frame.timestamp, index as f32 / 30.0);
        }
    }

    #[test]
    fn moves_change_every_two_seconds() {
        let timeline = Timeline::build(14.0);
        assert_eq!(timeline.pose_at(0.5).move_name, "moonwalk");
        assert_eq!(timeline.pose_at(2.5).move_name, "crotchGrab");
        assert_eq!(timeline.pose_at(4.5).move_name, "spin");
        assert_eq!(timeline.pose_at(10.5).move_name, "armWave");
        assert_eq!(timeline.pose_at(12.5).move_name, "moonwalk");
    }

    #[test]
    fn negative_time_gives_idle_pose() {
        let timeline = Timeline::build(2.0);
        let pose = timeline.pose_at(-0.1);
        assert!(pose.is_neutral());
        assert_eq!(pose.joints.len(), 22);
    }

    #[test]
    fn empty_timeline_gives_idle_pose() {
        let timeline = Timeline::build(0.0);
        assert!(timeline.is_empty());
        assert!(timeline.pose_at(3.0).is_neutral());
    }

    #[test]
    fn lookup_wraps_around() {
        let timeline = Timeline::build(10.0);
        assert_eq!(timeline.duration(), 10.0);
        for n in 0..4 {
            let later = 1.5 + n as f32 * timeline.duration();
            assert_eq!(timeline.pose_at(1.5), timeline.pose_at(later));
        }
    }

    #[test]
    fn repeated_lookups_are_identical() {
        let timeline = Timeline::build(6.0);
        assert_eq!(timeline.pose_at(3.3), timeline.pose_at(3.3));
    }

    #[test]
    fn schedule_cycles_through_the_catalog() {
        let schedule = MoveSchedule::catalog(1.0);
        assert_eq!(schedule.active(0.0).map(|m| m.0), Some(MoveKind::Moonwalk));
        assert_eq!(schedule.active(6.2).map(|m| m.0), Some(MoveKind::Moonwalk));
        assert!(MoveSchedule::new(Vec::new(), 1.0).active(0.0).is_none());
    }
}
