//! Grades a user's attempt against a reference pose stream.
//!
//! Everything here is pure: keypoints in, similarity or coaching report out.

use serde::{Deserialize, Serialize};

/// Both sides of a pair must be more confident than this to count.
pub const CONFIDENCE_THRESHOLD: f32 = 0.5;

pub const BEST_TIER: f32 = 0.8;
pub const MIDDLE_TIER: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Keypoint {
    pub x: f32,
    pub y: f32,
    #[serde(alias = "score", default)]
    pub confidence: f32,
}

impl Keypoint {
    pub fn new(x: f32, y: f32, confidence: f32) -> Self {
        Self { x, y, confidence }
    }

    fn is_confident(&self) -> bool {
        self.confidence > CONFIDENCE_THRESHOLD
    }

    fn distance(&self, other: &Keypoint) -> f32 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// Linear falloff on the mean distance of confidently tracked landmarks.
///
/// Index `i` in both sets must be the same landmark. Sets of different length,
/// or sets with no pair above the confidence threshold, score `0.0`. A mean
/// distance of `0.5` or more in normalized coordinates saturates to `0.0`.
pub fn similarity(reference: &[Keypoint], user: &[Keypoint]) -> f32 {
    if reference.len() != user.len() {
        return 0.0;
    }

    let (total, valid) = reference
        .iter()
        .zip(user)
        .filter(|(r, u)| r.is_confident() && u.is_confident())
        .fold((0.0_f32, 0_usize), |(total, valid), (r, u)| {
            (total + r.distance(u), valid + 1)
        });

    if valid == 0 {
        return 0.0;
    }

    (1.0 - 2.0 * (total / valid as f32)).max(0.0)
}

/// Pulls an accuracy fraction out of a free-text performance summary.
///
/// Understands `"... 85 accuracy% ..."` and, when the text mentions accuracy
/// at all, the first `"85%"` in it. Anything else reads as `0.0`.
pub fn parse_accuracy(text: &str) -> f32 {
    if let Some((before, _)) = text.split_once("accuracy%") {
        return before
            .split_whitespace()
            .last()
            .and_then(|word| word.parse::<f32>().ok())
            .map(|percent| percent / 100.0)
            .unwrap_or(0.0);
    }
    if text.contains("accuracy") {
        return first_percentage(text).map(|p| p / 100.0).unwrap_or(0.0);
    }
    0.0
}

fn first_percentage(text: &str) -> Option<f32> {
    let bytes = text.as_bytes();
    let mut start = None;
    for (index, byte) in bytes.iter().enumerate() {
        match (byte.is_ascii_digit(), start) {
            (true, None) => start = Some(index),
            (true, Some(_)) => {}
            (false, Some(from)) => {
                if *byte == b'%' {
                    return text[from..index].parse().ok();
                }
                start = None;
            }
            (false, None) => {}
        }
    }
    None
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoachingReport {
    pub feedback: String,
    pub tips: Vec<String>,
    pub encouragement: String,
    /// Whole percent, 0 to 100.
    pub score: u8,
}

/// Picks feedback and tips for an accuracy fraction.
pub fn coach(accuracy: f32) -> CoachingReport {
    let accuracy = if accuracy.is_finite() {
        accuracy.clamp(0.0, 1.0)
    } else {
        0.0
    };

    let (feedback, tips): (&str, [&str; 3]) = if accuracy > BEST_TIER {
        (
            "Excellent synchronization! You're matching the instructor perfectly.",
            [
                "Maintain this consistency",
                "Try adding more flair to your movements",
                "Look at your hand positioning",
            ],
        )
    } else if accuracy > MIDDLE_TIER {
        (
            "Good progress. You're catching most of the moves.",
            [
                "Watch the footwork carefully",
                "Try to anticipate the next move",
                "Slightly more power in your steps",
            ],
        )
    } else {
        (
            "Keep moving! Your energy is great.",
            [
                "Focus on your arm extensions",
                "Try to match the rhythm more closely",
                "Keep your core engaged",
            ],
        )
    };

    CoachingReport {
        feedback: feedback.to_string(),
        tips: tips.iter().map(|tip| tip.to_string()).collect(),
        encouragement: "You're doing amazing, keep it up!".to_string(),
        score: (accuracy * 100.0).round() as u8,
    }
}

/// Scorer input: either two text descriptors or two raw keypoint sets.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ScoreRequest {
    Keypoints {
        reference: Vec<Keypoint>,
        user: Vec<Keypoint>,
    },
    Descriptors {
        #[serde(rename = "videoContext", alias = "referenceDescriptor", default)]
        reference: String,
        #[serde(rename = "userPerformance", alias = "userPerformanceDescriptor")]
        user_performance: String,
    },
}

impl ScoreRequest {
    pub fn accuracy(&self) -> f32 {
        match self {
            Self::Keypoints { reference, user } => similarity(reference, user),
            Self::Descriptors {
                user_performance, ..
            } => parse_accuracy(user_performance),
        }
    }

    pub fn evaluate(&self) -> CoachingReport {
        let accuracy = self.accuracy();
        tracing::debug!(accuracy, "scored performance");
        coach(accuracy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn confident(points: &[(f32, f32)]) -> Vec<Keypoint> {
        points.iter().map(|&(x, y)| Keypoint::new(x, y, 0.9)).collect()
    }

    #[test]
    fn mismatched_lengths_score_zero() {
        let reference = confident(&[(0.1, 0.1), (0.2, 0.2)]);
        let user = confident(&[(0.1, 0.1)]);
        assert_eq!(similarity(&reference, &user), 0.0);
    }

    #[test]
    fn identical_sets_score_one() {
        let points = confident(&[(0.1, 0.2), (0.5, 0.5), (0.9, 0.3)]);
        assert_eq!(similarity(&points, &points), 1.0);
    }

    #[test]
    fn low_confidence_pairs_are_ignored() {
        let reference = vec![Keypoint::new(0.0, 0.0, 0.5), Keypoint::new(0.3, 0.3, 0.9)];
        let user = vec![Keypoint::new(0.9, 0.9, 0.9), Keypoint::new(0.3, 0.3, 0.4)];
        assert_eq!(similarity(&reference, &user), 0.0);
    }

    #[test]
    fn distance_falls_off_linearly_and_saturates() {
        let reference = confident(&[(0.0, 0.0)]);
        let near = confident(&[(0.25, 0.0)]);
        let far = confident(&[(0.8, 0.0)]);
        assert!((similarity(&reference, &near) - 0.5).abs() < 1e-6);
        assert_eq!(similarity(&reference, &far), 0.0);
    }

    #[test]
    fn accuracy_text_forms() {
        assert_eq!(parse_accuracy("steady tempo, 85 accuracy% overall"), 0.85);
        assert_eq!(parse_accuracy("accuracy around 62% today"), 0.62);
        assert_eq!(parse_accuracy("scored 70% but no keyword"), 0.0);
        assert_eq!(parse_accuracy("accuracy% first"), 0.0);
        assert_eq!(parse_accuracy(""), 0.0);
    }

    #[test]
    fn tiers_follow_thresholds() {
        assert!(coach(0.9).feedback.starts_with("Excellent"));
        assert!(coach(0.8).feedback.starts_with("Good progress"));
        assert!(coach(0.6).feedback.starts_with("Good progress"));
        assert!(coach(0.5).feedback.starts_with("Keep moving"));

        let report = coach(0.856);
        assert_eq!(report.score, 86);
        assert_eq!(report.tips.len(), 3);
        assert_eq!(coach(3.0).score, 100);
    }

    #[test]
    fn requests_accept_either_shape() {
        let text: ScoreRequest = serde_json::from_str(
            r#"{"referenceDescriptor":"salsa basic","userPerformanceDescriptor":"90 accuracy%"}"#,
        )
        .unwrap();
        assert_eq!(text.evaluate().score, 90);

        let points: ScoreRequest = serde_json::from_str(
            r#"{"reference":[{"x":0.1,"y":0.1,"score":0.9}],"user":[{"x":0.1,"y":0.1,"score":0.9}]}"#,
        )
        .unwrap();
        assert_eq!(points.accuracy(), 1.0);
        assert_eq!(points.evaluate().score, 100);
    }
}
