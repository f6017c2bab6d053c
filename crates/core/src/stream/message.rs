use serde::{Deserialize, Serialize};

use crate::{pose::Pose, transport::TransportEvent};

/// Text a synced viewer sends to pull the pose at the current playhead.
pub const GET_POSE: &str = "get_pose";

/// A pose on the wire, optionally numbered within a bounded session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PoseFrame {
    #[serde(flatten)]
    pub pose: Pose,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frame: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionNotice {
    pub status: &'static str,
    pub frames_sent: u64,
    pub duration: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlMessage {
    Connected { message: String },
    Pong,
}

/// Everything the server pushes to a viewer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ServerMessage {
    Pose(PoseFrame),
    Complete(CompletionNotice),
    Control(ControlMessage),
    Transport(TransportEvent),
}

impl ServerMessage {
    pub fn pose(pose: impl Into<Pose>, frame: Option<u64>) -> Self {
        Self::Pose(PoseFrame {
            pose: pose.into(),
            frame,
        })
    }

    pub fn complete(frames_sent: u64, duration: f32) -> Self {
        Self::Complete(CompletionNotice {
            status: "complete",
            frames_sent,
            duration,
        })
    }

    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// First message on a bounded session: `{style, duration?}`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SessionRequest {
    pub style: Option<String>,
    pub duration: Option<f32>,
}

impl SessionRequest {
    /// Unparseable input yields an empty request so the defaults apply.
    pub fn parse(text: &str) -> Self {
        serde_json::from_str(text).unwrap_or_default()
    }
}

/// Mid-stream request to switch style: `{style}`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StyleChange {
    pub style: String,
}

impl StyleChange {
    pub fn parse(text: &str) -> Option<Self> {
        serde_json::from_str(text).ok()
    }
}

/// What a synced viewer may ask for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncRequest {
    GetPose,
    Ping,
}

#[derive(Deserialize)]
struct TypedRequest {
    #[serde(rename = "type")]
    kind: String,
}

impl SyncRequest {
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if text == GET_POSE {
            return Some(Self::GetPose);
        }
        let typed: TypedRequest = serde_json::from_str(text).ok()?;
        match typed.kind.as_str() {
            "ping" => Some(Self::Ping),
            GET_POSE => Some(Self::GetPose),
            _ => None,
        }
    }
}
