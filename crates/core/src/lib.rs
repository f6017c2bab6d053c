//! Core library for the dance avatar server.
//!
//! Turns a dance style or named move plus a time into a full skeletal pose,
//! bakes those poses into a loopable timeline, keeps any number of viewers in
//! step with a shared play/pause/resume/reset clock, and grades a user's
//! attempt against reference keypoints. Networking lives in the app crate;
//! the streaming loops here only see the [`stream::ViewerConnection`] trait.

pub mod assets;
pub mod catalog;
pub mod config;
pub mod error;
pub mod pose;
pub mod scoring;
pub mod stream;
pub mod synth;
pub mod timeline;
pub mod transport;

pub use assets::{AssetStore, MusicTrack};
pub use catalog::{MoveCatalog, MoveDefinition, MoveKind, StyleCatalog, StyleProfile};
pub use config::{AppConfig, AssetConfig, ServerConfig, StreamConfig, TimelineConfig};
pub use error::{DanceError, Result};
pub use pose::{FullSkeletonPose, LimbChainPose, Pose, SkeletonJoint, Vec3};
pub use scoring::{CoachingReport, Keypoint, ScoreRequest};
pub use stream::{LiveStreamer, ServerMessage, SessionOutcome, ViewerConnection};
pub use synth::PoseSynthesizer;
pub use timeline::{MoveSchedule, PlaybackClock, Timeline};
pub use transport::{TransportController, TransportEvent, TransportStatus};
