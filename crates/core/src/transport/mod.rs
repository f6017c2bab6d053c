//! Shared play/pause/resume/reset clock and its viewer fan-out.
//!
//! One [`TransportController`] exists per server. It is constructed explicitly
//! and shared behind an `Arc`; state and registry sit behind their own mutexes,
//! neither of which is held across an await point. A transition keeps the
//! state lock while it broadcasts, so viewers see events in the order the
//! state changed. Lock order is always state, then registry.

mod viewer;

use std::sync::{Mutex, MutexGuard};

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

pub use viewer::{BroadcastReport, ChannelViewer, Viewer, ViewerId, ViewerRegistry};

use crate::{timeline::PlaybackClock, DanceError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportPhase {
    Idle,
    Playing,
    Paused,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransportState {
    pub current_music_id: Option<String>,
    pub is_playing: bool,
    pub is_paused: bool,
    pub clock: PlaybackClock,
    pub pause_time: f32,
}

impl TransportState {
    pub fn current_time(&self) -> f32 {
        self.clock.time_seconds
    }

    pub fn phase(&self) -> TransportPhase {
        match (self.is_playing, self.is_paused) {
            (true, _) => TransportPhase::Playing,
            (false, true) => TransportPhase::Paused,
            (false, false) => TransportPhase::Idle,
        }
    }
}

/// Notification fanned out to every registered viewer on a transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransportEvent {
    MusicStart {
        timestamp: String,
        #[serde(rename = "musicId")]
        music_id: String,
    },
    MusicPause {
        timestamp: String,
        #[serde(rename = "pauseTime")]
        pause_time: f32,
    },
    MusicResume {
        timestamp: String,
        #[serde(rename = "resumeFrom")]
        resume_from: f32,
    },
    Reset {
        timestamp: String,
    },
}

impl TransportEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MusicStart { .. } => "music_start",
            Self::MusicPause { .. } => "music_pause",
            Self::MusicResume { .. } => "music_resume",
            Self::Reset { .. } => "reset",
        }
    }
}

/// Response body for a transport request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TransportAck {
    Started {
        status: &'static str,
        #[serde(rename = "musicId")]
        music_id: String,
        #[serde(rename = "currentTime")]
        current_time: f32,
    },
    Paused {
        status: &'static str,
        #[serde(rename = "pauseTime")]
        pause_time: f32,
    },
    Resumed {
        status: &'static str,
        #[serde(rename = "resumeFrom")]
        resume_from: f32,
    },
    Reset {
        status: &'static str,
        pose: &'static str,
    },
}

#[derive(Debug, Clone)]
pub struct Transition {
    pub ack: TransportAck,
    pub broadcast: BroadcastReport,
}

/// Snapshot read of the transport.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransportStatus {
    pub music_playing: bool,
    pub current_music: Option<String>,
    pub current_time: f32,
    pub is_paused: bool,
    pub connected_clients: usize,
}

#[derive(Debug, Default)]
pub struct TransportController {
    state: Mutex<TransportState>,
    viewers: ViewerRegistry,
}

impl TransportController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn viewers(&self) -> &ViewerRegistry {
        &self.viewers
    }

    pub fn play(&self, music_id: impl Into<String>) -> Result<Transition> {
        let music_id = music_id.into();
        let mut state = self.lock_state()?;
        state.current_music_id = Some(music_id.clone());
        state.is_playing = true;
        state.is_paused = false;
        state.clock.reset();
        tracing::info!(music_id = %music_id, "transport playing");

        let broadcast = self.viewers.broadcast(&TransportEvent::MusicStart {
            timestamp: now_iso8601(),
            music_id: music_id.clone(),
        })?;
        drop(state);

        Ok(Transition {
            ack: TransportAck::Started {
                status: "playing",
                music_id,
                current_time: 0.0,
            },
            broadcast,
        })
    }

    pub fn pause(&self) -> Result<Transition> {
        let mut state = self.lock_state()?;
        state.is_playing = false;
        state.is_paused = true;
        state.pause_time = state.current_time();
        let pause_time = state.pause_time;
        tracing::info!(pause_time, "transport paused");

        let broadcast = self.viewers.broadcast(&TransportEvent::MusicPause {
            timestamp: now_iso8601(),
            pause_time,
        })?;
        drop(state);

        Ok(Transition {
            ack: TransportAck::Paused {
                status: "paused",
                pause_time,
            },
            broadcast,
        })
    }

    /// Continues from the current playhead; the clock is not rewound.
    pub fn resume(&self) -> Result<Transition> {
        let mut state = self.lock_state()?;
        state.is_playing = true;
        state.is_paused = false;
        let resume_from = state.current_time();
        tracing::info!(resume_from, "transport resumed");

        let broadcast = self.viewers.broadcast(&TransportEvent::MusicResume {
            timestamp: now_iso8601(),
            resume_from,
        })?;
        drop(state);

        Ok(Transition {
            ack: TransportAck::Resumed {
                status: "playing",
                resume_from,
            },
            broadcast,
        })
    }

    pub fn reset(&self) -> Result<Transition> {
        let mut state = self.lock_state()?;
        *state = TransportState::default();
        tracing::info!("transport reset");

        let broadcast = self.viewers.broadcast(&TransportEvent::Reset {
            timestamp: now_iso8601(),
        })?;
        drop(state);

        Ok(Transition {
            ack: TransportAck::Reset {
                status: "reset",
                pose: "idle",
            },
            broadcast,
        })
    }

    /// Moves the playhead forward by `delta` seconds while playing. Paused and
    /// idle transports ignore ticks.
    pub fn advance(&self, delta: f32) -> Result<f32> {
        let mut state = self.lock_state()?;
        if state.is_playing {
            state.clock.advance(delta);
        }
        Ok(state.current_time())
    }

    pub fn state(&self) -> Result<TransportState> {
        Ok(self.lock_state()?.clone())
    }

    pub fn status(&self) -> Result<TransportStatus> {
        let state = self.lock_state()?;
        Ok(TransportStatus {
            music_playing: state.is_playing,
            current_music: state.current_music_id.clone(),
            current_time: state.current_time(),
            is_paused: state.is_paused,
            connected_clients: self.viewers.len()?,
        })
    }

    fn lock_state(&self) -> Result<MutexGuard<'_, TransportState>> {
        self.state
            .lock()
            .map_err(|_| DanceError::msg("transport state has been poisoned"))
    }
}

fn now_iso8601() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
