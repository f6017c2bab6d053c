use std::{path::Path, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{DanceError, Result};

/// Top-level configuration structure for the application.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub stream: StreamConfig,
    pub timeline: TimelineConfig,
    pub assets: AssetConfig,
}

impl AppConfig {
    /// Reads a JSON configuration file. Missing sections and fields keep their
    /// defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.stream.frame_rate.is_finite() && self.stream.frame_rate > 0.0) {
            return Err(DanceError::InvalidConfig(format!(
                "frame_rate must be positive, got {}",
                self.stream.frame_rate
            )));
        }
        if self.timeline.move_duration_seconds <= 0.0 {
            return Err(DanceError::InvalidConfig(
                "move_duration_seconds must be positive".to_string(),
            ));
        }
        if self.timeline.total_duration_seconds < 0.0 {
            return Err(DanceError::InvalidConfig(
                "total_duration_seconds cannot be negative".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8000".to_string(),
        }
    }
}

/// Cadence and defaults for the per-connection pose loops.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    pub frame_rate: f32,
    pub default_style: String,
    pub default_session_seconds: f32,
    /// How long the streaming loop waits for a style change before rendering
    /// the next frame.
    pub poll_timeout_ms: u64,
}

impl StreamConfig {
    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f32(1.0 / self.frame_rate)
    }

    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_timeout_ms)
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            frame_rate: 30.0,
            default_style: crate::catalog::DEFAULT_STYLE.to_string(),
            default_session_seconds: 10.0,
            poll_timeout_ms: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelineConfig {
    pub total_duration_seconds: f32,
    pub move_duration_seconds: f32,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            total_duration_seconds: 60.0,
            move_duration_seconds: 2.0,
        }
    }
}

/// Directories the asset store and static file service read from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetConfig {
    pub static_dir: String,
    pub music_dir: String,
    pub models_dir: String,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            static_dir: "static".to_string(),
            music_dir: "music".to_string(),
            models_dir: "models".to_string(),
        }
    }
}
