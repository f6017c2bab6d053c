use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::Serialize;

use crate::{config::AssetConfig, DanceError, Result};

/// File extensions recognised as playable music.
pub const MUSIC_EXTENSIONS: [&str; 3] = ["mp3", "wav", "ogg"];

/// One playable file in the music directory. The id is the file stem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MusicTrack {
    pub id: String,
    pub name: String,
    pub path: String,
    pub size: u64,
}

/// On-disk music library and avatar models.
///
/// Directories are rescanned on every query so files dropped in while the
/// server runs show up without a restart. A missing directory is an empty
/// library, not an error.
#[derive(Debug, Clone)]
pub struct AssetStore {
    music_dir: PathBuf,
    models_dir: PathBuf,
}

impl AssetStore {
    pub fn new(music_dir: impl Into<PathBuf>, models_dir: impl Into<PathBuf>) -> Self {
        Self {
            music_dir: music_dir.into(),
            models_dir: models_dir.into(),
        }
    }

    pub fn from_config(config: &AssetConfig) -> Self {
        Self::new(&config.music_dir, &config.models_dir)
    }

    pub fn music_dir(&self) -> &Path {
        &self.music_dir
    }

    /// Tracks sorted by id.
    pub fn tracks(&self) -> Result<Vec<MusicTrack>> {
        let entries = match fs::read_dir(&self.music_dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(dir = %self.music_dir.display(), "music directory missing");
                return Ok(Vec::new());
            }
            Err(err) => return Err(err.into()),
        };

        let mut tracks = Vec::new();
        for entry in entries {
            let entry = entry?;
            let path = entry.path();
            if !is_music_file(&path) {
                continue;
            }
            let metadata = entry.metadata()?;
            if !metadata.is_file() {
                continue;
            }
            let Some(id) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let name = entry.file_name().to_string_lossy().into_owned();
            tracks.push(MusicTrack {
                id: id.to_string(),
                path: format!("/music/{name}"),
                name,
                size: metadata.len(),
            });
        }

        tracks.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(tracks)
    }

    pub fn track(&self, id: &str) -> Result<MusicTrack> {
        self.tracks()?
            .into_iter()
            .find(|track| track.id == id)
            .ok_or_else(|| DanceError::asset_missing("music track", id))
    }

    /// Path of a model file by bare file name. Names that try to leave the
    /// models directory are treated as missing.
    pub fn resolve_model(&self, name: &str) -> Result<PathBuf> {
        let escapes = name.is_empty()
            || name.contains(['/', '\\'])
            || name == "."
            || name == "..";
        if escapes {
            return Err(DanceError::asset_missing("model", name));
        }

        let path = self.models_dir.join(name);
        if path.is_file() {
            Ok(path)
        } else {
            Err(DanceError::asset_missing("model", name))
        }
    }
}

impl Default for AssetStore {
    fn default() -> Self {
        Self::from_config(&AssetConfig::default())
    }
}

fn is_music_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            MUSIC_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        })
        .unwrap_or(false)
}
