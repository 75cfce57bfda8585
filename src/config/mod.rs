//! Configuration module for replay-rs
//!
//! This module holds the plain configuration values consumed by the recording
//! and replay sessions, and the config file they can be loaded from.
//!
//! # Files
//!
//! A config file may be TOML (`.toml`) or JSON (`.json`); the format is picked
//! from the extension. Every field is optional and falls back to its default.
//!
//! ```toml
//! [recorder]
//! recording_interval = 0.1
//! max_frames_in_memory = 100000
//! save_on_stop = true
//!
//! [replay]
//! loop_playback = false
//! buffer_size = 1000
//! frame_load_offset = 60
//!
//! [storage]
//! base_dir = "/var/lib/replay"
//! ```
//!
//! # Data Location
//!
//! Recordings default to the platform-appropriate data directory under
//! `dev.hxyulin.replay-rs/recordings`:
//!
//! - **Linux**: `~/.local/share/dev.hxyulin.replay-rs/recordings`
//! - **macOS**: `~/Library/Application Support/dev.hxyulin.replay-rs/recordings`
//! - **Windows**: `%APPDATA%\dev.hxyulin.replay-rs\recordings`

use crate::error::{ReplayError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application identifier for data directories
pub const APP_ID: &str = "dev.hxyulin.replay-rs";

/// Default time between recorded samples in seconds
pub const DEFAULT_RECORDING_INTERVAL: f64 = 0.1;

/// Default number of frames buffered in memory before a flush
pub const DEFAULT_MAX_FRAMES_IN_MEMORY: usize = 100_000;

/// Default for flushing the remaining buffer on stop
pub const DEFAULT_SAVE_ON_STOP: bool = true;

/// Default for looping playback
pub const DEFAULT_LOOP: bool = false;

/// Default number of frames loaded per window
pub const DEFAULT_BUFFER_SIZE: usize = 1000;

/// Default prefetch lookahead in frames
pub const DEFAULT_FRAME_LOAD_OFFSET: usize = 60;

// ==================== App Data Directory ====================

/// Get the application data directory path
pub fn app_data_dir() -> Option<PathBuf> {
    dirs_next::data_dir().map(|p| p.join(APP_ID))
}

/// Default directory recordings are created in
pub fn default_recordings_dir() -> Option<PathBuf> {
    app_data_dir().map(|p| p.join("recordings"))
}

// ==================== Recorder Settings ====================

/// Settings consumed by a recording session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecorderSettings {
    /// Time between recorded samples in seconds
    pub recording_interval: f64,

    /// Buffered frames that trigger a flush to disk
    pub max_frames_in_memory: usize,

    /// Whether to flush the remaining buffer when recording stops
    pub save_on_stop: bool,
}

impl Default for RecorderSettings {
    fn default() -> Self {
        Self {
            recording_interval: DEFAULT_RECORDING_INTERVAL,
            max_frames_in_memory: DEFAULT_MAX_FRAMES_IN_MEMORY,
            save_on_stop: DEFAULT_SAVE_ON_STOP,
        }
    }
}

impl RecorderSettings {
    /// Set the recording interval
    pub fn with_interval(mut self, seconds: f64) -> Self {
        self.recording_interval = seconds;
        self
    }

    /// Set the flush threshold
    pub fn with_max_frames_in_memory(mut self, frames: usize) -> Self {
        self.max_frames_in_memory = frames;
        self
    }

    /// Set whether the remaining buffer is flushed on stop
    pub fn with_save_on_stop(mut self, save: bool) -> Self {
        self.save_on_stop = save;
        self
    }

    /// Check the settings are usable
    pub fn validate(&self) -> Result<()> {
        if !(self.recording_interval.is_finite() && self.recording_interval > 0.0) {
            return Err(ReplayError::Config(format!(
                "recording_interval must be positive, got {}",
                self.recording_interval
            )));
        }
        if self.max_frames_in_memory == 0 {
            return Err(ReplayError::Config(
                "max_frames_in_memory must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

// ==================== Replay Settings ====================

/// Settings consumed by a replay session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplaySettings {
    /// Whether to restart from the beginning once the end is reached
    pub loop_playback: bool,

    /// Frames loaded per window
    pub buffer_size: usize,

    /// Frames of lookahead before the window is extended
    pub frame_load_offset: usize,
}

impl Default for ReplaySettings {
    fn default() -> Self {
        Self {
            loop_playback: DEFAULT_LOOP,
            buffer_size: DEFAULT_BUFFER_SIZE,
            frame_load_offset: DEFAULT_FRAME_LOAD_OFFSET,
        }
    }
}

impl ReplaySettings {
    /// Set loop playback
    pub fn with_loop(mut self, loop_playback: bool) -> Self {
        self.loop_playback = loop_playback;
        self
    }

    /// Set the window size
    pub fn with_buffer_size(mut self, frames: usize) -> Self {
        self.buffer_size = frames;
        self
    }

    /// Set the prefetch lookahead
    pub fn with_frame_load_offset(mut self, frames: usize) -> Self {
        self.frame_load_offset = frames;
        self
    }

    /// Check the settings are usable
    pub fn validate(&self) -> Result<()> {
        if self.buffer_size == 0 {
            return Err(ReplayError::Config(
                "buffer_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

// ==================== Storage Settings ====================

/// Where recordings and logs are written
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Base directory for recordings (platform data dir when unset)
    pub base_dir: Option<PathBuf>,

    /// Directory for rolling log files (stdout only when unset)
    pub log_dir: Option<PathBuf>,
}

impl StorageSettings {
    /// Resolved base directory for recordings
    pub fn recordings_dir(&self) -> Result<PathBuf> {
        self.base_dir
            .clone()
            .or_else(default_recordings_dir)
            .ok_or_else(|| {
                ReplayError::Config("Could not determine recordings directory".to_string())
            })
    }
}

// ==================== Config File ====================

/// Complete configuration file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplayConfig {
    pub recorder: RecorderSettings,
    pub replay: ReplaySettings,
    pub storage: StorageSettings,
}

/// Serialization format of a config file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConfigFormat {
    Toml,
    Json,
}

impl ConfigFormat {
    fn from_path(path: &Path) -> Result<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Ok(ConfigFormat::Toml),
            Some("json") => Ok(ConfigFormat::Json),
            other => Err(ReplayError::Config(format!(
                "Unsupported config extension {:?} for {:?}",
                other, path
            ))),
        }
    }
}

impl ReplayConfig {
    /// Load and validate a config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ReplayError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config: Self = match ConfigFormat::from_path(path)? {
            ConfigFormat::Toml => toml::from_str(&content).map_err(|e| {
                ReplayError::Serialization(format!("Failed to parse {:?}: {}", path, e))
            })?,
            ConfigFormat::Json => serde_json::from_str(&content).map_err(|e| {
                ReplayError::Serialization(format!("Failed to parse {:?}: {}", path, e))
            })?,
        };

        config.validate()?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Load a config file, falling back to defaults on any error
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            tracing::warn!("Failed to load config, using defaults: {}", e);
            Self::default()
        })
    }

    /// Save the config, format picked from the extension
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = match ConfigFormat::from_path(path)? {
            ConfigFormat::Toml => toml::to_string_pretty(self).map_err(|e| {
                ReplayError::Serialization(format!("Failed to serialize config: {}", e))
            })?,
            ConfigFormat::Json => serde_json::to_string_pretty(self).map_err(|e| {
                ReplayError::Serialization(format!("Failed to serialize config: {}", e))
            })?,
        };

        std::fs::write(path, content).map_err(|e| {
            ReplayError::Config(format!("Failed to write config file {:?}: {}", path, e))
        })?;
        tracing::debug!("Saved config to {:?}", path);
        Ok(())
    }

    /// Check every section is usable
    pub fn validate(&self) -> Result<()> {
        self.recorder.validate()?;
        self.replay.validate()
    }
}
