//! Test data builders for creating test objects

use std::path::{Path, PathBuf};

use replay_rs::{
    DirectorySpec, RecorderSettings, RecordingSession, ReplaySettings, StreamKind, Vec3,
};

/// Builder for recording sessions with a finished capture on disk
pub struct CaptureBuilder {
    identifier: String,
    timestamp: String,
    frames: usize,
    interval: f64,
    max_frames_in_memory: usize,
}

impl CaptureBuilder {
    pub fn new(identifier: &str) -> Self {
        Self {
            identifier: identifier.to_string(),
            timestamp: "20240101000000".to_string(),
            frames: 10,
            interval: 0.1,
            max_frames_in_memory: 4,
        }
    }

    pub fn timestamp(mut self, timestamp: &str) -> Self {
        self.timestamp = timestamp.to_string();
        self
    }

    pub fn frames(mut self, frames: usize) -> Self {
        self.frames = frames;
        self
    }

    pub fn interval(mut self, interval: f64) -> Self {
        self.interval = interval;
        self
    }

    pub fn max_frames_in_memory(mut self, frames: usize) -> Self {
        self.max_frames_in_memory = frames;
        self
    }

    pub fn settings(&self) -> RecorderSettings {
        RecorderSettings::default()
            .with_interval(self.interval)
            .with_max_frames_in_memory(self.max_frames_in_memory)
    }

    /// Record `frames` path frames under `base_dir` and stop
    pub fn record(self, base_dir: &Path) -> (RecordingSession<Vec3>, PathBuf) {
        let mut session =
            RecordingSession::new(self.identifier.as_str(), StreamKind::Position, self.settings());
        session
            .start(&DirectorySpec::new(base_dir, self.timestamp.as_str()))
            .unwrap();
        for i in 0..self.frames {
            session.tick(super::path_frame(i)).unwrap();
        }
        session.stop().unwrap();
        let dir = session.current_directory().unwrap().to_path_buf();
        (session, dir)
    }
}

/// Replay settings with a small window for exercising prefetch
pub fn small_window(buffer_size: usize, frame_load_offset: usize) -> ReplaySettings {
    ReplaySettings::default()
        .with_buffer_size(buffer_size)
        .with_frame_load_offset(frame_load_offset)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_builder() {
        let base = tempfile::tempdir().unwrap();
        let (session, dir) = CaptureBuilder::new("rig").frames(6).record(base.path());

        assert_eq!(session.total_recorded_frames(), 6);
        assert!(dir.ends_with("recording_rig_20240101000000"));
    }
}
