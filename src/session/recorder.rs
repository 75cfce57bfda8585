//! Recording session for capturing one attribute stream
//!
//! Samples accumulate in a bounded in-memory buffer; whenever the buffer
//! reaches `max_frames_in_memory` it is written to the frame store as one
//! chunk and cleared. The session doubles as a [`ReplayDataSource`], so a
//! replay can follow a live recording, including frames not yet flushed.

use std::path::{Path, PathBuf};

use crate::config::RecorderSettings;
use crate::error::{ReplayError, Result};
use crate::layout::{self, DeleteReport, DirectorySpec};
use crate::store::{FrameStore, WriterClaim};
use crate::types::{Record, StreamKind};

use super::source::ReplayDataSource;
use super::types::{AggregatorId, AttributeProbe, ClockMode, SessionState};

/// Recording session for one attribute stream
#[derive(Debug)]
pub struct RecordingSession<R: Record> {
    /// Stable name used in directory names
    identifier: String,
    /// Attribute captured by this session
    kind: StreamKind,
    /// Settings in effect
    settings: RecorderSettings,
    /// Current recording state
    state: SessionState,
    /// Who drives the sampling clock
    clock: ClockMode,
    /// Store for the current (or last) recording directory
    store: Option<FrameStore<R>>,
    /// Held while recording
    claim: Option<WriterClaim>,
    /// Frames not yet flushed
    buffer: Vec<R>,
    /// Frames recorded, flushed or not
    total_recorded_frames: usize,
    /// Seconds of recorded time
    total_recording_time: f64,
    /// Host time accumulated by `advance`
    elapsed: f64,
    /// Host time at which the next standalone sample is due
    next_sample_time: f64,
}

impl<R: Record> RecordingSession<R> {
    /// Create an idle recording session
    pub fn new(identifier: impl Into<String>, kind: StreamKind, settings: RecorderSettings) -> Self {
        Self {
            identifier: identifier.into(),
            kind,
            settings,
            state: SessionState::Idle,
            clock: ClockMode::Standalone,
            store: None,
            claim: None,
            buffer: Vec::new(),
            total_recorded_frames: 0,
            total_recording_time: 0.0,
            elapsed: 0.0,
            next_sample_time: 0.0,
        }
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn kind(&self) -> &StreamKind {
        &self.kind
    }

    pub fn settings(&self) -> &RecorderSettings {
        &self.settings
    }

    /// Replace the settings; ignored while recording
    pub fn set_settings(&mut self, settings: RecorderSettings) {
        if self.is_recording() {
            tracing::warn!(
                "[Recorder] {} is recording, settings change ignored",
                self.identifier
            );
            return;
        }
        self.settings = settings;
    }

    /// Get current state
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Check if recording
    pub fn is_recording(&self) -> bool {
        self.state.is_recording()
    }

    pub fn clock(&self) -> &ClockMode {
        &self.clock
    }

    pub fn total_recorded_frames(&self) -> usize {
        self.total_recorded_frames
    }

    pub fn total_recording_time(&self) -> f64 {
        self.total_recording_time
    }

    /// Directory of the current (or last) recording
    pub fn current_directory(&self) -> Option<&Path> {
        self.store.as_ref().map(|s| s.directory())
    }

    /// Index the next flushed chunk will get
    pub fn current_chunk_index(&self) -> usize {
        self.store.as_ref().map(|s| s.next_index()).unwrap_or(0)
    }

    /// Frames recorded but not yet flushed
    pub fn buffered_frames(&self) -> &[R] {
        &self.buffer
    }

    /// Start recording into the directory described by `spec`
    ///
    /// Starting while already recording is a no-op with a warning.
    pub fn start(&mut self, spec: &DirectorySpec) -> Result<()> {
        self.begin(spec, ClockMode::Standalone)
    }

    /// Start recording with the clock owned by an aggregator
    pub fn start_delegated(&mut self, spec: &DirectorySpec, aggregator: AggregatorId) -> Result<()> {
        self.begin(spec, ClockMode::Delegated(aggregator))
    }

    fn begin(&mut self, spec: &DirectorySpec, clock: ClockMode) -> Result<()> {
        if self.is_recording() {
            tracing::warn!(
                "[Recorder] {}; stop the current recording before starting a new one",
                ReplayError::DuplicateStart(self.identifier.clone())
            );
            return Ok(());
        }

        self.settings.validate()?;

        let dir = spec.directory_for(&self.identifier);
        let store = FrameStore::open(&dir, self.kind.clone())?;
        if store.next_index() > 0 {
            return Err(ReplayError::OperationNotAllowed(format!(
                "{:?} already holds {} chunks",
                dir, self.kind
            )));
        }
        let claim = WriterClaim::acquire(&dir, &self.identifier)?;

        self.reset_recording_values();
        self.store = Some(store);
        self.claim = Some(claim);
        self.clock = clock;
        self.elapsed = 0.0;
        self.next_sample_time = 0.0;
        self.state = SessionState::Recording;

        tracing::info!("[Recorder] Created recording directory: {:?}", dir);
        Ok(())
    }

    /// Record one sample
    ///
    /// Flushes the buffer as one chunk once it holds `max_frames_in_memory`
    /// frames. Ignored unless recording.
    pub fn tick(&mut self, sample: R) -> Result<()> {
        if !self.is_recording() {
            return Ok(());
        }

        self.buffer.push(sample);
        self.total_recorded_frames += 1;
        self.total_recording_time += self.settings.recording_interval;

        if self.buffer.len() >= self.settings.max_frames_in_memory {
            self.write_buffer()?;
        }
        Ok(())
    }

    /// Per-tick entry point for a standalone clock
    ///
    /// Samples `probe` once every `recording_interval` of accumulated host
    /// time, starting with the first call. Returns whether a sample was taken.
    pub fn advance(&mut self, delta_time: f64, probe: &mut impl AttributeProbe<R>) -> Result<bool> {
        if !self.is_recording() || !self.clock.is_standalone() {
            return Ok(false);
        }

        self.elapsed += delta_time;
        if self.elapsed < self.next_sample_time {
            return Ok(false);
        }

        self.tick(probe.sample())?;
        self.next_sample_time = self.elapsed + self.settings.recording_interval;
        Ok(true)
    }

    /// Stop recording
    ///
    /// With `save_on_stop`, any buffered frames are flushed as a final chunk,
    /// which may be smaller than `max_frames_in_memory`.
    pub fn stop(&mut self) -> Result<()> {
        if !self.is_recording() {
            return Ok(());
        }

        let flushed = if self.settings.save_on_stop && !self.buffer.is_empty() {
            self.write_buffer().map(|_| ())
        } else {
            Ok(())
        };

        self.claim = None;
        self.clock = ClockMode::Standalone;
        self.state = SessionState::Idle;
        tracing::info!(
            "[Recorder] Stopped {}: {} frames, {:.2}s",
            self.identifier,
            self.total_recorded_frames,
            self.total_recording_time
        );
        flushed
    }

    /// Delete every recording of this identifier under `base_dir`
    ///
    /// Refused while recording.
    pub fn delete_all_recordings(&mut self, base_dir: &Path) -> Result<DeleteReport> {
        if self.is_recording() {
            tracing::error!("[Recorder] Cannot delete recording files while recording is in progress!");
            return Err(ReplayError::OperationNotAllowed(format!(
                "{} is recording",
                self.identifier
            )));
        }

        let report = layout::delete_recordings(base_dir, &self.identifier)?;
        if self
            .current_directory()
            .is_some_and(|dir| report.deleted.iter().any(|d| d == dir))
        {
            self.store = None;
        }
        self.reset_recording_values();
        Ok(report)
    }

    /// Clear counters and the unflushed buffer
    pub fn reset_recording_values(&mut self) {
        self.total_recorded_frames = 0;
        self.total_recording_time = 0.0;
        self.buffer.clear();
    }

    fn write_buffer(&mut self) -> Result<usize> {
        let store = self.store.as_mut().ok_or_else(|| {
            ReplayError::OperationNotAllowed("no recording directory to flush into".to_string())
        })?;

        tracing::debug!(
            "[Recorder] Writing {} frames to file: {}",
            self.buffer.len(),
            store.next_index()
        );
        let index = store.append(&self.buffer)?;
        self.buffer.clear();
        Ok(index)
    }

    fn store_or_no_source(&self) -> Result<&FrameStore<R>> {
        self.store.as_ref().ok_or(ReplayError::NoDataSource)
    }

    fn observe_total(&mut self, total_frames: usize) {
        self.total_recorded_frames = total_frames;
        self.total_recording_time = total_frames as f64 * self.settings.recording_interval;
    }
}

impl<R: Record> ReplayDataSource<R> for RecordingSession<R> {
    fn recording_interval(&self) -> f64 {
        self.settings.recording_interval
    }

    fn total_recorded_frames(&self) -> usize {
        self.total_recorded_frames
    }

    fn total_recording_time(&self) -> f64 {
        self.total_recording_time
    }

    fn load_frames_from_index(&mut self, start: usize, count: usize) -> Result<Vec<R>> {
        let range = self
            .store_or_no_source()?
            .read_range(start, count, &self.buffer)?;
        self.observe_total(range.total_frames);
        Ok(range.frames)
    }

    fn load_frames_from_directory(&mut self, dir: &Path, count: usize) -> Result<Vec<R>> {
        if self.is_recording() && self.current_directory() != Some(dir) {
            return Err(ReplayError::OperationNotAllowed(format!(
                "{} is recording into another directory",
                self.identifier
            )));
        }

        if self.current_directory() != Some(dir) {
            // Unflushed frames belong to the previous directory
            self.store = Some(FrameStore::open_existing(PathBuf::from(dir), self.kind.clone())?);
            self.buffer.clear();
        }
        self.load_frames_from_index(0, count)
    }
}
