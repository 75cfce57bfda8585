//! Aggregators that drive many sessions from one clock
//!
//! A [`CaptureGroup`] records several streams in lockstep: it owns the
//! sampling clock and its channels are started with a delegated clock into
//! child directories that share the group's timestamp. A [`PlaybackGroup`]
//! does the same for replay and decides looping against its longest channel.

use std::path::{Path, PathBuf};

use crate::config::RecorderSettings;
use crate::error::{ReplayError, Result};
use crate::layout::{self, DeleteReport, DirectorySpec};
use crate::store::WriterClaim;
use crate::types::{Interpolate, Record};

use super::player::ReplaySession;
use super::recorder::RecordingSession;
use super::types::{AggregatorId, AttributeProbe, ClockMode, SessionState, TickOutcome};

// ==================== Capture ====================

/// A recorder that can be driven by a [`CaptureGroup`]
pub trait CaptureChannel {
    fn identifier(&self) -> &str;

    /// Start recording with the clock owned by `aggregator`
    fn start_delegated(&mut self, spec: &DirectorySpec, aggregator: AggregatorId) -> Result<()>;

    /// Take one sample
    fn capture(&mut self) -> Result<()>;

    fn stop(&mut self) -> Result<()>;

    fn is_recording(&self) -> bool;

    fn total_recorded_frames(&self) -> usize;
}

/// A recording session paired with the probe it samples
#[derive(Debug)]
pub struct ProbedRecorder<R: Record, P: AttributeProbe<R>> {
    session: RecordingSession<R>,
    probe: P,
}

impl<R: Record, P: AttributeProbe<R>> ProbedRecorder<R, P> {
    pub fn new(session: RecordingSession<R>, probe: P) -> Self {
        Self { session, probe }
    }

    pub fn session(&self) -> &RecordingSession<R> {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut RecordingSession<R> {
        &mut self.session
    }

    pub fn into_session(self) -> RecordingSession<R> {
        self.session
    }
}

impl<R: Record, P: AttributeProbe<R>> CaptureChannel for ProbedRecorder<R, P> {
    fn identifier(&self) -> &str {
        self.session.identifier()
    }

    fn start_delegated(&mut self, spec: &DirectorySpec, aggregator: AggregatorId) -> Result<()> {
        self.session.start_delegated(spec, aggregator)
    }

    fn capture(&mut self) -> Result<()> {
        let sample = self.probe.sample();
        self.session.tick(sample)
    }

    fn stop(&mut self) -> Result<()> {
        self.session.stop()
    }

    fn is_recording(&self) -> bool {
        self.session.is_recording()
    }

    fn total_recorded_frames(&self) -> usize {
        self.session.total_recorded_frames()
    }
}

/// Records many channels from one clock
pub struct CaptureGroup {
    identifier: String,
    settings: RecorderSettings,
    state: SessionState,
    channels: Vec<Box<dyn CaptureChannel>>,
    /// Parent directory of the current (or last) capture
    directory: Option<PathBuf>,
    claim: Option<WriterClaim>,
    total_recorded_frames: usize,
    total_recording_time: f64,
    elapsed: f64,
    next_sample_time: f64,
}

impl std::fmt::Debug for CaptureGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureGroup")
            .field("identifier", &self.identifier)
            .field("state", &self.state)
            .field("channels", &self.channels.len())
            .field("directory", &self.directory)
            .field("total_recorded_frames", &self.total_recorded_frames)
            .finish_non_exhaustive()
    }
}

impl CaptureGroup {
    /// Create an idle group sampling every `settings.recording_interval`
    pub fn new(identifier: impl Into<String>, settings: RecorderSettings) -> Self {
        Self {
            identifier: identifier.into(),
            settings,
            state: SessionState::Idle,
            channels: Vec::new(),
            directory: None,
            claim: None,
            total_recorded_frames: 0,
            total_recording_time: 0.0,
            elapsed: 0.0,
            next_sample_time: 0.0,
        }
    }

    /// Add a channel; refused while recording
    pub fn add_channel(&mut self, channel: impl CaptureChannel + 'static) -> Result<()> {
        if self.is_recording() {
            return Err(ReplayError::OperationNotAllowed(format!(
                "cannot add channels while {} is recording",
                self.identifier
            )));
        }
        self.channels.push(Box::new(channel));
        Ok(())
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_recording(&self) -> bool {
        self.state.is_recording()
    }

    /// Parent directory of the current (or last) capture
    pub fn directory(&self) -> Option<&Path> {
        self.directory.as_deref()
    }

    pub fn total_recorded_frames(&self) -> usize {
        self.total_recorded_frames
    }

    pub fn total_recording_time(&self) -> f64 {
        self.total_recording_time
    }

    /// Start every channel into child directories of `recording_{group}_{ts}`
    pub fn start(&mut self, spec: &DirectorySpec) -> Result<()> {
        if self.is_recording() {
            tracing::warn!(
                "[CaptureGroup] {}; stop the current recording before starting a new one",
                ReplayError::DuplicateStart(self.identifier.clone())
            );
            return Ok(());
        }
        self.settings.validate()?;

        let parent = spec.directory_for(&self.identifier);
        std::fs::create_dir_all(&parent)?;
        let claim = WriterClaim::acquire(&parent, &self.identifier)?;

        let child_spec = DirectorySpec::new(&parent, spec.timestamp.clone());
        let aggregator = AggregatorId(self.identifier.clone());
        for started in 0..self.channels.len() {
            if let Err(e) = self.channels[started].start_delegated(&child_spec, aggregator.clone()) {
                tracing::error!(
                    "[CaptureGroup] Channel {} failed to start: {}",
                    self.channels[started].identifier(),
                    e
                );
                for channel in &mut self.channels[..started] {
                    if let Err(stop_err) = channel.stop() {
                        tracing::warn!("[CaptureGroup] Rollback stop failed: {}", stop_err);
                    }
                }
                return Err(e);
            }
        }

        self.total_recorded_frames = 0;
        self.total_recording_time = 0.0;
        self.elapsed = 0.0;
        self.next_sample_time = 0.0;
        self.claim = Some(claim);
        self.directory = Some(parent);
        self.state = SessionState::Recording;
        tracing::info!(
            "[CaptureGroup] Recording {} channels into {:?}",
            self.channels.len(),
            self.directory
        );
        Ok(())
    }

    /// Per-tick entry point; samples every channel once per interval
    ///
    /// A failing channel does not keep the others from sampling. The group
    /// counters still advance and the first failure is returned.
    pub fn advance(&mut self, delta_time: f64) -> Result<bool> {
        if !self.is_recording() {
            return Ok(false);
        }

        self.elapsed += delta_time;
        if self.elapsed < self.next_sample_time {
            return Ok(false);
        }

        // Every channel samples on every step, even after one fails
        let mut first_error = None;
        for channel in &mut self.channels {
            if let Err(e) = channel.capture() {
                tracing::error!("[CaptureGroup] Channel {} failed to capture: {}", channel.identifier(), e);
                first_error.get_or_insert(e);
            }
        }
        self.total_recorded_frames += 1;
        self.total_recording_time += self.settings.recording_interval;
        self.next_sample_time = self.elapsed + self.settings.recording_interval;
        first_error.map_or(Ok(true), Err)
    }

    /// Stop every channel
    ///
    /// All channels are stopped even if one fails; the first failure is
    /// returned.
    pub fn stop(&mut self) -> Result<()> {
        if !self.is_recording() {
            return Ok(());
        }

        let mut first_error = None;
        for channel in &mut self.channels {
            if let Err(e) = channel.stop() {
                tracing::error!("[CaptureGroup] Channel {} failed to stop: {}", channel.identifier(), e);
                first_error.get_or_insert(e);
            }
        }

        self.claim = None;
        self.state = SessionState::Idle;
        tracing::info!(
            "[CaptureGroup] Stopped {}: {} frames, {:.2}s",
            self.identifier,
            self.total_recorded_frames,
            self.total_recording_time
        );
        first_error.map_or(Ok(()), Err)
    }

    /// Delete every capture of this group under `base_dir`
    pub fn delete_all_recordings(&mut self, base_dir: &Path) -> Result<DeleteReport> {
        if self.is_recording() {
            tracing::error!("[CaptureGroup] Cannot delete recording files while recording is in progress!");
            return Err(ReplayError::OperationNotAllowed(format!(
                "{} is recording",
                self.identifier
            )));
        }

        let report = layout::delete_recordings(base_dir, &self.identifier)?;
        self.directory = None;
        self.total_recorded_frames = 0;
        self.total_recording_time = 0.0;
        Ok(report)
    }
}

// ==================== Playback ====================

/// A replay session that can be driven by a [`PlaybackGroup`]
pub trait PlaybackChannel {
    fn identifier(&self) -> &str;

    fn set_clock(&mut self, clock: ClockMode);

    fn load(&mut self) -> Result<()>;

    fn load_directory(&mut self, dir: &Path) -> Result<()>;

    fn loaded_frame_count(&self) -> usize;

    fn total_recording_time(&self) -> f64;

    fn play(&mut self) -> Result<()>;

    fn pause(&mut self);

    fn resume(&mut self);

    fn stop(&mut self);

    fn seek(&mut self, time: f64) -> Result<()>;

    /// Present the value at group time `time`
    fn advance_to(&mut self, time: f64) -> Result<()>;

    /// Restart from the beginning
    fn rewind(&mut self) -> Result<()>;
}

impl<R: Record + Interpolate> PlaybackChannel for ReplaySession<R> {
    fn identifier(&self) -> &str {
        ReplaySession::identifier(self)
    }

    fn set_clock(&mut self, clock: ClockMode) {
        ReplaySession::set_clock(self, clock)
    }

    fn load(&mut self) -> Result<()> {
        ReplaySession::load(self)
    }

    fn load_directory(&mut self, dir: &Path) -> Result<()> {
        ReplaySession::load_directory(self, dir)
    }

    fn loaded_frame_count(&self) -> usize {
        ReplaySession::loaded_frame_count(self)
    }

    fn total_recording_time(&self) -> f64 {
        ReplaySession::total_recording_time(self)
    }

    fn play(&mut self) -> Result<()> {
        ReplaySession::play(self)
    }

    fn pause(&mut self) {
        ReplaySession::pause(self)
    }

    fn resume(&mut self) {
        ReplaySession::resume(self)
    }

    fn stop(&mut self) {
        ReplaySession::stop(self)
    }

    fn seek(&mut self, time: f64) -> Result<()> {
        ReplaySession::seek(self, time)
    }

    fn advance_to(&mut self, time: f64) -> Result<()> {
        ReplaySession::advance_to(self, time)
    }

    fn rewind(&mut self) -> Result<()> {
        ReplaySession::rewind(self)
    }
}

/// Replays many channels against one clock
pub struct PlaybackGroup {
    identifier: String,
    loop_playback: bool,
    state: SessionState,
    channels: Vec<Box<dyn PlaybackChannel>>,
    current_time: f64,
}

impl std::fmt::Debug for PlaybackGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackGroup")
            .field("identifier", &self.identifier)
            .field("state", &self.state)
            .field("channels", &self.channels.len())
            .field("current_time", &self.current_time)
            .finish_non_exhaustive()
    }
}

impl PlaybackGroup {
    pub fn new(identifier: impl Into<String>, loop_playback: bool) -> Self {
        Self {
            identifier: identifier.into(),
            loop_playback,
            state: SessionState::Idle,
            channels: Vec::new(),
            current_time: 0.0,
        }
    }

    /// Add a channel; its clock is handed over to the group
    pub fn add_channel(&mut self, mut channel: impl PlaybackChannel + 'static) {
        channel.set_clock(ClockMode::Delegated(AggregatorId(self.identifier.clone())));
        self.channels.push(Box::new(channel));
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state.is_playing()
    }

    pub fn is_paused(&self) -> bool {
        self.state.is_paused()
    }

    pub fn current_time(&self) -> f64 {
        self.current_time
    }

    pub fn set_loop_playback(&mut self, loop_playback: bool) {
        self.loop_playback = loop_playback;
    }

    /// Duration of the longest channel
    pub fn total_recording_time(&self) -> f64 {
        self.channels
            .iter()
            .map(|c| c.total_recording_time())
            .fold(0.0, f64::max)
    }

    /// Load every channel from its bound source
    pub fn load(&mut self) -> Result<()> {
        for channel in &mut self.channels {
            channel.load()?;
        }
        self.loaded();
        Ok(())
    }

    /// Load every channel from its child directory of `parent_dir`
    pub fn load_directory(&mut self, parent_dir: &Path) -> Result<()> {
        for channel in &mut self.channels {
            let dir = layout::child_directory(parent_dir, channel.identifier()).ok_or_else(|| {
                ReplayError::OperationNotAllowed(format!(
                    "{:?} is not a recording directory",
                    parent_dir
                ))
            })?;
            channel.load_directory(&dir)?;
        }
        self.loaded();
        Ok(())
    }

    fn loaded(&mut self) {
        self.current_time = 0.0;
        self.state = SessionState::Loaded;
        tracing::info!(
            "[PlaybackGroup] {} loaded {} channels, {:.2}s",
            self.identifier,
            self.channels.len(),
            self.total_recording_time()
        );
    }

    /// Start playback of every channel
    pub fn play(&mut self) -> Result<()> {
        if self.channels.is_empty() || self.channels.iter().any(|c| c.loaded_frame_count() == 0) {
            tracing::warn!("[PlaybackGroup] {}: no frames loaded, cannot play", self.identifier);
            return Err(ReplayError::NoFramesLoaded);
        }
        for channel in &mut self.channels {
            channel.play()?;
        }
        self.state = SessionState::Playing;
        Ok(())
    }

    pub fn pause(&mut self) {
        if self.is_playing() {
            self.channels.iter_mut().for_each(|c| c.pause());
            self.state = SessionState::Paused;
        }
    }

    pub fn resume(&mut self) {
        if self.is_paused() {
            self.channels.iter_mut().for_each(|c| c.resume());
            self.state = SessionState::Playing;
        }
    }

    pub fn stop(&mut self) {
        self.channels.iter_mut().for_each(|c| c.stop());
        self.current_time = 0.0;
        self.state = SessionState::Idle;
    }

    /// Move every channel to `time`
    pub fn seek(&mut self, time: f64) -> Result<()> {
        let time = time.clamp(0.0, self.total_recording_time());
        for channel in &mut self.channels {
            channel.seek(time)?;
        }
        self.current_time = time;
        if self.state == SessionState::Idle {
            self.state = SessionState::Loaded;
        }
        Ok(())
    }

    /// Per-tick entry point; advances every channel to the group time
    pub fn tick(&mut self, delta_time: f64) -> Result<TickOutcome> {
        if !self.is_playing() {
            return Ok(TickOutcome::Inactive);
        }

        let previous = self.current_time;
        self.current_time += delta_time;
        for channel in &mut self.channels {
            if let Err(e) = channel.advance_to(self.current_time) {
                self.current_time = previous;
                return Err(e);
            }
        }

        if self.current_time < self.total_recording_time() {
            return Ok(TickOutcome::Advanced);
        }

        if self.loop_playback {
            tracing::debug!("[PlaybackGroup] End of replay reached. Looping playback.");
            for channel in &mut self.channels {
                channel.rewind()?;
            }
            self.current_time = 0.0;
            Ok(TickOutcome::Looped)
        } else {
            tracing::info!("[PlaybackGroup] End of replay reached. Stopping playback.");
            self.stop();
            Ok(TickOutcome::Stopped)
        }
    }
}
