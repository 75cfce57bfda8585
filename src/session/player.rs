//! Replay session for playing back one recorded stream
//!
//! Only a window of frames is resident at any time. The window is loaded
//! from a [`ReplayDataSource`] and slides forward as playback approaches its
//! trailing edge: frames behind the playhead are evicted and the next block
//! is appended from the first frame not yet resident.
//!
//! Each tick maps playback time onto a fractional frame position and hands
//! the interpolated value to the session's [`AttributeSink`].

use std::fmt;
use std::ops::Range;
use std::path::Path;

use crate::config::ReplaySettings;
use crate::error::{ReplayError, Result};
use crate::types::{Interpolate, Record};

use super::source::ReplayDataSource;
use super::types::{AttributeSink, ClockMode, SessionState, TickOutcome};

/// Replay session for one stream
pub struct ReplaySession<R: Record + Interpolate> {
    /// Stable name, used to resolve child directories in a group
    identifier: String,
    /// Settings in effect
    settings: ReplaySettings,
    /// Current playback state
    state: SessionState,
    /// Who drives the playback clock
    clock: ClockMode,
    /// Where frames come from
    source: Option<Box<dyn ReplayDataSource<R>>>,
    /// Where interpolated values go
    sink: Box<dyn AttributeSink<R>>,
    /// Resident window of frames
    frames: Vec<R>,
    /// Global index of `frames[0]`
    window_start: usize,
    /// Frames the source reported at the last load
    total_frames: usize,
    /// Seconds between frames, as reported by the source
    interval: f64,
    /// Global index of the last emitted lower frame
    current_frame: usize,
    /// Playback time in seconds
    current_time: f64,
}

impl<R: Record + Interpolate> fmt::Debug for ReplaySession<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReplaySession")
            .field("identifier", &self.identifier)
            .field("state", &self.state)
            .field("clock", &self.clock)
            .field("window", &self.window_range())
            .field("total_frames", &self.total_frames)
            .field("current_frame", &self.current_frame)
            .field("current_time", &self.current_time)
            .finish_non_exhaustive()
    }
}

impl<R: Record + Interpolate> ReplaySession<R> {
    /// Create an idle replay session writing values to `sink`
    pub fn new(
        identifier: impl Into<String>,
        settings: ReplaySettings,
        sink: impl AttributeSink<R> + 'static,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            settings,
            state: SessionState::Idle,
            clock: ClockMode::Standalone,
            source: None,
            sink: Box::new(sink),
            frames: Vec::new(),
            window_start: 0,
            total_frames: 0,
            interval: 0.0,
            current_frame: 0,
            current_time: 0.0,
        }
    }

    /// Create a replay session already bound to `source`
    pub fn with_source(
        identifier: impl Into<String>,
        settings: ReplaySettings,
        source: impl ReplayDataSource<R> + 'static,
        sink: impl AttributeSink<R> + 'static,
    ) -> Self {
        let mut session = Self::new(identifier, settings, sink);
        session.bind_source(source);
        session
    }

    /// Bind the source frames are loaded from
    ///
    /// Any resident window belongs to the previous source, so the session
    /// returns to idle.
    pub fn bind_source(&mut self, source: impl ReplayDataSource<R> + 'static) {
        self.source = Some(Box::new(source));
        self.clear();
    }

    pub fn has_source(&self) -> bool {
        self.source.is_some()
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn settings(&self) -> &ReplaySettings {
        &self.settings
    }

    /// Toggle looping; takes effect at the next end of stream
    pub fn set_loop_playback(&mut self, loop_playback: bool) {
        self.settings.loop_playback = loop_playback;
    }

    /// Get current state
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Check if playing
    pub fn is_playing(&self) -> bool {
        self.state.is_playing()
    }

    /// Check if paused
    pub fn is_paused(&self) -> bool {
        self.state.is_paused()
    }

    pub fn clock(&self) -> &ClockMode {
        &self.clock
    }

    pub fn set_clock(&mut self, clock: ClockMode) {
        self.clock = clock;
    }

    /// Playback time in seconds
    pub fn current_time(&self) -> f64 {
        self.current_time
    }

    /// Global index of the current frame
    pub fn current_frame(&self) -> usize {
        self.current_frame
    }

    pub fn total_recorded_frames(&self) -> usize {
        self.total_frames
    }

    /// Duration of the stream as observed at the last load
    pub fn total_recording_time(&self) -> f64 {
        self.total_frames as f64 * self.interval
    }

    /// Number of resident frames
    pub fn loaded_frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Global indices of the resident frames
    pub fn window_range(&self) -> Range<usize> {
        self.window_start..self.window_start + self.frames.len()
    }

    /// The resident frames, starting at `window_range().start`
    pub fn resident_frames(&self) -> &[R] {
        &self.frames
    }

    /// Load the first window from the bound source
    pub fn load(&mut self) -> Result<()> {
        self.settings.validate()?;
        self.load_window(0)?;
        self.current_time = 0.0;
        self.current_frame = 0;
        self.state = SessionState::Loaded;
        tracing::info!(
            "[Replay] {} loaded {} of {} frames",
            self.identifier,
            self.frames.len(),
            self.total_frames
        );
        Ok(())
    }

    /// Load the first window of the capture stored in `dir`
    pub fn load_directory(&mut self, dir: &Path) -> Result<()> {
        self.settings.validate()?;
        let count = self.settings.buffer_size;
        let source = self.source_mut()?;
        let frames = source.load_frames_from_directory(dir, count)?;
        self.commit_window(0, frames);

        self.current_time = 0.0;
        self.current_frame = 0;
        self.state = SessionState::Loaded;
        tracing::info!(
            "[Replay] {} loaded {} of {} frames from {:?}",
            self.identifier,
            self.frames.len(),
            self.total_frames,
            dir
        );
        Ok(())
    }

    /// Start playback from the current time
    pub fn play(&mut self) -> Result<()> {
        if self.frames.is_empty() {
            tracing::warn!("[Replay] {}: no frames loaded, cannot play", self.identifier);
            return Err(ReplayError::NoFramesLoaded);
        }
        if !self.is_playing() {
            self.state = SessionState::Playing;
        }
        Ok(())
    }

    /// Pause playback, keeping time and window
    pub fn pause(&mut self) {
        if self.is_playing() {
            self.state = SessionState::Paused;
        }
    }

    /// Resume paused playback
    pub fn resume(&mut self) {
        if self.is_paused() {
            self.state = SessionState::Playing;
        }
    }

    /// Stop playback and drop the resident window
    pub fn stop(&mut self) {
        if self.state == SessionState::Idle {
            return;
        }
        self.clear();
        tracing::info!("[Replay] {} stopped", self.identifier);
    }

    /// Move the playhead to `time`, reloading the window there
    pub fn seek(&mut self, time: f64) -> Result<()> {
        if self.source.is_none() {
            tracing::warn!("[Replay] {}: no data source to seek in", self.identifier);
            return Err(ReplayError::NoDataSource);
        }

        let time = time.clamp(0.0, self.total_recording_time().max(0.0));
        let frame = self.frame_at(time);
        self.load_window(frame)?;

        self.current_time = time;
        self.current_frame = frame;
        if self.state == SessionState::Idle {
            self.state = SessionState::Loaded;
        }
        tracing::debug!("[Replay] {} seek to {:.3}s (frame {})", self.identifier, time, frame);
        Ok(())
    }

    /// Per-tick entry point for a standalone clock
    ///
    /// Ignored for delegated sessions. On error the playback time is left
    /// where it was before the tick.
    pub fn tick(&mut self, delta_time: f64) -> Result<TickOutcome> {
        if !self.clock.is_standalone() || !self.is_playing() {
            return Ok(TickOutcome::Inactive);
        }

        let previous = self.current_time;
        self.current_time = (self.current_time + delta_time).max(0.0);
        if let Err(e) = self.present() {
            self.current_time = previous;
            return Err(e);
        }

        if self.current_time >= self.total_recording_time() {
            return self.finish();
        }
        Ok(TickOutcome::Advanced)
    }

    /// Present the value at `time` without end-of-stream handling
    ///
    /// Used by an aggregator that owns the clock and decides looping itself.
    pub fn advance_to(&mut self, time: f64) -> Result<()> {
        if !self.is_playing() {
            return Ok(());
        }

        let previous = self.current_time;
        self.current_time = time.max(0.0);
        self.present().inspect_err(|_| self.current_time = previous)
    }

    /// Restart from the beginning, staying in playback
    pub fn rewind(&mut self) -> Result<()> {
        self.load_window(0)?;
        self.current_time = 0.0;
        self.current_frame = 0;
        Ok(())
    }

    fn finish(&mut self) -> Result<TickOutcome> {
        if self.settings.loop_playback {
            self.rewind()?;
            tracing::debug!("[Replay] {} looped", self.identifier);
            Ok(TickOutcome::Looped)
        } else {
            self.clear();
            tracing::info!("[Replay] {} reached the end and stopped", self.identifier);
            Ok(TickOutcome::Stopped)
        }
    }

    /// Emit the interpolated value at the current time
    fn present(&mut self) -> Result<()> {
        // A live source may have grown since the window was loaded
        self.observe_source();
        let position = self.position_at(self.current_time);
        let target = (position.floor() as usize).min(self.total_frames.saturating_sub(1));
        self.ensure_resident(target)?;

        let Some(last) = self.window_range().end.checked_sub(1) else {
            return Err(ReplayError::NoFramesLoaded);
        };
        let low = target.clamp(self.window_start, last);
        let high = (low + 1).min(last);
        let fraction = (position - low as f64) as f32;

        let a = &self.frames[low - self.window_start];
        let b = &self.frames[high - self.window_start];
        self.sink.apply(a.lerp(b, fraction));
        self.current_frame = low;
        Ok(())
    }

    /// Make sure `target` is resident, sliding or reloading the window
    fn ensure_resident(&mut self, target: usize) -> Result<()> {
        let window = self.window_range();
        if !window.contains(&target) {
            return self.load_window(target);
        }

        let load_ahead = target + self.settings.frame_load_offset;
        if load_ahead + 1 < window.end || window.end >= self.total_frames {
            return Ok(());
        }

        let count = self.settings.buffer_size;
        let next = self.source_mut()?.load_frames_from_index(window.end, count)?;
        self.observe_source();

        let evicted = target - self.window_start;
        self.frames.drain(..evicted);
        self.window_start = target;
        tracing::trace!(
            "[Replay] {} prefetched {} frames at {}, evicted {}",
            self.identifier,
            next.len(),
            window.end,
            evicted
        );
        self.frames.extend(next);
        Ok(())
    }

    fn load_window(&mut self, start: usize) -> Result<()> {
        let count = self.settings.buffer_size;
        let frames = self.source_mut()?.load_frames_from_index(start, count)?;
        self.commit_window(start, frames);
        Ok(())
    }

    fn commit_window(&mut self, start: usize, frames: Vec<R>) {
        self.frames = frames;
        self.window_start = start;
        self.observe_source();
    }

    fn observe_source(&mut self) {
        if let Some(source) = self.source.as_ref() {
            self.interval = source.recording_interval();
            self.total_frames = source
                .total_recorded_frames()
                .max(self.window_start + self.frames.len());
        }
    }

    fn source_mut(&mut self) -> Result<&mut Box<dyn ReplayDataSource<R>>> {
        match self.source.as_mut() {
            Some(source) => Ok(source),
            None => {
                tracing::warn!("[Replay] {}: no data source bound", self.identifier);
                Err(ReplayError::NoDataSource)
            }
        }
    }

    /// Fractional frame position at `time`
    fn position_at(&self, time: f64) -> f64 {
        if self.interval <= 0.0 {
            return 0.0;
        }
        time.clamp(0.0, self.total_recording_time()) / self.interval
    }

    fn frame_at(&self, time: f64) -> usize {
        let frame = self.position_at(time).floor() as usize;
        frame.min(self.total_frames.saturating_sub(1))
    }

    fn clear(&mut self) {
        self.frames.clear();
        self.window_start = 0;
        self.current_frame = 0;
        self.current_time = 0.0;
        self.state = SessionState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::source::MemorySource;
    use crate::types::Vec3;
    use mockall::mock;
    use std::cell::RefCell;
    use std::rc::Rc;

    mock! {
        pub Source {}

        impl ReplayDataSource<Vec3> for Source {
            fn recording_interval(&self) -> f64;
            fn total_recorded_frames(&self) -> usize;
            fn load_frames_from_index(&mut self, start: usize, count: usize) -> Result<Vec<Vec3>>;
            fn load_frames_from_directory(&mut self, dir: &Path, count: usize) -> Result<Vec<Vec3>>;
        }
    }

    type Captured = Rc<RefCell<Vec<f32>>>;

    fn session_over(values: Vec<f32>, interval: f64, settings: ReplaySettings) -> (ReplaySession<f32>, Captured) {
        let captured: Captured = Rc::default();
        let out = Rc::clone(&captured);
        let session = ReplaySession::with_source(
            "dial",
            settings,
            MemorySource::new(values, interval),
            move |v: f32| out.borrow_mut().push(v),
        );
        (session, captured)
    }

    fn ramp(n: usize) -> Vec<f32> {
        (0..n).map(|i| i as f32 * 10.0).collect()
    }

    fn last(captured: &Captured) -> f32 {
        *captured.borrow().last().unwrap()
    }

    #[test]
    fn test_player_lifecycle() {
        let (mut player, _) = session_over(ramp(4), 0.5, ReplaySettings::default());
        assert_eq!(player.state(), SessionState::Idle);

        player.load().unwrap();
        assert_eq!(player.state(), SessionState::Loaded);
        assert_eq!(player.loaded_frame_count(), 4);
        assert_eq!(player.total_recording_time(), 2.0);

        player.play().unwrap();
        assert!(player.is_playing());

        player.pause();
        assert!(player.is_paused());

        player.resume();
        assert!(player.is_playing());

        player.stop();
        assert_eq!(player.state(), SessionState::Idle);
        assert_eq!(player.loaded_frame_count(), 0);
    }

    #[test]
    fn test_midpoint_interpolation() {
        let (mut player, captured) = session_over(ramp(4), 0.5, ReplaySettings::default());
        player.load().unwrap();
        player.play().unwrap();

        assert_eq!(player.tick(0.25).unwrap(), TickOutcome::Advanced);
        assert_eq!(last(&captured), 5.0);
        assert_eq!(player.current_frame(), 0);

        // Exactly on a frame boundary
        player.tick(0.25).unwrap();
        assert_eq!(last(&captured), 10.0);
        assert_eq!(player.current_frame(), 1);
    }

    #[test]
    fn test_vec3_interpolation() {
        let captured: Rc<RefCell<Vec<Vec3>>> = Rc::default();
        let out = Rc::clone(&captured);
        let mut player = ReplaySession::with_source(
            "cube",
            ReplaySettings::default(),
            MemorySource::new(vec![Vec3::ZERO, Vec3::new(2.0, 4.0, -6.0)], 0.5),
            move |v: Vec3| out.borrow_mut().push(v),
        );
        player.load().unwrap();
        player.play().unwrap();
        player.tick(0.25).unwrap();
        assert_eq!(captured.borrow()[0], Vec3::new(1.0, 2.0, -3.0));
    }

    #[test]
    fn test_pause_freezes_time() {
        let (mut player, captured) = session_over(ramp(4), 0.5, ReplaySettings::default());
        player.load().unwrap();
        player.play().unwrap();
        player.tick(0.5).unwrap();
        player.pause();

        assert_eq!(player.tick(0.5).unwrap(), TickOutcome::Inactive);
        assert_eq!(player.current_time(), 0.5);
        assert_eq!(captured.borrow().len(), 1);
    }

    #[test]
    fn test_loop_restarts_from_beginning() {
        let (mut player, captured) = session_over(
            ramp(10),
            0.1,
            ReplaySettings::default().with_loop(true),
        );
        player.load().unwrap();
        player.play().unwrap();

        assert_eq!(player.tick(0.6).unwrap(), TickOutcome::Advanced);
        assert!((last(&captured) - 60.0).abs() < 1e-3);

        assert_eq!(player.tick(0.6).unwrap(), TickOutcome::Looped);
        // The overshooting tick still shows the final frame
        assert!((last(&captured) - 90.0).abs() < 1e-3);
        assert!(player.is_playing());
        assert_eq!(player.current_time(), 0.0);
        assert_eq!(player.current_frame(), 0);
        assert_eq!(player.window_range(), 0..10);
    }

    #[test]
    fn test_negative_delta_clamps_to_start() {
        let (mut player, captured) = session_over(ramp(4), 0.5, ReplaySettings::default());
        player.load().unwrap();
        player.play().unwrap();
        player.tick(0.5).unwrap();
        assert_eq!(last(&captured), 10.0);

        assert_eq!(player.tick(-1.0).unwrap(), TickOutcome::Advanced);
        assert_eq!(player.current_time(), 0.0);
        assert_eq!(player.current_frame(), 0);
        assert_eq!(last(&captured), 0.0);

        // Forward progress starts again from zero
        player.tick(0.25).unwrap();
        assert_eq!(player.current_time(), 0.25);
        assert_eq!(last(&captured), 5.0);
    }

    #[test]
    fn test_end_without_loop_stops() {
        let (mut player, captured) = session_over(ramp(4), 0.5, ReplaySettings::default());
        player.load().unwrap();
        player.play().unwrap();

        assert_eq!(player.tick(2.5).unwrap(), TickOutcome::Stopped);
        assert_eq!(last(&captured), 30.0);
        assert_eq!(player.state(), SessionState::Idle);
        assert_eq!(player.current_time(), 0.0);
        assert!(matches!(player.play(), Err(ReplayError::NoFramesLoaded)));
    }

    #[test]
    fn test_single_frame_stream() {
        let (mut player, captured) = session_over(vec![7.0], 1.0, ReplaySettings::default().with_loop(true));
        player.load().unwrap();
        player.play().unwrap();

        player.tick(0.3).unwrap();
        assert_eq!(last(&captured), 7.0);
    }

    #[test]
    fn test_play_without_frames() {
        let (mut player, _) = session_over(Vec::new(), 0.1, ReplaySettings::default());
        player.load().unwrap();
        assert!(matches!(player.play(), Err(ReplayError::NoFramesLoaded)));
        assert_eq!(player.state(), SessionState::Loaded);
    }

    #[test]
    fn test_load_without_source() {
        let mut player: ReplaySession<f32> =
            ReplaySession::new("dial", ReplaySettings::default(), |_: f32| {});
        assert!(matches!(player.load(), Err(ReplayError::NoDataSource)));
        assert!(matches!(player.seek(1.0), Err(ReplayError::NoDataSource)));
        assert_eq!(player.state(), SessionState::Idle);
    }

    #[test]
    fn test_seek_reloads_window() {
        let (mut player, captured) =
            session_over(ramp(100), 0.5, ReplaySettings::default().with_buffer_size(10));
        player.load().unwrap();

        player.seek(20.0).unwrap();
        assert_eq!(player.current_frame(), 40);
        assert_eq!(player.window_range(), 40..50);
        assert_eq!(player.state(), SessionState::Loaded);

        player.play().unwrap();
        player.tick(0.25).unwrap();
        assert_eq!(last(&captured), 405.0);

        // Clamped to the end of the stream
        player.seek(1000.0).unwrap();
        assert_eq!(player.current_time(), 50.0);
        assert_eq!(player.current_frame(), 99);
        assert_eq!(player.window_range(), 99..100);
    }

    #[test]
    fn test_prefetch_slides_window_without_duplicates() {
        let (mut player, captured) = session_over(
            ramp(100),
            1.0,
            ReplaySettings::default()
                .with_buffer_size(10)
                .with_frame_load_offset(3),
        );
        player.load().unwrap();
        player.play().unwrap();

        player.tick(5.0).unwrap();
        assert_eq!(player.window_range(), 0..10);

        player.tick(1.0).unwrap();
        assert_eq!(player.window_range(), 6..20);
        let expected: Vec<f32> = (6..20).map(|i| i as f32 * 10.0).collect();
        assert_eq!(player.resident_frames(), expected.as_slice());
        assert_eq!(last(&captured), 60.0);

        // Jumping past the window reloads at the target frame
        player.tick(30.0).unwrap();
        assert_eq!(player.window_range(), 36..46);
        assert_eq!(last(&captured), 360.0);
    }

    #[test]
    fn test_prefetch_failure_restores_time() {
        let mut source = MockSource::new();
        source.expect_recording_interval().return_const(1.0);
        source.expect_total_recorded_frames().return_const(100usize);
        source
            .expect_load_frames_from_index()
            .withf(|start, _| *start == 0)
            .times(1)
            .returning(|_, count| Ok(vec![Vec3::ZERO; count]));
        source
            .expect_load_frames_from_index()
            .withf(|start, _| *start == 10)
            .times(1)
            .returning(|_, _| {
                Err(ReplayError::Io(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "chunk vanished",
                )))
            });

        let mut player = ReplaySession::with_source(
            "cube",
            ReplaySettings::default()
                .with_buffer_size(10)
                .with_frame_load_offset(3),
            source,
            |_: Vec3| {},
        );
        player.load().unwrap();
        player.play().unwrap();

        assert!(player.tick(7.0).is_err());
        assert_eq!(player.current_time(), 0.0);
        assert!(player.is_playing());
        assert_eq!(player.window_range(), 0..10);
    }

    #[test]
    fn test_load_directory_uses_source() {
        let mut source = MockSource::new();
        source.expect_recording_interval().return_const(0.5);
        source.expect_total_recorded_frames().return_const(2usize);
        source
            .expect_load_frames_from_directory()
            .withf(|dir, count| dir == Path::new("/captures/recording_cube_1") && *count == 1000)
            .times(1)
            .returning(|_, _| Ok(vec![Vec3::ZERO, Vec3::new(1.0, 1.0, 1.0)]));

        let mut player = ReplaySession::with_source("cube", ReplaySettings::default(), source, |_: Vec3| {});
        player
            .load_directory(Path::new("/captures/recording_cube_1"))
            .unwrap();
        assert_eq!(player.loaded_frame_count(), 2);
        assert_eq!(player.total_recording_time(), 1.0);
    }

    #[test]
    fn test_delegated_clock_ignores_tick() {
        let (mut player, captured) = session_over(ramp(4), 0.5, ReplaySettings::default());
        player.set_clock(ClockMode::delegated("rig"));
        player.load().unwrap();
        player.play().unwrap();

        assert_eq!(player.tick(0.5).unwrap(), TickOutcome::Inactive);
        assert!(captured.borrow().is_empty());

        player.advance_to(0.75).unwrap();
        assert_eq!(last(&captured), 15.0);
        // Past the end holds the final frame; the aggregator decides what's next
        player.advance_to(5.0).unwrap();
        assert_eq!(last(&captured), 30.0);
        assert!(player.is_playing());

        player.advance_to(-2.0).unwrap();
        assert_eq!(player.current_time(), 0.0);
        assert_eq!(last(&captured), 0.0);
    }
}
