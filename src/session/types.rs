//! Session data types

use std::fmt;

/// State of a recording or replay session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// No active session
    #[default]
    Idle,
    /// Currently recording
    Recording,
    /// Frames loaded, ready for playback
    Loaded,
    /// Playing back loaded frames
    Playing,
    /// Playback paused
    Paused,
}

impl SessionState {
    /// Check if currently recording
    pub fn is_recording(&self) -> bool {
        matches!(self, SessionState::Recording)
    }

    /// Check if currently playing
    pub fn is_playing(&self) -> bool {
        matches!(self, SessionState::Playing)
    }

    /// Check if paused
    pub fn is_paused(&self) -> bool {
        matches!(self, SessionState::Paused)
    }

    /// Check if playback data is resident (loaded, playing or paused)
    pub fn is_loaded(&self) -> bool {
        matches!(
            self,
            SessionState::Loaded | SessionState::Playing | SessionState::Paused
        )
    }

    /// Display name for the state
    pub fn display_name(&self) -> &'static str {
        match self {
            SessionState::Idle => "Idle",
            SessionState::Recording => "Recording",
            SessionState::Loaded => "Loaded",
            SessionState::Playing => "Playing",
            SessionState::Paused => "Paused",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Identifier of the aggregator driving a delegated session
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AggregatorId(pub String);

impl fmt::Display for AggregatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Who owns a session's clock
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ClockMode {
    /// The session advances on its own per-tick entry point
    #[default]
    Standalone,
    /// The session is advanced only by the named aggregator
    Delegated(AggregatorId),
}

impl ClockMode {
    /// Clock delegated to the aggregator named `id`
    pub fn delegated(id: impl Into<String>) -> Self {
        ClockMode::Delegated(AggregatorId(id.into()))
    }

    pub fn is_standalone(&self) -> bool {
        matches!(self, ClockMode::Standalone)
    }
}

/// Produces the current value of a recorded attribute
pub trait AttributeProbe<R> {
    fn sample(&mut self) -> R;
}

impl<R, F> AttributeProbe<R> for F
where
    F: FnMut() -> R,
{
    fn sample(&mut self) -> R {
        self()
    }
}

/// Receives each interpolated playback value
pub trait AttributeSink<R> {
    fn apply(&mut self, value: R);
}

impl<R, F> AttributeSink<R> for F
where
    F: FnMut(R),
{
    fn apply(&mut self, value: R) {
        self(value)
    }
}

/// What happened during one playback tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Not playing; nothing happened
    Inactive,
    /// A value was emitted
    Advanced,
    /// The end was reached and playback restarted from the beginning
    Looped,
    /// The end was reached and playback stopped
    Stopped,
}
