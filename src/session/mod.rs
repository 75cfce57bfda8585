//! Session recording and playback module
//!
//! A [`RecordingSession`] samples one attribute at a fixed interval and
//! flushes bounded batches of frames to chunk files. A [`ReplaySession`]
//! streams those frames back through a sliding window and emits interpolated
//! values at arbitrary playback times.
//!
//! # Features
//!
//! - Record with a bounded memory footprint, flushing full buffers to disk
//! - Replay live recordings, stored captures, or in-memory frames
//! - Loop or stop at the end of a stream, seek to any time
//! - Drive many sessions from one clock with [`CaptureGroup`] and
//!   [`PlaybackGroup`]

pub mod group;
pub mod player;
pub mod recorder;
pub mod source;
pub mod types;

pub use group::{CaptureChannel, CaptureGroup, PlaybackChannel, PlaybackGroup, ProbedRecorder};
pub use player::ReplaySession;
pub use recorder::RecordingSession;
pub use source::{DirectorySource, MemorySource, ReplayDataSource};
pub use types::{
    AggregatorId, AttributeProbe, AttributeSink, ClockMode, SessionState, TickOutcome,
};
