//! # Replay-RS: chunked attribute recording and windowed replay
//!
//! Records time-sampled attributes (positions, rotations, scales, or any
//! fixed-width payload) into numbered binary chunk files, and replays them
//! with bounded memory by streaming a sliding window of frames and
//! interpolating between neighbours.
//!
//! ## Architecture
//!
//! - **Codec**: `i32` count header followed by fixed-width little-endian records
//! - **Store**: one directory of immutable, sequentially numbered chunks per stream
//! - **Recording**: bounded in-memory buffer, flushed as one chunk when full
//! - **Replay**: windowed loads with prefetch, linear interpolation, loop or stop
//! - **Groups**: one clock shared by many recorders or replay sessions
//!
//! ## Configuration
//!
//! Settings load from TOML or JSON. When no base directory is configured,
//! recordings go under the platform data directory in `dev.hxyulin.replay-rs`:
//!
//! - **Linux**: `~/.local/share/dev.hxyulin.replay-rs/recordings/`
//! - **macOS**: `~/Library/Application Support/dev.hxyulin.replay-rs/recordings/`
//! - **Windows**: `%APPDATA%\dev.hxyulin.replay-rs\recordings\`
//!
//! ## Example
//!
//! ```no_run
//! use replay_rs::{
//!     DirectorySpec, MemorySource, RecordingSession, RecorderSettings, ReplaySession,
//!     ReplaySettings, StreamKind, Vec3,
//! };
//!
//! fn main() -> replay_rs::Result<()> {
//!     let mut recorder = RecordingSession::<Vec3>::new(
//!         "drone",
//!         StreamKind::Position,
//!         RecorderSettings::default(),
//!     );
//!     recorder.start(&DirectorySpec::now("/tmp/captures"))?;
//!     for i in 0..100 {
//!         recorder.tick(Vec3::new(i as f32, 0.0, 0.0))?;
//!     }
//!     recorder.stop()?;
//!
//!     let mut replay = ReplaySession::with_source(
//!         "drone",
//!         ReplaySettings::default(),
//!         recorder,
//!         |p: Vec3| println!("{}", p),
//!     );
//!     replay.load()?;
//!     replay.play()?;
//!     replay.tick(1.0 / 60.0)?;
//!     Ok(())
//! }
//! ```

pub mod codec;
pub mod config;
pub mod error;
pub mod layout;
pub mod session;
pub mod store;
pub mod types;

// Re-export commonly used types
pub use config::{RecorderSettings, ReplayConfig, ReplaySettings, StorageSettings};
pub use error::{ReplayError, Result, ResultExt};
pub use layout::{DeleteReport, DirectorySpec};
pub use session::{
    AttributeProbe, AttributeSink, CaptureGroup, ClockMode, DirectorySource, MemorySource,
    PlaybackGroup, ProbedRecorder, RecordingSession, ReplayDataSource, ReplaySession,
    SessionState, TickOutcome,
};
pub use store::{FrameStore, WriterClaim};
pub use types::{Interpolate, Record, StreamKind, Vec3};
