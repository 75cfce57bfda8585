//! Replay-RS demo - Main Entry Point
//!
//! Records a synthetic orbit into the configured recordings directory, then
//! replays the capture from disk at 60 Hz.
//!
//! Usage: `replay-rs [config.toml|config.json]`

use anyhow::Context;
use replay_rs::{
    layout, DirectorySource, RecordingSession, ReplayConfig, ReplaySession, StreamKind,
    TickOutcome, Vec3,
};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Host frame time for both recording and replay
const FRAME_TIME: f64 = 1.0 / 60.0;

/// Seconds of orbit to record
const RECORD_SECONDS: f64 = 3.0;

/// Upper bound on replay ticks when looping
const MAX_REPLAY_TICKS: usize = 600;

fn orbit_at(t: f64) -> Vec3 {
    let angle = (t * std::f64::consts::TAU / RECORD_SECONDS) as f32;
    Vec3::new(angle.cos() * 5.0, 1.0, angle.sin() * 5.0)
}

fn main() -> anyhow::Result<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => ReplayConfig::load(&path).with_context(|| format!("loading {}", path))?,
        None => ReplayConfig::default(),
    };

    // Keep the guard alive so buffered log lines are flushed on exit
    let (file_layer, _log_guard) = match &config.storage.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "replay-rs.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_writer(writer).with_ansi(false)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,replay_rs=debug")),
        )
        .with(fmt::layer())
        .with(file_layer)
        .init();

    tracing::info!("Starting replay-rs demo");

    let base_dir = config.storage.recordings_dir()?;
    let mut recorder = RecordingSession::<Vec3>::new("orbit", StreamKind::Position, config.recorder.clone());
    recorder.start(&layout::DirectorySpec::now(&base_dir))?;

    let mut elapsed = 0.0;
    while elapsed < RECORD_SECONDS {
        elapsed += FRAME_TIME;
        recorder.advance(FRAME_TIME, &mut || orbit_at(elapsed))?;
    }
    recorder.stop()?;

    let dir = recorder
        .current_directory()
        .map(|d| d.to_path_buf())
        .context("recorder has no directory after stopping")?;
    tracing::info!(
        "Recorded {} frames ({:.2}s) into {:?}",
        recorder.total_recorded_frames(),
        recorder.total_recording_time(),
        dir
    );

    let source = DirectorySource::<Vec3>::open(
        &dir,
        StreamKind::Position,
        config.recorder.recording_interval,
    )?;
    let mut replay = ReplaySession::with_source(
        "orbit",
        config.replay.clone(),
        source,
        |p: Vec3| tracing::debug!("orbit at {}", p),
    );
    replay.load()?;
    replay.play()?;

    for _ in 0..MAX_REPLAY_TICKS {
        match replay.tick(FRAME_TIME)? {
            TickOutcome::Looped => tracing::info!("Replay looped"),
            TickOutcome::Stopped => {
                tracing::info!("Replay finished");
                break;
            }
            TickOutcome::Advanced | TickOutcome::Inactive => {}
        }
    }

    tracing::info!("Shutting down...");
    Ok(())
}
