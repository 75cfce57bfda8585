//! Frame sources for replay sessions
//!
//! A replay session never touches chunk files itself; it pulls windows of
//! frames from a [`ReplayDataSource`]. Sources re-derive their totals from
//! what each load observes, so a source reading a directory that is still
//! being written to picks up newly flushed chunks on the next load.

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::error::Result;
use crate::store::FrameStore;
use crate::types::{Record, StreamKind};

/// Something a replay session can load frames from
pub trait ReplayDataSource<R> {
    /// Time between consecutive frames in seconds
    fn recording_interval(&self) -> f64;

    /// Frames observed by the last load
    fn total_recorded_frames(&self) -> usize;

    /// Duration covered by the observed frames
    fn total_recording_time(&self) -> f64 {
        self.total_recorded_frames() as f64 * self.recording_interval()
    }

    /// Load up to `count` frames starting at global index `start`
    fn load_frames_from_index(&mut self, start: usize, count: usize) -> Result<Vec<R>>;

    /// Load up to `count` frames from the start of the capture in `dir`
    fn load_frames_from_directory(&mut self, dir: &Path, count: usize) -> Result<Vec<R>>;
}

impl<R, S> ReplayDataSource<R> for Rc<RefCell<S>>
where
    S: ReplayDataSource<R>,
{
    fn recording_interval(&self) -> f64 {
        self.borrow().recording_interval()
    }

    fn total_recorded_frames(&self) -> usize {
        self.borrow().total_recorded_frames()
    }

    fn total_recording_time(&self) -> f64 {
        self.borrow().total_recording_time()
    }

    fn load_frames_from_index(&mut self, start: usize, count: usize) -> Result<Vec<R>> {
        self.borrow_mut().load_frames_from_index(start, count)
    }

    fn load_frames_from_directory(&mut self, dir: &Path, count: usize) -> Result<Vec<R>> {
        self.borrow_mut().load_frames_from_directory(dir, count)
    }
}

/// A finished capture stored on disk
#[derive(Debug)]
pub struct DirectorySource<R: Record> {
    store: FrameStore<R>,
    interval: f64,
    total_frames: usize,
}

impl<R: Record> DirectorySource<R> {
    /// Source reading the `kind` stream in `dir`
    pub fn open(dir: impl Into<PathBuf>, kind: StreamKind, interval: f64) -> Result<Self> {
        Ok(Self {
            store: FrameStore::open_existing(dir, kind)?,
            interval,
            total_frames: 0,
        })
    }

    /// Directory currently read from
    pub fn directory(&self) -> &Path {
        self.store.directory()
    }
}

impl<R: Record> ReplayDataSource<R> for DirectorySource<R> {
    fn recording_interval(&self) -> f64 {
        self.interval
    }

    fn total_recorded_frames(&self) -> usize {
        self.total_frames
    }

    fn load_frames_from_index(&mut self, start: usize, count: usize) -> Result<Vec<R>> {
        let range = self.store.read_range(start, count, &[])?;
        self.total_frames = range.total_frames;
        Ok(range.frames)
    }

    fn load_frames_from_directory(&mut self, dir: &Path, count: usize) -> Result<Vec<R>> {
        if dir != self.store.directory() {
            self.store = FrameStore::open_existing(dir, self.store.kind().clone())?;
        }
        self.load_frames_from_index(0, count)
    }
}

/// A fixed capture supplied in memory
#[derive(Debug, Clone)]
pub struct MemorySource<R> {
    frames: Vec<R>,
    interval: f64,
}

impl<R: Clone> MemorySource<R> {
    pub fn new(frames: Vec<R>, interval: f64) -> Self {
        Self { frames, interval }
    }

    pub fn frames(&self) -> &[R] {
        &self.frames
    }
}

impl<R: Clone> ReplayDataSource<R> for MemorySource<R> {
    fn recording_interval(&self) -> f64 {
        self.interval
    }

    fn total_recorded_frames(&self) -> usize {
        self.frames.len()
    }

    fn load_frames_from_index(&mut self, start: usize, count: usize) -> Result<Vec<R>> {
        let start = start.min(self.frames.len());
        let end = start.saturating_add(count).min(self.frames.len());
        Ok(self.frames[start..end].to_vec())
    }

    fn load_frames_from_directory(&mut self, dir: &Path, count: usize) -> Result<Vec<R>> {
        tracing::debug!(
            "In-memory capture ignores directory {:?}, loading from the start",
            dir
        );
        self.load_frames_from_index(0, count)
    }
}
