//! Frame store
//!
//! A frame store owns one stream's on-disk representation: a directory of
//! sequentially numbered, immutable chunk files. Frames are addressed by their
//! global index across all chunks; reads scan chunk headers in index order and
//! decode only the chunks that intersect the requested range.
//!
//! # Writer claims
//!
//! A directory has at most one active writer. The writer holds a
//! [`WriterClaim`], an OS lock on a file in the directory that bulk deletion
//! checks before touching anything.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use fs2::FileExt;

use crate::codec;
use crate::error::{ReplayError, Result, ResultExt};
use crate::types::{Record, StreamKind};

/// Lock file held by the active writer of a directory
pub const WRITER_CLAIM_FILE: &str = ".writer.lock";

/// Exclusive write access to a recording directory
///
/// Backed by an OS file lock on [`WRITER_CLAIM_FILE`]. A lock file left behind
/// by a writer that exited without cleaning up holds no lock and is reclaimed.
/// Released when dropped.
#[derive(Debug)]
pub struct WriterClaim {
    path: PathBuf,
    file: Option<File>,
}

impl WriterClaim {
    /// Claim `dir` for writing on behalf of `owner`
    pub fn acquire(dir: &Path, owner: &str) -> Result<Self> {
        let path = dir.join(WRITER_CLAIM_FILE);
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .with_context(|| format!("Failed to open writer claim {:?}", path))?;

        match file.try_lock_exclusive() {
            Ok(()) => {}
            Err(e) if is_contended(&e) => return Err(ReplayError::directory_in_use(dir)),
            Err(e) => return Err(ReplayError::Io(e)),
        }

        file.set_len(0)?;
        writeln!(
            file,
            "{} pid={} {}",
            owner,
            std::process::id(),
            chrono::Local::now().to_rfc3339()
        )?;
        file.flush()?;

        Ok(Self {
            path,
            file: Some(file),
        })
    }

    /// Whether some live writer currently holds `dir`
    pub fn is_held(dir: &Path) -> bool {
        let path = dir.join(WRITER_CLAIM_FILE);
        let Ok(file) = OpenOptions::new().read(true).write(true).open(&path) else {
            return false;
        };
        match file.try_lock_exclusive() {
            Ok(()) => {
                tracing::debug!("Writer claim {:?} is stale", path);
                false
            }
            Err(_) => true,
        }
    }
}

fn is_contended(err: &std::io::Error) -> bool {
    err.kind() == std::io::ErrorKind::WouldBlock
        || err.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}

impl Drop for WriterClaim {
    fn drop(&mut self) {
        // Close first so the lock is gone before the file is
        drop(self.file.take());
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!("Failed to release writer claim {:?}: {}", self.path, e);
            }
        }
    }
}

/// Frames returned by a range read
#[derive(Debug, Clone, PartialEq)]
pub struct FrameRange<R> {
    /// Requested frames, in global order
    pub frames: Vec<R>,
    /// Total frames observed across all chunks plus tail
    pub total_frames: usize,
}

/// Chunked on-disk storage for one stream
#[derive(Debug)]
pub struct FrameStore<R: Record> {
    dir: PathBuf,
    kind: StreamKind,
    next_index: usize,
    _record: PhantomData<fn() -> R>,
}

impl<R: Record> FrameStore<R> {
    /// Open (creating if needed) the store for `kind` in `dir`
    ///
    /// Appends continue after the highest existing chunk index.
    pub fn open(dir: impl Into<PathBuf>, kind: StreamKind) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create recording directory {:?}", dir))?;

        let next_index = list_chunks(&dir, &kind)?
            .last()
            .map(|(index, _)| index + 1)
            .unwrap_or(0);

        Ok(Self {
            dir,
            kind,
            next_index,
            _record: PhantomData,
        })
    }

    /// Open the store for `kind` in an existing directory without creating it
    pub fn open_existing(dir: impl Into<PathBuf>, kind: StreamKind) -> Result<Self> {
        let dir = dir.into();
        if !dir.is_dir() {
            return Err(ReplayError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("recording directory {:?} does not exist", dir),
            )));
        }
        Self::open(dir, kind)
    }

    /// Directory this store writes to
    pub fn directory(&self) -> &Path {
        &self.dir
    }

    /// Stream kind of this store
    pub fn kind(&self) -> &StreamKind {
        &self.kind
    }

    /// Index the next appended chunk will get
    pub fn next_index(&self) -> usize {
        self.next_index
    }

    /// Write `records` as a new chunk and return its index
    pub fn append(&mut self, records: &[R]) -> Result<usize> {
        let index = self.next_index;
        let path = self.dir.join(self.kind.chunk_file_name(index));
        let bytes = codec::encode(records);

        if path.exists() {
            return Err(ReplayError::Io(std::io::Error::new(
                std::io::ErrorKind::AlreadyExists,
                format!("chunk {:?} already exists", path),
            )));
        }

        // Staged under a temporary name; only complete chunks get renamed in
        let staging = self.dir.join(staging_file_name(&path));
        if let Err(e) = write_staged(&staging, &path, &bytes) {
            if let Err(cleanup) = std::fs::remove_file(&staging) {
                if cleanup.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!("Failed to remove staging file {:?}: {}", staging, cleanup);
                }
            }
            return Err(ReplayError::Io(e).with_context(format!("Failed to write chunk {:?}", path)));
        }

        self.next_index += 1;
        tracing::debug!(
            "Wrote {} frames to chunk {} in {:?}",
            records.len(),
            index,
            self.dir
        );
        Ok(index)
    }

    /// Read up to `max_count` frames starting at global index `start`
    ///
    /// `tail` holds frames not yet flushed; they follow the last chunk in
    /// global order.
    pub fn read_range(&self, start: usize, max_count: usize, tail: &[R]) -> Result<FrameRange<R>> {
        scan(&self.dir, &self.kind, start, max_count, tail)
    }

    /// Read up to `max_count` frames from the start of the stream in `dir`
    pub fn read_all(dir: &Path, kind: &StreamKind, max_count: usize) -> Result<FrameRange<R>> {
        scan(dir, kind, 0, max_count, &[])
    }

    /// Remove every chunk in this store's directory
    pub fn delete_all(&mut self) -> Result<usize> {
        let removed = delete_chunks(&self.dir)?;
        self.next_index = 0;
        Ok(removed)
    }
}

/// Chunk files of `kind` in `dir`, ordered by numeric index
pub fn list_chunks(dir: &Path, kind: &StreamKind) -> Result<Vec<(usize, PathBuf)>> {
    let mut chunks = Vec::new();
    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("Failed to list recording directory {:?}", dir))?
    {
        let entry = entry?;
        let name = entry.file_name();
        if let Some(index) = name.to_str().and_then(|n| kind.parse_chunk_index(n)) {
            chunks.push((index, entry.path()));
        }
    }
    chunks.sort_by_key(|(index, _)| *index);
    Ok(chunks)
}

fn is_chunk_file(name: &str) -> bool {
    name.strip_suffix(".bin")
        .and_then(|stem| stem.rsplit_once('_'))
        .is_some_and(|(prefix, index)| {
            !prefix.is_empty() && !index.is_empty() && index.bytes().all(|b| b.is_ascii_digit())
        })
}

/// Remove every chunk file (of any stream) in `dir`
///
/// Refused with [`ReplayError::OperationNotAllowed`] while a writer holds the
/// directory; nothing is removed in that case.
pub fn delete_chunks(dir: &Path) -> Result<usize> {
    if WriterClaim::is_held(dir) {
        tracing::warn!("Cannot delete chunks in {:?} while recording is in progress", dir);
        return Err(ReplayError::directory_in_use(dir));
    }

    let mut removed = 0;
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_name().to_str().is_some_and(is_chunk_file) {
            std::fs::remove_file(entry.path())?;
            removed += 1;
        }
    }
    tracing::info!("Deleted {} chunk(s) in {:?}", removed, dir);
    Ok(removed)
}

fn staging_file_name(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    format!(".{}.tmp", name)
}

fn write_staged(staging: &Path, path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = File::create(staging)?;
    file.write_all(bytes)?;
    file.sync_all()?;
    drop(file);
    std::fs::rename(staging, path)
}

fn chunk_count(path: &Path) -> Result<usize> {
    let mut file = File::open(path).with_context(|| format!("Failed to open chunk {:?}", path))?;
    codec::read_count(&mut file).with_context(|| format!("Failed to read chunk {:?}", path))
}

fn scan<R: Record>(
    dir: &Path,
    kind: &StreamKind,
    start: usize,
    max_count: usize,
    tail: &[R],
) -> Result<FrameRange<R>> {
    let end = start.saturating_add(max_count);
    let mut frames = Vec::with_capacity(max_count.min(4096));
    let mut offset = 0usize;

    for (_, path) in list_chunks(dir, kind)? {
        let count = chunk_count(&path)?;
        let chunk_end = offset + count;

        if count > 0 && offset < end && chunk_end > start {
            let bytes =
                std::fs::read(&path).with_context(|| format!("Failed to read chunk {:?}", path))?;
            let records: Vec<R> =
                codec::decode(&bytes).with_context(|| format!("Failed to decode chunk {:?}", path))?;
            let lo = start.max(offset) - offset;
            let hi = end.min(chunk_end) - offset;
            frames.extend_from_slice(&records[lo..hi]);
        }

        offset = chunk_end;
    }

    let tail_end = offset + tail.len();
    if offset < end && tail_end > start {
        let lo = start.max(offset) - offset;
        let hi = end.min(tail_end) - offset;
        frames.extend_from_slice(&tail[lo..hi]);
    }

    tracing::debug!(
        "Loaded {} frames from index {} in {:?} ({} total)",
        frames.len(),
        start,
        dir,
        tail_end
    );

    Ok(FrameRange {
        frames,
        total_frames: tail_end,
    })
}
