//! Frame loading and the process-wide frame cache.
//!
//! Frames are loaded at most once per [`FrameStore`]. Whatever the first load
//! produces (real frames or the sentinel) is kept for the store's lifetime.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use tracing::{info, warn};

use crate::error::{LoadError, LoadResult};
use crate::{Frame, FrameFile, FrameSet};

/// Trait for frame asset providers.
///
/// Implement this trait to serve frames from something other than a
/// directory on disk.
pub trait FrameSource {
    /// List the frame files in playback order.
    fn frame_files(&self) -> LoadResult<Vec<FrameFile>>;

    /// Read the raw text of one frame.
    fn read_frame(&self, file: &FrameFile) -> LoadResult<String>;
}

/// Frames stored as one text file per frame in a directory.
#[derive(Clone, Debug)]
pub struct DirectorySource {
    /// Tried first
    pub primary: PathBuf,
    /// Used whenever `primary` does not exist
    pub fallback: PathBuf,
    /// File extension (without the dot) marking a frame file
    pub extension: String,
}

impl DirectorySource {
    pub fn new(primary: impl Into<PathBuf>, fallback: impl Into<PathBuf>) -> Self {
        Self {
            primary: primary.into(),
            fallback: fallback.into(),
            extension: "txt".to_string(),
        }
    }

    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    /// The directory frames are read from.
    pub fn resolve_dir(&self) -> &Path {
        if self.primary.exists() {
            &self.primary
        } else {
            &self.fallback
        }
    }
}

impl FrameSource for DirectorySource {
    fn frame_files(&self) -> LoadResult<Vec<FrameFile>> {
        let dir = self.resolve_dir();
        let suffix = format!(".{}", self.extension);
        let entries = fs::read_dir(dir).map_err(|source| LoadError::List {
            path: dir.to_path_buf(),
            source,
        })?;

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| LoadError::List {
                path: dir.to_path_buf(),
                source,
            })?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.ends_with(&suffix) {
                files.push(FrameFile::new(entry.path(), name));
            }
        }
        files.sort_by(|a, b| a.name.cmp(&b.name));

        if files.is_empty() {
            return Err(LoadError::Empty(dir.to_path_buf()));
        }
        Ok(files)
    }

    /// Invalid UTF-8 is replaced with U+FFFD rather than rejected.
    fn read_frame(&self, file: &FrameFile) -> LoadResult<String> {
        let bytes = fs::read(&file.path).map_err(|source| LoadError::Read {
            path: file.path.clone(),
            source,
        })?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// Normalize Windows line endings so terminals render every frame alike.
pub fn normalize_line_endings(text: &str) -> String {
    text.replace("\r\n", "\n")
}

/// Read every frame the source lists, in order.
pub fn read_frames<S: FrameSource + ?Sized>(source: &S) -> LoadResult<Vec<Frame>> {
    let files = source.frame_files()?;
    let mut frames = Vec::with_capacity(files.len());
    for file in &files {
        let content = source.read_frame(file)?;
        frames.push(Frame::new(normalize_line_endings(&content)));
    }
    Ok(frames)
}

/// Load a frame set, substituting the sentinel on any failure or empty result.
pub fn load_frame_set<S: FrameSource + ?Sized>(source: &S) -> FrameSet {
    match read_frames(source) {
        Ok(frames) => match FrameSet::new(frames) {
            Some(set) => {
                let (cols, rows) = set.max_dimensions();
                info!(frames = set.len(), cols, rows, "loaded frames");
                set
            }
            None => {
                warn!("frame source returned no frames, using sentinel frame");
                FrameSet::sentinel()
            }
        },
        Err(err) => {
            warn!(error = %err, "failed to load frames, using sentinel frame");
            FrameSet::sentinel()
        }
    }
}

/// Lazily loaded, never invalidated frame cache.
pub struct FrameStore {
    source: Box<dyn FrameSource + Send + Sync>,
    frames: OnceLock<FrameSet>,
}

impl FrameStore {
    pub fn new<S>(source: S) -> Self
    where
        S: FrameSource + Send + Sync + 'static,
    {
        Self {
            source: Box::new(source),
            frames: OnceLock::new(),
        }
    }

    /// Get the frame set, loading it on first call.
    ///
    /// Concurrent first callers block until the single load finishes.
    pub fn load(&self) -> &FrameSet {
        self.frames.get_or_init(|| load_frame_set(self.source.as_ref()))
    }

    /// Whether the first load has already happened.
    pub fn is_loaded(&self) -> bool {
        self.frames.get().is_some()
    }
}

impl std::fmt::Debug for FrameStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameStore")
            .field("frames", &self.frames.get().map(FrameSet::len))
            .finish_non_exhaustive()
    }
}
