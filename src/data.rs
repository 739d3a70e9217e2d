//! Core data structures for text frames.

use std::path::PathBuf;
use std::sync::Arc;

/// Shown in place of the animation when no frames could be loaded.
pub const SENTINEL_FRAME: &str = "Something's not legal :')";

/// Metadata about a frame file on disk.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameFile {
    /// Full path to the frame file
    pub path: PathBuf,
    /// Filename (e.g., "frame_0001.txt"), used as the sort key
    pub name: String,
}

impl FrameFile {
    /// Create a new FrameFile
    pub fn new(path: PathBuf, name: String) -> Self {
        Self { path, name }
    }
}

/// A single pre-rendered text frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    /// Plain text content (with newlines)
    pub content: String,
}

impl Frame {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }

    /// Get the frame dimensions (columns, rows) from the text content.
    pub fn dimensions(&self) -> (usize, usize) {
        let lines: Vec<&str> = self.content.lines().collect();
        let rows = lines.len();
        let cols = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0);
        (cols, rows)
    }
}

/// An ordered, immutable, non-empty sequence of frames.
///
/// Cloning is cheap: the frames live in a shared slice.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameSet {
    frames: Arc<[Frame]>,
}

impl FrameSet {
    /// Build a frame set, or `None` if `frames` is empty.
    pub fn new(frames: Vec<Frame>) -> Option<Self> {
        if frames.is_empty() {
            None
        } else {
            Some(Self {
                frames: frames.into(),
            })
        }
    }

    /// The single-frame set substituted when loading fails.
    pub fn sentinel() -> Self {
        Self {
            frames: Arc::from(vec![Frame::new(SENTINEL_FRAME)]),
        }
    }

    /// Whether this is exactly the sentinel set.
    pub fn is_sentinel(&self) -> bool {
        self.frames.len() == 1 && self.frames[0].content == SENTINEL_FRAME
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Always false for sets built through the public constructors.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&Frame> {
        self.frames.get(index)
    }

    /// Frame at `index`, wrapping around the end of the set.
    #[inline]
    pub fn at(&self, index: usize) -> &Frame {
        &self.frames[index % self.frames.len()]
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Frame> {
        self.frames.iter()
    }

    /// Largest (columns, rows) across all frames.
    pub fn max_dimensions(&self) -> (usize, usize) {
        self.frames
            .iter()
            .map(Frame::dimensions)
            .fold((0, 0), |(c, r), (fc, fr)| (c.max(fc), r.max(fr)))
    }
}
