//! Frame transforms applied per request.

use crate::{Frame, FrameSet};

/// Reverse the character order of a frame.
///
/// This is a raw reversal: newlines move along with everything else, so the
/// result is not a line-by-line mirror.
pub fn reverse_frame(frame: &Frame) -> Frame {
    Frame::new(frame.content.chars().rev().collect::<String>())
}

/// Reverse every frame of a set, leaving the input untouched.
pub fn reverse(frames: &FrameSet) -> FrameSet {
    let reversed = frames.iter().map(reverse_frame).collect();
    // Same length as the input, which is never empty.
    FrameSet::new(reversed).unwrap_or_else(FrameSet::sentinel)
}
