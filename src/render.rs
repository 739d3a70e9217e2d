//! Terminal encoding of frames.
//!
//! Every tick produces one unit on the wire:
//! `CLEAR_SCREEN`, then the frame wrapped in a color escape and `ANSI_RESET`,
//! then a newline.

use crate::{AnsiColor, Frame};

/// Clear the screen, clear scrollback, and move the cursor home.
pub const CLEAR_SCREEN: &str = "\x1b[2J\x1b[3J\x1b[H";

/// Reset all text attributes.
pub const ANSI_RESET: &str = "\x1b[0m";

/// Wrap a frame in a color escape and a reset, followed by a newline.
pub fn colorize(frame: &Frame, color: AnsiColor) -> String {
    let escape = color.escape();
    let mut out =
        String::with_capacity(escape.len() + frame.content.len() + ANSI_RESET.len() + 1);
    out.push_str(escape);
    out.push_str(&frame.content);
    out.push_str(ANSI_RESET);
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_colorize() {
        let frame = Frame::new("AA\nBB");
        assert_eq!(
            colorize(&frame, AnsiColor::Red),
            "\u{1b}[31mAA\nBB\u{1b}[0m\n"
        );
    }
}
