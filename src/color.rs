//! ANSI colors and the no-immediate-repeat color cycler.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::ConfigError;

/// Foreground colors from the basic ANSI set.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AnsiColor {
    Black,
    Red,
    Green,
    Yellow,
    Blue,
    Magenta,
    Cyan,
    White,
    Gray,
}

impl AnsiColor {
    /// The SGR escape sequence that switches the foreground to this color.
    pub fn escape(self) -> &'static str {
        match self {
            AnsiColor::Black   => "\x1b[30m",
            AnsiColor::Red     => "\x1b[31m",
            AnsiColor::Green   => "\x1b[32m",
            AnsiColor::Yellow  => "\x1b[33m",
            AnsiColor::Blue    => "\x1b[34m",
            AnsiColor::Magenta => "\x1b[35m",
            AnsiColor::Cyan    => "\x1b[36m",
            AnsiColor::White   => "\x1b[37m",
            AnsiColor::Gray    => "\x1b[90m",
        }
    }
}

/// Parse a color name into an ANSI color.
///
/// Supports black, red, green, yellow, blue, magenta (or purple), cyan,
/// white and gray/grey. Case-insensitive, trims whitespace.
pub fn parse_color(s: &str) -> Option<AnsiColor> {
    match s.trim().to_lowercase().as_str() {
        "black"              => Some(AnsiColor::Black),
        "red"                => Some(AnsiColor::Red),
        "green"              => Some(AnsiColor::Green),
        "yellow"             => Some(AnsiColor::Yellow),
        "blue"               => Some(AnsiColor::Blue),
        "magenta" | "purple" => Some(AnsiColor::Magenta),
        "cyan"               => Some(AnsiColor::Cyan),
        "white"              => Some(AnsiColor::White),
        "gray" | "grey"      => Some(AnsiColor::Gray),
        _                    => None,
    }
}

/// A fixed, non-empty, ordered set of colors.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColorPalette {
    colors: Vec<AnsiColor>,
}

impl Default for ColorPalette {
    fn default() -> Self {
        Self {
            colors: vec![
                AnsiColor::Red,
                AnsiColor::Yellow,
                AnsiColor::Green,
                AnsiColor::Blue,
                AnsiColor::Magenta,
                AnsiColor::Cyan,
                AnsiColor::White,
            ],
        }
    }
}

impl ColorPalette {
    /// Build a palette, or `None` if `colors` is empty.
    pub fn new(colors: Vec<AnsiColor>) -> Option<Self> {
        if colors.is_empty() {
            None
        } else {
            Some(Self { colors })
        }
    }

    /// Build a palette from color names, as found in config files.
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Result<Self, ConfigError> {
        let colors = names
            .iter()
            .map(|name| {
                parse_color(name.as_ref())
                    .ok_or_else(|| ConfigError::UnknownColor(name.as_ref().to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(colors).ok_or(ConfigError::EmptyPalette)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.colors.len()
    }

    /// Always false; palettes are non-empty by construction.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<AnsiColor> {
        self.colors.get(index).copied()
    }
}

/// Picks colors at random so that no color follows itself.
///
/// Holds no state besides its RNG; the previous index is supplied by the
/// caller on every call.
#[derive(Clone, Debug)]
pub struct ColorCycler {
    palette: ColorPalette,
    rng: StdRng,
}

impl ColorCycler {
    pub fn new(palette: ColorPalette) -> Self {
        Self {
            palette,
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic cycler, for reproducible sequences.
    pub fn seeded(palette: ColorPalette, seed: u64) -> Self {
        Self {
            palette,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn palette(&self) -> &ColorPalette {
        &self.palette
    }

    /// Select the next color, never returning `previous` when the palette
    /// has more than one entry.
    ///
    /// Draws once from the other `n - 1` indices instead of resampling.
    pub fn next(&mut self, previous: Option<usize>) -> (AnsiColor, usize) {
        let n = self.palette.colors.len();
        let index = match previous {
            _ if n == 1 => 0,
            Some(prev) if prev < n => {
                let k = self.rng.gen_range(0..n - 1);
                if k >= prev {
                    k + 1
                } else {
                    k
                }
            }
            _ => self.rng.gen_range(0..n),
        };
        (self.palette.colors[index], index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn named_colors() {
        assert_eq!(parse_color("black"),   Some(AnsiColor::Black));
        assert_eq!(parse_color("red"),     Some(AnsiColor::Red));
        assert_eq!(parse_color("green"),   Some(AnsiColor::Green));
        assert_eq!(parse_color("yellow"),  Some(AnsiColor::Yellow));
        assert_eq!(parse_color("blue"),    Some(AnsiColor::Blue));
        assert_eq!(parse_color("magenta"), Some(AnsiColor::Magenta));
        assert_eq!(parse_color("purple"),  Some(AnsiColor::Magenta));
        assert_eq!(parse_color("cyan"),    Some(AnsiColor::Cyan));
        assert_eq!(parse_color("white"),   Some(AnsiColor::White));
        assert_eq!(parse_color("gray"),    Some(AnsiColor::Gray));
        assert_eq!(parse_color("grey"),    Some(AnsiColor::Gray));
    }

    #[test]
    fn named_colors_case_and_whitespace() {
        assert_eq!(parse_color("  Red "), Some(AnsiColor::Red));
        assert_eq!(parse_color("\tCYAN\n"), Some(AnsiColor::Cyan));
    }

    #[test]
    fn invalid_colors() {
        assert_eq!(parse_color(""), None);
        assert_eq!(parse_color("notacolor"), None);
        assert_eq!(parse_color("#ff0000"), None);
    }

    #[test]
    fn escapes() {
        assert_eq!(AnsiColor::Red.escape(), "\u{1b}[31m");
        assert_eq!(AnsiColor::White.escape(), "\u{1b}[37m");
    }

    #[test]
    fn default_palette_order() {
        let palette = ColorPalette::default();
        assert_eq!(palette.len(), 7);
        assert_eq!(palette.get(0), Some(AnsiColor::Red));
        assert_eq!(palette.get(6), Some(AnsiColor::White));
    }

    #[test]
    fn palette_from_names() {
        let palette = ColorPalette::from_names(&["red", "Blue"]).unwrap();
        assert_eq!(palette.get(1), Some(AnsiColor::Blue));

        assert!(matches!(
            ColorPalette::from_names::<&str>(&[]),
            Err(ConfigError::EmptyPalette)
        ));
        assert!(matches!(
            ColorPalette::from_names(&["red", "mauve"]),
            Err(ConfigError::UnknownColor(name)) if name == "mauve"
        ));
    }

    #[test]
    fn single_color_palette_repeats() {
        let palette = ColorPalette::new(vec![AnsiColor::Green]).unwrap();
        let mut cycler = ColorCycler::seeded(palette, 7);
        let mut prev = None;
        for _ in 0..20 {
            let (color, index) = cycler.next(prev);
            assert_eq!(color, AnsiColor::Green);
            assert_eq!(index, 0);
            prev = Some(index);
        }
    }

    #[test]
    fn two_color_palette_alternates() {
        let palette = ColorPalette::new(vec![AnsiColor::Red, AnsiColor::Blue]).unwrap();
        let mut cycler = ColorCycler::seeded(palette, 1);
        let (_, first) = cycler.next(None);
        let mut prev = first;
        for _ in 0..10 {
            let (_, index) = cycler.next(Some(prev));
            assert_eq!(index, 1 - prev);
            prev = index;
        }
    }

    #[test]
    fn every_other_color_reachable() {
        let mut cycler = ColorCycler::seeded(ColorPalette::default(), 42);
        let mut seen = [false; 7];
        for _ in 0..500 {
            let (_, index) = cycler.next(Some(3));
            seen[index] = true;
        }
        assert!(!seen[3]);
        assert_eq!(seen.iter().filter(|s| **s).count(), 6);
    }

    proptest! {
        #[test]
        fn no_immediate_repeat(seed in any::<u64>(), n in 2usize..9, steps in 1usize..64) {
            let all = [
                AnsiColor::Black, AnsiColor::Red, AnsiColor::Green,
                AnsiColor::Yellow, AnsiColor::Blue, AnsiColor::Magenta,
                AnsiColor::Cyan, AnsiColor::White, AnsiColor::Gray,
            ];
            let palette = ColorPalette::new(all[..n].to_vec()).unwrap();
            let mut cycler = ColorCycler::seeded(palette, seed);
            let mut prev = None;
            for _ in 0..steps {
                let (color, index) = cycler.next(prev);
                prop_assert!(index < n);
                prop_assert_eq!(color, all[index]);
                prop_assert_ne!(Some(index), prev);
                prev = Some(index);
            }
        }
    }
}
