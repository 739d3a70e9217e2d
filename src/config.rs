//! Server configuration, read from a TOML file.
//!
//! Every field has a default, so an empty file (or no file) is a valid
//! configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::animation::Timing;
use crate::error::ConfigError;
use crate::loader::DirectorySource;
use crate::ColorPalette;

/// Where frame files live.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameAssets {
    pub primary_dir: PathBuf,
    pub fallback_dir: PathBuf,
    /// Extension (without the dot) of frame files
    pub extension: String,
}

impl Default for FrameAssets {
    fn default() -> Self {
        Self {
            primary_dir: PathBuf::from("frames"),
            fallback_dir: PathBuf::from("netlify/functions/frames"),
            extension: "txt".to_string(),
        }
    }
}

impl FrameAssets {
    pub fn source(&self) -> DirectorySource {
        DirectorySource::new(&self.primary_dir, &self.fallback_dir)
            .with_extension(self.extension.clone())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Address the HTTP server listens on
    pub bind: String,
    pub frame_delay_ms: u64,
    /// Cap on a single stream's lifetime
    pub max_stream_ms: u64,
    /// Where non-terminal clients are redirected
    pub redirect_url: String,
    /// User-Agent substrings that identify terminal clients
    pub terminal_agents: Vec<String>,
    /// Color names, see [`crate::color::parse_color`]
    pub palette: Vec<String>,
    pub frames: FrameAssets,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".to_string(),
            frame_delay_ms: 70,
            max_stream_ms: 5000,
            redirect_url: "https://github.com/ArneshRC/Vi".to_string(),
            terminal_agents: vec!["curl".to_string()],
            palette: ["red", "yellow", "green", "blue", "magenta", "cyan", "white"]
                .iter()
                .map(|c| c.to_string())
                .collect(),
            frames: FrameAssets::default(),
        }
    }
}

impl StreamConfig {
    /// Parse and validate a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.frame_delay_ms == 0 {
            return Err(ConfigError::Zero("frame_delay_ms"));
        }
        if self.max_stream_ms == 0 {
            return Err(ConfigError::Zero("max_stream_ms"));
        }
        self.palette().map(|_| ())
    }

    pub fn timing(&self) -> Timing {
        Timing {
            frame_delay: Duration::from_millis(self.frame_delay_ms),
            max_duration: Duration::from_millis(self.max_stream_ms),
        }
    }

    pub fn palette(&self) -> Result<ColorPalette, ConfigError> {
        ColorPalette::from_names(self.palette.as_slice())
    }
}
