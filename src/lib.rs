//! # cascii-stream
//!
//! Streams looping ASCII frame animations to terminal clients over HTTP.
//!
//! This crate provides:
//! - Loading and caching text frames from a directory (or any [`FrameSource`])
//! - Reversing frames on request
//! - Picking ANSI colors that never repeat back to back
//! - A tick loop that clears the screen and writes one colorized frame per
//!   tick, until a time budget runs out, the client fails, or the session is
//!   cancelled
//! - Chunked HTTP delivery and a small blocking server
//!
//! ## Example
//!
//! ```rust,no_run
//! use cascii_stream::{StreamConfig, StreamServer};
//!
//! let config = StreamConfig::from_toml_str("bind = \"0.0.0.0:8080\"")?;
//! let server = StreamServer::bind(config)?;
//! server.run();
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! Then, from a terminal: `curl http://localhost:8080/?flip=true`.

pub mod animation;
pub mod color;
pub mod config;
mod data;
pub mod error;
pub mod loader;
pub mod render;
pub mod server;
pub mod sink;
pub mod transform;

pub use animation::{
    AnimationLoop, AnimationState, CancelToken, Clock, SessionReport, StreamSession, SystemClock,
    Timing,
};
pub use color::{AnsiColor, ColorCycler, ColorPalette};
pub use config::{FrameAssets, StreamConfig};
pub use data::{Frame, FrameFile, FrameSet, SENTINEL_FRAME};
pub use error::{ConfigError, LoadError, ServerError, SinkError};
pub use loader::{DirectorySource, FrameSource, FrameStore};
pub use server::{should_stream, Route, ShutdownHandle, StreamServer};
pub use sink::{Framing, HttpBodyWriter, StreamWriter};
