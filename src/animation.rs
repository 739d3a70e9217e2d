//! Animation loop for frame streaming.
//!
//! One [`AnimationLoop`] drives one client session: every tick it clears the
//! screen, writes the next frame in a fresh color, and advances the frame
//! index. The loop ends when the time budget runs out, the sink fails, or the
//! session is cancelled.

use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::error::SinkError;
use crate::render::{colorize, CLEAR_SCREEN};
use crate::sink::StreamWriter;
use crate::{ColorCycler, FrameSet};

/// Delay between ticks used when nothing else is configured.
pub const DEFAULT_FRAME_DELAY: Duration = Duration::from_millis(70);

/// Session lifetime cap used when nothing else is configured.
pub const DEFAULT_MAX_DURATION: Duration = Duration::from_millis(5000);

/// Lifecycle of one streaming session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AnimationState {
    /// Created, not yet started
    Idle,
    /// Emitting frames
    Streaming,
    /// Time budget used up; sink closed cleanly
    Completed,
    /// The sink failed
    Errored,
    /// Stopped from outside (client gone or server shutting down)
    Cancelled,
}

impl AnimationState {
    /// Whether no further ticks can happen.
    #[inline]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            AnimationState::Completed | AnimationState::Errored | AnimationState::Cancelled
        )
    }
}

/// Tick cadence and session lifetime cap.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Timing {
    /// Pause after each tick, measured from the end of the tick's work
    pub frame_delay: Duration,
    /// Hard cap on session lifetime, measured from session start
    pub max_duration: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            frame_delay: DEFAULT_FRAME_DELAY,
            max_duration: DEFAULT_MAX_DURATION,
        }
    }
}

/// Shared cancellation flag that can wake a sleeping session.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        let (flag, cvar) = &*self.inner;
        *flag.lock().unwrap_or_else(PoisonError::into_inner) = true;
        cvar.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        *self.inner.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Block for up to `timeout`. Returns true if cancelled.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let (flag, cvar) = &*self.inner;
        let guard = flag.lock().unwrap_or_else(PoisonError::into_inner);
        let (guard, _) = cvar
            .wait_timeout_while(guard, timeout, |cancelled| !*cancelled)
            .unwrap_or_else(PoisonError::into_inner);
        *guard
    }
}

/// Time source for the animation loop.
pub trait Clock {
    /// Monotonic time since an arbitrary, fixed origin.
    fn now(&self) -> Duration;

    /// Pause for `duration`, returning early with `true` if `cancel` fires.
    fn sleep(&self, duration: Duration, cancel: &CancelToken) -> bool;
}

/// Wall clock backed by [`Instant`].
#[derive(Clone, Copy, Debug)]
pub struct SystemClock {
    origin: Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    fn sleep(&self, duration: Duration, cancel: &CancelToken) -> bool {
        cancel.wait_timeout(duration)
    }
}

/// Per-request state, owned by exactly one loop.
#[derive(Clone, Debug)]
pub struct StreamSession {
    /// Index of the next frame to emit
    pub frame_index: usize,
    /// Palette index of the last color used
    pub last_color: Option<usize>,
    /// Clock reading when streaming started
    pub started_at: Duration,
    /// Number of frames written
    pub ticks: usize,
    pub state: AnimationState,
}

impl StreamSession {
    fn new() -> Self {
        Self {
            frame_index: 0,
            last_color: None,
            started_at: Duration::ZERO,
            ticks: 0,
            state: AnimationState::Idle,
        }
    }
}

/// Outcome of a finished session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionReport {
    pub state: AnimationState,
    pub ticks: usize,
    pub elapsed: Duration,
}

/// Drives one session: clear, colorize, write, advance, wait, repeat.
///
/// ## Example
///
/// ```rust
/// use cascii_stream::{
///     AnimationLoop, AnimationState, CancelToken, ColorCycler, ColorPalette, Frame, FrameSet,
///     HttpBodyWriter, SystemClock, Timing,
/// };
/// use std::time::Duration;
///
/// let frames = FrameSet::new(vec![Frame::new("o"), Frame::new("O")]).unwrap();
/// let timing = Timing {
///     frame_delay: Duration::from_millis(1),
///     max_duration: Duration::from_millis(20),
/// };
/// let cycler = ColorCycler::new(ColorPalette::default());
/// let mut sink = HttpBodyWriter::chunked(Vec::new());
///
/// let report = AnimationLoop::new(frames, cycler, timing)
///     .run(&mut sink, &SystemClock::new(), &CancelToken::new());
/// assert_eq!(report.state, AnimationState::Completed);
/// assert!(report.ticks > 0);
/// ```
pub struct AnimationLoop {
    frames: FrameSet,
    cycler: ColorCycler,
    timing: Timing,
    session: StreamSession,
}

impl AnimationLoop {
    pub fn new(frames: FrameSet, cycler: ColorCycler, timing: Timing) -> Self {
        Self {
            frames,
            cycler,
            timing,
            session: StreamSession::new(),
        }
    }

    #[inline]
    pub fn state(&self) -> AnimationState {
        self.session.state
    }

    #[inline]
    pub fn session(&self) -> &StreamSession {
        &self.session
    }

    /// Begin streaming at clock reading `now`. Only valid from `Idle`.
    pub fn start(&mut self, now: Duration) {
        if self.session.state != AnimationState::Idle {
            return;
        }
        self.session.started_at = now;
        self.session.frame_index = 0;
        self.session.last_color = None;
        self.session.state = AnimationState::Streaming;
    }

    /// Emit one frame, or finish the session if the budget is spent.
    ///
    /// Returns the state after the tick.
    pub fn tick<S>(&mut self, sink: &mut S, now: Duration) -> AnimationState
    where
        S: StreamWriter + ?Sized,
    {
        if self.session.state != AnimationState::Streaming {
            return self.session.state;
        }

        if now.saturating_sub(self.session.started_at) >= self.timing.max_duration {
            self.session.state = match sink.close() {
                Ok(()) => AnimationState::Completed,
                Err(err) => {
                    debug!(error = %err, "closing stream failed");
                    AnimationState::Errored
                }
            };
            return self.session.state;
        }

        if let Err(err) = sink.write(CLEAR_SCREEN.as_bytes()) {
            return self.fail(sink, err);
        }

        let (color, color_index) = self.cycler.next(self.session.last_color);
        self.session.last_color = Some(color_index);

        let unit = colorize(self.frames.at(self.session.frame_index), color);
        if let Err(err) = sink.write(unit.as_bytes()) {
            return self.fail(sink, err);
        }

        self.session.frame_index = (self.session.frame_index + 1) % self.frames.len();
        self.session.ticks += 1;
        self.session.state
    }

    /// Cancel from outside. No further writes are attempted.
    pub fn cancel<S: StreamWriter + ?Sized>(&mut self, sink: &mut S) {
        if self.session.state.is_terminal() {
            return;
        }
        sink.abort();
        self.session.state = AnimationState::Cancelled;
    }

    /// Run the session to completion.
    pub fn run<S, C>(mut self, sink: &mut S, clock: &C, cancel: &CancelToken) -> SessionReport
    where
        S: StreamWriter + ?Sized,
        C: Clock + ?Sized,
    {
        self.start(clock.now());
        debug!(frames = self.frames.len(), "stream started");

        loop {
            if cancel.is_cancelled() {
                self.cancel(sink);
                break;
            }
            if self.tick(sink, clock.now()).is_terminal() {
                break;
            }
            if clock.sleep(self.timing.frame_delay, cancel) {
                self.cancel(sink);
                break;
            }
        }

        let report = SessionReport {
            state: self.session.state,
            ticks: self.session.ticks,
            elapsed: clock.now().saturating_sub(self.session.started_at),
        };
        match report.state {
            AnimationState::Cancelled => info!(ticks = report.ticks, "stream cancelled"),
            AnimationState::Errored => warn!(ticks = report.ticks, "stream ended by sink error"),
            _ => debug!(
                ticks = report.ticks,
                elapsed_ms = report.elapsed.as_millis() as u64,
                "stream completed"
            ),
        }
        report
    }

    fn fail<S: StreamWriter + ?Sized>(&mut self, sink: &mut S, err: SinkError) -> AnimationState {
        debug!(error = %err, ticks = self.session.ticks, "stream write failed");
        sink.abort();
        self.session.state = AnimationState::Errored;
        self.session.state
    }
}
