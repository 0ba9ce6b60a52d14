//! Playback Clock for Montage
//!
//! [`PlaybackClock`] is the pure Stopped/Playing state machine that owns
//! the playhead. [`Transport`] shares a clock with a tokio ticker task that
//! advances it while playing. The ticker is aborted on pause and on drop,
//! so no timer outlives the transport.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::config::EngineConfig;

/// Clock states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    /// Playhead is still (default state)
    #[default]
    Stopped,
    /// Playhead advances on every tick
    Playing,
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaybackState::Stopped => write!(f, "Stopped"),
            PlaybackState::Playing => write!(f, "Playing"),
        }
    }
}

/// Playhead position and play state
///
/// The position is always within `[0, total_duration]`.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackClock {
    /// Current state
    state: PlaybackState,

    /// Playhead position in seconds
    position: f64,

    /// Timeline length in seconds
    total_duration: f64,

    /// Seconds advanced per tick
    tick_seconds: f64,

    /// Seconds per frame for frame stepping
    frame_seconds: f64,
}

impl PlaybackClock {
    /// Create a stopped clock at 0.
    pub fn new(total_duration: f64, tick_seconds: f64, frame_seconds: f64) -> Self {
        Self {
            state: PlaybackState::Stopped,
            position: 0.0,
            total_duration: total_duration.max(0.0),
            tick_seconds,
            frame_seconds,
        }
    }

    pub fn from_config(config: &EngineConfig, total_duration: f64) -> Self {
        Self::new(total_duration, config.tick_seconds(), config.frame_seconds())
    }

    // ========================================================================
    // Controls
    // ========================================================================

    /// Start playing. At the end of the timeline playback restarts from 0.
    pub fn play(&mut self) {
        if self.state == PlaybackState::Playing {
            return;
        }
        if self.position >= self.total_duration {
            self.position = 0.0;
        }
        self.state = PlaybackState::Playing;
    }

    pub fn pause(&mut self) {
        self.state = PlaybackState::Stopped;
    }

    pub fn toggle(&mut self) {
        match self.state {
            PlaybackState::Playing => self.pause(),
            PlaybackState::Stopped => self.play(),
        }
    }

    /// Move the playhead without changing state. Clamped to `[0, total]`.
    pub fn seek(&mut self, time: f64) {
        self.position = if time.is_nan() {
            0.0
        } else {
            time.clamp(0.0, self.total_duration)
        };
    }

    /// Step one frame forward (`frames > 0`) or back (`frames < 0`).
    pub fn step_frame(&mut self, frames: i32) {
        self.seek(self.position + frames as f64 * self.frame_seconds);
    }

    /// Advance one tick. Returns whether the clock is still playing.
    ///
    /// Reaching the end clamps the playhead to the end and stops.
    pub fn tick(&mut self) -> bool {
        if self.state != PlaybackState::Playing {
            return false;
        }
        let next = self.position + self.tick_seconds;
        if next >= self.total_duration {
            self.position = self.total_duration;
            self.state = PlaybackState::Stopped;
            return false;
        }
        self.position = next;
        true
    }

    /// Change the timeline length, pulling the playhead back inside it.
    pub fn set_total_duration(&mut self, total_duration: f64) {
        self.total_duration = total_duration.max(0.0);
        if self.position > self.total_duration {
            self.position = self.total_duration;
        }
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn total_duration(&self) -> f64 {
        self.total_duration
    }

    pub fn tick_seconds(&self) -> f64 {
        self.tick_seconds
    }
}

/// A [`PlaybackClock`] driven by a tokio interval while playing
#[derive(Debug)]
pub struct Transport {
    clock: Arc<Mutex<PlaybackClock>>,
    tick_interval: Duration,
    ticker: Option<JoinHandle<()>>,
}

fn lock(clock: &Mutex<PlaybackClock>) -> MutexGuard<'_, PlaybackClock> {
    clock.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Transport {
    pub fn new(clock: PlaybackClock, tick_interval: Duration) -> Self {
        Self {
            clock: Arc::new(Mutex::new(clock)),
            tick_interval,
            ticker: None,
        }
    }

    pub fn from_config(config: &EngineConfig, total_duration: f64) -> Self {
        Self::new(
            PlaybackClock::from_config(config, total_duration),
            Duration::from_millis(config.tick_interval_ms),
        )
    }

    /// Start playback and the ticker task.
    ///
    /// Outside a tokio runtime the clock enters Playing but only advances
    /// through [`Transport::tick`].
    pub fn play(&mut self) {
        let position = {
            let mut clock = lock(&self.clock);
            clock.play();
            clock.position()
        };
        debug!(position, "transport play");

        if self.ticker.as_ref().is_some_and(|t| !t.is_finished()) {
            return;
        }
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let clock = Arc::clone(&self.clock);
                let period = self.tick_interval;
                self.ticker = Some(handle.spawn(async move {
                    let mut interval = tokio::time::interval(period);
                    interval.tick().await;
                    loop {
                        interval.tick().await;
                        if !lock(&clock).tick() {
                            break;
                        }
                    }
                }));
            }
            Err(_) => warn!("no tokio runtime; playback will not advance on its own"),
        }
    }

    /// Stop playback and abort the ticker.
    pub fn pause(&mut self) {
        self.stop_ticker();
        let mut clock = lock(&self.clock);
        clock.pause();
        debug!(position = clock.position(), "transport pause");
    }

    pub fn toggle(&mut self) {
        if self.is_playing() {
            self.pause();
        } else {
            self.play();
        }
    }

    /// Move the playhead. A running ticker keeps running from the new spot.
    pub fn seek(&mut self, time: f64) {
        lock(&self.clock).seek(time);
    }

    pub fn step_frame(&mut self, frames: i32) {
        lock(&self.clock).step_frame(frames);
    }

    /// Advance the clock by hand.
    pub fn tick(&mut self) -> bool {
        lock(&self.clock).tick()
    }

    pub fn set_total_duration(&mut self, total_duration: f64) {
        lock(&self.clock).set_total_duration(total_duration);
    }

    pub fn position(&self) -> f64 {
        lock(&self.clock).position()
    }

    pub fn state(&self) -> PlaybackState {
        lock(&self.clock).state()
    }

    pub fn is_playing(&self) -> bool {
        lock(&self.clock).is_playing()
    }

    /// Copy of the clock
    pub fn clock(&self) -> PlaybackClock {
        lock(&self.clock).clone()
    }

    /// Whether a ticker task is alive
    pub fn has_ticker(&self) -> bool {
        self.ticker.as_ref().is_some_and(|t| !t.is_finished())
    }

    fn stop_ticker(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
    }
}

impl Drop for Transport {
    fn drop(&mut self) {
        self.stop_ticker();
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
