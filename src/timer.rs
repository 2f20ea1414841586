//! Single countdown with start/pause/reset and one-second ticks.
//!
//! The repeating tick is owned by the timer as a scheduler handle. Dropping
//! the handle cancels the tick, so every transition out of `Running` (and
//! dropping the timer itself) releases it.

use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Identifies one acquired repeating tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TickerId(pub u64);

/// A live repeating tick; cancelled when dropped.
pub trait TickHandle {
    fn id(&self) -> TickerId;
}

/// Source of repeating ticks.
///
/// The first tick of a new handle fires one full period after `every`
/// returns, never immediately.
pub trait Scheduler {
    type Handle: TickHandle;

    fn every(&mut self, period: Duration) -> Self::Handle;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
    Idle,
    Running,
    Paused,
}

impl TimerState {
    pub fn label(&self) -> &'static str {
        match self {
            TimerState::Idle => "idle",
            TimerState::Running => "running",
            TimerState::Paused => "paused",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preset {
    pub label: String,
    pub seconds: u64,
}

impl Preset {
    pub fn new(label: impl Into<String>, seconds: u64) -> Self {
        Preset {
            label: label.into(),
            seconds,
        }
    }
}

pub fn default_presets() -> Vec<Preset> {
    [
        ("15초", 15),
        ("45초", 45),
        ("10분", 600),
        ("25분", 1500),
        ("20초", 20),
        ("1분", 60),
        ("15분", 900),
        ("30분", 1800),
        ("30초", 30),
        ("5분", 300),
        ("20분", 1200),
        ("45분", 2700),
    ]
    .into_iter()
    .map(|(label, seconds)| Preset::new(label, seconds))
    .collect()
}

pub struct CountdownTimer<S: Scheduler> {
    scheduler: S,
    ticker: Option<S::Handle>,
    configured: u64,
    run_total: u64,
    remaining: u64,
    state: TimerState,
}

impl<S: Scheduler> CountdownTimer<S> {
    pub fn new(scheduler: S) -> Self {
        CountdownTimer {
            scheduler,
            ticker: None,
            configured: 0,
            run_total: 0,
            remaining: 0,
            state: TimerState::Idle,
        }
    }

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    pub fn configured(&self) -> u64 {
        self.configured
    }

    /// Length of the current (or last) run; `remaining` never exceeds it.
    pub fn run_total(&self) -> u64 {
        self.run_total
    }

    pub fn is_ticking(&self) -> bool {
        self.ticker.is_some()
    }

    pub fn ticker_id(&self) -> Option<TickerId> {
        self.ticker.as_ref().map(|t| t.id())
    }

    /// Sets the duration used by the next `start`. A running countdown keeps
    /// its remaining time.
    pub fn configure(&mut self, hours: u32, minutes: u32, seconds: u32) {
        self.configured =
            u64::from(hours) * 3600 + u64::from(minutes) * 60 + u64::from(seconds);
    }

    /// Restarts from the configured duration. Returns `false` and leaves
    /// everything untouched when the configured duration is zero.
    pub fn start(&mut self) -> bool {
        self.run(self.configured)
    }

    /// Jumps straight to `seconds` and starts running, ignoring the
    /// configured duration. A zero preset is ignored like a zero `start`.
    pub fn select_preset(&mut self, seconds: u64) -> bool {
        self.run(seconds)
    }

    fn run(&mut self, seconds: u64) -> bool {
        if seconds == 0 {
            return false;
        }
        self.remaining = seconds;
        self.run_total = seconds;
        self.state = TimerState::Running;
        self.arm();
        log::debug!("event=timer_start seconds={}", seconds);
        true
    }

    pub fn toggle(&mut self) {
        match self.state {
            TimerState::Running => {
                self.disarm();
                self.state = TimerState::Paused;
                log::debug!("event=timer_pause remaining={}", self.remaining);
            }
            TimerState::Paused => {
                self.state = TimerState::Running;
                self.arm();
                log::debug!("event=timer_resume remaining={}", self.remaining);
            }
            TimerState::Idle => {}
        }
    }

    pub fn reset(&mut self) {
        self.disarm();
        self.remaining = 0;
        self.state = TimerState::Idle;
    }

    /// One elapsed second. Ignored unless running; returns whether the
    /// remaining time changed.
    pub fn tick(&mut self) -> bool {
        if self.state != TimerState::Running {
            return false;
        }
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            self.disarm();
            self.state = TimerState::Idle;
            log::info!("event=timer_finished seconds={}", self.run_total);
        }
        true
    }

    /// Delivers a tick from `id`, dropping it if that ticker has since been
    /// cancelled.
    pub fn on_tick(&mut self, id: TickerId) -> bool {
        if self.ticker_id() != Some(id) {
            return false;
        }
        self.tick()
    }

    /// Fraction of the current run already elapsed, in `0.0..=1.0`.
    pub fn progress(&self) -> f64 {
        if self.run_total == 0 {
            return 0.0;
        }
        (self.run_total - self.remaining.min(self.run_total)) as f64 / self.run_total as f64
    }

    fn arm(&mut self) {
        // Release the previous tick before acquiring a new one.
        self.disarm();
        self.ticker = Some(self.scheduler.every(TICK_PERIOD));
    }

    fn disarm(&mut self) {
        self.ticker = None;
    }
}

/// `HH:MM:SS`; hours keep counting past 99.
pub fn format_clock(total_seconds: u64) -> String {
    let h = total_seconds / 3600;
    let m = (total_seconds % 3600) / 60;
    let s = total_seconds % 60;
    format!("{:02}:{:02}:{:02}", h, m, s)
}

/// Hours, minutes and seconds for the editor, or `None` past 23:59:59.
pub fn split_hms(total_seconds: u64) -> Option<(u32, u32, u32)> {
    let h = u32::try_from(total_seconds / 3600).ok().filter(|h| *h <= 23)?;
    let m = ((total_seconds % 3600) / 60) as u32;
    let s = (total_seconds % 60) as u32;
    Some((h, m, s))
}
