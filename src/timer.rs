//! Drop timer: decides when the session gets its next gravity tick.
//!
//! The interval is `1000 / level` ms. Because it depends on the level, the
//! app restarts the timer on every level change; with `fixed_speed` the
//! interval chosen at start is kept for the whole game instead.

use std::time::{Duration, Instant};

/// Gravity interval at level 1.
pub const BASE_INTERVAL_MS: u64 = 1000;

/// Shortest interval, reached from level 1000 on.
pub const MIN_INTERVAL_MS: u64 = 1;

pub fn interval_for_level(level: u32) -> Duration {
    let ms = BASE_INTERVAL_MS / u64::from(level.max(1));
    Duration::from_millis(ms.max(MIN_INTERVAL_MS))
}

#[derive(Debug, Clone)]
pub struct DropTimer {
    interval: Duration,
    last_tick: Instant,
    running: bool,
    fixed_speed: bool,
}

impl DropTimer {
    /// Stopped timer; call [`DropTimer::start`] when a game begins.
    pub fn new(fixed_speed: bool, now: Instant) -> Self {
        Self {
            interval: interval_for_level(1),
            last_tick: now,
            running: false,
            fixed_speed,
        }
    }

    /// Begin ticking for a new game.
    pub fn start(&mut self, level: u32, now: Instant) {
        self.interval = interval_for_level(level);
        self.last_tick = now;
        self.running = true;
    }

    /// Level changed mid-game. Picks up the new interval and measures the
    /// next tick from `now`, unless running at fixed speed.
    pub fn on_level_change(&mut self, level: u32, now: Instant) {
        if self.fixed_speed || !self.running {
            return;
        }
        self.start(level, now);
    }

    /// Paused time does not count toward the next tick.
    pub fn resume(&mut self, now: Instant) {
        self.last_tick = now;
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// True when a tick is due; the next one is then measured from `now`.
    pub fn poll(&mut self, now: Instant) -> bool {
        if !self.running || now.saturating_duration_since(self.last_tick) < self.interval {
            return false;
        }
        self.last_tick = now;
        true
    }

    /// Time left until the next tick (zero when due or stopped).
    pub fn until_next(&self, now: Instant) -> Duration {
        if !self.running {
            return Duration::ZERO;
        }
        self.interval
            .saturating_sub(now.saturating_duration_since(self.last_tick))
    }
}
