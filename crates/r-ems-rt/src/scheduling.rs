//! ---
//! ems_section: "01-core-functionality"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Injectable clocks and frame pacing for timeline playback."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::MissedTickBehavior;

use crate::clock::ManualClock;

/// Paces a frame loop. Each call resolves when the next frame is due.
#[async_trait]
pub trait FrameTicker: Send {
    async fn tick(&mut self);
}

/// Simple async rate limiter that ensures deterministic loop intervals.
#[derive(Debug)]
pub struct RateLimiter {
    interval: tokio::time::Interval,
}

impl RateLimiter {
    pub fn new(period: Duration) -> Self {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self { interval }
    }

    pub fn period(&self) -> Duration {
        self.interval.period()
    }
}

#[async_trait]
impl FrameTicker for RateLimiter {
    async fn tick(&mut self) {
        self.interval.tick().await;
    }
}

/// Ticker for simulated time: every tick moves a [`ManualClock`] forward by
/// a fixed step and yields to the runtime.
#[derive(Debug, Clone)]
pub struct SteppedTicker {
    clock: ManualClock,
    step: Duration,
    first: bool,
}

impl SteppedTicker {
    pub fn new(clock: ManualClock, step: Duration) -> Self {
        Self {
            clock,
            step,
            first: true,
        }
    }
}

#[async_trait]
impl FrameTicker for SteppedTicker {
    async fn tick(&mut self) {
        // The first tick fires at the current time, like `tokio::time::interval`.
        if self.first {
            self.first = false;
        } else {
            self.clock.advance(self.step);
        }
        tokio::task::yield_now().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{Clock, SystemClock};

    #[tokio::test]
    async fn stepped_ticker_advances_after_first_tick() {
        let clock = ManualClock::new();
        let mut ticker = SteppedTicker::new(clock.clone(), Duration::from_millis(16));
        ticker.tick().await;
        assert_eq!(clock.now(), Duration::ZERO);
        ticker.tick().await;
        ticker.tick().await;
        assert_eq!(clock.now(), Duration::from_millis(32));
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limiter_paces_frames() {
        let clock = SystemClock::new();
        let mut limiter = RateLimiter::new(Duration::from_millis(20));
        assert_eq!(limiter.period(), Duration::from_millis(20));
        for _ in 0..4 {
            limiter.tick().await;
        }
        assert_eq!(clock.now(), Duration::from_millis(60));
    }
}
