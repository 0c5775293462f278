use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

use crate::foundation::core::FrameRate;

/// Shared, lock-free cell holding an item's configured frame rate.
///
/// Rate broadcasts write it from whichever thread delivers them; the scheduler reads it when it
/// arms the next tick.
#[derive(Clone, Debug)]
pub struct RateHandle(Arc<AtomicU32>);

impl RateHandle {
    /// Create a handle holding `rate`.
    pub fn new(rate: FrameRate) -> Self {
        Self(Arc::new(AtomicU32::new(rate.get())))
    }

    /// Current rate.
    pub fn get(&self) -> FrameRate {
        FrameRate::at_least_one(self.0.load(Ordering::Acquire))
    }

    /// Replace the rate; returns the previous one.
    pub fn set(&self, rate: FrameRate) -> FrameRate {
        FrameRate::at_least_one(self.0.swap(rate.get(), Ordering::AcqRel))
    }
}

/// Periodic render trigger of one item.
///
/// Deadlines advance in whole intervals from the previous deadline, so pacing does not drift with
/// control-loop latency. When the loop falls more than one interval behind, missed ticks are
/// skipped rather than replayed. A rate change re-arms the pending deadline one new interval after
/// the last tick.
#[derive(Debug)]
pub struct RenderScheduler {
    rate: RateHandle,
    next_tick: Option<Instant>,
    // Rate `next_tick` was computed with.
    armed_rate: FrameRate,
    last_tick: Option<Instant>,
}

impl RenderScheduler {
    /// Create a stopped scheduler reading its rate from `rate`.
    pub fn new(rate: RateHandle) -> Self {
        let armed_rate = rate.get();
        Self {
            rate,
            next_tick: None,
            armed_rate,
            last_tick: None,
        }
    }

    /// The rate cell this scheduler reads.
    pub fn rate(&self) -> &RateHandle {
        &self.rate
    }

    /// Interval derived from the current rate.
    pub fn interval(&self) -> Duration {
        self.rate.get().interval()
    }

    /// Return `true` while ticks are armed.
    pub fn is_active(&self) -> bool {
        self.next_tick.is_some()
    }

    /// Arm the scheduler with an immediate first tick. No-op when already running.
    pub fn start(&mut self, now: Instant) {
        if self.next_tick.is_none() {
            self.next_tick = Some(now);
            self.armed_rate = self.rate.get();
        }
    }

    /// Disarm the scheduler.
    pub fn stop(&mut self) {
        self.next_tick = None;
        self.last_tick = None;
    }

    /// When the next tick is due, if armed. Reflects a rate change not yet seen by [`poll`].
    ///
    /// [`poll`]: RenderScheduler::poll
    pub fn next_deadline(&self) -> Option<Instant> {
        self.deadline_at(self.rate.get())
    }

    /// Consume the tick due at `now`, if any, and arm the following one.
    pub fn poll(&mut self, now: Instant) -> bool {
        let rate = self.rate.get();
        let Some(due) = self.deadline_at(rate) else {
            return false;
        };
        if rate != self.armed_rate {
            tracing::trace!(from = %self.armed_rate, to = %rate, "scheduler re-armed");
            self.next_tick = Some(due);
            self.armed_rate = rate;
        }
        if now < due {
            return false;
        }

        let interval = rate.interval();
        let tick = if due + interval <= now { now } else { due };
        self.last_tick = Some(tick);
        self.next_tick = Some(tick + interval);
        true
    }

    fn deadline_at(&self, rate: FrameRate) -> Option<Instant> {
        let due = self.next_tick?;
        match self.last_tick {
            Some(last) if rate != self.armed_rate => Some(last + rate.interval()),
            _ => Some(due),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/scheduler.rs"]
mod tests;
