//! Wrapping millisecond clock.
//!
//! Timestamps are `u32` milliseconds that wrap after ~49 days; all
//! comparisons go through wrapping subtraction.

pub trait Clock {
    fn now_ms(&self) -> u32;
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now_ms(&self) -> u32 {
        (**self).now_ms()
    }
}

/// Milliseconds elapsed from `earlier` to `now`, across wraparound.
#[inline]
pub const fn ticks_diff(now: u32, earlier: u32) -> u32 {
    now.wrapping_sub(earlier)
}

/// True once `timeout_ms` has passed since `since`.
#[inline]
pub const fn has_elapsed(now: u32, since: u32, timeout_ms: u32) -> bool {
    ticks_diff(now, since) >= timeout_ms
}

/// Manually advanced clock for tests and host tooling.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: core::cell::Cell<u32>,
}

impl ManualClock {
    pub const fn new(start_ms: u32) -> Self {
        Self {
            now: core::cell::Cell::new(start_ms),
        }
    }

    pub fn advance(&self, ms: u32) {
        self.now.set(self.now.get().wrapping_add(ms));
    }

    pub fn set(&self, now_ms: u32) {
        self.now.set(now_ms);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u32 {
        self.now.get()
    }
}
