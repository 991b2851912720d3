//! Tiered idle strategy for hot consumer loops.
//!
//! Escalates busy-spin -> yield -> short sleep -> long sleep as a loop
//! stays idle, and drops back to spinning the moment work arrives. This is
//! the only approved idle behavior for pipeline threads.

use std::time::Duration;

const BUSY_SPIN_ITERS: u32 = 1_000;
const YIELD_ITERS: u32 = 5_000;
const SLEEP_ITERS: u32 = 50_000;
const SHORT_SLEEP_MICROS: u64 = 50;

/// Escalating wait state; one per consumer loop.
#[derive(Debug, Default)]
pub struct WaitStrategy {
    iter: u32,
}

impl WaitStrategy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Idle once at the current tier.
    #[inline]
    pub fn idle(&mut self) {
        if self.iter < BUSY_SPIN_ITERS {
            std::hint::spin_loop();
        } else if self.iter < BUSY_SPIN_ITERS + YIELD_ITERS {
            std::thread::yield_now();
        } else if self.iter < BUSY_SPIN_ITERS + YIELD_ITERS + SLEEP_ITERS {
            std::thread::sleep(Duration::from_micros(SHORT_SLEEP_MICROS));
        } else {
            std::thread::sleep(Duration::from_millis(1));
        }
        self.iter = self.iter.saturating_add(1);
    }

    /// Call on progress to fall back to the busy-spin tier.
    #[inline]
    pub fn reset(&mut self) {
        self.iter = 0;
    }
}
