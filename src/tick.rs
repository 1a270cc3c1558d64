//! # Tick Source
//!
//! Process-wide monotonic tick counter. The kernel never advances it —
//! a periodic timer interrupt (SysTick in the demo firmware) must call
//! [`tick()`] at a fixed, application-defined rate. [`since()`] computes
//! elapsed ticks and stays correct across the 32-bit wraparound.

use core::sync::atomic::{AtomicU32, Ordering};

static COUNTER: AtomicU32 = AtomicU32::new(0);

/// Advance the counter by one. Call from the periodic timer interrupt.
#[inline]
pub fn tick() {
    COUNTER.fetch_add(1, Ordering::Release);
}

/// Current counter value.
#[inline]
pub fn get() -> u32 {
    COUNTER.load(Ordering::Acquire)
}

/// Ticks elapsed since `start` (a value previously returned by [`get()`]),
/// accounting for counter wraparound.
pub fn since(start: u32) -> u32 {
    elapsed(get(), start)
}

/// Wraparound-safe elapsed computation: `now - start` when the counter
/// has not rolled over, `now + (MAX - start)` when it has.
pub(crate) fn elapsed(now: u32, start: u32) -> u32 {
    if now >= start {
        now - start
    } else {
        // counter overflowed between start and now
        now + (u32::MAX - start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_elapsed_immediately_zero() {
        assert_eq!(elapsed(42, 42), 0);
    }

    #[test]
    fn test_elapsed_forward() {
        assert_eq!(elapsed(100, 70), 30);
    }

    #[test]
    fn test_elapsed_across_wraparound() {
        // counter rolled over: 2 ticks to reach MAX, then 3 past zero
        assert_eq!(elapsed(3, u32::MAX - 2), 5);
        assert_eq!(elapsed(0, u32::MAX), 0);
    }

    #[test]
    fn test_counter_advances() {
        let start = get();
        tick();
        tick();
        tick();
        // other tests may tick concurrently, so only a lower bound holds
        assert!(since(start) >= 3);
    }
}
