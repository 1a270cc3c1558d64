//! # Mutex
//!
//! Blocking lock for task-context use. Acquisition is a single atomic
//! compare-and-set, so two tasks can never both observe "unlocked" and
//! both proceed — the check and the claim are one step. A contender that
//! loses registers itself in the waiter ring and sleeps; `unlock` pops
//! one waiter and wakes it to re-contend. A third task may barge in
//! between the wake and the retry; the woken waiter simply sleeps again,
//! and exclusion is never violated.
//!
//! There is no ownership tracking: any task may unlock any mutex, and a
//! lock taken outside task context (before the scheduler starts) is
//! waited on by cooperative busy-polling instead of sleeping.

use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicBool, Ordering};

use crate::config::MAX_TASKS;
use crate::kernel;
use crate::ringbuf::RingBuf;
use crate::sync;

pub struct Mutex {
    locked: AtomicBool,
    /// Tasks blocked on this lock, in arrival order. Touched only inside
    /// critical sections.
    waiters: UnsafeCell<RingBuf<usize, MAX_TASKS>>,
}

// SAFETY: `locked` is atomic and the waiter ring is only accessed inside
// interrupt-masking critical sections (a process-global lock on the host),
// so shared references across tasks and handlers are sound.
unsafe impl Send for Mutex {}
unsafe impl Sync for Mutex {}

impl Mutex {
    pub const fn new() -> Self {
        Self {
            locked: AtomicBool::new(false),
            waiters: UnsafeCell::new(RingBuf::new()),
        }
    }

    /// Attempt to take the lock without blocking. Returns whether the
    /// caller now holds it.
    #[inline]
    pub fn try_lock(&self) -> bool {
        self.locked
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }

    /// Whether the lock is currently held. Advisory only — by the time
    /// the caller acts on the answer it may have changed; use
    /// [`try_lock`] to check and claim in one step.
    ///
    /// [`try_lock`]: Mutex::try_lock
    #[inline]
    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Relaxed)
    }

    /// Take the lock, blocking the calling task until it is available.
    pub fn lock(&self) {
        loop {
            if self.try_lock() {
                return;
            }

            let id = kernel::current_task();
            kernel::sleep_if(|| {
                if self.locked.load(Ordering::Relaxed) {
                    if let Some(id) = id {
                        // SAFETY: inside the critical section, the only
                        // place the waiter ring is touched.
                        unsafe {
                            (*self.waiters.get()).push(id);
                        }
                    }
                    // outside task context nothing can be registered, so
                    // the loop degrades to a cooperative busy-wait
                    true
                } else {
                    false
                }
            });
        }
    }

    /// Release the lock and wake one waiter, if any. No ownership check —
    /// any task may unlock any mutex.
    pub fn unlock(&self) {
        let waiter = sync::critical_section(|| {
            self.locked.store(false, Ordering::Release);
            // SAFETY: inside the critical section.
            unsafe { (*self.waiters.get()).pop() }
        });

        // wake outside the section; sections do not nest
        if let Some(id) = waiter {
            kernel::wake(id);
        }
    }
}

impl Default for Mutex {
    fn default() -> Self {
        Self::new()
    }
}
