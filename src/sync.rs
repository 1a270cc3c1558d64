//! # Critical Sections
//!
//! Interrupt-masking exclusion for shared kernel state. On the target,
//! a critical section masks all interrupts via PRIMASK; on the host it
//! takes a process-global spinlock so threaded tests get real exclusion.
//!
//! Sections must be kept very short — they block the tick source and the
//! switch-request interrupt system-wide — and must not nest: the host
//! spinlock is not reentrant, and keeping the same discipline on the
//! target keeps both builds equivalent. Kernel code therefore never calls
//! a section-taking function from inside a section.

/// Run `f` with exclusive access to shared kernel state.
#[cfg(target_arch = "arm")]
#[inline]
pub fn critical_section<F, R>(f: F) -> R
where
    F: FnOnce() -> R,
{
    cortex_m::interrupt::free(|_| f())
}

/// Run `f` with exclusive access to shared kernel state.
#[cfg(not(target_arch = "arm"))]
pub fn critical_section<F, R>(f: F) -> R
where
    F: FnOnce() -> R,
{
    use core::sync::atomic::{AtomicBool, Ordering};

    static LOCK: AtomicBool = AtomicBool::new(false);

    while LOCK
        .compare_exchange_weak(false, true, Ordering::Acquire, Ordering::Relaxed)
        .is_err()
    {
        core::hint::spin_loop();
    }

    let result = f();
    LOCK.store(false, Ordering::Release);
    result
}

/// Globally mask interrupts. Prefer [`critical_section`], which pairs the
/// mask and unmask for you.
#[inline]
pub fn disable_interrupts() {
    #[cfg(target_arch = "arm")]
    cortex_m::interrupt::disable();
}

/// Globally unmask interrupts.
#[inline]
pub fn enable_interrupts() {
    #[cfg(target_arch = "arm")]
    // SAFETY: only ever paired with a preceding disable_interrupts();
    // the kernel holds no critical section across this call.
    unsafe {
        cortex_m::interrupt::enable();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_critical_section_returns_value() {
        let x = critical_section(|| 7);
        assert_eq!(x, 7);
    }

    #[test]
    fn test_critical_section_excludes_threads() {
        use std::sync::atomic::{AtomicU32, Ordering};

        static COUNTER: AtomicU32 = AtomicU32::new(0);

        let threads: std::vec::Vec<_> = (0..4)
            .map(|_| {
                std::thread::spawn(|| {
                    for _ in 0..1000 {
                        critical_section(|| {
                            // non-atomic read-modify-write under the section
                            let v = COUNTER.load(Ordering::Relaxed);
                            COUNTER.store(v + 1, Ordering::Relaxed);
                        });
                    }
                })
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }
        assert_eq!(COUNTER.load(Ordering::Relaxed), 4000);
    }
}
