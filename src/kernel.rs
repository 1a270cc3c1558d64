//! # Kernel
//!
//! The global scheduler instance and the public task API.
//!
//! ## Startup sequence
//!
//! ```text
//! reset_handler (cortex-m-rt)
//!   └─► main()
//!         ├─► kernel::init()        ← set up the global scheduler
//!         ├─► kernel::create_task() ← register tasks (×N)
//!         └─► kernel::start()       ← configure SysTick/PendSV, pend the
//!                                     first switch; never returns
//! ```
//!
//! The first context switch moves execution from the boot stack (MSP)
//! into the task model (PSP) and never comes back; `start()` parks the
//! boot context behind it.

use crate::arch;
use crate::scheduler::Scheduler;
use crate::sync;
use crate::tick;

// ---------------------------------------------------------------------------
// Global scheduler instance
// ---------------------------------------------------------------------------

static mut SCHEDULER: Scheduler = Scheduler::new();

/// Raw pointer to the global scheduler, set once by [`init`]. The switch
/// handler reads it from exception context, where references into a
/// `static mut` are awkward to justify.
pub static mut SCHEDULER_PTR: *mut Scheduler = core::ptr::null_mut();

/// Run `f` on the global scheduler inside a critical section.
/// Returns `None` before [`init`] has been called.
fn with_scheduler<F, R>(f: F) -> Option<R>
where
    F: FnOnce(&mut Scheduler) -> R,
{
    sync::critical_section(|| {
        // SAFETY: the pointer is either null or set once by init(); the
        // critical section excludes every other accessor.
        unsafe {
            if SCHEDULER_PTR.is_null() {
                None
            } else {
                Some(f(&mut *SCHEDULER_PTR))
            }
        }
    })
}

// ---------------------------------------------------------------------------
// Kernel API
// ---------------------------------------------------------------------------

/// Initialize the kernel. Call exactly once, from the main thread,
/// before any other kernel function.
pub fn init() {
    sync::critical_section(|| {
        // SAFETY: single-threaded startup; nothing else touches the
        // scheduler until the pointer is published.
        unsafe {
            SCHEDULER = Scheduler::new();
            SCHEDULER_PTR = core::ptr::addr_of_mut!(SCHEDULER);
        }
    });
}

/// Create a task that starts executing `handler` once the scheduler
/// reaches it. Returns the task's slot index, or `None` when the table
/// is full — no task is created and no slot is disturbed in that case.
///
/// A handler that returns destroys its own task: the slot is freed for
/// reuse and the scheduler moves on to the next runnable task.
pub fn create_task(handler: extern "C" fn()) -> Option<usize> {
    with_scheduler(|s| s.create_task(handler, task_exit)).flatten()
}

/// Slot index of the calling task, or `None` before the first context
/// switch (startup code, or interrupt handlers that fire before the
/// scheduler is running).
pub fn current_task() -> Option<usize> {
    with_scheduler(|s| s.current_task()).flatten()
}

/// Voluntarily hand the CPU to the next runnable task.
///
/// The switch request is latched in the interrupt controller and
/// serviced asynchronously; the trigger spins a few cycles so the
/// request cannot be missed before the caller reaches another
/// suspension point.
#[inline]
pub fn yield_now() {
    arch::pend_context_switch();
}

/// Busy cooperative wait: yield until `ticks` have elapsed on the tick
/// source. The task keeps consuming scheduling turns until the deadline.
pub fn delay(ticks: u32) {
    let start = tick::get();
    while tick::since(start) < ticks {
        yield_now();
    }
}

/// Block the calling task until another task (or an interrupt handler)
/// wakes it by slot index.
pub fn sleep() {
    with_scheduler(|s| s.mark_current_sleeping());
    yield_now();
}

/// Conditionally block: `register` runs inside a single critical
/// section, and when it returns `true` the calling task is marked
/// sleeping in that same section, then yields. Registering a waiter and
/// going to sleep in one section is what prevents a wake issued in
/// between from being lost.
///
/// `register` must not take another critical section (sections do not
/// nest), so capture the task id with [`current_task`] beforehand.
///
/// Returns whether the task actually slept.
pub fn sleep_if<F>(register: F) -> bool
where
    F: FnOnce() -> bool,
{
    let block = sync::critical_section(|| {
        let block = register();
        if block {
            // SAFETY: inside the critical section, like every other
            // scheduler access.
            unsafe {
                if !SCHEDULER_PTR.is_null() {
                    (*SCHEDULER_PTR).mark_current_sleeping();
                }
            }
        }
        block
    });

    if block {
        yield_now();
    }
    block
}

/// Clear the sleeping flag on the given slot. Callable from any task and
/// from interrupt-handler context; waking an already-runnable task is a
/// harmless no-op.
pub fn wake(task_id: usize) {
    with_scheduler(|s| s.wake(task_id));
}

/// Start multitasking. **Does not return.**
///
/// Configures SysTick and the switch-interrupt priorities, points PSP at
/// the boot scratch region, pends the first context switch and parks.
/// The first switch never saves into any slot and never resumes the boot
/// context.
pub fn start(mut core_peripherals: cortex_m::Peripherals) -> ! {
    arch::configure_systick(&mut core_peripherals.SYST);
    arch::set_interrupt_priorities();
    arch::prepare_boot_stack();

    yield_now();

    loop {
        arch::park();
    }
}

/// Lands here when a task's handler returns: free the slot, request a
/// switch, and idle out the remaining time until the switch is taken.
/// The slot is immediately ineligible for selection but its memory stays
/// allocated in place until a later create reuses it.
extern "C" fn task_exit() -> ! {
    with_scheduler(|s| s.terminate_current());
    yield_now();

    loop {
        arch::park();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::sync::atomic::{AtomicBool, Ordering};

    #[test]
    fn test_current_task_is_none_outside_tasks() {
        assert_eq!(current_task(), None);
    }

    #[test]
    fn test_yield_latches_switch_request() {
        arch::take_pending_switch();
        yield_now();
        assert!(arch::take_pending_switch());
    }

    #[test]
    fn test_sleep_if_reports_blocking_decision() {
        assert!(!sleep_if(|| false));
        assert!(sleep_if(|| true));
    }

    #[test]
    fn test_delay_waits_for_elapsed_ticks() {
        static DONE: AtomicBool = AtomicBool::new(false);

        let ticker = std::thread::spawn(|| {
            while !DONE.load(Ordering::Acquire) {
                tick::tick();
                std::thread::yield_now();
            }
        });

        delay(5);

        DONE.store(true, Ordering::Release);
        ticker.join().unwrap();
    }
}
