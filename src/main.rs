//! # Comet Demo Firmware
//!
//! Wires the kernel's external collaborators together and runs three
//! cooperating tasks:
//!
//! | Task | Behavior |
//! |------|----------|
//! | `sampler_task`  | Samples a counter every 100 ticks, puts it on the queue |
//! | `consumer_task` | Blocks on the queue, folds samples into shared stats |
//! | `reporter_task` | Wakes once a second, snapshots the stats |
//!
//! A fourth, one-shot task runs once at startup and returns, freeing its
//! slot for reuse.
//!
//! The SysTick handler is the timer collaborator: it advances the tick
//! source at `TICK_HZ`. `main` is the startup collaborator: it registers
//! the tasks and performs the one-way handoff into the task model via
//! `kernel::start()`.

#![cfg_attr(target_arch = "arm", no_std)]
#![cfg_attr(target_arch = "arm", no_main)]
#![cfg_attr(not(target_arch = "arm"), allow(dead_code))]

#[cfg(target_arch = "arm")]
use cortex_m_rt::entry;
#[cfg(target_arch = "arm")]
use panic_halt as _;

use comet::kernel;
use comet::mutex::Mutex;
use comet::queue::Queue;
use comet::tick;

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

static SAMPLES: Queue = Queue::new();

struct Stats {
    received: u32,
    sum: u32,
}

static STATS_LOCK: Mutex = Mutex::new();
static mut STATS: Stats = Stats { received: 0, sum: 0 };

// ---------------------------------------------------------------------------
// Timer collaborator
// ---------------------------------------------------------------------------

/// Advances the tick source at `TICK_HZ`. Nothing else in the system
/// increments the counter.
#[no_mangle]
extern "C" fn SysTick() {
    tick::tick();
}

// ---------------------------------------------------------------------------
// Tasks
// ---------------------------------------------------------------------------

/// Runs once and returns: the handler return path destroys the task and
/// its slot becomes reusable by a later create.
extern "C" fn warmup_task() {
    SAMPLES.put(0);
}

/// Produces one sample every 100 ticks.
extern "C" fn sampler_task() {
    let mut reading: u32 = 0;
    loop {
        // stand-in for a real sensor read
        reading = reading.wrapping_add(7);
        SAMPLES.put(reading);
        kernel::delay(100);
    }
}

/// Blocks on the queue and folds each sample into the shared stats.
extern "C" fn consumer_task() {
    loop {
        let msg = SAMPLES.receive();

        STATS_LOCK.lock();
        // SAFETY: STATS is only touched while STATS_LOCK is held.
        unsafe {
            let stats = &mut *core::ptr::addr_of_mut!(STATS);
            stats.received += 1;
            stats.sum = stats.sum.wrapping_add(msg.value);
        }
        STATS_LOCK.unlock();
    }
}

/// Snapshots the stats once a second.
extern "C" fn reporter_task() {
    loop {
        kernel::delay(1000);

        STATS_LOCK.lock();
        // SAFETY: STATS is only touched while STATS_LOCK is held.
        let (received, sum) = unsafe {
            let stats = &*core::ptr::addr_of!(STATS);
            (stats.received, stats.sum)
        };
        STATS_LOCK.unlock();

        // a real application would log or display these
        let _ = (received, sum);
    }
}

// ---------------------------------------------------------------------------
// Startup collaborator
// ---------------------------------------------------------------------------

#[cfg(target_arch = "arm")]
#[entry]
fn main() -> ! {
    let cp = cortex_m::Peripherals::take().unwrap();

    kernel::init();

    kernel::create_task(warmup_task);
    kernel::create_task(sampler_task);
    kernel::create_task(consumer_task);
    kernel::create_task(reporter_task);

    // one-way transition from the boot stack into the task model
    kernel::start(cp)
}

/// The firmware only runs on the target; host builds get a stub entry
/// point so every workspace target compiles everywhere.
#[cfg(not(target_arch = "arm"))]
fn main() {}
