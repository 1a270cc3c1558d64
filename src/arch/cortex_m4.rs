//! # Cortex-M4 Port
//!
//! Hardware-specific half of the port layer: the PendSV switch handler,
//! the switch-request trigger, SysTick configuration, and interrupt
//! priority setup.
//!
//! ## Context switch mechanism
//!
//! Tasks run in Thread mode on the process stack (PSP); the kernel and
//! all handlers use the main stack (MSP). On PendSV entry the hardware
//! stacks r0–r3, r12, lr, pc and xPSR onto the PSP; the handler pushes
//! r4–r11, records the resulting PSP in the outgoing task's slot, asks
//! the scheduler for the next runnable slot, pops r4–r11 from that slot's
//! saved PSP and returns with EXC_RETURN `0xFFFF_FFFD`, which unstacks
//! the hardware frame and resumes the incoming task.
//!
//! PendSV and SysTick both run at the lowest priority so a switch never
//! preempts another handler, and the selector's idle parking can still be
//! interrupted by a tick or a wake from ISR context.

use core::arch::naked_asm;

use cortex_m::peripheral::syst::SystClkSource;

use crate::config::{SYSTEM_CLOCK_HZ, TICK_HZ};

// ---------------------------------------------------------------------------
// Switch request
// ---------------------------------------------------------------------------

/// Interrupt Control and State Register.
const ICSR: *mut u32 = 0xE000_ED04 as *mut u32;

/// Request a context switch by pending PendSV, then spin a few cycles so
/// the request is latched before the caller can reach another suspension
/// point. The switch itself happens asynchronously once the exception is
/// taken.
#[inline]
pub fn pend_context_switch() {
    // PENDSVSET is bit 28
    // SAFETY: ICSR is a valid, always-present system control register.
    unsafe {
        core::ptr::write_volatile(ICSR, 1 << 28);
    }

    cortex_m::asm::nop();
    cortex_m::asm::nop();
    cortex_m::asm::nop();
    cortex_m::asm::nop();
}

// ---------------------------------------------------------------------------
// Startup plumbing
// ---------------------------------------------------------------------------

/// Scratch region the boot PSP points at so the very first PendSV has
/// owned memory to push the (discarded) software frame into.
#[repr(align(8))]
struct BootScratch([u8; 64]);

static mut BOOT_SCRATCH: BootScratch = BootScratch([0; 64]);

/// Point PSP at the scratch region before the first switch. The first
/// PendSV pushes r4–r11 through PSP unconditionally; no task slot records
/// the result, so the bytes land here and are never read back.
pub fn prepare_boot_stack() {
    let top = unsafe { core::ptr::addr_of_mut!(BOOT_SCRATCH) as usize } + 64;
    // SAFETY: top is 8-aligned and inside a static region we own.
    unsafe {
        cortex_m::register::psp::write(top as u32);
    }
}

/// Configure SysTick to fire at [`TICK_HZ`] from the core clock.
pub fn configure_systick(syst: &mut cortex_m::peripheral::SYST) {
    let reload = SYSTEM_CLOCK_HZ / TICK_HZ - 1;
    syst.set_reload(reload);
    syst.clear_current();
    syst.set_clock_source(SystClkSource::Core);
    syst.enable_counter();
    syst.enable_interrupt();
}

/// Set PendSV and SysTick to the lowest interrupt priority.
pub fn set_interrupt_priorities() {
    // System Handler Priority Register 3: PendSV bits [23:16],
    // SysTick bits [31:24]
    const SHPR3: *mut u32 = 0xE000_ED20 as *mut u32;
    // SAFETY: SHPR3 is a valid system control register; read-modify-write
    // of the two priority bytes only.
    unsafe {
        let val = core::ptr::read_volatile(SHPR3);
        core::ptr::write_volatile(SHPR3, val | (0xFF << 16) | (0xFF << 24));
    }
}

/// Wait for the next interrupt. Used by the startup loop after the first
/// switch has been pended; execution never comes back here once a task
/// is running.
#[inline]
pub fn park() {
    cortex_m::asm::wfi();
}

// ---------------------------------------------------------------------------
// PendSV handler
// ---------------------------------------------------------------------------

/// The context-switch exception handler.
///
/// Naked so the compiler cannot touch r4–r11 or the stack between the
/// save and restore halves. The two `bl` targets are ordinary Rust
/// functions operating on the global scheduler.
#[unsafe(no_mangle)]
#[unsafe(naked)]
pub unsafe extern "C" fn PendSV() {
    naked_asm!(
        // --- save current context ---
        "mrs r0, psp",
        "stmdb r0!, {{r4-r11}}",
        // record the pushed frame's address, if a task is current
        "bl {save}",
        // --- select next task; returns its saved psp in r0 ---
        "bl {next}",
        // --- restore next context ---
        "ldmia r0!, {{r4-r11}}",
        "msr psp, r0",
        // return to thread mode on the process stack
        "ldr r0, =0xFFFFFFFD",
        "bx r0",
        save = sym save_context,
        next = sym next_context,
    );
}

/// Record the outgoing task's stack pointer. Skipped (nothing recorded)
/// on the very first switch, when no task has run yet and `psp` points
/// at the boot scratch region.
///
/// # Safety
/// Called from the PendSV handler only.
unsafe extern "C" fn save_context(psp: *mut u32) {
    let scheduler = &mut *crate::kernel::SCHEDULER_PTR;
    scheduler.save_context(psp);
}

/// Pick the next runnable slot and hand back its saved stack pointer.
///
/// When no slot is runnable the CPU parks on `wfe` and retries after each
/// interrupt — only an interrupt (tick, wake from ISR) can make a task
/// runnable again. PendSV runs at the lowest priority, so those handlers
/// preempt this loop freely.
///
/// # Safety
/// Called from the PendSV handler only.
unsafe extern "C" fn next_context() -> *mut u32 {
    let scheduler = &mut *crate::kernel::SCHEDULER_PTR;
    loop {
        if let Some(next) = scheduler.select_next() {
            return scheduler.resume_sp(next);
        }
        cortex_m::asm::wfe();
    }
}
