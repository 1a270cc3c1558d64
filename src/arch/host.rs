//! # Host Stand-ins
//!
//! Replacements for the Cortex-M4 port on non-ARM builds, so the
//! scheduler and synchronization primitives can be unit-tested on the
//! build machine. No context switch ever happens here: a switch request
//! latches a flag that tests can observe, and the startup plumbing is
//! inert.

use core::sync::atomic::{AtomicBool, Ordering};

/// Latched "switch pending" signal. Cleared at startup; set by
/// [`pend_context_switch`]; consumed by [`take_pending_switch`].
static SWITCH_PENDING: AtomicBool = AtomicBool::new(false);

/// Latch a switch request. The host has no PendSV, so the request is
/// only recorded for inspection.
#[inline]
pub fn pend_context_switch() {
    SWITCH_PENDING.store(true, Ordering::Release);
}

/// Consume and return the latched switch request.
pub fn take_pending_switch() -> bool {
    SWITCH_PENDING.swap(false, Ordering::AcqRel)
}

pub fn prepare_boot_stack() {}

pub fn configure_systick(_syst: &mut cortex_m::peripheral::SYST) {}

pub fn set_interrupt_priorities() {}

#[inline]
pub fn park() {
    core::hint::spin_loop();
}
