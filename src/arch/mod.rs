//! # Port Layer
//!
//! Hardware abstraction boundary for the context-switch engine. The
//! stack-frame layout and frame construction are shared; everything that
//! touches CPU registers or the interrupt controller lives in the
//! Cortex-M4 port. Non-ARM builds get a host stand-in so the scheduler
//! and synchronization primitives can be unit-tested on the build machine.

use crate::config::STACK_SIZE;

#[cfg(target_arch = "arm")]
pub mod cortex_m4;

#[cfg(target_arch = "arm")]
pub use cortex_m4::*;

#[cfg(not(target_arch = "arm"))]
pub mod host;

#[cfg(not(target_arch = "arm"))]
pub use host::*;

// ---------------------------------------------------------------------------
// Stack frame layout
// ---------------------------------------------------------------------------

/// xPSR for a freshly created task: Thumb bit set, thread mode, no
/// pending exception state.
pub const INITIAL_PSR: u32 = 0x0100_0000;

/// Registers pushed explicitly by the switch handler.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct SwFrame {
    pub r4: u32,
    pub r5: u32,
    pub r6: u32,
    pub r7: u32,
    pub r8: u32,
    pub r9: u32,
    pub r10: u32,
    pub r11: u32,
}

/// Registers stacked automatically by the hardware on exception entry.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct HwFrame {
    pub r0: u32,
    pub r1: u32,
    pub r2: u32,
    pub r3: u32,
    pub r12: u32,
    /// Return address: where execution goes if the task's handler returns.
    pub lr: u32,
    /// Resume address: the handler entry point for a never-run task, the
    /// point of suspension otherwise.
    pub pc: u32,
    pub psr: u32,
}

/// Full saved context of a suspended task, as laid out at the top of its
/// stack. The shape is identical whether the task has run before or is
/// starting for the first time, so the restore path never distinguishes
/// the two cases.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct StackFrame {
    pub sw: SwFrame,
    pub hw: HwFrame,
}

const _: () = assert!(core::mem::size_of::<StackFrame>() == 64);

// ---------------------------------------------------------------------------
// Frame construction
// ---------------------------------------------------------------------------

/// Build the synthetic starting context at the top of `stack`.
///
/// The frame is shaped exactly as if the task had been suspended by a
/// context switch: `pc` carries the handler entry point, `lr` the
/// self-terminate routine invoked when the handler returns, and `psr`
/// the default thread-mode status word. Returns the address of the frame,
/// which becomes the slot's saved stack pointer.
pub fn init_stack(
    stack: &mut [u8; STACK_SIZE],
    entry: extern "C" fn(),
    on_return: extern "C" fn() -> !,
) -> *mut u32 {
    let top = stack.as_mut_ptr() as usize + STACK_SIZE;
    // align to 8 bytes (AAPCS requirement)
    let top = top & !0x07;

    let frame = (top - core::mem::size_of::<StackFrame>()) as *mut StackFrame;

    // SAFETY: STACK_SIZE is far larger than one frame, so the write is
    // entirely within the caller's stack array.
    unsafe {
        *frame = StackFrame {
            sw: SwFrame {
                r4: 0,
                r5: 0,
                r6: 0,
                r7: 0,
                r8: 0,
                r9: 0,
                r10: 0,
                r11: 0,
            },
            hw: HwFrame {
                r0: 0,
                r1: 0,
                r2: 0,
                r3: 0,
                r12: 0,
                lr: on_return as usize as u32,
                pc: entry as usize as u32,
                psr: INITIAL_PSR,
            },
        };
    }

    frame as *mut u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::mem::{offset_of, size_of};

    extern "C" fn entry_stub() {}

    extern "C" fn exit_stub() -> ! {
        loop {
            core::hint::spin_loop();
        }
    }

    #[test]
    fn test_frame_layout_offsets() {
        assert_eq!(size_of::<SwFrame>(), 32);
        assert_eq!(size_of::<HwFrame>(), 32);
        assert_eq!(offset_of!(StackFrame, hw), 32);
        assert_eq!(offset_of!(HwFrame, lr), 20);
        assert_eq!(offset_of!(HwFrame, pc), 24);
        assert_eq!(offset_of!(HwFrame, psr), 28);
    }

    #[test]
    fn test_init_stack_builds_starting_context() {
        let mut stack = [0u8; STACK_SIZE];
        let sp = init_stack(&mut stack, entry_stub, exit_stub);

        // frame sits at the very top of the stack region
        let top = (stack.as_ptr() as usize + STACK_SIZE) & !0x07;
        assert_eq!(sp as usize, top - size_of::<StackFrame>());

        let frame = unsafe { &*(sp as *const StackFrame) };
        assert_eq!(frame.hw.pc, entry_stub as usize as u32);
        assert_eq!(frame.hw.lr, exit_stub as usize as u32);
        assert_eq!(frame.hw.psr, INITIAL_PSR);
        assert_eq!(frame.sw.r4, 0);
        assert_eq!(frame.hw.r12, 0);
    }
}
