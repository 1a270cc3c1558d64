//! # Comet Configuration
//!
//! Compile-time constants governing the kernel. All limits are fixed at
//! build time — no dynamic allocation anywhere in the crate.

/// Maximum number of task slots in the scheduler table.
/// Increase with care — each slot carries `STACK_SIZE` bytes of RAM
/// whether or not it is in use.
pub const MAX_TASKS: usize = 8;

/// Per-task stack size in bytes. Must cover the deepest call chain plus
/// the hardware exception frame (32 bytes) and the software-saved
/// context (32 bytes for r4–r11).
pub const STACK_SIZE: usize = 2048;

/// Capacity of a message queue: both the pending-message ring and the
/// blocked-waiter ring hold this many entries.
pub const QUEUE_DEPTH: usize = 10;

/// SysTick frequency in Hz. The timer collaborator is expected to call
/// `tick::tick()` at this rate.
pub const TICK_HZ: u32 = 1000;

/// System clock frequency in Hz (STM32F4 on the 16 MHz HSI).
pub const SYSTEM_CLOCK_HZ: u32 = 16_000_000;
