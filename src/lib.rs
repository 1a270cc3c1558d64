//! # Comet — a cooperative multitasking kernel for ARM Cortex-M
//!
//! Comet runs a fixed table of cooperative tasks on a single-core
//! Cortex-M4. Tasks own statically allocated stacks, switch via PendSV,
//! and hand the CPU around explicitly: a task runs until it yields,
//! delays, sleeps, or blocks on a synchronization primitive. There is no
//! timer-driven preemption — a task that never reaches a suspension
//! point starves everything else.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                   Application Tasks                      │
//! ├─────────────────────────────────────────────────────────┤
//! │                Kernel API (kernel.rs)                    │
//! │   init() · create_task() · start() · yield_now()        │
//! │   delay() · sleep() · wake()                             │
//! ├───────────────┬──────────────────┬──────────────────────┤
//! │  Scheduler    │  Primitives      │  Tick Source         │
//! │  scheduler.rs │  mutex.rs        │  tick.rs             │
//! │  ─ task table │  queue.rs        │  ─ tick()            │
//! │  ─ round robin│  ringbuf.rs      │  ─ since()           │
//! │  ─ sleep/wake │  sync.rs         │                      │
//! ├───────────────┴──────────────────┴──────────────────────┤
//! │              Port Layer (arch/cortex_m4.rs)              │
//! │    PendSV · stack frames · switch request · SysTick     │
//! ├─────────────────────────────────────────────────────────┤
//! │            ARM Cortex-M4 Hardware (Thumb-2)              │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Memory model
//!
//! - **No heap, no `alloc`**: every structure is statically sized
//! - **Fixed task table**: `[Task; MAX_TASKS]`, one inline stack each
//! - **Critical sections**: PRIMASK masking around all shared state
//!
//! ## Collaborators
//!
//! The kernel advances nothing by itself. The application provides a
//! SysTick handler calling [`tick::tick()`] at a fixed rate, registers
//! its tasks, and hands control to [`kernel::start()`], which performs
//! the one-way transition from the boot stack into the task model. On
//! non-ARM builds the port layer is replaced by host stand-ins so the
//! scheduling and synchronization logic unit-tests on the build machine.

#![no_std]

#[cfg(test)]
extern crate std;

pub mod arch;
pub mod config;
pub mod kernel;
pub mod mutex;
pub mod queue;
pub mod ringbuf;
pub mod scheduler;
pub mod sync;
pub mod task;
pub mod tick;
