//! # Task Slots
//!
//! Defines the per-task state the scheduler keeps. Each slot pairs a
//! saved stack pointer with a flag bitmask and carries the task's private
//! stack inline — the whole table is statically allocated, no heap.
//!
//! ## Lifecycle
//!
//! ```text
//!   free ──create_task()──► in use ──sleep()──► sleeping
//!    ▲                         │  ◄──wake()────────┘
//!    └──handler returns────────┘
//! ```
//!
//! A slot whose `IN_USE` flag is clear is eligible for reuse by the next
//! create; a slot with `SLEEPING` set is never selected by the scheduler.
//! Flags are cleared only when the task's handler returns and the task
//! self-terminates — nothing destroys a task from the outside.

use crate::config::STACK_SIZE;

// ---------------------------------------------------------------------------
// Flag bits
// ---------------------------------------------------------------------------

/// Slot is allocated to a live task.
pub const FLAG_IN_USE: u8 = 1 << 0;

/// Task is blocked waiting for a wake; the selector skips it.
pub const FLAG_SLEEPING: u8 = 1 << 1;

// ---------------------------------------------------------------------------
// Task slot
// ---------------------------------------------------------------------------

/// Task stack storage. Aligned to 8 bytes as required by AAPCS.
#[repr(C, align(8))]
pub struct TaskStack(pub [u8; STACK_SIZE]);

/// One entry in the scheduler's fixed-size task table.
///
/// `stack_pointer` points at the top of the saved register context inside
/// `stack` and is meaningful only while the task is not running — the
/// context-switch engine records it on save and consumes it on restore.
pub struct Task {
    /// Saved process stack pointer. Points into `self.stack`.
    pub stack_pointer: *mut u32,

    /// Bitmask over [`FLAG_IN_USE`] and [`FLAG_SLEEPING`].
    pub flags: u8,

    /// Per-task stack memory.
    pub stack: TaskStack,
}

// SAFETY: the raw stack_pointer always points into the slot's own stack
// array, and slots are only touched inside critical sections or from the
// switch handler where interrupts serialize access.
unsafe impl Send for Task {}
unsafe impl Sync for Task {}

impl Task {
    /// A free slot. Used to initialize the static table.
    pub const EMPTY: Self = Self {
        stack_pointer: core::ptr::null_mut(),
        flags: 0,
        stack: TaskStack([0u8; STACK_SIZE]),
    };

    #[inline]
    pub fn is_in_use(&self) -> bool {
        self.flags & FLAG_IN_USE != 0
    }

    #[inline]
    pub fn is_sleeping(&self) -> bool {
        self.flags & FLAG_SLEEPING != 0
    }

    /// In use and not sleeping — eligible for selection.
    #[inline]
    pub fn is_runnable(&self) -> bool {
        self.is_in_use() && !self.is_sleeping()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_slot_is_free() {
        let task = Task::EMPTY;
        assert!(!task.is_in_use());
        assert!(!task.is_sleeping());
        assert!(!task.is_runnable());
        assert!(task.stack_pointer.is_null());
    }

    #[test]
    fn test_flag_combinations() {
        let mut task = Task::EMPTY;

        task.flags = FLAG_IN_USE;
        assert!(task.is_runnable());

        task.flags |= FLAG_SLEEPING;
        assert!(task.is_in_use());
        assert!(task.is_sleeping());
        assert!(!task.is_runnable());

        task.flags &= !FLAG_SLEEPING;
        assert!(task.is_runnable());

        // sleeping without in-use is never runnable
        task.flags = FLAG_SLEEPING;
        assert!(!task.is_runnable());
    }
}
