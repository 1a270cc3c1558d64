//! # Scheduler
//!
//! The task table and the select half of the context-switch protocol.
//! Selection is strict round-robin: advance from the slot after the
//! current one, wrap past the end of the table, and take the first slot
//! that is in use and not sleeping.
//!
//! The struct holds no hardware state and is fully exercisable on the
//! host; the port layer drives it from the switch handler through
//! [`save_context`]/[`select_next`]/[`resume_sp`].
//!
//! [`save_context`]: Scheduler::save_context
//! [`select_next`]: Scheduler::select_next
//! [`resume_sp`]: Scheduler::resume_sp

use crate::arch;
use crate::config::MAX_TASKS;
use crate::task::{Task, FLAG_IN_USE, FLAG_SLEEPING};

/// The task table plus the current-task cursor. Stored as a global in
/// `kernel.rs`; all access goes through critical sections or the switch
/// handler.
pub struct Scheduler {
    /// Fixed-size slot table. Index is the task id.
    pub tasks: [Task; MAX_TASKS],

    /// Index of the running task; `None` until the first switch.
    current: Option<usize>,
}

impl Scheduler {
    pub const fn new() -> Self {
        Self {
            tasks: [Task::EMPTY; MAX_TASKS],
            current: None,
        }
    }

    /// Allocate the first free slot to a new task.
    ///
    /// The slot's stack is zero-filled and a synthetic starting frame is
    /// built at its top: `entry` as the resume address, `on_return` as
    /// the address the handler returns into. Returns `None` without any
    /// side effect when every slot is in use.
    pub fn create_task(
        &mut self,
        entry: extern "C" fn(),
        on_return: extern "C" fn() -> !,
    ) -> Option<usize> {
        let id = (0..MAX_TASKS).find(|&i| !self.tasks[i].is_in_use())?;

        let task = &mut self.tasks[id];
        task.stack.0.fill(0);
        task.stack_pointer = arch::init_stack(&mut task.stack.0, entry, on_return);
        task.flags = FLAG_IN_USE;

        Some(id)
    }

    /// Index of the running task; `None` before the first switch.
    #[inline]
    pub fn current_task(&self) -> Option<usize> {
        self.current
    }

    /// Record the outgoing task's saved stack pointer. A no-op when no
    /// task has run yet — there is no prior context to save.
    pub fn save_context(&mut self, psp: *mut u32) {
        if let Some(current) = self.current {
            self.tasks[current].stack_pointer = psp;
        }
    }

    /// Advance the current-task cursor round-robin to the next runnable
    /// slot and return its index.
    ///
    /// Scans at most one full lap of the table; when nothing is runnable
    /// the cursor is left untouched and `None` comes back, and the switch
    /// engine retries after the next interrupt.
    pub fn select_next(&mut self) -> Option<usize> {
        let start = match self.current {
            Some(current) => current + 1,
            None => 0,
        };

        for offset in 0..MAX_TASKS {
            let id = (start + offset) % MAX_TASKS;
            if self.tasks[id].is_runnable() {
                self.current = Some(id);
                return Some(id);
            }
        }

        None
    }

    /// Saved stack pointer of the given slot, for the restore half of
    /// the switch.
    #[inline]
    pub fn resume_sp(&self, id: usize) -> *mut u32 {
        self.tasks[id].stack_pointer
    }

    /// Mark the running task as sleeping; the selector skips it until a
    /// wake. No-op outside task context.
    pub fn mark_current_sleeping(&mut self) {
        if let Some(current) = self.current {
            self.tasks[current].flags |= FLAG_SLEEPING;
        }
    }

    /// Clear the sleeping flag on the given slot. Callable on behalf of
    /// any task, including from interrupt handlers. An out-of-range id
    /// is ignored.
    pub fn wake(&mut self, id: usize) {
        if let Some(task) = self.tasks.get_mut(id) {
            task.flags &= !FLAG_SLEEPING;
        }
    }

    /// Free the running task's slot. The stack memory stays in place
    /// until a later create reuses the slot, but the selector will never
    /// pick it again.
    pub fn terminate_current(&mut self) {
        if let Some(current) = self.current {
            self.tasks[current].flags = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    extern "C" fn task_stub() {}

    extern "C" fn exit_stub() -> ! {
        loop {
            core::hint::spin_loop();
        }
    }

    fn create(sched: &mut Scheduler) -> Option<usize> {
        sched.create_task(task_stub, exit_stub)
    }

    #[test]
    fn test_current_is_none_before_first_switch() {
        let sched = Scheduler::new();
        assert_eq!(sched.current_task(), None);
    }

    #[test]
    fn test_create_fills_slots_in_order() {
        let mut sched = Scheduler::new();
        assert_eq!(create(&mut sched), Some(0));
        assert_eq!(create(&mut sched), Some(1));
        assert_eq!(create(&mut sched), Some(2));
        assert!(sched.tasks[2].is_in_use());
        assert!(!sched.tasks[2].stack_pointer.is_null());
    }

    #[test]
    fn test_create_fails_when_table_full() {
        let mut sched = Scheduler::new();
        for i in 0..MAX_TASKS {
            assert_eq!(create(&mut sched), Some(i));
        }
        assert_eq!(create(&mut sched), None);
        // table unchanged: every slot still in use
        for task in &sched.tasks {
            assert!(task.is_in_use());
        }
    }

    #[test]
    fn test_single_runnable_task_is_reselected() {
        let mut sched = Scheduler::new();
        create(&mut sched);
        for _ in 0..5 {
            assert_eq!(sched.select_next(), Some(0));
        }
    }

    #[test]
    fn test_round_robin_order() {
        let mut sched = Scheduler::new();
        for _ in 0..3 {
            create(&mut sched);
        }
        assert_eq!(sched.select_next(), Some(0));
        assert_eq!(sched.select_next(), Some(1));
        assert_eq!(sched.select_next(), Some(2));
        assert_eq!(sched.select_next(), Some(0));
    }

    #[test]
    fn test_sleeping_task_is_skipped_until_woken() {
        let mut sched = Scheduler::new();
        for _ in 0..3 {
            create(&mut sched);
        }
        sched.tasks[0].flags |= FLAG_SLEEPING;

        for _ in 0..4 {
            let next = sched.select_next().unwrap();
            assert_ne!(next, 0);
        }

        sched.wake(0);
        // current is 1 or 2 here; one full rotation reaches slot 0 again
        let mut seen_zero = false;
        for _ in 0..3 {
            if sched.select_next() == Some(0) {
                seen_zero = true;
            }
        }
        assert!(seen_zero);
    }

    #[test]
    fn test_select_returns_none_with_no_runnable_task() {
        let mut sched = Scheduler::new();
        assert_eq!(sched.select_next(), None);

        create(&mut sched);
        sched.tasks[0].flags |= FLAG_SLEEPING;
        assert_eq!(sched.select_next(), None);
        // cursor untouched by the failed scan
        assert_eq!(sched.current_task(), None);
    }

    #[test]
    fn test_terminated_slot_is_reused() {
        let mut sched = Scheduler::new();
        create(&mut sched);
        create(&mut sched);

        assert_eq!(sched.select_next(), Some(0));
        sched.terminate_current();
        assert!(!sched.tasks[0].is_in_use());

        // next create scans from the front and lands on the freed slot
        assert_eq!(create(&mut sched), Some(0));
    }

    #[test]
    fn test_save_context_records_into_current_slot() {
        let mut sched = Scheduler::new();
        create(&mut sched);

        // before the first switch there is nothing to save into
        let marker = 0x1000 as *mut u32;
        sched.save_context(marker);
        assert_ne!(sched.tasks[0].stack_pointer, marker);

        sched.select_next();
        sched.save_context(marker);
        assert_eq!(sched.tasks[0].stack_pointer, marker);
        assert_eq!(sched.resume_sp(0), marker);
    }

    #[test]
    fn test_mark_current_sleeping() {
        let mut sched = Scheduler::new();
        create(&mut sched);

        // no current task yet: marking is a no-op
        sched.mark_current_sleeping();
        assert!(!sched.tasks[0].is_sleeping());

        sched.select_next();
        sched.mark_current_sleeping();
        assert!(sched.tasks[0].is_sleeping());
    }
}
