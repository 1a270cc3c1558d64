//! # Message Queue
//!
//! Blocking producer/consumer channel between tasks: a ring of pending
//! messages, a ring of blocked waiters, and one mutex protecting both.
//!
//! A `put` into a full queue drops the message — there is no
//! backpressure signal. A wake is only a scheduling hint: the woken
//! receiver re-checks the messages ring itself, and `receive` loops
//! (re-sleeping as needed) until it has actually popped a message, so a
//! raced or spurious wake can never surface stale output.

use core::cell::UnsafeCell;

use crate::config::QUEUE_DEPTH;
use crate::kernel;
use crate::mutex::Mutex;
use crate::ringbuf::RingBuf;

/// A queued payload, stamped with the index of the task that sent it
/// (`None` when sent from outside any task, e.g. during startup).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Message {
    pub value: u32,
    pub sender: Option<usize>,
}

struct Inner {
    messages: RingBuf<Message, QUEUE_DEPTH>,
    /// Indices of tasks blocked waiting for data. Entries are removed
    /// exactly once, at wake time.
    waiters: RingBuf<usize, QUEUE_DEPTH>,
}

pub struct Queue {
    inner: UnsafeCell<Inner>,
    lock: Mutex,
}

// SAFETY: the rings behind the UnsafeCell are accessed while holding the
// queue mutex, or — in the sleep-registration path — inside a critical
// section on the single-core target, where a task holding the mutex is
// suspended and cannot be mid-update.
unsafe impl Send for Queue {}
unsafe impl Sync for Queue {}

impl Queue {
    pub const fn new() -> Self {
        Self {
            inner: UnsafeCell::new(Inner {
                messages: RingBuf::new(),
                waiters: RingBuf::new(),
            }),
            lock: Mutex::new(),
        }
    }

    /// Send `value`, stamped with the calling task's index. A full
    /// messages ring drops the message silently; otherwise one blocked
    /// waiter (if any) is woken to come and claim it.
    pub fn put(&self, value: u32) {
        self.put_from(value, kernel::current_task());
    }

    fn put_from(&self, value: u32, sender: Option<usize>) {
        let msg = Message { value, sender };

        self.lock.lock();
        // SAFETY: holding the queue mutex.
        let stored = unsafe { (*self.inner.get()).messages.push(msg) };
        self.lock.unlock();

        if !stored {
            // ring full: dropped, no signal to the caller
            return;
        }

        self.lock.lock();
        // SAFETY: holding the queue mutex.
        let waiter = unsafe { (*self.inner.get()).waiters.pop() };
        self.lock.unlock();

        // hint only — the woken task re-checks for data itself
        if let Some(id) = waiter {
            kernel::wake(id);
        }
    }

    /// Receive the oldest pending message, blocking the calling task
    /// until one is available. Only ever returns a message that was
    /// actually popped; after every wake the ring is re-checked and the
    /// task re-sleeps if it lost the race for the data.
    pub fn receive(&self) -> Message {
        loop {
            self.lock.lock();
            // SAFETY: holding the queue mutex.
            let msg = unsafe { (*self.inner.get()).messages.pop() };
            self.lock.unlock();

            if let Some(msg) = msg {
                return msg;
            }

            match kernel::current_task() {
                Some(id) => {
                    // register as a waiter and sleep in one critical
                    // section, so a put landing in between cannot slip
                    // its wake past us
                    kernel::sleep_if(|| {
                        // SAFETY: inside the critical section; on the
                        // single-core target a mutex holder is suspended
                        // at a yield point, never mid-update.
                        let inner = unsafe { &mut *self.inner.get() };
                        if inner.messages.is_empty() {
                            // sleep only if the registration fit — an
                            // unregistered sleeper could never be woken
                            inner.waiters.push(id)
                        } else {
                            false
                        }
                    });
                }
                // outside task context there is nothing to wake: poll
                None => kernel::yield_now(),
            }
        }
    }

    /// Number of pending messages.
    pub fn len(&self) -> usize {
        self.lock.lock();
        // SAFETY: holding the queue mutex.
        let len = unsafe { (*self.inner.get()).messages.len() };
        self.lock.unlock();
        len
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for Queue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_then_receive_returns_message() {
        let queue = Queue::new();
        queue.put(17);
        let msg = queue.receive();
        assert_eq!(msg.value, 17);
        // sent from outside any task
        assert_eq!(msg.sender, None);
    }

    #[test]
    fn test_sender_is_stamped_at_send_time() {
        let queue = Queue::new();
        queue.put_from(5, Some(3));
        let msg = queue.receive();
        assert_eq!(msg, Message { value: 5, sender: Some(3) });
    }

    #[test]
    fn test_fifo_across_senders() {
        let queue = Queue::new();
        queue.put_from(1, Some(0));
        queue.put_from(2, Some(1));
        queue.put_from(3, Some(0));
        assert_eq!(queue.receive().value, 1);
        assert_eq!(queue.receive().value, 2);
        assert_eq!(queue.receive().value, 3);
    }

    #[test]
    fn test_put_on_full_queue_drops_message() {
        let queue = Queue::new();
        for i in 0..QUEUE_DEPTH as u32 {
            queue.put(i);
        }
        assert_eq!(queue.len(), QUEUE_DEPTH);

        queue.put(99);
        assert_eq!(queue.len(), QUEUE_DEPTH);

        // the dropped message never surfaces
        for i in 0..QUEUE_DEPTH as u32 {
            assert_eq!(queue.receive().value, i);
        }
        assert!(queue.is_empty());
    }

    #[test]
    fn test_receive_blocks_until_put() {
        static QUEUE: Queue = Queue::new();

        // the receiver polls cooperatively until the main thread puts
        let receiver = std::thread::spawn(|| QUEUE.receive());

        QUEUE.put(123);
        let msg = receiver.join().unwrap();
        assert_eq!(msg.value, 123);
        assert!(QUEUE.is_empty());
    }
}
