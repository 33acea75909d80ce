//! Single-producer single-consumer lock-free ring
//!
//! Every cross-thread channel in the plant is one of these. The ring exposes
//! a two-phase API on each side: the producer mutates the next slot in place
//! and then commits, the consumer inspects the head slot and then commits.
//! Publication happens through a single atomic element counter: the
//! producer's release increment pairs with the consumer's acquire load, so a
//! slot's contents are visible before the consumer can observe it.
//!
//! Overflow is deliberately unchecked in release builds; callers size the
//! ring to absorb their worst burst. There is exactly one producer thread and
//! one consumer thread per ring, enforced by the split handle types.

use crossbeam::utils::CachePadded;
use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

struct Shared<T> {
    slots: Box<[UnsafeCell<T>]>,
    len: CachePadded<AtomicUsize>,
}

// The halves hand out disjoint slot references: the producer only touches
// slots not yet published (len < capacity), the consumer only slots already
// published (len > 0).
unsafe impl<T: Send> Sync for Shared<T> {}

/// Create a bounded SPSC ring, returning the producer and consumer halves.
pub fn ring<T: Default>(capacity: usize) -> (Producer<T>, Consumer<T>) {
    assert!(capacity > 0, "ring capacity must be non-zero");

    let slots = (0..capacity)
        .map(|_| UnsafeCell::new(T::default()))
        .collect::<Vec<_>>()
        .into_boxed_slice();

    let shared = Arc::new(Shared {
        slots,
        len: CachePadded::new(AtomicUsize::new(0)),
    });

    (
        Producer {
            shared: Arc::clone(&shared),
            write_idx: 0,
        },
        Consumer {
            shared,
            read_idx: 0,
        },
    )
}

/// Write half of an SPSC ring. Owned by exactly one thread.
pub struct Producer<T> {
    shared: Arc<Shared<T>>,
    write_idx: usize,
}

unsafe impl<T: Send> Send for Producer<T> {}

impl<T> Producer<T> {
    /// Next slot to write into. The write is not visible to the consumer
    /// until [`Producer::commit_write`].
    #[inline(always)]
    pub fn next_to_write(&mut self) -> &mut T {
        debug_assert!(
            self.shared.len.load(Ordering::Relaxed) < self.shared.slots.len(),
            "spsc ring overrun"
        );
        unsafe { &mut *self.shared.slots[self.write_idx].get() }
    }

    /// Publish the slot written via [`Producer::next_to_write`].
    #[inline(always)]
    pub fn commit_write(&mut self) {
        self.write_idx = (self.write_idx + 1) % self.shared.slots.len();
        self.shared.len.fetch_add(1, Ordering::Release);
    }

    /// Single-call write-and-commit.
    #[inline(always)]
    pub fn push(&mut self, value: T) {
        *self.next_to_write() = value;
        self.commit_write();
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.shared.len.load(Ordering::Relaxed)
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline(always)]
    pub fn capacity(&self) -> usize {
        self.shared.slots.len()
    }
}

/// Read half of an SPSC ring. Owned by exactly one thread.
pub struct Consumer<T> {
    shared: Arc<Shared<T>>,
    read_idx: usize,
}

unsafe impl<T: Send> Send for Consumer<T> {}

impl<T> Consumer<T> {
    /// Peek the oldest published element, if any.
    #[inline(always)]
    pub fn next_to_read(&self) -> Option<&T> {
        if self.shared.len.load(Ordering::Acquire) == 0 {
            return None;
        }
        Some(unsafe { &*self.shared.slots[self.read_idx].get() })
    }

    /// Release the slot returned by the last [`Consumer::next_to_read`].
    #[inline(always)]
    pub fn commit_read(&mut self) {
        debug_assert!(
            self.shared.len.load(Ordering::Relaxed) != 0,
            "commit_read on empty ring"
        );
        self.read_idx = (self.read_idx + 1) % self.shared.slots.len();
        self.shared.len.fetch_sub(1, Ordering::Release);
    }

    /// Copy out the oldest element and release its slot.
    #[inline(always)]
    pub fn pop(&mut self) -> Option<T>
    where
        T: Copy,
    {
        let value = *self.next_to_read()?;
        self.commit_read();
        Some(value)
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.shared.len.load(Ordering::Acquire)
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn push_pop_in_order() {
        let (mut tx, mut rx) = ring::<u64>(8);
        for i in 0..5 {
            tx.push(i);
        }
        assert_eq!(rx.len(), 5);
        for i in 0..5 {
            assert_eq!(rx.pop(), Some(i));
        }
        assert_eq!(rx.pop(), None);
    }

    #[test]
    fn two_phase_write_is_invisible_until_commit() {
        let (mut tx, rx) = ring::<u64>(4);
        *tx.next_to_write() = 99;
        assert!(rx.next_to_read().is_none());
        tx.commit_write();
        assert_eq!(rx.next_to_read(), Some(&99));
    }

    #[test]
    fn wraps_around() {
        let (mut tx, mut rx) = ring::<u32>(4);
        for round in 0..10u32 {
            for i in 0..3 {
                tx.push(round * 10 + i);
            }
            for i in 0..3 {
                assert_eq!(rx.pop(), Some(round * 10 + i));
            }
        }
    }

    #[test]
    fn cross_thread_transfer_preserves_order() {
        const N: u64 = 100_000;
        let (mut tx, mut rx) = ring::<u64>(1024);

        let producer = thread::spawn(move || {
            for i in 0..N {
                // Wait for space so the unchecked-overflow contract holds.
                while tx.len() == tx.capacity() - 1 {
                    std::hint::spin_loop();
                }
                tx.push(i);
            }
        });

        let mut expected = 0;
        while expected < N {
            if let Some(v) = rx.pop() {
                assert_eq!(v, expected);
                expected += 1;
            } else {
                std::hint::spin_loop();
            }
        }

        producer.join().unwrap();
    }
}
