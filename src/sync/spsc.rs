//! Wait-free single-producer/single-consumer ring queue.
//!
//! The only shared state is a pair of cache-line-separated monotonic
//! counters: `head` is written by the producer, `tail` by the consumer.
//! A release store on `head` publishes the written slot; the consumer
//! acquires `head` before reading. Capacity is a power of two so the
//! indices wrap with a mask. The queue never blocks: `push` fails on full
//! and `pop` returns `None` on empty.

use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crossbeam::utils::CachePadded;

struct Inner<T> {
    buffer: Box<[UnsafeCell<MaybeUninit<T>>]>,
    mask: usize,
    /// Producer-owned write counter.
    head: CachePadded<AtomicUsize>,
    /// Consumer-owned read counter.
    tail: CachePadded<AtomicUsize>,
}

unsafe impl<T: Send> Send for Inner<T> {}
unsafe impl<T: Send> Sync for Inner<T> {}

impl<T> Drop for Inner<T> {
    fn drop(&mut self) {
        let head = self.head.load(Ordering::Relaxed);
        let mut tail = self.tail.load(Ordering::Relaxed);
        while tail != head {
            let slot = self.buffer[tail & self.mask].get();
            unsafe { (*slot).assume_init_drop() };
            tail = tail.wrapping_add(1);
        }
    }
}

/// Producer half of an SPSC queue. Not clonable; exactly one exists per
/// queue.
pub struct SpscProducer<T> {
    inner: Arc<Inner<T>>,
}

/// Consumer half of an SPSC queue.
pub struct SpscConsumer<T> {
    inner: Arc<Inner<T>>,
}

/// Create a queue with the given capacity (a power of two, at least 2).
///
/// # Panics
/// Panics if `capacity` is not a power of two or is below 2.
pub fn spsc_channel<T: Send>(capacity: usize) -> (SpscProducer<T>, SpscConsumer<T>) {
    assert!(
        capacity >= 2 && capacity.is_power_of_two(),
        "spsc capacity must be a power of two >= 2, got {capacity}"
    );
    let buffer = (0..capacity)
        .map(|_| UnsafeCell::new(MaybeUninit::uninit()))
        .collect::<Vec<_>>()
        .into_boxed_slice();
    let inner = Arc::new(Inner {
        buffer,
        mask: capacity - 1,
        head: CachePadded::new(AtomicUsize::new(0)),
        tail: CachePadded::new(AtomicUsize::new(0)),
    });
    (
        SpscProducer {
            inner: Arc::clone(&inner),
        },
        SpscConsumer { inner },
    )
}

impl<T: Send> SpscProducer<T> {
    /// Enqueue an item. Wait-free; on a full queue the item is handed
    /// back so the caller can retry, drop or escalate.
    #[inline]
    pub fn push(&mut self, item: T) -> Result<(), T> {
        let inner = &*self.inner;
        let head = inner.head.load(Ordering::Relaxed);
        let tail = inner.tail.load(Ordering::Acquire);
        if head.wrapping_sub(tail) == inner.buffer.len() {
            return Err(item);
        }
        unsafe { (*inner.buffer[head & inner.mask].get()).write(item) };
        inner.head.store(head.wrapping_add(1), Ordering::Release);
        Ok(())
    }

    /// May lag the consumer by one slot.
    pub fn is_full(&self) -> bool {
        let inner = &*self.inner;
        let head = inner.head.load(Ordering::Relaxed);
        let tail = inner.tail.load(Ordering::Acquire);
        head.wrapping_sub(tail) == inner.buffer.len()
    }

    pub fn capacity(&self) -> usize {
        self.inner.buffer.len()
    }
}

impl<T: Send> SpscConsumer<T> {
    /// Dequeue the oldest item, or `None` when the queue is empty.
    #[inline]
    pub fn pop(&mut self) -> Option<T> {
        let inner = &*self.inner;
        let tail = inner.tail.load(Ordering::Relaxed);
        let head = inner.head.load(Ordering::Acquire);
        if tail == head {
            return None;
        }
        let item = unsafe { (*inner.buffer[tail & inner.mask].get()).assume_init_read() };
        inner.tail.store(tail.wrapping_add(1), Ordering::Release);
        Some(item)
    }

    /// May lag the producer by one slot.
    pub fn is_empty(&self) -> bool {
        let inner = &*self.inner;
        inner.head.load(Ordering::Acquire) == inner.tail.load(Ordering::Relaxed)
    }

    pub fn len(&self) -> usize {
        let inner = &*self.inner;
        let head = inner.head.load(Ordering::Acquire);
        let tail = inner.tail.load(Ordering::Relaxed);
        head.wrapping_sub(tail)
    }
}
