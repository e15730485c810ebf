use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicUsize, Ordering};

/// Fixed capacity byte queue shared between exactly one producer and one consumer.
///
/// The read and write positions are each only ever stored by their own side. The
/// number of queued bytes is a separate counter that both sides update with a single
/// atomic read-modify-write, which is what tells a full buffer apart from an empty one.
///
/// A push into a full buffer is rejected and the byte is dropped.
pub struct RingBuffer<const N: usize> {
    storage: UnsafeCell<[u8; N]>,
    read: AtomicUsize,
    write: AtomicUsize,
    count: AtomicUsize,
    dropped: AtomicUsize,
}

// Access to `storage` is partitioned by `count`: the producer only touches the slot at
// `write` while it is free, the consumer only the slot at `read` while it is filled.
unsafe impl<const N: usize> Sync for RingBuffer<N> {}

impl<const N: usize> Default for RingBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> RingBuffer<N> {
    pub const fn new() -> Self {
        assert!(N > 0, "RingBuffer needs room for at least one byte");
        Self {
            storage: UnsafeCell::new([0; N]),
            read: AtomicUsize::new(0),
            write: AtomicUsize::new(0),
            count: AtomicUsize::new(0),
            dropped: AtomicUsize::new(0),
        }
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    pub fn len(&self) -> usize {
        self.count.load(Ordering::Acquire)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_full(&self) -> bool {
        self.len() == N
    }

    /// Number of bytes rejected because the buffer was full
    pub fn dropped(&self) -> usize {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn push(&mut self, byte: u8) -> bool {
        self.enqueue(byte)
    }

    pub fn pop(&mut self) -> Option<u8> {
        self.dequeue()
    }

    /// Hand out the two sides of the buffer.
    ///
    /// The mutable borrow guarantees there is only ever one of each.
    pub fn split(&mut self) -> (Producer<'_, N>, Consumer<'_, N>) {
        (Producer { ring: self }, Consumer { ring: self })
    }

    fn enqueue(&self, byte: u8) -> bool {
        if self.count.load(Ordering::Acquire) == N {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            return false;
        }

        let write = self.write.load(Ordering::Relaxed);
        unsafe { (self.storage.get() as *mut u8).add(write).write(byte) };
        self.write.store((write + 1) % N, Ordering::Relaxed);

        // Publishes the byte to the consumer
        self.count.fetch_add(1, Ordering::Release);
        true
    }

    fn dequeue(&self) -> Option<u8> {
        if self.count.load(Ordering::Acquire) == 0 {
            return None;
        }

        let read = self.read.load(Ordering::Relaxed);
        let byte = unsafe { (self.storage.get() as *const u8).add(read).read() };
        self.read.store((read + 1) % N, Ordering::Relaxed);

        // Hands the slot back to the producer
        self.count.fetch_sub(1, Ordering::Release);
        Some(byte)
    }
}

/// Pushing side of a [`RingBuffer`]
pub struct Producer<'a, const N: usize> {
    ring: &'a RingBuffer<N>,
}

impl<'a, const N: usize> Producer<'a, N> {
    /// Queue a byte, returns `false` when it was dropped because the buffer is full
    pub fn push(&mut self, byte: u8) -> bool {
        self.ring.enqueue(byte)
    }

    pub fn len(&self) -> usize {
        self.ring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    pub fn capacity(&self) -> usize {
        N
    }

    pub fn dropped(&self) -> usize {
        self.ring.dropped()
    }
}

/// Popping side of a [`RingBuffer`]
pub struct Consumer<'a, const N: usize> {
    ring: &'a RingBuffer<N>,
}

impl<'a, const N: usize> Consumer<'a, N> {
    pub fn pop(&mut self) -> Option<u8> {
        self.ring.dequeue()
    }

    pub fn len(&self) -> usize {
        self.ring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    pub fn capacity(&self) -> usize {
        N
    }
}
