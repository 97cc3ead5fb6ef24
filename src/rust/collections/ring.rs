// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//======================================================================================================================
// Imports
//======================================================================================================================

use ::core::{
    cell::UnsafeCell,
    fmt,
    mem::MaybeUninit,
    sync::atomic::{
        AtomicBool,
        AtomicUsize,
        Ordering,
    },
};

//======================================================================================================================
// Structures
//======================================================================================================================

/// Result codes of ring buffer operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RingError {
    /// No free slot, or another producer is in the middle of a put.
    Full,
    /// No item, or another consumer is in the middle of a get.
    Empty,
    /// Capacity is not a power of two or is smaller than two.
    Size,
}

/// A lock-free, single writer and single reader, fixed-size circular buffer.
///
/// One slot is kept free to tell a full ring from an empty one, so a ring of size `n` holds `n - 1` items. Neither
/// side ever blocks: if a second producer (or consumer) races the first one, it backs off with [RingError::Full] (or
/// [RingError::Empty]) instead of waiting.
pub struct SpscRing<T> {
    // Indexes the first empty slot after the item in the back of the ring buffer.
    back: AtomicUsize,
    // Indexes the first item in the front of the ring buffer.
    front: AtomicUsize,
    // Claimed by the producer for the duration of a put.
    producer: AtomicBool,
    // Claimed by the consumer for the duration of a get.
    consumer: AtomicBool,
    // Underlying buffer.
    buffer: Box<[UnsafeCell<MaybeUninit<T>>]>,
    // Pre-computed capacity mask for the buffer.
    mask: usize,
}

//======================================================================================================================
// Associated Functions
//======================================================================================================================

impl<T: Copy> SpscRing<T> {
    /// Creates a ring buffer with `size` slots.
    pub fn new(size: usize) -> Result<Self, RingError> {
        // Check if capacity is invalid.
        if size < 2 || !size.is_power_of_two() {
            let cause: String = format!("invalid ring buffer size (size={:?})", size);
            error!("new(): {}", cause);
            return Err(RingError::Size);
        }

        let buffer: Box<[UnsafeCell<MaybeUninit<T>>]> =
            (0..size).map(|_| UnsafeCell::new(MaybeUninit::uninit())).collect();

        Ok(Self {
            back: AtomicUsize::new(0),
            front: AtomicUsize::new(0),
            producer: AtomicBool::new(false),
            consumer: AtomicBool::new(false),
            buffer,
            mask: size - 1,
        })
    }

    /// Returns the effective capacity of the target ring buffer.
    pub fn capacity(&self) -> usize {
        self.mask
    }

    /// Peeks the target ring buffer and checks if it is full.
    pub fn is_full(&self) -> bool {
        let front_cached: usize = self.front.load(Ordering::Acquire);
        let back_cached: usize = self.back.load(Ordering::Acquire);
        (back_cached + 1) & self.mask == front_cached
    }

    /// Peeks the target ring buffer and checks if it is empty.
    pub fn is_empty(&self) -> bool {
        let front_cached: usize = self.front.load(Ordering::Acquire);
        let back_cached: usize = self.back.load(Ordering::Acquire);
        back_cached == front_cached
    }

    /// Returns the number of items currently in the ring buffer.
    pub fn len(&self) -> usize {
        let front_cached: usize = self.front.load(Ordering::Acquire);
        let back_cached: usize = self.back.load(Ordering::Acquire);
        back_cached.wrapping_sub(front_cached) & self.mask
    }

    /// Attempts to insert an item at the back of the target ring buffer. Safe to call from interrupt context.
    pub fn put(&self, item: T) -> Result<(), RingError> {
        if self.producer.swap(true, Ordering::Acquire) {
            return Err(RingError::Full);
        }

        let back_cached: usize = self.back.load(Ordering::Relaxed);
        let front_cached: usize = self.front.load(Ordering::Acquire);

        // Check if the ring buffer is full.
        if (back_cached + 1) & self.mask == front_cached {
            self.producer.store(false, Ordering::Release);
            return Err(RingError::Full);
        }

        // Write. The slot is outside [front, back) so the consumer does not read it.
        unsafe { (*self.buffer[back_cached].get()).write(item) };

        // Commit write.
        self.back.store((back_cached + 1) & self.mask, Ordering::Release);
        self.producer.store(false, Ordering::Release);

        Ok(())
    }

    /// Attempts to remove the item from the front of the target ring buffer.
    pub fn get(&self) -> Result<T, RingError> {
        if self.consumer.swap(true, Ordering::Acquire) {
            return Err(RingError::Empty);
        }

        let front_cached: usize = self.front.load(Ordering::Relaxed);
        let back_cached: usize = self.back.load(Ordering::Acquire);

        // Check if the ring buffer is empty.
        if back_cached == front_cached {
            self.consumer.store(false, Ordering::Release);
            return Err(RingError::Empty);
        }

        // Read. The Acquire load of `back` makes the producer's write visible.
        let item: T = unsafe { (*self.buffer[front_cached].get()).assume_init() };

        // Commit read.
        self.front.store((front_cached + 1) & self.mask, Ordering::Release);
        self.consumer.store(false, Ordering::Release);

        Ok(item)
    }
}

//======================================================================================================================
// Trait Implementations
//======================================================================================================================

impl fmt::Display for RingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RingError::Full => write!(f, "ring buffer is full"),
            RingError::Empty => write!(f, "ring buffer is empty"),
            RingError::Size => write!(f, "invalid ring buffer size"),
        }
    }
}

impl ::std::error::Error for RingError {}

/// Send trait implementation.
unsafe impl<T: Send> Send for SpscRing<T> {}

/// Sync trait implementation. Slot accesses are serialized by the producer and consumer claims.
unsafe impl<T: Send> Sync for SpscRing<T> {}

impl<T> fmt::Debug for SpscRing<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpscRing")
            .field("front", &self.front.load(Ordering::Relaxed))
            .field("back", &self.back.load(Ordering::Relaxed))
            .field("size", &(self.mask + 1))
            .finish()
    }
}

//======================================================================================================================
// Unit Tests
//======================================================================================================================
