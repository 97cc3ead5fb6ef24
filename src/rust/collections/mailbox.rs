// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//======================================================================================================================
// Imports
//======================================================================================================================

use crate::runtime::scheduler::{
    Scheduler,
    TaskHandle,
};
use ::std::{
    cell::{
        Cell,
        RefCell,
    },
    fmt,
};

//======================================================================================================================
// Structures
//======================================================================================================================

/// Bounded FIFO of items with optional put/get notification tasks.
///
/// The write position and the item count are tracked explicitly, so a full mailbox and an empty one are never
/// confused. All operations take `&self`: a mailbox is typically shared (behind an `Rc`) by a producer task and a
/// consumer task, and the notification tasks may re-enter it while they run.
pub struct Mailbox<T> {
    items: RefCell<Box<[Option<T>]>>,
    // Number of items stored.
    count: Cell<usize>,
    // Slot that the next put writes to.
    index: Cell<usize>,
    on_put: Option<TaskHandle>,
    on_get: Option<TaskHandle>,
}

//======================================================================================================================
// Associated Functions
//======================================================================================================================

impl<T: Clone> Mailbox<T> {
    /// Creates a mailbox that holds up to `capacity` items and notifies no one.
    pub fn new(capacity: usize) -> Self {
        Self::with_callbacks(capacity, None, None)
    }

    /// Creates a mailbox that calls `on_put` after every successful put and `on_get` after every successful get.
    pub fn with_callbacks(capacity: usize, on_put: Option<TaskHandle>, on_get: Option<TaskHandle>) -> Self {
        let items: Box<[Option<T>]> = (0..capacity).map(|_| None).collect();
        Self {
            items: RefCell::new(items),
            count: Cell::new(0),
            index: Cell::new(0),
            on_put,
            on_get,
        }
    }

    pub fn capacity(&self) -> usize {
        self.items.borrow().len()
    }

    pub fn count(&self) -> usize {
        self.count.get()
    }

    pub fn is_empty(&self) -> bool {
        self.count.get() == 0
    }

    pub fn is_full(&self) -> bool {
        self.count.get() == self.capacity()
    }

    /// Drops all items.
    pub fn reset(&self) {
        self.items.borrow_mut().iter_mut().for_each(|slot| *slot = None);
        self.count.set(0);
        self.index.set(0);
    }

    /// Appends `item`. Returns false, leaving the mailbox untouched, if it is full.
    pub fn put(&self, sched: &mut Scheduler, item: T) -> bool {
        if !self.push(item) {
            return false;
        }
        if let Some(task) = self.on_put.as_ref() {
            task.call(sched, None);
        }
        true
    }

    /// Removes the oldest item, or returns `None` if the mailbox is empty.
    pub fn get(&self, sched: &mut Scheduler) -> Option<T> {
        let item: T = self.pop()?;
        if let Some(task) = self.on_get.as_ref() {
            task.call(sched, None);
        }
        Some(item)
    }

    /// Returns a copy of the oldest item without removing it.
    pub fn peek(&self) -> Option<T> {
        if self.is_empty() {
            return None;
        }
        self.items.borrow()[self.front()].clone()
    }

    /// Appends `item` without notifying anyone.
    pub(crate) fn push(&self, item: T) -> bool {
        let count: usize = self.count.get();
        let mut items = self.items.borrow_mut();
        let capacity: usize = items.len();
        if count == capacity {
            return false;
        }
        let index: usize = self.index.get();
        items[index] = Some(item);
        self.index.set((index + 1) % capacity);
        self.count.set(count + 1);
        true
    }

    /// Removes the oldest item without notifying anyone.
    pub(crate) fn pop(&self) -> Option<T> {
        if self.is_empty() {
            return None;
        }
        let front: usize = self.front();
        let item: Option<T> = self.items.borrow_mut()[front].take();
        self.count.set(self.count.get() - 1);
        item
    }

    // Slot holding the oldest item. Only meaningful when the mailbox is not empty.
    fn front(&self) -> usize {
        let capacity: usize = self.capacity();
        (capacity + self.index.get() - self.count.get()) % capacity
    }
}

//======================================================================================================================
// Trait Implementations
//======================================================================================================================

impl<T> fmt::Debug for Mailbox<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mailbox")
            .field("capacity", &self.items.borrow().len())
            .field("count", &self.count.get())
            .field("index", &self.index.get())
            .finish()
    }
}

//======================================================================================================================
// Unit Tests
//======================================================================================================================
