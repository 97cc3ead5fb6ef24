// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//======================================================================================================================
// Imports
//======================================================================================================================

use crate::runtime::time::AbsTime;

//======================================================================================================================
// Structures
//======================================================================================================================

/// An item waiting for a point in time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeferredEntry<T> {
    pub at: AbsTime,
    pub item: T,
}

/// Bounded list of items ordered by wake time.
///
/// Entries are kept in reverse time order: the earliest entry sits at the end of the backing vector, so it is found
/// and removed in constant time. Items due at the same time come out in the order they were inserted.
#[derive(Debug)]
pub struct DeferredList<T> {
    entries: Vec<DeferredEntry<T>>,
    capacity: usize,
}

//======================================================================================================================
// Associated Functions
//======================================================================================================================

impl<T: PartialEq> DeferredList<T> {
    /// Creates a list that holds up to `capacity` entries. This is the only allocation the list performs.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.entries.len() == self.capacity
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Checks if `item` has at least one pending entry.
    pub fn contains(&self, item: &T) -> bool {
        self.entries.iter().any(|entry| entry.item == *item)
    }

    /// Inserts `item` to wake at `at`, after every entry due at the same time. Hands the item back if the list is
    /// full.
    pub fn insert(&mut self, at: AbsTime, item: T) -> Result<(), T> {
        if self.is_full() {
            return Err(item);
        }

        // Scan from the earliest end and stop at the first entry that is strictly later.
        let mut position: usize = self.entries.len();
        while position > 0 && !self.entries[position - 1].at.follows(at) {
            position -= 1;
        }
        self.entries.insert(position, DeferredEntry { at, item });

        Ok(())
    }

    /// Removes every entry for `item`. Returns how many were removed.
    pub fn remove(&mut self, item: &T) -> usize {
        let before: usize = self.entries.len();
        self.entries.retain(|entry| entry.item != *item);
        before - self.entries.len()
    }

    /// Returns the entry with the earliest wake time, due or not.
    pub fn peek_earliest(&self) -> Option<&DeferredEntry<T>> {
        self.entries.last()
    }

    /// Removes and returns the earliest item if its wake time is not after `now`.
    pub fn take_due(&mut self, now: AbsTime) -> Option<T> {
        match self.entries.last() {
            Some(entry) if !now.precedes(entry.at) => self.entries.pop().map(|entry| entry.item),
            _ => None,
        }
    }

    /// Iterates over entries from the earliest to the latest.
    pub fn iter(&self) -> impl Iterator<Item = &DeferredEntry<T>> {
        self.entries.iter().rev()
    }
}

//======================================================================================================================
// Unit Tests
//======================================================================================================================
