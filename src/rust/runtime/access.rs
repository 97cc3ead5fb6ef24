// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//======================================================================================================================
// Imports
//======================================================================================================================

use crate::runtime::scheduler::{
    self,
    Scheduler,
    TaskHandle,
};
use ::std::{
    cell::RefCell,
    collections::VecDeque,
    fmt,
};

//======================================================================================================================
// Structures
//======================================================================================================================

/// Result codes of access manager operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccessError {
    /// The task already owns the resource.
    AlreadyOwner,
    /// The task is already waiting for the resource.
    AlreadyPending,
    /// No room left to queue the request.
    Full,
    /// The task neither owns nor waits for the resource.
    NotPending,
}

/// Grants exclusive ownership of a resource to one task at a time.
///
/// Waiting tasks are served in request order. A task is called, in the caller's stack, at the moment it is granted
/// ownership.
pub struct AccessManager {
    owner: RefCell<Option<TaskHandle>>,
    pending: RefCell<VecDeque<TaskHandle>>,
    capacity: usize,
}

//======================================================================================================================
// Associated Functions
//======================================================================================================================

impl AccessManager {
    /// Creates a manager that queues up to `capacity` waiting tasks.
    pub fn new(capacity: usize) -> Self {
        Self {
            owner: RefCell::new(None),
            pending: RefCell::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    /// Clears the owner and calls every waiting task, in request order.
    pub fn reset(&self, sched: &mut Scheduler) {
        *self.owner.borrow_mut() = None;
        while let Some(task) = self.pop_pending() {
            task.call(sched, None);
        }
    }

    /// Asks for ownership on behalf of `task`. If the resource is free, `task` becomes the owner and is called right
    /// away; otherwise it is queued.
    pub fn request(&self, sched: &mut Scheduler, task: &TaskHandle) -> Result<(), AccessError> {
        let free: bool = match self.owner.borrow().as_ref() {
            None => true,
            Some(owner) if owner == task => return Err(AccessError::AlreadyOwner),
            Some(_) => false,
        };
        if free {
            *self.owner.borrow_mut() = Some(task.clone());
            task.call(sched, None);
            return Ok(());
        }

        let mut pending = self.pending.borrow_mut();
        if pending.contains(task) {
            return Err(AccessError::AlreadyPending);
        }
        if pending.len() == self.capacity {
            warn!("request(): pending queue is full (task={:?})", task);
            return Err(AccessError::Full);
        }
        pending.push_back(task.clone());
        Ok(())
    }

    /// Gives up ownership, or a pending request, on behalf of `task`. When the owner releases, the next waiting task
    /// becomes the owner and is called right away.
    pub fn release(&self, sched: &mut Scheduler, task: &TaskHandle) -> Result<(), AccessError> {
        if self.has_ownership(task) {
            let next: Option<TaskHandle> = self.pop_pending();
            *self.owner.borrow_mut() = next.clone();
            scheduler::call(next.as_ref(), sched, None);
            return Ok(());
        }

        let mut pending = self.pending.borrow_mut();
        match pending.iter().position(|t| t == task) {
            Some(index) => {
                pending.remove(index);
                Ok(())
            },
            None => Err(AccessError::NotPending),
        }
    }

    pub fn has_ownership(&self, task: &TaskHandle) -> bool {
        self.owner.borrow().as_ref() == Some(task)
    }

    pub fn owner(&self) -> Option<TaskHandle> {
        self.owner.borrow().clone()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.borrow().len()
    }

    fn pop_pending(&self) -> Option<TaskHandle> {
        self.pending.borrow_mut().pop_front()
    }
}

//======================================================================================================================
// Trait Implementations
//======================================================================================================================

impl fmt::Display for AccessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessError::AlreadyOwner => write!(f, "task already owns the resource"),
            AccessError::AlreadyPending => write!(f, "task is already waiting for the resource"),
            AccessError::Full => write!(f, "too many tasks waiting for the resource"),
            AccessError::NotPending => write!(f, "task is not waiting for the resource"),
        }
    }
}

impl ::std::error::Error for AccessError {}

impl fmt::Debug for AccessManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessManager")
            .field("owner", &self.owner.borrow())
            .field("pending", &self.pending.borrow().len())
            .field("capacity", &self.capacity)
            .finish()
    }
}

//======================================================================================================================
// Unit Tests
//======================================================================================================================
