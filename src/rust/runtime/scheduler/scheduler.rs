// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//! Run-to-completion dispatcher.
//!
//! Each call to [Scheduler::step] picks exactly one task and runs it to completion. Sources are consulted in a fixed
//! order of precedence:
//!
//! 1. the interrupt hand-off queue,
//! 2. the earliest deferred task, if its wake time has been reached,
//! 3. the ASAP queue,
//! 4. the idle task, if any.
//!
//! Only [IsrHandle] may be used from interrupt context (or another thread). Everything else is bound to the thread
//! that owns the scheduler.

//==============================================================================
// Imports
//==============================================================================

use crate::{
    collections::{
        deferred::DeferredList,
        mailbox::Mailbox,
        ring::SpscRing,
    },
    runtime::{
        config::SchedConfig,
        fail::Fail,
        scheduler::task::TaskHandle,
        time::{
            AbsTime,
            Clock,
            RelTime,
        },
    },
};
use ::std::{
    fmt,
    rc::Rc,
    sync::Arc,
};

//==============================================================================
// Structures
//==============================================================================

/// Result codes of scheduling operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SchedError {
    /// A bounded queue is at capacity.
    SchedFull,
    /// The task to remove is not pending.
    NotFound,
}

/// Identifies a task registered for interrupt hand-off.
#[derive(Clone, Copy, Hash, PartialEq, Eq, Debug)]
pub struct TaskId(usize);

/// Interrupt-side access to a scheduler. This is the only piece of a scheduler that may cross threads.
#[derive(Clone)]
pub struct IsrHandle {
    ring: Arc<SpscRing<TaskId>>,
}

pub struct Scheduler {
    clock: Rc<dyn Clock>,
    deferred: DeferredList<TaskHandle>,
    asap: Mailbox<TaskHandle>,
    isr: Arc<SpscRing<TaskId>>,
    /// Tasks addressable from the interrupt hand-off queue, indexed by [TaskId].
    registry: Vec<TaskHandle>,
    max_tasks: usize,
    idle: Option<TaskHandle>,
    current: Option<TaskHandle>,
}

//==============================================================================
// Associate Functions
//==============================================================================

impl IsrHandle {
    /// Schedules task `id`. Never blocks, so it is safe to call from interrupt context.
    pub fn schedule(&self, id: TaskId) -> Result<(), SchedError> {
        self.ring.put(id).map_err(|_| SchedError::SchedFull)
    }
}

impl Scheduler {
    /// Creates a scheduler whose queues are sized after `config` and whose notion of time comes from `clock`.
    pub fn new(config: &SchedConfig, clock: impl Clock + 'static) -> Result<Self, Fail> {
        config.validate()?;
        let isr: SpscRing<TaskId> = SpscRing::new(config.max_isr_tasks)?;

        debug!(
            "new(): deferred={:?} isr={:?} asap={:?} tasks={:?}",
            config.max_deferred_tasks, config.max_isr_tasks, config.max_asap_tasks, config.max_tasks
        );

        Ok(Self {
            clock: Rc::new(clock),
            deferred: DeferredList::new(config.max_deferred_tasks),
            asap: Mailbox::new(config.max_asap_tasks),
            isr: Arc::new(isr),
            registry: Vec::with_capacity(config.max_tasks),
            max_tasks: config.max_tasks,
            idle: None,
            current: None,
        })
    }

    /// Drops every deferred and ASAP task. Registered tasks and the interrupt queue are kept.
    ///
    /// Tasks are not told that their entries were dropped: a [Timer](crate::runtime::timer::Timer) that was running
    /// still reports itself as running until it is stopped or restarted.
    pub fn reset(&mut self) {
        trace!("reset(): dropping {:?} deferred and {:?} asap tasks", self.deferred.len(), self.asap.count());
        self.deferred.clear();
        self.asap.reset();
        self.current = None;
    }

    /// Runs the next task, if any.
    pub fn step(&mut self) {
        let task: TaskHandle = match self.next_task() {
            Some(task) => task,
            None => return,
        };
        trace!("step(): running {:?}", task);
        self.current = Some(task.clone());
        task.call(self, None);
        self.current = None;
    }

    /// Returns the task being run by [Scheduler::step], if called from within it.
    pub fn current_task(&self) -> Option<TaskHandle> {
        self.current.clone()
    }

    /// Returns the task that would run next among the deferred and ASAP tasks, without removing it. The earliest
    /// deferred task wins even if it is not due yet.
    pub fn peek_next_task(&self) -> Option<TaskHandle> {
        match self.deferred.peek_earliest() {
            Some(entry) => Some(entry.item.clone()),
            None => self.asap.peek(),
        }
    }

    /// Schedules `task` to run as soon as possible, after every task already in the ASAP queue.
    pub fn asap(&mut self, task: &TaskHandle) -> Result<(), SchedError> {
        if !self.asap.push(task.clone()) {
            warn!("asap(): queue is full (task={:?})", task);
            return Err(SchedError::SchedFull);
        }
        Ok(())
    }

    /// Schedules `task` through the interrupt hand-off queue, registering it first if needed.
    pub fn from_isr(&mut self, task: &TaskHandle) -> Result<(), SchedError> {
        let id: TaskId = self.register(task)?;
        self.isr_handle()
            .schedule(id)
            .inspect_err(|_| warn!("from_isr(): queue is full (task={:?})", task))
    }

    /// Schedules `task` to run once `at` is reached.
    pub fn defer_until(&mut self, task: &TaskHandle, at: AbsTime) -> Result<(), SchedError> {
        let duplicate: bool = self.deferred.contains(task);
        if duplicate {
            warn!("defer_until(): task is already deferred (task={:?})", task);
        }
        debug_assert!(!duplicate, "task deferred twice: {:?}", task);
        self.deferred.insert(at, task.clone()).map_err(|_| {
            warn!("defer_until(): deferred list is full (task={:?})", task);
            SchedError::SchedFull
        })
    }

    /// Schedules `task` to run `delay` ticks from now.
    pub fn defer_for(&mut self, task: &TaskHandle, delay: RelTime) -> Result<(), SchedError> {
        let at: AbsTime = self.current_time().offset(delay);
        self.defer_until(task, at)
    }

    /// Cancels the pending deferral of `task`.
    pub fn remove_deferred_task(&mut self, task: &TaskHandle) -> Result<(), SchedError> {
        match self.deferred.remove(task) {
            0 => Err(SchedError::NotFound),
            _ => Ok(()),
        }
    }

    pub fn clock_source(&self) -> Rc<dyn Clock> {
        self.clock.clone()
    }

    /// Replaces the source of time. Deferred wake times are kept as they are. A source previously returned by
    /// [Scheduler::clock_source] may be passed back as is.
    pub fn set_clock_source(&mut self, clock: impl Clock + 'static) {
        self.clock = Rc::new(clock);
    }

    pub fn current_time(&self) -> AbsTime {
        self.clock.now()
    }

    pub fn idle_task(&self) -> Option<TaskHandle> {
        self.idle.clone()
    }

    /// Sets the task to run when nothing else is pending. `None` makes idle steps a no-op.
    pub fn set_idle_task(&mut self, task: Option<TaskHandle>) {
        self.idle = task;
    }

    /// Makes `task` addressable from interrupt context. Registering a task twice returns the same identifier.
    pub fn register(&mut self, task: &TaskHandle) -> Result<TaskId, SchedError> {
        if let Some(index) = self.registry.iter().position(|t| t == task) {
            return Ok(TaskId(index));
        }
        if self.registry.len() == self.max_tasks {
            warn!("register(): registry is full (task={:?})", task);
            return Err(SchedError::SchedFull);
        }
        self.registry.push(task.clone());
        Ok(TaskId(self.registry.len() - 1))
    }

    /// Returns a handle through which interrupt code can schedule registered tasks.
    pub fn isr_handle(&self) -> IsrHandle {
        IsrHandle {
            ring: self.isr.clone(),
        }
    }

    pub fn deferred_count(&self) -> usize {
        self.deferred.len()
    }

    pub fn asap_count(&self) -> usize {
        self.asap.count()
    }

    /// Checks if no task is pending in any queue.
    pub fn is_idle(&self) -> bool {
        self.isr.is_empty() && self.deferred.is_empty() && self.asap.is_empty()
    }

    /// Wake time of the earliest deferred task.
    pub fn next_wake_time(&self) -> Option<AbsTime> {
        self.deferred.peek_earliest().map(|entry| entry.at)
    }

    fn next_task(&mut self) -> Option<TaskHandle> {
        while let Ok(id) = self.isr.get() {
            match self.registry.get(id.0) {
                Some(task) => return Some(task.clone()),
                None => warn!("next_task(): unknown task id from interrupt queue (id={:?})", id),
            }
        }
        let now: AbsTime = self.current_time();
        if let Some(task) = self.deferred.take_due(now) {
            return Some(task);
        }
        if let Some(task) = self.asap.pop() {
            return Some(task);
        }
        self.idle.clone()
    }
}

//==============================================================================
// Trait Implementations
//==============================================================================

impl fmt::Display for SchedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedError::SchedFull => write!(f, "scheduler queue is full"),
            SchedError::NotFound => write!(f, "task not found"),
        }
    }
}

impl ::std::error::Error for SchedError {}

impl From<TaskId> for usize {
    fn from(id: TaskId) -> Self {
        id.0
    }
}

impl fmt::Debug for IsrHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IsrHandle").field("ring", &self.ring).finish()
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("deferred", &self.deferred.len())
            .field("asap", &self.asap.count())
            .field("isr", &self.isr.len())
            .field("registered", &self.registry.len())
            .field("idle", &self.idle)
            .field("current", &self.current)
            .finish()
    }
}

//==============================================================================
// Unit Tests
//==============================================================================
