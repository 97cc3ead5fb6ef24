// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//======================================================================================================================
// Imports
//======================================================================================================================

use crate::runtime::{
    scheduler::{
        self,
        SchedError,
        Scheduler,
        Step,
        TaskArg,
        TaskHandle,
        TaskInfo,
        TaskRef,
    },
    time::{
        AbsTime,
        RelTime,
    },
};
use ::std::cell::{
    Cell,
    RefCell,
};

//======================================================================================================================
// Structures
//======================================================================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimerState {
    Idle,
    Running,
}

/// One-shot or periodic timer that calls a completion task when it fires.
///
/// The timer is itself a task: it sits in the deferred list of the scheduler while running. [Scheduler::reset] drops
/// that entry without telling the timer, which then keeps reporting itself as running, and never fires, until it is
/// stopped or restarted.
#[derive(Clone, Debug)]
pub struct Timer {
    task: TaskRef<TimerTask>,
}

pub struct TimerTask {
    delay: Cell<RelTime>,
    deadline: Cell<AbsTime>,
    periodic: Cell<bool>,
    on_completion: RefCell<Option<TaskHandle>>,
}

//======================================================================================================================
// Associated Functions
//======================================================================================================================

impl Timer {
    pub fn new() -> Self {
        Self::build(None)
    }

    /// Creates a timer whose task carries `name`.
    pub fn with_name(name: &str) -> Self {
        Self::build(Some(TaskInfo::new(name)))
    }

    fn build(info: Option<TaskInfo>) -> Self {
        let body: TimerTask = TimerTask {
            delay: Cell::new(0),
            deadline: Cell::new(AbsTime::default()),
            periodic: Cell::new(false),
            on_completion: RefCell::new(None),
        };
        let task: TaskRef<TimerTask> = match info {
            Some(info) => TaskRef::with_info(body, TimerState::Idle, info),
            None => TaskRef::new(body, TimerState::Idle),
        };
        Self { task }
    }

    /// Arms the timer to fire `delay` ticks from now, then every `delay` ticks if `periodic`. A running timer is
    /// restarted without notification.
    pub fn start(
        &self,
        sched: &mut Scheduler,
        delay: RelTime,
        periodic: bool,
        on_completion: Option<TaskHandle>,
    ) -> Result<(), SchedError> {
        self.stop(sched);
        let deadline: AbsTime = sched.current_time().offset(delay);
        self.task.delay.set(delay);
        self.task.deadline.set(deadline);
        self.task.periodic.set(periodic);
        *self.task.on_completion.borrow_mut() = on_completion;
        self.task.defer_until(sched, TimerState::Running, deadline)
    }

    /// Disarms the timer. The completion task is not called.
    pub fn stop(&self, sched: &mut Scheduler) {
        if self.is_running() {
            // Not found means the timer is firing right now.
            let _ = self.task.remove_deferred(sched);
        }
        self.task.set_state(TimerState::Idle);
    }

    pub fn is_running(&self) -> bool {
        self.task.state() == TimerState::Running
    }

    pub fn is_stopped(&self) -> bool {
        !self.is_running()
    }

    /// Time at which the timer fires next. Meaningless if the timer is stopped.
    pub fn deadline(&self) -> AbsTime {
        self.task.deadline.get()
    }

    pub fn handle(&self) -> TaskHandle {
        self.task.handle()
    }
}

//======================================================================================================================
// Trait Implementations
//======================================================================================================================

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

impl Step for TimerTask {
    type State = TimerState;

    fn step(&self, task: &TaskRef<Self>, sched: &mut Scheduler, _arg: TaskArg<'_>) {
        match task.state() {
            // Waiting for a call to start().
            TimerState::Idle => (),
            TimerState::Running => {
                if self.periodic.get() {
                    // Reload from the previous deadline to prevent slippage.
                    let deadline: AbsTime = self.deadline.get().offset(self.delay.get());
                    self.deadline.set(deadline);
                    if let Err(e) = task.defer_until(sched, TimerState::Running, deadline) {
                        error!("step(): cannot reload periodic timer ({:?})", e);
                        task.set_state(TimerState::Idle);
                    }
                } else {
                    task.set_state(TimerState::Idle);
                }
                let on_completion: Option<TaskHandle> = self.on_completion.borrow().clone();
                scheduler::call(on_completion.as_ref(), sched, None);
            },
        }
    }
}

//======================================================================================================================
// Unit Tests
//======================================================================================================================
