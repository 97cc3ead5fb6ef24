// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//! Debug logging of task transitions.
//!
//! Once [install]ed, every switch from one task to another and every state change of a named task is logged at
//! `debug` level, as `from => to` and `name: prev => next` respectively. Calls to the idle task are not logged.

//======================================================================================================================
// Imports
//======================================================================================================================

use crate::runtime::scheduler::{
    self,
    TaskHandle,
};
use ::log::Level;
use ::std::{
    cell::RefCell,
    fmt::Debug,
    rc::Rc,
};

//======================================================================================================================
// Constants
//======================================================================================================================

/// Name used for tasks that carry no name.
const UNKNOWN_TASK: &str = "unknown_task";

//======================================================================================================================
// Structures
//======================================================================================================================

/// Tracks the last task called, to report switches between tasks.
pub struct Tracer {
    idle: Option<TaskHandle>,
    prev: RefCell<Option<TaskHandle>>,
}

//======================================================================================================================
// Associated Functions
//======================================================================================================================

impl Tracer {
    pub fn new(idle: Option<TaskHandle>) -> Self {
        Self {
            idle,
            prev: RefCell::new(None),
        }
    }

    /// Records a call to `task`. Returns the transition to report, if it switches away from another task.
    pub fn on_call(&self, task: &TaskHandle) -> Option<String> {
        if self.idle.as_ref() == Some(task) || self.prev.borrow().as_ref() == Some(task) {
            return None;
        }
        let prev: Option<TaskHandle> = self.prev.replace(Some(task.clone()));
        Some(format!("{} => {}", task_name(prev.as_ref()), task_name(Some(task))))
    }

    /// Returns the state change to report. Only named tasks are reported.
    pub fn on_set_state(task: &TaskHandle, prev: &dyn Debug, next: &dyn Debug) -> Option<String> {
        let name: &str = task.name()?;
        Some(format!("{}: {:?} => {:?}", name, prev, next))
    }
}

//======================================================================================================================
// Standalone Functions
//======================================================================================================================

/// Name of `task`, or a placeholder.
pub fn task_name(task: Option<&TaskHandle>) -> &str {
    task.and_then(TaskHandle::name).unwrap_or(UNKNOWN_TASK)
}

/// Installs the tracing hooks on the current thread. `idle` is the idle task, if any.
pub fn install(idle: Option<TaskHandle>) {
    let tracer: Rc<Tracer> = Rc::new(Tracer::new(idle));
    scheduler::install_call_hook(move |task: &TaskHandle| {
        if let Some(line) = tracer.on_call(task) {
            if log_enabled!(Level::Debug) {
                debug!("{}", line);
            }
        }
    });
    scheduler::install_set_state_hook(|task: &TaskHandle, prev: &dyn Debug, next: &dyn Debug| {
        if log_enabled!(Level::Debug) {
            if let Some(line) = Tracer::on_set_state(task, prev, next) {
                debug!("{}", line);
            }
        }
    });
}

/// Removes the tracing hooks from the current thread.
pub fn uninstall() {
    scheduler::clear_hooks();
}

//======================================================================================================================
// Unit Tests
//======================================================================================================================
