// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//==============================================================================
// Imports
//==============================================================================

use crate::runtime::{
    scheduler::{
        hooks,
        scheduler::Scheduler,
        SchedError,
    },
    time::{
        AbsTime,
        RelTime,
    },
};
use ::std::{
    any::Any,
    cell::Cell,
    fmt,
    ops::Deref,
    rc::Rc,
};

//==============================================================================
// Structures
//==============================================================================

/// Optional argument handed to a task when it is called.
pub type TaskArg<'a> = Option<&'a dyn Any>;

/// Logic of a task.
///
/// A task is resumed from its [Step::step] function every time it is called, and must run to completion before
/// returning. A logically longer operation is split into several steps, and the task records where it left off in its
/// [Step::State]. The body is shared by every handle to the task, so mutable fields go in cells.
pub trait Step: Sized + 'static {
    type State: Copy + Eq + fmt::Debug + 'static;

    fn step(&self, task: &TaskRef<Self>, sched: &mut Scheduler, arg: TaskArg<'_>);
}

/// User information attached to a task.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TaskInfo {
    name: String,
}

/// A typed reference to a task.
pub struct TaskRef<T: Step> {
    cell: Rc<TaskCell<T>>,
}

/// A type-erased reference to a task, as stored by the scheduler. Two handles are equal when they refer to the same
/// task.
#[derive(Clone)]
pub struct TaskHandle {
    inner: Rc<dyn Runnable>,
}

struct TaskCell<T: Step> {
    body: T,
    state: Cell<T::State>,
    info: Option<TaskInfo>,
}

/// Type-erased view of a task cell.
trait Runnable {
    fn run(self: Rc<Self>, sched: &mut Scheduler, arg: TaskArg<'_>);
    fn info(&self) -> Option<&TaskInfo>;
    fn state_name(&self) -> String;
}

//==============================================================================
// Associate Functions
//==============================================================================

impl TaskInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<T: Step> TaskRef<T> {
    /// Creates a task in `initial_state`.
    pub fn new(body: T, initial_state: T::State) -> Self {
        Self::build(body, initial_state, None)
    }

    /// Creates a task in `initial_state` that carries `info`.
    pub fn with_info(body: T, initial_state: T::State, info: TaskInfo) -> Self {
        Self::build(body, initial_state, Some(info))
    }

    fn build(body: T, initial_state: T::State, info: Option<TaskInfo>) -> Self {
        Self {
            cell: Rc::new(TaskCell {
                body,
                state: Cell::new(initial_state),
                info,
            }),
        }
    }

    pub fn state(&self) -> T::State {
        self.cell.state.get()
    }

    /// Moves the task to `next`. The state-change hook fires only if the state actually changes.
    pub fn set_state(&self, next: T::State) {
        let prev: T::State = self.cell.state.get();
        if prev != next {
            if hooks::has_set_state_hook() {
                hooks::fire_set_state(&self.handle(), &prev, &next);
            }
            self.cell.state.set(next);
        }
    }

    /// Moves the task to `next` and leaves it until some other code calls or schedules it.
    pub fn wait(&self, next: T::State) {
        self.set_state(next);
    }

    /// Moves the task to `next` and schedules it to run as soon as possible.
    pub fn yield_now(&self, sched: &mut Scheduler, next: T::State) -> Result<(), SchedError> {
        sched.asap(&self.handle())?;
        self.set_state(next);
        Ok(())
    }

    /// Moves the task to `next` and schedules it to run `delay` ticks from now.
    pub fn defer_for(&self, sched: &mut Scheduler, next: T::State, delay: RelTime) -> Result<(), SchedError> {
        sched.defer_for(&self.handle(), delay)?;
        self.set_state(next);
        Ok(())
    }

    /// Moves the task to `next` and schedules it to run at `at`.
    pub fn defer_until(&self, sched: &mut Scheduler, next: T::State, at: AbsTime) -> Result<(), SchedError> {
        sched.defer_until(&self.handle(), at)?;
        self.set_state(next);
        Ok(())
    }

    /// Schedules the task through the interrupt hand-off queue.
    pub fn sched_from_isr(&self, sched: &mut Scheduler) -> Result<(), SchedError> {
        sched.from_isr(&self.handle())
    }

    /// Cancels a pending deferral of this task.
    pub fn remove_deferred(&self, sched: &mut Scheduler) -> Result<(), SchedError> {
        sched.remove_deferred_task(&self.handle())
    }

    /// Moves this task to `final_state` and schedules `to` to run as soon as possible.
    pub fn transfer(&self, sched: &mut Scheduler, final_state: T::State, to: &TaskHandle) -> Result<(), SchedError> {
        sched.asap(to)?;
        self.set_state(final_state);
        Ok(())
    }

    /// Runs the task right now, in the caller's stack.
    pub fn call(&self, sched: &mut Scheduler, arg: TaskArg<'_>) {
        self.handle().call(sched, arg)
    }

    pub fn handle(&self) -> TaskHandle {
        TaskHandle {
            inner: self.cell.clone(),
        }
    }

    pub fn info(&self) -> Option<&TaskInfo> {
        self.cell.info.as_ref()
    }
}

impl TaskHandle {
    /// Runs the task right now, in the caller's stack. The call hook fires first.
    pub fn call(&self, sched: &mut Scheduler, arg: TaskArg<'_>) {
        hooks::fire_call(self);
        self.inner.clone().run(sched, arg);
    }

    pub fn info(&self) -> Option<&TaskInfo> {
        self.inner.info()
    }

    /// Name of the task, if it carries one.
    pub fn name(&self) -> Option<&str> {
        self.inner.info().map(TaskInfo::name)
    }

    /// Debug rendering of the current state of the task.
    pub fn state_name(&self) -> String {
        self.inner.state_name()
    }

    fn addr(&self) -> *const () {
        Rc::as_ptr(&self.inner) as *const ()
    }
}

//==============================================================================
// Standalone Functions
//==============================================================================

/// Calls `task` if there is one.
pub fn call(task: Option<&TaskHandle>, sched: &mut Scheduler, arg: TaskArg<'_>) {
    if let Some(task) = task {
        task.call(sched, arg);
    }
}

//==============================================================================
// Trait Implementations
//==============================================================================

impl<T: Step> Runnable for TaskCell<T> {
    fn run(self: Rc<Self>, sched: &mut Scheduler, arg: TaskArg<'_>) {
        let task: TaskRef<T> = TaskRef { cell: self };
        task.cell.body.step(&task, sched, arg);
    }

    fn info(&self) -> Option<&TaskInfo> {
        self.info.as_ref()
    }

    fn state_name(&self) -> String {
        format!("{:?}", self.state.get())
    }
}

impl<T: Step> Clone for TaskRef<T> {
    fn clone(&self) -> Self {
        Self {
            cell: self.cell.clone(),
        }
    }
}

impl<T: Step> Deref for TaskRef<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.cell.body
    }
}

impl<T: Step> From<&TaskRef<T>> for TaskHandle {
    fn from(task: &TaskRef<T>) -> Self {
        task.handle()
    }
}

impl<T: Step> PartialEq<TaskHandle> for TaskRef<T> {
    fn eq(&self, other: &TaskHandle) -> bool {
        self.handle() == *other
    }
}

impl PartialEq for TaskHandle {
    fn eq(&self, other: &Self) -> bool {
        self.addr() == other.addr()
    }
}

impl Eq for TaskHandle {}

impl fmt::Debug for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "TaskHandle({})", name),
            None => write!(f, "TaskHandle({:p})", self.addr()),
        }
    }
}

impl<T: Step> fmt::Debug for TaskRef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskRef")
            .field("task", &self.handle())
            .field("state", &self.state())
            .finish()
    }
}

//==============================================================================
// Unit Tests
//==============================================================================
