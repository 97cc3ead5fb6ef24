// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//! Diagnostic hooks fired on task calls and state changes.
//!
//! Hooks are installed per thread: every scheduler driven from a thread shares them. They must not alter scheduling.

//==============================================================================
// Imports
//==============================================================================

use crate::runtime::scheduler::task::TaskHandle;
use ::std::{
    cell::RefCell,
    fmt::Debug,
    rc::Rc,
};

//==============================================================================
// Structures
//==============================================================================

type CallHook = Rc<dyn Fn(&TaskHandle)>;
type SetStateHook = Rc<dyn Fn(&TaskHandle, &dyn Debug, &dyn Debug)>;

#[derive(Default)]
struct Hooks {
    call: Option<CallHook>,
    set_state: Option<SetStateHook>,
}

//==============================================================================
// Static Variables
//==============================================================================

thread_local! {
    static HOOKS: RefCell<Hooks> = RefCell::new(Hooks::default());
}

//==============================================================================
// Standalone Functions
//==============================================================================

/// Installs `hook` to run every time a task is called, replacing any previous call hook.
pub fn install_call_hook<F>(hook: F)
where
    F: Fn(&TaskHandle) + 'static,
{
    HOOKS.with(|hooks| hooks.borrow_mut().call = Some(Rc::new(hook)));
}

/// Installs `hook` to run every time a task changes state, replacing any previous state-change hook. The hook
/// receives the task, the previous state and the next state.
pub fn install_set_state_hook<F>(hook: F)
where
    F: Fn(&TaskHandle, &dyn Debug, &dyn Debug) + 'static,
{
    HOOKS.with(|hooks| hooks.borrow_mut().set_state = Some(Rc::new(hook)));
}

/// Removes both hooks.
pub fn clear_hooks() {
    HOOKS.with(|hooks| *hooks.borrow_mut() = Hooks::default());
}

pub(crate) fn has_set_state_hook() -> bool {
    HOOKS.with(|hooks| hooks.borrow().set_state.is_some())
}

pub(crate) fn fire_call(task: &TaskHandle) {
    // Clone the hook out so that it may install or clear hooks itself.
    let hook: Option<CallHook> = HOOKS.with(|hooks| hooks.borrow().call.clone());
    if let Some(hook) = hook {
        hook(task);
    }
}

pub(crate) fn fire_set_state(task: &TaskHandle, prev: &dyn Debug, next: &dyn Debug) {
    let hook: Option<SetStateHook> = HOOKS.with(|hooks| hooks.borrow().set_state.clone());
    if let Some(hook) = hook {
        hook(task, prev, next);
    }
}
