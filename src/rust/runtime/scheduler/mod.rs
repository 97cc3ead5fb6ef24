// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

pub mod hooks;
mod scheduler;
mod task;

//==============================================================================
// Exports
//==============================================================================

pub use self::{
    hooks::{
        clear_hooks,
        install_call_hook,
        install_set_state_hook,
    },
    scheduler::{
        IsrHandle,
        SchedError,
        Scheduler,
        TaskId,
    },
    task::{
        call,
        Step,
        TaskArg,
        TaskHandle,
        TaskInfo,
        TaskRef,
    },
};
