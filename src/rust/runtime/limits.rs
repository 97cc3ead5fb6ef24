// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

/// Default number of entries in the deferred task list.
pub const MAX_DEFERRED_TASKS: usize = 20;

/// Default capacity of the interrupt hand-off ring. Must be a power of two.
pub const MAX_ISR_TASKS: usize = 8;

/// Default number of entries in the ASAP queue.
pub const MAX_ASAP_TASKS: usize = 20;

/// Default number of tasks that may be registered for interrupt hand-off.
pub const MAX_TASKS: usize = 32;

/// Default tick rate of the system clock.
pub const TICKS_PER_SECOND: u32 = 1000;
