// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//! Cooperative, single-threaded, run-to-completion task scheduler.
//!
//! Interrupt-originated events, immediate work and time-deferred work are multiplexed onto one
//! logical thread of execution. Each call to [Scheduler::step] runs at most one task to completion.

#![cfg_attr(feature = "strict", deny(warnings))]
#![deny(clippy::all)]

#[macro_use]
extern crate log;

pub mod collections;
pub mod runtime;

//======================================================================================================================
// Exports
//======================================================================================================================

pub use self::runtime::{
    config::SchedConfig,
    fail::Fail,
    scheduler::{
        IsrHandle,
        SchedError,
        Scheduler,
        Step,
        TaskArg,
        TaskHandle,
        TaskId,
        TaskInfo,
        TaskRef,
    },
    time::{
        AbsTime,
        Clock,
        ManualClock,
        RelTime,
        SystemClock,
    },
};

//======================================================================================================================
// Macros
//======================================================================================================================

/// Ensures that two expressions are equal, bailing out with an [anyhow::Error] otherwise.
#[macro_export]
macro_rules! ensure_eq {
    ($left:expr, $right:expr) => ({
        match (&$left, &$right) {
            (left_val, right_val) => {
                if !(*left_val == *right_val) {
                    anyhow::bail!(r#"ensure failed: `(left == right)` left: `{:?}`, right: `{:?}`"#, left_val, right_val)
                }
            }
        }
    });
    ($left:expr, $right:expr,) => ({
        $crate::ensure_eq!($left, $right)
    });
}

/// Ensures that two expressions are not equal, bailing out with an [anyhow::Error] otherwise.
#[macro_export]
macro_rules! ensure_neq {
    ($left:expr, $right:expr) => ({
        match (&$left, &$right) {
            (left_val, right_val) => {
                if *left_val == *right_val {
                    anyhow::bail!(r#"ensure failed: `(left != right)` left: `{:?}`, right: `{:?}`"#, left_val, right_val)
                }
            }
        }
    });
    ($left:expr, $right:expr,) => ({
        $crate::ensure_neq!($left, $right)
    });
}
