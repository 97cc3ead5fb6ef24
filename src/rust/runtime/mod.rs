// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//======================================================================================================================
// Exports
//======================================================================================================================

pub mod access;
pub mod config;
pub mod fail;
pub mod limits;
pub mod logging;
pub mod scheduler;
pub mod time;
pub mod timer;
pub mod trace;
