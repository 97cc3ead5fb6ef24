// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

pub mod deferred;
pub mod mailbox;
pub mod ring;
