// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//==============================================================================
// Imports
//==============================================================================

use crate::{
    collections::ring::RingError,
    runtime::scheduler::SchedError,
};
use ::libc::{
    c_int,
    EAGAIN,
    EINVAL,
    EIO,
    ENOENT,
};
use ::std::{
    error,
    fmt,
    io,
};

//==============================================================================
// Structures
//==============================================================================

/// Failure
#[derive(Clone, PartialEq, Eq)]
pub struct Fail {
    /// Error code.
    pub errno: c_int,
    /// Cause.
    pub cause: String,
}

//==============================================================================
// Associate Functions
//==============================================================================

/// Associate Functions for Failures
impl Fail {
    /// Creates a new Failure
    pub fn new(errno: i32, cause: &str) -> Self {
        Self {
            errno,
            cause: cause.to_string(),
        }
    }
}

//==============================================================================
// Trait Implementations
//==============================================================================

/// Display Trait Implementation for Failures
impl fmt::Display for Fail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Error {:?}: {:?}", self.errno, self.cause)
    }
}

/// Debug trait Implementation for Failures
impl fmt::Debug for Fail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Error {:?}: {:?}", self.errno, self.cause)
    }
}

/// Error Trait Implementation for Failures
impl error::Error for Fail {}

/// Conversion Trait Implementation for Fail
impl From<io::Error> for Fail {
    fn from(_: io::Error) -> Self {
        Self {
            errno: EIO,
            cause: "I/O error".to_string(),
        }
    }
}

/// Conversion from scheduling result codes.
impl From<SchedError> for Fail {
    fn from(e: SchedError) -> Self {
        match e {
            SchedError::SchedFull => Self::new(EAGAIN, "scheduler queue is full"),
            SchedError::NotFound => Self::new(ENOENT, "task not found"),
        }
    }
}

/// Conversion from ring buffer result codes.
impl From<RingError> for Fail {
    fn from(e: RingError) -> Self {
        match e {
            RingError::Full => Self::new(EAGAIN, "ring buffer is full"),
            RingError::Empty => Self::new(EAGAIN, "ring buffer is empty"),
            RingError::Size => Self::new(EINVAL, "ring buffer capacity must be a power of two greater than one"),
        }
    }
}

//==============================================================================
// Unit Tests
//==============================================================================
