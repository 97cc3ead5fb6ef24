// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//======================================================================================================================
// Imports
//======================================================================================================================

use crate::runtime::limits;
use ::std::{
    cell::Cell,
    fmt,
    rc::Rc,
    time::Instant,
};

//======================================================================================================================
// Structures
//======================================================================================================================

/// Signed distance between two points in time, in clock ticks.
pub type RelTime = i32;

/// Absolute point in time, in clock ticks.
///
/// The tick counter wraps around, so two values are only comparable through their signed difference. For this reason
/// [AbsTime] deliberately does not implement [Ord]; use [AbsTime::precedes], [AbsTime::equals] and [AbsTime::follows].
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct AbsTime(u32);

/// A source of absolute time.
pub trait Clock {
    /// Returns the current time.
    fn now(&self) -> AbsTime;
}

/// Monotonic host clock.
pub struct SystemClock {
    epoch: Instant,
    ticks_per_second: u32,
}

/// Clock that only moves when told to. Clones share the same underlying time.
#[derive(Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<AbsTime>>,
}

//======================================================================================================================
// Associated Functions
//======================================================================================================================

impl AbsTime {
    /// Builds an absolute time from a raw tick count.
    pub const fn from_ticks(ticks: u32) -> Self {
        Self(ticks)
    }

    /// Returns the raw tick count.
    pub const fn ticks(self) -> u32 {
        self.0
    }

    /// Returns `self + dt`.
    pub fn offset(self, dt: RelTime) -> AbsTime {
        AbsTime(self.0.wrapping_add_signed(dt))
    }

    /// Returns `self - other`.
    pub fn difference(self, other: AbsTime) -> RelTime {
        self.0.wrapping_sub(other.0) as RelTime
    }

    /// Returns true if `self` is strictly earlier than `other`.
    pub fn precedes(self, other: AbsTime) -> bool {
        self.difference(other) < 0
    }

    pub fn equals(self, other: AbsTime) -> bool {
        self.difference(other) == 0
    }

    /// Returns true if `self` is strictly later than `other`.
    pub fn follows(self, other: AbsTime) -> bool {
        self.difference(other) > 0
    }
}

impl SystemClock {
    /// Creates a clock whose epoch is the moment of creation.
    pub fn new(ticks_per_second: u32) -> Self {
        Self {
            epoch: Instant::now(),
            ticks_per_second: ticks_per_second.max(1),
        }
    }

    pub fn ticks_per_second(&self) -> u32 {
        self.ticks_per_second
    }
}

impl ManualClock {
    /// Creates a clock stopped at `start`.
    pub fn new(start: AbsTime) -> Self {
        Self {
            now: Rc::new(Cell::new(start)),
        }
    }

    /// Moves the clock to `t`.
    pub fn set(&self, t: AbsTime) {
        self.now.set(t);
    }

    /// Moves the clock forward by `dt` ticks.
    pub fn advance(&self, dt: RelTime) {
        self.now.set(self.now.get().offset(dt));
    }
}

//======================================================================================================================
// Standalone Functions
//======================================================================================================================

/// Converts a relative time into milliseconds.
pub fn rel_to_ms(dt: RelTime, ticks_per_second: u32) -> i64 {
    (dt as i64 * 1000) / ticks_per_second.max(1) as i64
}

/// Converts milliseconds into a relative time. Saturates at the bounds of [RelTime].
pub fn ms_to_rel(ms: i64, ticks_per_second: u32) -> RelTime {
    let ticks: i64 = ms.saturating_mul(ticks_per_second as i64) / 1000;
    ticks.clamp(RelTime::MIN as i64, RelTime::MAX as i64) as RelTime
}

//======================================================================================================================
// Trait Implementations
//======================================================================================================================

impl fmt::Debug for AbsTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.0)
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new(limits::TICKS_PER_SECOND)
    }
}

impl Clock for SystemClock {
    fn now(&self) -> AbsTime {
        let ticks: u128 = self.epoch.elapsed().as_nanos() * self.ticks_per_second as u128 / 1_000_000_000;
        // Truncation wraps the counter.
        AbsTime(ticks as u32)
    }
}

impl Clock for ManualClock {
    fn now(&self) -> AbsTime {
        self.now.get()
    }
}

impl Clock for Rc<dyn Clock> {
    fn now(&self) -> AbsTime {
        (**self).now()
    }
}

impl<F> Clock for F
where
    F: Fn() -> AbsTime,
{
    fn now(&self) -> AbsTime {
        self()
    }
}

//======================================================================================================================
// Unit Tests
//======================================================================================================================
