/*! The discrete time base shared by every other module.

This crate represents all quantities — activation periods, jitter,
execution costs, response times — as non-negative integers in a single,
user-chosen time base (ps/ns/µs/ms/s; the crate itself is agnostic).
`Duration` is the length of an interval, `Service` is an amount of
processor work, and `Offset` is a position relative to a reference
point ("time zero") that distinguishes the half-open and closed
interval conventions used throughout the busy-window analyses.
*/

use std::fmt;
use std::ops::{Div, Mul, Rem};

use derive_more::{Add, AddAssign, Sub, SubAssign, Sum};

/// The underlying scalar time representation.
pub type Time = u64;

/// An instant on the time axis, measured from an implicit origin.
/// Used only where a bare scalar suffices (e.g. diagnostic messages);
/// prefer [Offset] wherever half-open/closed conventions matter.
pub type Instant = Duration;

/// The length of a time interval.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[derive(Add, AddAssign, Sub, SubAssign, Sum)]
pub struct Duration(Time);

impl Duration {
    /// The zero-length interval.
    pub fn zero() -> Self {
        Duration(0)
    }

    /// The smallest representable positive interval (one time unit).
    pub fn epsilon() -> Self {
        Duration(1)
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn is_non_zero(&self) -> bool {
        self.0 != 0
    }

    /// Subtract without underflowing past zero.
    pub fn saturating_sub(self, other: Duration) -> Duration {
        Duration(self.0.saturating_sub(other.0))
    }

    /// A practically-infinite duration, used where the event-model
    /// algebra calls for `+∞` (e.g. an unconstrained `δ⁺`). Kept well
    /// below `Time::MAX` so that adding finite durations to it cannot
    /// overflow.
    pub fn infinite() -> Self {
        Duration(Time::MAX / 4)
    }

    pub fn is_infinite(&self) -> bool {
        self.0 >= Time::MAX / 4
    }
}

impl From<Time> for Duration {
    fn from(val: Time) -> Self {
        Duration(val)
    }
}

impl From<Duration> for Time {
    fn from(val: Duration) -> Self {
        val.0
    }
}

impl fmt::Debug for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Mul<u64> for Duration {
    type Output = Duration;
    fn mul(self, rhs: u64) -> Duration {
        Duration(self.0 * rhs)
    }
}

impl Mul<Duration> for u64 {
    type Output = Duration;
    fn mul(self, rhs: Duration) -> Duration {
        Duration(self * rhs.0)
    }
}

/// Integer division of two durations yields a plain count.
impl Div for Duration {
    type Output = u64;
    fn div(self, rhs: Duration) -> u64 {
        self.0 / rhs.0
    }
}

impl Rem for Duration {
    type Output = Duration;
    fn rem(self, rhs: Duration) -> Duration {
        Duration(self.0 % rhs.0)
    }
}

/// A position relative to a reference point ("time zero"), used by
/// the busy-window search to distinguish the half-open convention
/// (`since_time_zero`, interval `[0, A)`) from the closed convention
/// (`closed_since_time_zero`, interval `[0, A]`).
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Offset(Time);

impl Offset {
    /// Build an offset from a half-open interval length: the offset
    /// `A` such that `A.since_time_zero() == delta`.
    pub fn from_time_zero(delta: Duration) -> Self {
        Offset(delta.0)
    }

    /// Build an offset from a closed interval length `delta`, i.e.
    /// the offset `A` such that `A.closed_since_time_zero() == delta`.
    pub fn closed_from_time_zero(delta: Duration) -> Self {
        Offset(delta.0.saturating_sub(1))
    }

    /// The half-open interval length `[0, self)`.
    pub fn since_time_zero(self) -> Duration {
        Duration(self.0)
    }

    /// The closed interval length `[0, self]`.
    pub fn closed_since_time_zero(self) -> Duration {
        Duration(self.0) + Duration::epsilon()
    }

    /// The (non-negative) distance from `self` to a later offset `other`.
    pub fn distance_to(self, other: Offset) -> Duration {
        Duration(other.0 - self.0)
    }
}

impl fmt::Debug for Offset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "A={}", self.0)
    }
}

impl Add<Duration> for Offset {
    type Output = Offset;
    fn add(self, rhs: Duration) -> Offset {
        Offset(self.0 + rhs.0)
    }
}

/// An amount of processor service (work performed), as opposed to a
/// length of time (an interval during which work may or may not be
/// performed). Kept as a distinct type from [Duration] because a
/// supply-bound function converts between the two, and conflating
/// them is a common source of off-by-one errors in this literature.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Service(Time);

impl Service {
    pub fn none() -> Self {
        Service(0)
    }

    pub fn epsilon() -> Self {
        Service(1)
    }

    pub fn is_none(&self) -> bool {
        self.0 == 0
    }

    pub fn is_some(&self) -> bool {
        self.0 != 0
    }

    pub fn saturating_sub(self, other: Service) -> Service {
        Service(self.0.saturating_sub(other.0))
    }
}

impl From<Time> for Service {
    fn from(val: Time) -> Self {
        Service(val)
    }
}

impl From<Duration> for Service {
    fn from(val: Duration) -> Self {
        Service(val.0)
    }
}

impl From<Service> for Duration {
    fn from(val: Service) -> Self {
        Duration(val.0)
    }
}

impl fmt::Debug for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Add for Service {
    type Output = Service;
    fn add(self, rhs: Service) -> Service {
        Service(self.0 + rhs.0)
    }
}

impl AddAssign for Service {
    fn add_assign(&mut self, rhs: Service) {
        self.0 += rhs.0;
    }
}

impl Sub for Service {
    type Output = Service;
    fn sub(self, rhs: Service) -> Service {
        Service(self.0 - rhs.0)
    }
}

impl Mul<u64> for Service {
    type Output = Service;
    fn mul(self, rhs: u64) -> Service {
        Service(self.0 * rhs)
    }
}

impl Div<Service> for Service {
    type Output = u64;
    fn div(self, rhs: Service) -> u64 {
        self.0 / rhs.0
    }
}

impl Sum for Service {
    fn sum<I: Iterator<Item = Service>>(iter: I) -> Self {
        Service(iter.map(|s| s.0).sum())
    }
}

/// Rescale a quantity expressed in `from_units`-per-second to one
/// expressed in `to_units`-per-second, e.g. converting a period given
/// in microseconds into the analysis's nanosecond-based time base.
/// Pure: the crate carries no global notion of "the" time base, only
/// whatever scalar unit the caller used to build its `Duration`s.
pub fn time_to_time(value: Time, from_units_per_second: Time, to_units_per_second: Time) -> Time {
    // value * to/from, reordered to push the multiply before the
    // divide so small values don't round to zero.
    (value as u128 * to_units_per_second as u128 / from_units_per_second as u128) as Time
}

/// Convert a processor cycle count at `hz` into a duration in the
/// caller's time base (`time_units_per_second`), e.g. turning a
/// measured cycle budget into a `Duration` expressed in nanoseconds.
pub fn cycles_to_time(cycles: Time, hz: Time, time_units_per_second: Time) -> Duration {
    Duration::from(time_to_time(cycles, hz, time_units_per_second))
}
