use std::fmt::{Debug, Formatter};

use chrono::{DateTime, TimeDelta};
use chrono_tz::Tz;

#[derive(Copy, Clone, Eq, PartialEq)]
#[must_use]
pub struct Interval {
    /// Inclusive.
    pub start: DateTime<Tz>,

    /// Exclusive.
    pub end: DateTime<Tz>,
}

impl Debug for Interval {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}..{:?}", self.start, self.end)
    }
}

impl Interval {
    pub const fn new(start: DateTime<Tz>, end: DateTime<Tz>) -> Self {
        Self { start, end }
    }

    #[must_use]
    pub fn duration(self) -> TimeDelta {
        self.end - self.start
    }

    #[must_use]
    pub fn contains(self, other: DateTime<Tz>) -> bool {
        (self.start <= other) && (other < self.end)
    }

    /// Inclusive at both ends, unlike [`Interval::contains`]. The period
    /// predicates treat an instant sitting exactly on the end boundary as
    /// still inside the period.
    #[must_use]
    pub fn contains_closed(self, other: DateTime<Tz>) -> bool {
        (self.start <= other) && (other <= self.end)
    }
}
