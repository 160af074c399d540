use jiff::{SignedDuration, Timestamp};
use serde::Serialize;

/// Fixed scheduling slot length.
pub const SLOT_DURATION: SignedDuration = SignedDuration::from_mins(30);

/// Slot length in hours, for kW ↔ kWh conversion.
pub const SLOT_HOURS: f64 = 0.5;

/// The ordered half-hour slot grid covering a planning window. The grid
/// start is floored to the half-hour so slot boundaries line up with the
/// price and forecast series.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSlots {
    start: Timestamp,
    count: usize,
}

/// Floor an instant to the enclosing half-hour boundary.
pub fn floor_to_slot(instant: Timestamp) -> Timestamp {
    let seconds = instant.as_second();
    let remainder = seconds.rem_euclid(SLOT_DURATION.as_secs());
    instant - SignedDuration::from_secs(remainder)
}

impl TimeSlots {
    pub fn build(start: Timestamp, end: Timestamp) -> TimeSlots {
        let start = floor_to_slot(start);
        let mut count = 0;
        let mut current = start;
        while current < end {
            count += 1;
            current += SLOT_DURATION;
        }

        TimeSlots { start, count }
    }

    pub fn start(&self) -> Timestamp {
        self.start
    }

    pub fn end(&self) -> Timestamp {
        self.start + SLOT_DURATION * self.count as i32
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn hours(&self) -> f64 {
        self.count as f64 * SLOT_HOURS
    }

    pub fn at(&self, index: usize) -> Timestamp {
        self.start + SLOT_DURATION * index as i32
    }

    /// Index of the first slot starting at or after the given instant.
    /// `None` when the instant falls past the grid.
    pub fn index_at_or_after(&self, instant: Timestamp) -> Option<usize> {
        if self.count == 0 {
            return None;
        }
        if instant <= self.start {
            return Some(0);
        }

        let offset = instant.duration_since(self.start).as_secs();
        let slot_secs = SLOT_DURATION.as_secs();
        let index = offset.div_euclid(slot_secs) + i64::from(offset.rem_euclid(slot_secs) != 0);

        (index < self.count as i64).then_some(index as usize)
    }

    /// Index of the slot containing the given instant.
    pub fn index_containing(&self, instant: Timestamp) -> Option<usize> {
        if self.count == 0 || instant < self.start {
            return None;
        }

        let index = instant.duration_since(self.start).as_secs() / SLOT_DURATION.as_secs();
        (index < self.count as i64).then_some(index as usize)
    }

    pub fn iter(&self) -> impl Iterator<Item = Timestamp> + '_ {
        (0..self.count).map(|index| self.at(index))
    }
}
