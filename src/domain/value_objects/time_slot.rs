//! Appointment time slots.

use chrono::{Duration, NaiveTime};
use serde::Serialize;

/// Half-open `[start, end)` interval within a single day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeSlot {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

/// Reasons a slot cannot be built.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SlotError {
    #[error("Duration must be positive")]
    NonPositiveDuration,

    #[error("Appointment must end on the day it starts")]
    CrossesMidnight,
}

impl TimeSlot {
    /// Build a slot from its start time and length in minutes.
    pub fn starting_at(start: NaiveTime, duration_minutes: i32) -> Result<Self, SlotError> {
        if duration_minutes <= 0 {
            return Err(SlotError::NonPositiveDuration);
        }

        let (end, wrapped) =
            start.overflowing_add_signed(Duration::minutes(i64::from(duration_minutes)));

        // Ending exactly at midnight wraps to 00:00, which would break ordering.
        if wrapped != 0 || end <= start {
            return Err(SlotError::CrossesMidnight);
        }

        Ok(Self { start, end })
    }

    /// Two slots overlap when each starts before the other ends.
    pub fn overlaps(&self, other: &TimeSlot) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }
}
