use std::ops::Range;

use chrono::{DateTime, Duration, Utc};
use derive_more::{Display, Error};
use serde::{Deserialize, Serialize};

/// A bookable interval in the availability data set.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    is_available: bool,
}

impl TimeSlot {
    pub fn create(
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        is_available: bool,
    ) -> Result<Self, TimeSlotError> {
        Self::validate_interval(&start, &end)?;
        Ok(TimeSlot {
            start,
            end,
            is_available,
        })
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn is_available(&self) -> bool {
        self.is_available
    }

    pub fn time(&self) -> Range<DateTime<Utc>> {
        self.start..self.end
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    pub fn with_availability(self, is_available: bool) -> Self {
        TimeSlot {
            is_available,
            ..self
        }
    }

    /// Open-interval test: intervals that only touch at a bound do not overlap.
    pub fn overlaps(&self, time: &Range<DateTime<Utc>>) -> bool {
        self.start < time.end && self.end > time.start
    }

    /// Half-open membership test: the end instant belongs to the next slot.
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant < self.end
    }

    fn validate_interval(
        start: &DateTime<Utc>,
        end: &DateTime<Utc>,
    ) -> Result<(), TimeSlotError> {
        match start < end {
            true => Ok(()),
            false => Err(TimeSlotError::InvalidInterval),
        }
    }
}

/// Slot interval error
#[derive(Error, Display, Debug)]
pub enum TimeSlotError {
    #[display(fmt = "End time must be after start time")]
    InvalidInterval,
}
