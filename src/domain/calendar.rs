use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc};
use intervaltree::IntervalTree;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::availability::{AvailabilityView, SearchRange};
use super::core::TimeSlot;

/// UTC bounds of a calendar day, 00:00:00.000 through 23:59:59.999.
pub fn day_bounds(date: NaiveDate) -> SearchRange {
    let start = date.and_hms_opt(0, 0, 0).unwrap();
    let end = date.and_hms_milli_opt(23, 59, 59, 999).unwrap();
    Utc.from_utc_datetime(&start)..Utc.from_utc_datetime(&end)
}

/// How a calendar day renders within the active search.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayClassification {
    /// Outside the search window; the tile is disabled
    OutOfRange,
    /// At least one free slot touches the day within the window
    Available,
    /// Inside the window but nothing bookable
    Unavailable,
}

/// Day-by-day rendering model for one search result.
///
/// A day counts as available only when a free slot overlaps both the day
/// bounds and the search window. A slot the window never covered must not
/// light up a day the navigation arrows can still reach.
pub struct CalendarGrid {
    view: AvailabilityView,
    search: SearchRange,
    index: IntervalTree<DateTime<Utc>, TimeSlot>,
}

impl CalendarGrid {
    pub fn new(view: AvailabilityView, search: SearchRange) -> Self {
        let index: IntervalTree<DateTime<Utc>, TimeSlot> = view
            .time_slots()
            .iter()
            .map(|s| (s.time(), *s))
            .collect();
        debug!(
            "calendar grid over {} slots, search {} .. {}",
            view.time_slots().len(),
            search.start,
            search.end,
        );
        CalendarGrid {
            view,
            search,
            index,
        }
    }

    pub fn view(&self) -> &AvailabilityView {
        &self.view
    }

    pub fn search(&self) -> &SearchRange {
        &self.search
    }

    /// Day bounds against the search window: the start of the day falls
    /// before the window ends and the end of the day is not before it starts.
    pub fn in_range(&self, date: NaiveDate) -> bool {
        let bounds = day_bounds(date);
        bounds.start < self.search.end && bounds.end >= self.search.start
    }

    pub fn has_availability(&self, date: NaiveDate) -> bool {
        self.classify(date) == DayClassification::Available
    }

    /// Out-of-range days cannot be picked.
    pub fn is_disabled(&self, date: NaiveDate) -> bool {
        !self.in_range(date)
    }

    pub fn classify(&self, date: NaiveDate) -> DayClassification {
        if !self.in_range(date) {
            return DayClassification::OutOfRange;
        }
        match self.day_has_free_slot(date) {
            true => DayClassification::Available,
            false => DayClassification::Unavailable,
        }
    }

    /// Free slots a customer can pick on the day, ordered by start.
    pub fn available_slots_on(&self, date: NaiveDate) -> Vec<TimeSlot> {
        let mut slots: Vec<TimeSlot> = self
            .index
            .query(day_bounds(date))
            .filter(|e| e.value.is_available() && e.value.overlaps(&self.search))
            .map(|e| e.value)
            .collect();
        slots.sort_by_key(|s| s.start());
        slots
    }

    /// Classification of every day of a month, for tile rendering.
    pub fn month(&self, year: i32, month: u32) -> Vec<(NaiveDate, DayClassification)> {
        let mut days = Vec::new();
        let mut date = match NaiveDate::from_ymd_opt(year, month, 1) {
            Some(d) => d,
            None => return days,
        };
        while date.month() == month {
            days.push((date, self.classify(date)));
            date = match date.succ_opt() {
                Some(d) => d,
                None => break,
            };
        }
        days
    }

    fn day_has_free_slot(&self, date: NaiveDate) -> bool {
        self.index
            .query(day_bounds(date))
            .any(|e| e.value.is_available() && e.value.overlaps(&self.search))
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use crate::domain::availability::AvailabilityStore;

    use super::*;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn sample_grid() -> CalendarGrid {
        let store = AvailabilityStore::sample();
        let search = store.span().unwrap();
        CalendarGrid::new(store.availability(&search, None), search)
    }

    #[tokio::test]
    async fn test_day_bounds_cover_the_whole_day() {
        let bounds = day_bounds(date(2025, 12, 1));
        assert_eq!(bounds.start.to_rfc3339(), "2025-12-01T00:00:00+00:00");
        assert_eq!(bounds.end - bounds.start, Duration::milliseconds(86_399_999));
    }

    #[tokio::test]
    async fn test_days_outside_the_window_are_out_of_range() {
        let grid = sample_grid();
        assert_eq!(grid.classify(date(2025, 11, 29)), DayClassification::OutOfRange);
        assert_eq!(grid.classify(date(2025, 12, 11)), DayClassification::OutOfRange);
        assert!(grid.is_disabled(date(2025, 11, 29)));
        assert!(!grid.is_disabled(date(2025, 12, 5)));
    }

    #[tokio::test]
    async fn test_days_with_free_slots_are_available() {
        let grid = sample_grid();
        for day in [30, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10] {
            let month = if day == 30 { 11 } else { 12 };
            assert_eq!(
                grid.classify(date(2025, month, day)),
                DayClassification::Available,
            );
        }
    }

    #[tokio::test]
    async fn test_fully_booked_day_is_unavailable() {
        let start = "2025-12-01T10:00:00Z".parse::<DateTime<Utc>>().unwrap();
        let slots = vec![
            TimeSlot::create(start, start + Duration::minutes(30), false).unwrap(),
            TimeSlot::create(
                start + Duration::minutes(30),
                start + Duration::minutes(60),
                false,
            )
            .unwrap(),
        ];
        let store = AvailabilityStore::new(slots, Vec::new());
        let search = store.span().unwrap();
        let grid = CalendarGrid::new(store.availability(&search, None), search);
        assert_eq!(
            grid.classify(date(2025, 12, 1)),
            DayClassification::Unavailable,
        );
    }

    #[tokio::test]
    async fn test_free_slot_outside_the_window_does_not_count() {
        // Keep the wide fetch result but narrow the search to the afternoon:
        // the free morning slots on Dec 1 still sit in the view, yet a search
        // that never covered them must not light the day up.
        let store = AvailabilityStore::sample();
        let view = store.availability(&store.span().unwrap(), None);
        let search = "2025-12-01T12:00:00Z".parse::<DateTime<Utc>>().unwrap()
            .."2025-12-02T00:00:00Z".parse::<DateTime<Utc>>().unwrap();
        let grid = CalendarGrid::new(view, search);
        assert_eq!(
            grid.classify(date(2025, 12, 1)),
            DayClassification::Unavailable,
        );
    }

    #[tokio::test]
    async fn test_day_partially_covered_by_the_window() {
        let store = AvailabilityStore::sample();
        let search = "2025-11-30T14:10:00Z".parse::<DateTime<Utc>>().unwrap()
            .."2025-12-11T00:00:00Z".parse::<DateTime<Utc>>().unwrap();
        let grid = CalendarGrid::new(store.availability(&search, None), search);
        // The 14:00 slot is cut by the window start but still overlaps it.
        assert_eq!(
            grid.classify(date(2025, 11, 30)),
            DayClassification::Available,
        );

        let search = "2025-11-30T15:00:00Z".parse::<DateTime<Utc>>().unwrap()
            .."2025-12-11T00:00:00Z".parse::<DateTime<Utc>>().unwrap();
        let grid = CalendarGrid::new(store.availability(&search, None), search);
        // Still in range, but every slot of the day ended by 15:00.
        assert_eq!(
            grid.classify(date(2025, 11, 30)),
            DayClassification::Unavailable,
        );
    }

    #[tokio::test]
    async fn test_two_day_window_over_the_sample_data() {
        let store = AvailabilityStore::sample();
        let search = "2025-11-30T00:00:00Z".parse::<DateTime<Utc>>().unwrap()
            .."2025-12-02T00:00:00Z".parse::<DateTime<Utc>>().unwrap();
        let grid = CalendarGrid::new(store.availability(&search, None), search);
        assert_eq!(grid.classify(date(2025, 11, 30)), DayClassification::Available);
        assert_eq!(grid.classify(date(2025, 12, 1)), DayClassification::Available);
        assert_eq!(grid.classify(date(2025, 11, 29)), DayClassification::OutOfRange);
        assert_eq!(grid.classify(date(2025, 12, 2)), DayClassification::OutOfRange);
    }

    #[tokio::test]
    async fn test_midnight_window_bounds() {
        let store = AvailabilityStore::sample();
        let search = "2025-12-02T00:00:00Z".parse::<DateTime<Utc>>().unwrap()
            .."2025-12-03T00:00:00Z".parse::<DateTime<Utc>>().unwrap();
        let grid = CalendarGrid::new(store.availability(&search, None), search);
        assert_eq!(grid.classify(date(2025, 12, 1)), DayClassification::OutOfRange);
        assert_eq!(grid.classify(date(2025, 12, 2)), DayClassification::Available);
        assert_eq!(grid.classify(date(2025, 12, 3)), DayClassification::OutOfRange);
    }

    #[tokio::test]
    async fn test_slot_list_matches_classification() {
        let grid = sample_grid();
        let slots = grid.available_slots_on(date(2025, 12, 1));
        assert_eq!(slots.len(), 3);
        assert!(slots.windows(2).all(|w| w[0].start() < w[1].start()));
        assert!(slots.iter().all(|s| s.is_available()));
        // Every available day lists at least one slot and vice versa.
        for day in grid.month(2025, 12) {
            let listed = !grid.available_slots_on(day.0).is_empty();
            assert_eq!(listed, day.1 == DayClassification::Available);
        }
    }

    #[tokio::test]
    async fn test_month_covers_every_day() {
        let grid = sample_grid();
        let days = grid.month(2025, 12);
        assert_eq!(days.len(), 31);
        assert_eq!(days[0].0, date(2025, 12, 1));
        assert_eq!(days[10].1, DayClassification::OutOfRange);
    }
}
