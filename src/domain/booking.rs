use chrono::{DateTime, NaiveDate, Utc};
use derive_more::{Deref, Display, Error, From, IntoIterator};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{Aggregation, Entity, Event, EventQueue, Id};

use super::calendar::{CalendarGrid, DayClassification};
use super::core::ServiceId;

/// Selection ID, one per widget session
#[derive(
    Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Display, From, Deref, Default,
)]
pub struct SelectionId(u64);

impl Id for SelectionId {
    type Inner = u64;
}

/// Selection event
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelectionEvent {
    /// An in-range day was picked
    DayPicked {
        date: NaiveDate,
        availability: DayAvailability,
    },
    /// A service was picked for the selected day
    ServicePicked { service_id: ServiceId },
    /// A time was picked on the selected day
    SlotPicked { start: DateTime<Utc> },
    /// The booking request went out
    ConfirmStarted,
    /// The booking was accepted; the widget starts over
    ConfirmSucceeded,
    /// The booking failed; the choices stay for another try
    ConfirmFailed,
    /// The search changed and the choices no longer apply
    SelectionReset,
}

impl Event for SelectionEvent {
    type Id = SelectionId;
}

/// What a picked day offers.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayAvailability {
    Available,
    Unavailable,
}

/// Where the customer stands in the booking flow.
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SelectionState {
    /// Nothing picked yet
    #[default]
    NoDaySelected,
    /// A day inside the search window was picked
    DaySelected {
        date: NaiveDate,
        availability: DayAvailability,
        service: Option<ServiceId>,
        slot: Option<DateTime<Utc>>,
        booking_in_progress: bool,
    },
}

/// Booking selection aggregate.
///
/// Day, service and time are picked in any order once a day is selected;
/// confirmation needs all of them and runs at most once at a time. While a
/// confirmation is in flight every other operation is rejected.
#[derive(Debug, Default, Clone, IntoIterator, Serialize, Deserialize)]
pub struct Selection {
    id: SelectionId,
    state: SelectionState,
    #[serde(skip)]
    #[into_iterator]
    events: EventQueue<SelectionEvent>,
}

impl Selection {
    pub fn create(id: SelectionId) -> Self {
        Selection {
            id,
            ..Default::default()
        }
    }

    /// Day click. An out-of-range day changes nothing and reports why;
    /// picking a new day drops any service and time chosen for the old one.
    pub fn pick_day(
        &mut self,
        grid: &CalendarGrid,
        date: NaiveDate,
    ) -> Result<DayAvailability, SelectionError> {
        self.validate_not_booking()?;
        let availability = match grid.classify(date) {
            DayClassification::OutOfRange => return Err(SelectionError::DayOutOfRange),
            DayClassification::Available => DayAvailability::Available,
            DayClassification::Unavailable => DayAvailability::Unavailable,
        };
        debug!("selected day {} ({:?})", date, availability);
        self.state = SelectionState::DaySelected {
            date,
            availability,
            service: None,
            slot: None,
            booking_in_progress: false,
        };
        self.events
            .push(SelectionEvent::DayPicked { date, availability });
        Ok(availability)
    }

    pub fn pick_service(
        &mut self,
        grid: &CalendarGrid,
        service_id: ServiceId,
    ) -> Result<(), SelectionError> {
        self.validate_service_picked()?;
        if grid.view().service(&service_id).is_none() {
            return Err(SelectionError::UnknownService);
        }
        if let SelectionState::DaySelected { service, .. } = &mut self.state {
            *service = Some(service_id.clone());
        }
        self.events
            .push(SelectionEvent::ServicePicked { service_id });
        Ok(())
    }

    pub fn pick_slot(
        &mut self,
        grid: &CalendarGrid,
        start: DateTime<Utc>,
    ) -> Result<(), SelectionError> {
        let date = self.validate_slot_picked()?;
        if !grid
            .available_slots_on(date)
            .iter()
            .any(|s| s.start() == start)
        {
            return Err(SelectionError::SlotNotBookable);
        }
        if let SelectionState::DaySelected { slot, .. } = &mut self.state {
            *slot = Some(start);
        }
        self.events.push(SelectionEvent::SlotPicked { start });
        Ok(())
    }

    pub fn can_confirm(&self) -> bool {
        self.validate_confirm_started().is_ok()
    }

    pub fn begin_confirm(&mut self) -> Result<(), SelectionError> {
        self.validate_confirm_started()?;
        if let SelectionState::DaySelected {
            booking_in_progress,
            ..
        } = &mut self.state
        {
            *booking_in_progress = true;
        }
        self.events.push(SelectionEvent::ConfirmStarted);
        Ok(())
    }

    /// Successful confirmation clears the whole selection.
    pub fn finish_confirm(&mut self) -> Result<(), SelectionError> {
        self.validate_confirming()?;
        debug!("booking confirmed, selection cleared");
        self.state = SelectionState::NoDaySelected;
        self.events.push(SelectionEvent::ConfirmSucceeded);
        Ok(())
    }

    /// Failed confirmation keeps the choices so the customer can retry.
    pub fn abort_confirm(&mut self) -> Result<(), SelectionError> {
        self.validate_confirming()?;
        if let SelectionState::DaySelected {
            booking_in_progress,
            ..
        } = &mut self.state
        {
            *booking_in_progress = false;
        }
        self.events.push(SelectionEvent::ConfirmFailed);
        Ok(())
    }

    pub fn reset(&mut self) -> Result<(), SelectionError> {
        self.validate_not_booking()?;
        self.state = SelectionState::NoDaySelected;
        self.events.push(SelectionEvent::SelectionReset);
        Ok(())
    }

    pub fn state(&self) -> &SelectionState {
        &self.state
    }

    pub fn selected_date(&self) -> Option<NaiveDate> {
        match &self.state {
            SelectionState::DaySelected { date, .. } => Some(*date),
            SelectionState::NoDaySelected => None,
        }
    }

    pub fn selected_service(&self) -> Option<&ServiceId> {
        match &self.state {
            SelectionState::DaySelected { service, .. } => service.as_ref(),
            SelectionState::NoDaySelected => None,
        }
    }

    pub fn selected_slot(&self) -> Option<DateTime<Utc>> {
        match &self.state {
            SelectionState::DaySelected { slot, .. } => *slot,
            SelectionState::NoDaySelected => None,
        }
    }

    pub fn is_booking(&self) -> bool {
        matches!(
            self.state,
            SelectionState::DaySelected {
                booking_in_progress: true,
                ..
            }
        )
    }

    fn validate_not_booking(&self) -> Result<(), SelectionError> {
        match self.is_booking() {
            true => Err(SelectionError::BookingInProgress),
            false => Ok(()),
        }
    }

    fn validate_service_picked(&self) -> Result<(), SelectionError> {
        self.validate_not_booking()?;
        match &self.state {
            SelectionState::NoDaySelected => Err(SelectionError::NoDaySelected),
            SelectionState::DaySelected {
                availability: DayAvailability::Unavailable,
                ..
            } => Err(SelectionError::DayUnavailable),
            SelectionState::DaySelected { .. } => Ok(()),
        }
    }

    fn validate_slot_picked(&self) -> Result<NaiveDate, SelectionError> {
        self.validate_not_booking()?;
        match &self.state {
            SelectionState::NoDaySelected => Err(SelectionError::NoDaySelected),
            SelectionState::DaySelected {
                availability: DayAvailability::Unavailable,
                ..
            } => Err(SelectionError::DayUnavailable),
            SelectionState::DaySelected { date, .. } => Ok(*date),
        }
    }

    fn validate_confirm_started(&self) -> Result<(), SelectionError> {
        match &self.state {
            SelectionState::NoDaySelected => Err(SelectionError::NoDaySelected),
            SelectionState::DaySelected {
                booking_in_progress: true,
                ..
            } => Err(SelectionError::BookingInProgress),
            SelectionState::DaySelected { service: None, .. }
            | SelectionState::DaySelected { slot: None, .. } => {
                Err(SelectionError::IncompleteSelection)
            }
            SelectionState::DaySelected { .. } => Ok(()),
        }
    }

    fn validate_confirming(&self) -> Result<(), SelectionError> {
        match self.is_booking() {
            true => Ok(()),
            false => Err(SelectionError::NotConfirming),
        }
    }
}

impl Entity for Selection {
    type Id = SelectionId;

    const ENTITY_NAME: &'static str = "selection";

    fn id(&self) -> Self::Id {
        self.id
    }
}

impl Aggregation for Selection {
    type Event = SelectionEvent;
    type Error = SelectionError;

    fn validate(&self, event: &Self::Event) -> Result<(), Self::Error> {
        match event {
            SelectionEvent::DayPicked { .. } | SelectionEvent::SelectionReset => {
                self.validate_not_booking()
            }
            SelectionEvent::ServicePicked { .. } => self.validate_service_picked(),
            SelectionEvent::SlotPicked { .. } => self.validate_slot_picked().map(|_| ()),
            SelectionEvent::ConfirmStarted => self.validate_confirm_started(),
            SelectionEvent::ConfirmSucceeded | SelectionEvent::ConfirmFailed => {
                self.validate_confirming()
            }
        }
    }

    fn apply(&mut self, event: Self::Event) {
        if self.validate(&event).is_err() {
            return;
        }
        match event {
            SelectionEvent::DayPicked { date, availability } => {
                self.state = SelectionState::DaySelected {
                    date,
                    availability,
                    service: None,
                    slot: None,
                    booking_in_progress: false,
                };
            }
            SelectionEvent::ServicePicked { service_id } => {
                if let SelectionState::DaySelected { service, .. } = &mut self.state {
                    *service = Some(service_id);
                }
            }
            SelectionEvent::SlotPicked { start } => {
                if let SelectionState::DaySelected { slot, .. } = &mut self.state {
                    *slot = Some(start);
                }
            }
            SelectionEvent::ConfirmStarted => {
                if let SelectionState::DaySelected {
                    booking_in_progress,
                    ..
                } = &mut self.state
                {
                    *booking_in_progress = true;
                }
            }
            SelectionEvent::ConfirmSucceeded | SelectionEvent::SelectionReset => {
                self.state = SelectionState::NoDaySelected;
            }
            SelectionEvent::ConfirmFailed => {
                if let SelectionState::DaySelected {
                    booking_in_progress,
                    ..
                } = &mut self.state
                {
                    *booking_in_progress = false;
                }
            }
        }
    }

    fn events(&self) -> &EventQueue<Self::Event> {
        &self.events
    }

    fn events_mut(&mut self) -> &mut EventQueue<Self::Event> {
        &mut self.events
    }
}

impl PartialEq for Selection {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.state == other.state
    }
}

impl Eq for Selection {}

/// Selection error
#[derive(Error, Display, Debug)]
pub enum SelectionError {
    /// The day lies outside the current search window
    #[display(fmt = "The day is not part of the current search range")]
    DayOutOfRange,
    /// The day is in range but offers nothing bookable
    #[display(fmt = "The day has no available times")]
    DayUnavailable,
    /// A day must be picked first
    #[display(fmt = "No day is selected")]
    NoDaySelected,
    /// The service does not exist in the current results
    #[display(fmt = "Service not found in the current results")]
    UnknownService,
    /// The time is not a free slot on the selected day
    #[display(fmt = "The time is not bookable on the selected day")]
    SlotNotBookable,
    /// Confirmation needs both a service and a time
    #[display(fmt = "Select a service and a time first")]
    IncompleteSelection,
    /// Another confirmation is still running
    #[display(fmt = "A booking is already being confirmed")]
    BookingInProgress,
    /// There is no confirmation to finish
    #[display(fmt = "No booking is being confirmed")]
    NotConfirming,
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use crate::domain::availability::AvailabilityStore;

    use super::*;

    fn grid() -> CalendarGrid {
        let store = AvailabilityStore::sample();
        let search = store.span().unwrap();
        CalendarGrid::new(store.availability(&search, None), search)
    }

    fn afternoon_grid() -> CalendarGrid {
        // Dec 1 has only booked slots left once the search starts at noon.
        let store = AvailabilityStore::sample();
        let view = store.availability(&store.span().unwrap(), None);
        let search = Utc.with_ymd_and_hms(2025, 12, 1, 12, 0, 0).unwrap()
            ..Utc.with_ymd_and_hms(2025, 12, 2, 0, 0, 0).unwrap();
        CalendarGrid::new(view, search)
    }

    fn date(month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, month, day).unwrap()
    }

    fn ready_selection(grid: &CalendarGrid) -> Selection {
        let mut selection = Selection::create(SelectionId(1));
        selection.pick_day(grid, date(12, 1)).unwrap();
        selection
            .pick_service(grid, ServiceId::from("service-1"))
            .unwrap();
        selection
            .pick_slot(grid, Utc.with_ymd_and_hms(2025, 12, 1, 10, 0, 0).unwrap())
            .unwrap();
        selection
    }

    #[tokio::test]
    async fn test_day_click_outcomes() {
        let grid = grid();
        let mut selection = Selection::create(SelectionId(1));
        assert_eq!(
            selection.pick_day(&grid, date(12, 1)).unwrap(),
            DayAvailability::Available,
        );
        assert_eq!(selection.selected_date(), Some(date(12, 1)));

        let unavailable = afternoon_grid();
        let mut selection = Selection::create(SelectionId(2));
        assert_eq!(
            selection.pick_day(&unavailable, date(12, 1)).unwrap(),
            DayAvailability::Unavailable,
        );
    }

    #[tokio::test]
    async fn test_out_of_range_click_changes_nothing() {
        let grid = grid();
        let mut selection = ready_selection(&grid);
        let before = selection.state().clone();
        assert!(matches!(
            selection.pick_day(&grid, date(11, 29)),
            Err(SelectionError::DayOutOfRange),
        ));
        assert_eq!(selection.state(), &before);
    }

    #[tokio::test]
    async fn test_service_needs_an_available_day() {
        let grid = grid();
        let mut selection = Selection::create(SelectionId(1));
        assert!(matches!(
            selection.pick_service(&grid, ServiceId::from("service-1")),
            Err(SelectionError::NoDaySelected),
        ));

        let unavailable = afternoon_grid();
        selection.pick_day(&unavailable, date(12, 1)).unwrap();
        assert!(matches!(
            selection.pick_service(&unavailable, ServiceId::from("service-1")),
            Err(SelectionError::DayUnavailable),
        ));
    }

    #[tokio::test]
    async fn test_unknown_service_is_rejected() {
        let grid = grid();
        let mut selection = Selection::create(SelectionId(1));
        selection.pick_day(&grid, date(12, 1)).unwrap();
        assert!(matches!(
            selection.pick_service(&grid, ServiceId::from("service-9")),
            Err(SelectionError::UnknownService),
        ));
    }

    #[tokio::test]
    async fn test_slot_must_be_bookable_on_the_day() {
        let grid = grid();
        let mut selection = Selection::create(SelectionId(1));
        selection.pick_day(&grid, date(11, 30)).unwrap();
        // 10:00 on Nov 30 exists but is already taken.
        assert!(matches!(
            selection.pick_slot(&grid, Utc.with_ymd_and_hms(2025, 11, 30, 10, 0, 0).unwrap()),
            Err(SelectionError::SlotNotBookable),
        ));
        // A slot from another day does not count either.
        assert!(matches!(
            selection.pick_slot(&grid, Utc.with_ymd_and_hms(2025, 12, 1, 10, 0, 0).unwrap()),
            Err(SelectionError::SlotNotBookable),
        ));
        selection
            .pick_slot(&grid, Utc.with_ymd_and_hms(2025, 11, 30, 9, 0, 0).unwrap())
            .unwrap();
    }

    #[tokio::test]
    async fn test_confirm_needs_service_and_slot() {
        let grid = grid();
        let mut selection = Selection::create(SelectionId(1));
        assert!(!selection.can_confirm());
        selection.pick_day(&grid, date(12, 1)).unwrap();
        assert!(!selection.can_confirm());
        selection
            .pick_service(&grid, ServiceId::from("service-1"))
            .unwrap();
        assert!(matches!(
            selection.begin_confirm(),
            Err(SelectionError::IncompleteSelection),
        ));
        selection
            .pick_slot(&grid, Utc.with_ymd_and_hms(2025, 12, 1, 10, 0, 0).unwrap())
            .unwrap();
        assert!(selection.can_confirm());

        // A time without a service is just as incomplete.
        let mut selection = Selection::create(SelectionId(2));
        selection.pick_day(&grid, date(12, 1)).unwrap();
        selection
            .pick_slot(&grid, Utc.with_ymd_and_hms(2025, 12, 1, 10, 0, 0).unwrap())
            .unwrap();
        assert!(!selection.can_confirm());
    }

    #[tokio::test]
    async fn test_confirm_lifecycle() {
        let grid = grid();
        let mut selection = ready_selection(&grid);
        selection.begin_confirm().unwrap();
        assert!(selection.is_booking());
        assert!(matches!(
            selection.begin_confirm(),
            Err(SelectionError::BookingInProgress),
        ));
        assert!(matches!(
            selection.pick_day(&grid, date(12, 2)),
            Err(SelectionError::BookingInProgress),
        ));
        selection.finish_confirm().unwrap();
        assert_eq!(selection.state(), &SelectionState::NoDaySelected);
        assert!(!selection.can_confirm());
        assert!(matches!(
            selection.finish_confirm(),
            Err(SelectionError::NotConfirming),
        ));
    }

    #[tokio::test]
    async fn test_failed_confirm_keeps_the_choices() {
        let grid = grid();
        let mut selection = ready_selection(&grid);
        selection.begin_confirm().unwrap();
        selection.abort_confirm().unwrap();
        assert!(!selection.is_booking());
        assert_eq!(
            selection.selected_service(),
            Some(&ServiceId::from("service-1")),
        );
        assert!(selection.can_confirm());
    }

    #[tokio::test]
    async fn test_new_day_drops_service_and_slot() {
        let grid = grid();
        let mut selection = ready_selection(&grid);
        selection.pick_day(&grid, date(12, 2)).unwrap();
        assert_eq!(selection.selected_service(), None);
        assert_eq!(selection.selected_slot(), None);
    }

    #[tokio::test]
    async fn test_replaying_events_rebuilds_the_state() {
        let grid = grid();
        let mut selection = ready_selection(&grid);
        let events = selection.pop_all();
        let mut replayed = Selection::create(SelectionId(1));
        for event in events {
            replayed.apply(event);
        }
        assert_eq!(replayed, selection);
    }
}
