use chrono::{NaiveDate, TimeZone, Utc};
use scheduleflow::domain::availability::{
    AvailabilityProvider, AvailabilityRequest, AvailabilityStore, BookingRequest,
};
use scheduleflow::domain::booking::{DayAvailability, Selection, SelectionState};
use scheduleflow::domain::calendar::{day_bounds, CalendarGrid, DayClassification};
use scheduleflow::domain::core::{AppointmentCustomer, ServiceId, ServiceType};
use scheduleflow::infrastructure::{DateField, InMemoryAvailabilityProvider};

fn alice() -> AppointmentCustomer {
    AppointmentCustomer::new("Alice Santos".to_owned(), "alice@example.com".to_owned())
}

fn date(month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, month, day).unwrap()
}

/// The full happy path: search, pick a day, a service and a time, confirm,
/// then cancel and watch the slot come back.
#[tokio::test]
async fn test_booking_round_trip() {
    let store = AvailabilityStore::sample();
    let span = store.span().unwrap();
    let provider = InMemoryAvailabilityProvider::new(store);
    let request =
        AvailabilityRequest::new(ServiceType::Consultation, span.start, span.end).unwrap();
    let view = provider.fetch_availability(request.clone()).await.unwrap();
    let grid = CalendarGrid::new(view, request.range());

    let mut selection = Selection::create(1.into());
    assert_eq!(
        selection.pick_day(&grid, date(12, 1)).unwrap(),
        DayAvailability::Available,
    );
    let start = grid.available_slots_on(date(12, 1))[0].start();
    selection
        .pick_service(&grid, ServiceId::from("service-1"))
        .unwrap();
    selection.pick_slot(&grid, start).unwrap();
    assert!(selection.can_confirm());

    selection.begin_confirm().unwrap();
    let receipt = provider
        .book(BookingRequest {
            service_id: ServiceId::from("service-1"),
            customer: alice(),
            requested_datetime: start,
        })
        .await
        .unwrap();
    selection.finish_confirm().unwrap();
    assert_eq!(selection.state(), &SelectionState::NoDaySelected);

    // The booked time is gone from the next search.
    let view = provider.fetch_availability(request.clone()).await.unwrap();
    assert!(!view.slot_starting_at(start).unwrap().is_available());

    // Cancelling puts it back on offer.
    provider.cancel(receipt.cancellation_token).await.unwrap();
    let view = provider.fetch_availability(request).await.unwrap();
    assert!(view.slot_starting_at(start).unwrap().is_available());
}

/// Dates typed through the mask narrow the search, and days beyond the new
/// window stop being clickable.
#[tokio::test]
async fn test_masked_dates_drive_the_search() {
    let store = AvailabilityStore::sample();
    let span = store.span().unwrap();
    let provider = InMemoryAvailabilityProvider::new(store);

    let mut start_field = DateField::new(span.start.date_naive());
    let mut end_field = DateField::new(span.end.date_naive());
    start_field.input("01/12/2025");
    end_field.input("03 12 2025");
    let search = day_bounds(start_field.date()).start..day_bounds(end_field.date()).end;
    let request =
        AvailabilityRequest::new(ServiceType::Consultation, search.start, search.end).unwrap();
    let view = provider.fetch_availability(request).await.unwrap();
    let grid = CalendarGrid::new(view, search);

    assert_eq!(grid.classify(date(12, 2)), DayClassification::Available);
    assert_eq!(grid.classify(date(12, 4)), DayClassification::OutOfRange);
    assert_eq!(grid.classify(date(11, 30)), DayClassification::OutOfRange);

    let mut selection = Selection::create(1.into());
    assert!(selection.pick_day(&grid, date(12, 4)).is_err());
    assert_eq!(selection.state(), &SelectionState::NoDaySelected);
}

/// Booking every open time on a day turns the whole day unavailable on the
/// next search.
#[tokio::test]
async fn test_bookings_exhaust_a_day() {
    let store = AvailabilityStore::sample();
    let span = store.span().unwrap();
    let provider = InMemoryAvailabilityProvider::new(store);
    let request =
        AvailabilityRequest::new(ServiceType::Consultation, span.start, span.end).unwrap();

    // Two one-hour consultations cover all three open slots on Dec 1.
    for (hour, min) in [(10, 0), (11, 0)] {
        provider
            .book(BookingRequest {
                service_id: ServiceId::from("service-1"),
                customer: alice(),
                requested_datetime: Utc
                    .from_utc_datetime(&date(12, 1).and_hms_opt(hour, min, 0).unwrap()),
            })
            .await
            .unwrap();
    }

    let view = provider.fetch_availability(request.clone()).await.unwrap();
    let grid = CalendarGrid::new(view, request.range());
    assert_eq!(grid.classify(date(12, 1)), DayClassification::Unavailable);
    assert_eq!(grid.classify(date(12, 2)), DayClassification::Available);

    let mut selection = Selection::create(1.into());
    assert_eq!(
        selection.pick_day(&grid, date(12, 1)).unwrap(),
        DayAvailability::Unavailable,
    );
    assert!(selection
        .pick_service(&grid, ServiceId::from("service-1"))
        .is_err());
}
