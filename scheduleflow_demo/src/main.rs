use std::{error::Error, time::Duration};

use chrono::NaiveDate;
use scheduleflow::{
    domain::{
        availability::{
            AvailabilityProvider, AvailabilityRequest, AvailabilityStore, BookingRequest,
        },
        booking::Selection,
        calendar::{day_bounds, CalendarGrid},
        core::{AppointmentCustomer, ServiceId, ServiceType},
        Aggregation, ID_GENERATOR,
    },
    infrastructure::{DateField, InMemoryAvailabilityProvider, LOCALES},
    ScheduleFlowConfig,
};
use tracing::{error, info, warn, Level};

#[tokio::main]
async fn main() {
    match ScheduleFlowConfig::load() {
        Ok(config) => {
            tracing_subscriber::fmt()
                .with_max_level(Level::from(&config.logger.level))
                .init();
            if let Err(error) = walkthrough(&config).await {
                error!("Application error: {}", error);
            }
        }
        Err(error) => {
            tracing_subscriber::fmt::init();
            error!("Application error: {}", error)
        }
    }
}

/// Runs the whole booking flow once against the sample data set.
async fn walkthrough(config: &ScheduleFlowConfig) -> Result<(), Box<dyn Error>> {
    let locale = LOCALES.get(&config.locale.tag);
    let store = AvailabilityStore::sample();
    let span = store.span().ok_or("the sample data set is empty")?;
    let provider = InMemoryAvailabilityProvider::with_delay(
        store,
        Duration::from_millis(config.booking.confirm_delay_ms),
    );

    let request = AvailabilityRequest::new(ServiceType::Consultation, span.start, span.end)?;
    let view = provider.fetch_availability(request.clone()).await?;
    for service in view.available_services() {
        info!("service {}: {} min", service.name, service.duration_minutes);
    }
    let grid = CalendarGrid::new(view, request.range());
    info!(
        "searching {} .. {}",
        locale.format_date(span.start.date_naive()),
        locale.format_date(span.end.date_naive()),
    );
    for (date, classification) in grid.month(2025, 12) {
        info!("{} is {:?}", locale.format_date(date), classification);
    }

    // The customer narrows the window through the masked date inputs.
    let mut start_field = DateField::new(span.start.date_naive());
    let mut end_field = DateField::new(span.end.date_naive());
    start_field.input("01x12*2025");
    end_field.input("03122025");
    info!(
        "narrowed to {} .. {}",
        start_field.text(),
        end_field.text(),
    );
    let narrowed = day_bounds(start_field.date()).start..day_bounds(end_field.date()).end;
    let request = AvailabilityRequest::new(ServiceType::Consultation, narrowed.start, narrowed.end)?;
    let view = provider.fetch_availability(request.clone()).await?;
    let grid = CalendarGrid::new(view, request.range());

    let mut selection = Selection::create(ID_GENERATOR.generate().await);
    let december_10 = NaiveDate::from_ymd_opt(2025, 12, 10).ok_or("bad date")?;
    if let Err(error) = selection.pick_day(&grid, december_10) {
        warn!("{} rejected: {}", locale.format_date(december_10), error);
    }

    let december_1 = NaiveDate::from_ymd_opt(2025, 12, 1).ok_or("bad date")?;
    selection.pick_day(&grid, december_1)?;
    let slots = grid.available_slots_on(december_1);
    for slot in &slots {
        info!("{} is open", locale.format_time(slot.start()));
    }
    let first = slots.first().ok_or("no open time on the selected day")?;
    selection.pick_service(&grid, ServiceId::from("service-1"))?;
    selection.pick_slot(&grid, first.start())?;

    selection.begin_confirm()?;
    let booking = BookingRequest {
        service_id: selection
            .selected_service()
            .cloned()
            .ok_or("no service selected")?,
        customer: AppointmentCustomer::new(
            "Alice Santos".to_owned(),
            "alice@example.com".to_owned(),
        ),
        requested_datetime: selection.selected_slot().ok_or("no time selected")?,
    };
    match provider.book(booking).await {
        Ok(receipt) => {
            selection.finish_confirm()?;
            info!(
                "appointment {} booked, view token {}",
                receipt.appointment_id, receipt.view_token,
            );

            // Another customer takes the one time the day still offers.
            let view = provider.fetch_availability(request.clone()).await?;
            let grid = CalendarGrid::new(view, request.range());
            if let Some(open) = grid.available_slots_on(december_1).first() {
                provider
                    .book(BookingRequest {
                        service_id: ServiceId::from("service-1"),
                        customer: AppointmentCustomer::new(
                            "Bruno Lima".to_owned(),
                            "bruno@example.com".to_owned(),
                        ),
                        requested_datetime: open.start(),
                    })
                    .await?;
            }
            let view = provider.fetch_availability(request.clone()).await?;
            let grid = CalendarGrid::new(view, request.range());
            let availability = selection.pick_day(&grid, december_1)?;
            info!(
                "{} is now {:?}",
                locale.format_date(december_1),
                availability,
            );

            provider.cancel(receipt.cancellation_token).await?;
            info!("appointment {} cancelled again", receipt.appointment_id);
        }
        Err(error) => {
            selection.abort_confirm()?;
            error!("booking failed with {}: {}", error.code(), error);
        }
    }

    selection.reset()?;
    for event in selection.pop_all() {
        info!("selection event: {:?}", event);
    }
    Ok(())
}
