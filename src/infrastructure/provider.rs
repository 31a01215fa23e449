use std::time::Duration;

use async_trait::async_trait;
use snowflake::SnowflakeIdGenerator;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::domain::availability::{
    AvailabilityProvider, AvailabilityRequest, AvailabilityStore, AvailabilityView, BookingError,
    BookingReceipt, BookingRequest, SearchRange,
};
use crate::domain::core::{Appointment, AppointmentId, Service, ServiceType};
use crate::domain::{Aggregation, DataAccessError, Entity, IdGenerator};

/// Backend stand-in serving canned availability out of process memory.
///
/// Bookings are written back, so a booked time stops being offered on the
/// next fetch. An artificial response delay makes the widget behave as it
/// would against a remote service.
pub struct InMemoryAvailabilityProvider {
    state: RwLock<ProviderState>,
    delay: Duration,
}

struct ProviderState {
    store: AvailabilityStore,
    appointments: Vec<Appointment>,
    ids: IdGenerator,
}

impl ProviderState {
    /// Availability is scoped per service type; an appointment only blocks
    /// the grid it was booked under.
    fn booked_over(&self, time: &SearchRange, service_type: ServiceType) -> bool {
        self.appointments.iter().any(|a| {
            self.store
                .service(a.service_id())
                .map_or(false, |s| s.service_type() == service_type)
                && a.conflicts_with(time)
        })
    }
}

impl InMemoryAvailabilityProvider {
    pub fn new(store: AvailabilityStore) -> Self {
        Self::with_delay(store, Duration::ZERO)
    }

    pub fn with_delay(store: AvailabilityStore, delay: Duration) -> Self {
        InMemoryAvailabilityProvider {
            state: RwLock::new(ProviderState {
                store,
                appointments: Vec::new(),
                ids: SnowflakeIdGenerator::new(1, 1).into(),
            }),
            delay,
        }
    }

    /// Provider over a fresh half-hour grid instead of the canned fixture.
    pub fn generated(time: &SearchRange, services: Vec<Service>) -> Self {
        Self::new(AvailabilityStore::generated(time, services))
    }

    pub async fn appointment_by_view_token(&self, view_token: Uuid) -> Option<Appointment> {
        let state = self.state.read().await;
        state
            .appointments
            .iter()
            .find(|a| a.view_token() == view_token)
            .cloned()
    }
}

#[async_trait]
impl AvailabilityProvider for InMemoryAvailabilityProvider {
    async fn fetch_availability(
        &self,
        request: AvailabilityRequest,
    ) -> Result<AvailabilityView, DataAccessError> {
        tokio::time::sleep(self.delay).await;
        let state = self.state.read().await;
        let view = state
            .store
            .availability(&request.range(), Some(request.service_type));
        let time_slots = view
            .time_slots()
            .iter()
            .map(|s| match state.booked_over(&s.time(), request.service_type) {
                true => s.with_availability(false),
                false => *s,
            })
            .collect();
        Ok(AvailabilityView::new(
            view.service_type(),
            time_slots,
            view.available_services().to_vec(),
        ))
    }

    async fn book(&self, request: BookingRequest) -> Result<BookingReceipt, BookingError> {
        tokio::time::sleep(self.delay).await;
        let mut state = self.state.write().await;
        let service = match state.store.service(&request.service_id) {
            Some(service) => service.clone(),
            None => return Err(BookingError::ServiceNotFound),
        };
        // The booked span runs for the service duration, not the slot length.
        let time = request.requested_datetime
            ..request.requested_datetime + service.duration().to_duration();
        // Bookings are slot-addressed; the requested start must be a slot
        // that is still on offer.
        if !state
            .store
            .slots()
            .iter()
            .any(|s| s.start() == time.start && s.is_available())
        {
            return Err(BookingError::TimeSlotConflict);
        }
        if state
            .appointments
            .iter()
            .any(|a| *a.service_id() == request.service_id && a.conflicts_with(&time))
        {
            return Err(BookingError::TimeSlotConflict);
        }
        if state
            .appointments
            .iter()
            .any(|a| a.customer().email() == request.customer.email() && a.conflicts_with(&time))
        {
            return Err(BookingError::UserTimeSlotConflict);
        }
        let id = AppointmentId::from(state.ids.generate());
        let mut appointment = Appointment::book(
            id,
            request.service_id.clone(),
            request.customer,
            time.clone(),
            Uuid::new_v4(),
            Uuid::new_v4(),
        )?;
        // No event stream here; the aggregate itself is the record.
        appointment.clear();
        let receipt = BookingReceipt {
            appointment_id: appointment.id(),
            cancellation_token: appointment.cancellation_token(),
            view_token: appointment.view_token(),
        };
        debug!(
            "booked appointment {} for {} at {}",
            receipt.appointment_id, request.service_id, time.start,
        );
        state.appointments.push(appointment);
        Ok(receipt)
    }

    async fn cancel(&self, cancellation_token: Uuid) -> Result<(), BookingError> {
        tokio::time::sleep(self.delay).await;
        let mut state = self.state.write().await;
        let appointment = match state
            .appointments
            .iter_mut()
            .find(|a| a.cancellation_token() == cancellation_token)
        {
            Some(appointment) => appointment,
            None => return Err(BookingError::AppointmentNotFound),
        };
        match appointment.cancel() {
            Ok(()) => {
                appointment.clear();
                debug!("cancelled appointment {}", appointment.id());
                Ok(())
            }
            Err(_) => Err(BookingError::InvalidStatusForCancellation),
        }
    }
}
