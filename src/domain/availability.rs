use std::ops::Range;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::domain::{DataAccessError, Entity};

use super::core::{
    AppointmentCustomer, AppointmentError, AppointmentId, Currency, Price, Service,
    ServiceDuration, ServiceId, ServiceType, TimeSlot,
};

/// Half-open search window. An inverted window matches nothing.
pub type SearchRange = Range<DateTime<Utc>>;

/// Immutable availability data set the widget searches over.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AvailabilityStore {
    slots: Vec<TimeSlot>,
    services: Vec<Service>,
}

impl AvailabilityStore {
    pub fn new(slots: Vec<TimeSlot>, services: Vec<Service>) -> Self {
        AvailabilityStore { slots, services }
    }

    /// Fixed data set used by the interactive walkthrough and the tests.
    pub fn sample() -> Self {
        let slots = [
            ("2025-11-30T09:00:00Z", true),
            ("2025-11-30T09:30:00Z", true),
            ("2025-11-30T10:00:00Z", false),
            ("2025-11-30T10:30:00Z", true),
            ("2025-11-30T14:00:00Z", true),
            ("2025-11-30T14:30:00Z", false),
            ("2025-12-01T10:00:00Z", true),
            ("2025-12-01T10:30:00Z", true),
            ("2025-12-01T11:00:00Z", true),
            ("2025-12-01T15:00:00Z", false),
            ("2025-12-02T09:00:00Z", true),
            ("2025-12-02T09:30:00Z", false),
            ("2025-12-02T16:00:00Z", true),
            ("2025-12-03T11:00:00Z", true),
            ("2025-12-03T11:30:00Z", true),
            ("2025-12-03T12:00:00Z", false),
            ("2025-12-04T13:00:00Z", true),
            ("2025-12-04T13:30:00Z", true),
            ("2025-12-04T14:00:00Z", true),
            ("2025-12-05T10:00:00Z", false),
            ("2025-12-05T10:30:00Z", true),
            ("2025-12-06T09:00:00Z", true),
            ("2025-12-06T09:30:00Z", true),
            ("2025-12-06T10:00:00Z", true),
            ("2025-12-06T14:00:00Z", false),
            ("2025-12-07T15:00:00Z", true),
            ("2025-12-07T15:30:00Z", true),
            ("2025-12-08T11:00:00Z", false),
            ("2025-12-08T11:30:00Z", true),
            ("2025-12-08T12:00:00Z", true),
            ("2025-12-09T10:00:00Z", true),
            ("2025-12-09T10:30:00Z", true),
            ("2025-12-09T11:00:00Z", true),
            ("2025-12-09T11:30:00Z", false),
            ("2025-12-10T09:00:00Z", true),
            ("2025-12-10T09:30:00Z", true),
            ("2025-12-10T14:00:00Z", true),
            ("2025-12-10T14:30:00Z", true),
        ]
        .into_iter()
        .map(|(start, is_available)| {
            let start = start.parse::<DateTime<Utc>>().unwrap();
            TimeSlot::create(start, start + Duration::minutes(30), is_available).unwrap()
        })
        .collect();
        let services = vec![
            Service::create(
                ServiceId::from("service-1"),
                "Cardiology Consultation".to_owned(),
                Some("Initial consultation focusing on cardiovascular diagnosis.".to_owned()),
                ServiceDuration::new(60).unwrap(),
                Some(Price::new(20000, Currency::USD)),
                ServiceType::Consultation,
            )
            .unwrap(),
            Service::create(
                ServiceId::from("service-2"),
                "Dermatology Consultation".to_owned(),
                Some("Consultation for skin condition diagnosis and treatment.".to_owned()),
                ServiceDuration::new(45).unwrap(),
                Some(Price::new(18000, Currency::USD)),
                ServiceType::Consultation,
            )
            .unwrap(),
        ];
        AvailabilityStore::new(slots, services)
    }

    /// Fresh half-hour grid across the window, every slot open. The last
    /// slot may run past the window end; slots are never clipped.
    pub fn generated(time: &SearchRange, services: Vec<Service>) -> Self {
        let mut slots = Vec::new();
        let mut current = time.start;
        while current < time.end {
            let end = current + Duration::minutes(30);
            // A half-hour step forward is always a valid interval.
            slots.push(TimeSlot::create(current, end, true).unwrap());
            current = end;
        }
        AvailabilityStore::new(slots, services)
    }

    pub fn slots(&self) -> &[TimeSlot] {
        &self.slots
    }

    pub fn services(&self) -> &[Service] {
        &self.services
    }

    pub fn service(&self, id: &ServiceId) -> Option<&Service> {
        self.services.iter().find(|s| s.id() == *id)
    }

    /// Widest window covered by the data set, the default search range.
    pub fn span(&self) -> Option<SearchRange> {
        let start = self.slots.iter().map(TimeSlot::start).min()?;
        let end = self.slots.iter().map(TimeSlot::end).max()?;
        Some(start..end)
    }

    /// Slots overlapping the search window, paired with the services of the
    /// requested type. Unavailable slots stay in the result; the calendar
    /// needs them to tell an empty day from a fully booked one.
    pub fn availability(
        &self,
        search: &SearchRange,
        service_type: Option<ServiceType>,
    ) -> AvailabilityView {
        let time_slots: Vec<TimeSlot> = match search.is_empty() {
            true => Vec::new(),
            false => self
                .slots
                .iter()
                .filter(|s| s.overlaps(search))
                .copied()
                .collect(),
        };
        let available_services: Vec<ServiceSummary> = self
            .services
            .iter()
            .filter(|s| service_type.map_or(true, |t| s.service_type() == t))
            .map(ServiceSummary::from)
            .collect();
        debug!(
            "availability search {} .. {} matched {} slots, {} services",
            search.start,
            search.end,
            time_slots.len(),
            available_services.len(),
        );
        AvailabilityView::new(service_type, time_slots, available_services)
    }
}

/// Search result the calendar renders from.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AvailabilityView {
    service_type: Option<ServiceType>,
    time_slots: Vec<TimeSlot>,
    available_services: Vec<ServiceSummary>,
}

impl AvailabilityView {
    pub fn new(
        service_type: Option<ServiceType>,
        time_slots: Vec<TimeSlot>,
        available_services: Vec<ServiceSummary>,
    ) -> Self {
        AvailabilityView {
            service_type,
            time_slots,
            available_services,
        }
    }

    pub fn service_type(&self) -> Option<ServiceType> {
        self.service_type
    }

    pub fn time_slots(&self) -> &[TimeSlot] {
        &self.time_slots
    }

    pub fn available_services(&self) -> &[ServiceSummary] {
        &self.available_services
    }

    pub fn service(&self, id: &ServiceId) -> Option<&ServiceSummary> {
        self.available_services.iter().find(|s| s.id == *id)
    }

    /// The slot a customer picked, addressed by its start instant.
    pub fn slot_starting_at(&self, start: DateTime<Utc>) -> Option<&TimeSlot> {
        self.time_slots.iter().find(|s| s.start() == start)
    }
}

/// Service entry as the availability response presents it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ServiceSummary {
    pub id: ServiceId,
    pub name: String,
    pub description: Option<String>,
    pub duration_minutes: u32,
    pub price: Option<f64>,
    pub service_type: ServiceType,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Service> for ServiceSummary {
    fn from(value: &Service) -> Self {
        ServiceSummary {
            id: value.id(),
            name: value.name().to_owned(),
            description: value.description().map(str::to_owned),
            duration_minutes: value.duration().minutes(),
            price: value.price().map(Price::to_decimal),
            service_type: value.service_type(),
            created_at: value.created_at(),
            updated_at: value.updated_at(),
        }
    }
}

/// Query half of the availability contract.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityRequest {
    #[serde_as(as = "DisplayFromStr")]
    pub service_type: ServiceType,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl AvailabilityRequest {
    pub fn new(
        service_type: ServiceType,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Self, AvailabilityRequestError> {
        match start < end {
            true => Ok(AvailabilityRequest {
                service_type,
                start,
                end,
            }),
            false => Err(AvailabilityRequestError::InvalidRange),
        }
    }

    pub fn range(&self) -> SearchRange {
        self.start..self.end
    }
}

#[derive(Error, Debug)]
pub enum AvailabilityRequestError {
    #[error("End date must be after start date")]
    InvalidRange,
}

/// Booking submission of the contract.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingRequest {
    pub service_id: ServiceId,
    pub customer: AppointmentCustomer,
    pub requested_datetime: DateTime<Utc>,
}

/// Identifiers handed back for a successful booking.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingReceipt {
    pub appointment_id: AppointmentId,
    pub cancellation_token: Uuid,
    pub view_token: Uuid,
}

/// Booking failure, with the stable code the contract names.
#[derive(Error, Debug)]
pub enum BookingError {
    #[error("Service not found")]
    ServiceNotFound,
    #[error("The requested time slot is not available for this service")]
    TimeSlotConflict,
    #[error("The requested time slot conflicts with another appointment for this user")]
    UserTimeSlotConflict,
    #[error("Appointment not found or invalid token")]
    AppointmentNotFound,
    #[error("Cannot cancel an appointment that is not scheduled")]
    InvalidStatusForCancellation,
    #[error("Validation error: {0}")]
    Validation(#[from] AppointmentError),
    #[error(transparent)]
    DataAccess(#[from] DataAccessError),
}

impl BookingError {
    pub fn code(&self) -> &'static str {
        match self {
            BookingError::ServiceNotFound => "SERVICE_NOT_FOUND",
            BookingError::TimeSlotConflict => "TIME_SLOT_CONFLICT",
            BookingError::UserTimeSlotConflict => "USER_TIME_SLOT_CONFLICT",
            BookingError::AppointmentNotFound => "APPOINTMENT_NOT_FOUND",
            BookingError::InvalidStatusForCancellation => "INVALID_STATUS_FOR_CANCELLATION",
            BookingError::Validation(_) => "VALIDATION_ERROR",
            BookingError::DataAccess(_) => "INTERNAL_ERROR",
        }
    }
}

/// Backend the booking widget talks to.
#[async_trait]
pub trait AvailabilityProvider {
    /// Slots and services for the requested window
    async fn fetch_availability(
        &self,
        request: AvailabilityRequest,
    ) -> Result<AvailabilityView, DataAccessError>;
    /// Book a slot for a customer
    async fn book(&self, request: BookingRequest) -> Result<BookingReceipt, BookingError>;
    /// Cancel a booked appointment by its cancellation token
    async fn cancel(&self, cancellation_token: Uuid) -> Result<(), BookingError>;
}
