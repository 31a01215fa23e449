use std::ops::Range;

use chrono::{DateTime, Utc};
use derive_more::{Deref, Display, Error, From, IntoIterator};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{Aggregation, Entity, Event, EventQueue, Id};

use super::ServiceId;

/// Appointment ID
#[derive(
    Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Display, From, Deref, Default,
)]
pub struct AppointmentId(u64);

impl Id for AppointmentId {
    type Inner = u64;
}

/// Appointment event
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AppointmentEvent {
    /// An appointment was booked
    AppointmentBooked {
        id: AppointmentId,
        service_id: ServiceId,
        customer: AppointmentCustomer,
        time: Range<DateTime<Utc>>,
        cancellation_token: Uuid,
        view_token: Uuid,
    },
    /// The customer cancelled the appointment
    AppointmentCancelled { id: AppointmentId },
    /// The visit took place
    AppointmentCompleted { id: AppointmentId },
    /// The customer never showed up
    AppointmentMarkedNoShow { id: AppointmentId },
}

impl Event for AppointmentEvent {
    type Id = AppointmentId;
}

/// Appointment aggregate
#[derive(Debug, Default, Clone, IntoIterator, Serialize, Deserialize)]
pub struct Appointment {
    id: AppointmentId,
    service_id: ServiceId,
    customer: AppointmentCustomer,
    time: Range<DateTime<Utc>>,
    status: AppointmentStatus,
    cancellation_token: Uuid,
    view_token: Uuid,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(skip)]
    #[into_iterator]
    events: EventQueue<AppointmentEvent>,
}

impl Appointment {
    pub fn book(
        id: AppointmentId,
        service_id: ServiceId,
        customer: AppointmentCustomer,
        time: Range<DateTime<Utc>>,
        cancellation_token: Uuid,
        view_token: Uuid,
    ) -> Result<Self, AppointmentError> {
        Self::validate_booked(&customer, &time)?;
        let now = Utc::now();
        let mut entity = Appointment {
            id,
            service_id: service_id.clone(),
            customer: customer.clone(),
            time: time.clone(),
            status: AppointmentStatus::Scheduled,
            cancellation_token,
            view_token,
            created_at: now,
            updated_at: now,
            ..Default::default()
        };
        entity.events.push(AppointmentEvent::AppointmentBooked {
            id,
            service_id,
            customer,
            time,
            cancellation_token,
            view_token,
        });
        Ok(entity)
    }

    pub fn cancel(&mut self) -> Result<(), AppointmentError> {
        self.validate_status(&AppointmentStatus::Cancelled)?;
        self.status = AppointmentStatus::Cancelled;
        self.updated_at = Utc::now();
        self.events
            .push(AppointmentEvent::AppointmentCancelled { id: self.id });
        Ok(())
    }

    pub fn complete(&mut self) -> Result<(), AppointmentError> {
        self.validate_status(&AppointmentStatus::Completed)?;
        self.status = AppointmentStatus::Completed;
        self.updated_at = Utc::now();
        self.events
            .push(AppointmentEvent::AppointmentCompleted { id: self.id });
        Ok(())
    }

    pub fn mark_no_show(&mut self) -> Result<(), AppointmentError> {
        self.validate_status(&AppointmentStatus::NoShow)?;
        self.status = AppointmentStatus::NoShow;
        self.updated_at = Utc::now();
        self.events
            .push(AppointmentEvent::AppointmentMarkedNoShow { id: self.id });
        Ok(())
    }

    /// Only a scheduled appointment blocks other bookings.
    pub fn conflicts_with(&self, time: &Range<DateTime<Utc>>) -> bool {
        self.status == AppointmentStatus::Scheduled
            && self.time.start < time.end
            && self.time.end > time.start
    }

    pub fn service_id(&self) -> &ServiceId {
        &self.service_id
    }

    pub fn customer(&self) -> &AppointmentCustomer {
        &self.customer
    }

    pub fn time(&self) -> &Range<DateTime<Utc>> {
        &self.time
    }

    pub fn status(&self) -> AppointmentStatus {
        self.status
    }

    pub fn cancellation_token(&self) -> Uuid {
        self.cancellation_token
    }

    pub fn view_token(&self) -> Uuid {
        self.view_token
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    fn validate_id(&self, id: &AppointmentId) -> Result<(), AppointmentError> {
        match self.id == *id {
            true => Ok(()),
            false => Err(AppointmentError::MismatchedId),
        }
    }

    fn validate_booked(
        customer: &AppointmentCustomer,
        time: &Range<DateTime<Utc>>,
    ) -> Result<(), AppointmentError> {
        Self::validate_customer(customer)?;
        Self::validate_time(time)
    }

    fn validate_customer(customer: &AppointmentCustomer) -> Result<(), AppointmentError> {
        if customer.name.trim().is_empty() {
            return Err(AppointmentError::CustomerNameRequired);
        }
        match customer.email.split_once('@') {
            Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
            _ => Err(AppointmentError::InvalidCustomerEmail),
        }
    }

    fn validate_time(time: &Range<DateTime<Utc>>) -> Result<(), AppointmentError> {
        if time.start >= time.end {
            return Err(AppointmentError::InvalidTime);
        }
        Ok(())
    }

    fn validate_status(&self, status: &AppointmentStatus) -> Result<(), AppointmentError> {
        match (&self.status, status) {
            (AppointmentStatus::Scheduled, AppointmentStatus::Completed)
            | (AppointmentStatus::Scheduled, AppointmentStatus::Cancelled)
            | (AppointmentStatus::Scheduled, AppointmentStatus::NoShow) => Ok(()),
            _ => Err(AppointmentError::InvalidStatusTransition),
        }
    }
}

impl Entity for Appointment {
    type Id = AppointmentId;

    const ENTITY_NAME: &'static str = "appointment";

    fn id(&self) -> Self::Id {
        self.id
    }
}

impl Aggregation for Appointment {
    type Event = AppointmentEvent;
    type Error = AppointmentError;

    fn validate(&self, event: &Self::Event) -> Result<(), Self::Error> {
        match event {
            AppointmentEvent::AppointmentBooked { customer, time, .. } => {
                Self::validate_booked(customer, time)
            }
            AppointmentEvent::AppointmentCancelled { id } => {
                self.validate_id(id)?;
                self.validate_status(&AppointmentStatus::Cancelled)
            }
            AppointmentEvent::AppointmentCompleted { id } => {
                self.validate_id(id)?;
                self.validate_status(&AppointmentStatus::Completed)
            }
            AppointmentEvent::AppointmentMarkedNoShow { id } => {
                self.validate_id(id)?;
                self.validate_status(&AppointmentStatus::NoShow)
            }
        }
    }

    fn apply(&mut self, event: Self::Event) {
        match event {
            AppointmentEvent::AppointmentBooked {
                id,
                service_id,
                customer,
                time,
                cancellation_token,
                view_token,
            } => {
                if self.id != id {
                    if let Ok(entity) = Self::book(
                        id,
                        service_id,
                        customer,
                        time,
                        cancellation_token,
                        view_token,
                    ) {
                        *self = entity;
                    }
                }
            }
            AppointmentEvent::AppointmentCancelled { id } => {
                if self.id == id {
                    if let Err(_e) = self.cancel() {}
                }
            }
            AppointmentEvent::AppointmentCompleted { id } => {
                if self.id == id {
                    if let Err(_e) = self.complete() {}
                }
            }
            AppointmentEvent::AppointmentMarkedNoShow { id } => {
                if self.id == id {
                    if let Err(_e) = self.mark_no_show() {}
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

impl PartialEq for Appointment {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.service_id == other.service_id
            && self.customer == other.customer
            && self.time == other.time
            && self.status == other.status
            && self.cancellation_token == other.cancellation_token
            && self.view_token == other.view_token
    }
}

impl Eq for Appointment {}

/// Appointment error
#[derive(Error, Display, Debug)]
pub enum AppointmentError {
    /// ID does not match
    #[display(fmt = "ID does not match")]
    MismatchedId,
    /// Customer name is not specified
    #[display(fmt = "Customer name is not specified")]
    CustomerNameRequired,
    /// Customer email address is malformed
    #[display(fmt = "Invalid customer email address")]
    InvalidCustomerEmail,
    /// End time must be after start time
    #[display(fmt = "Invalid time")]
    InvalidTime,
    /// Status pair is not a legal transition
    #[display(fmt = "Invalid status transition")]
    InvalidStatusTransition,
}

/// Who the appointment is for
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AppointmentCustomer {
    name: String,
    email: String,
}

impl AppointmentCustomer {
    pub fn new(name: String, email: String) -> Self {
        AppointmentCustomer { name, email }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn email(&self) -> &str {
        &self.email
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    /// Booked and still ahead
    #[default]
    Scheduled,
    /// The visit took place
    Completed,
    /// Cancelled before the visit
    Cancelled,
    /// The customer did not arrive
    NoShow,
}
