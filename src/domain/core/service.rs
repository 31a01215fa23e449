use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use derive_more::{Deref, Display, Error, From};
use num_format::{Locale, ToFormattedString};
use serde::{Deserialize, Serialize};

use crate::domain::{Entity, Id};

/// Service ID
#[derive(
    Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Display, From, Deref, Default,
)]
pub struct ServiceId(String);

impl Id for ServiceId {
    type Inner = String;
}

impl From<&str> for ServiceId {
    fn from(value: &str) -> Self {
        ServiceId(value.to_owned())
    }
}

/// Kind of appointment a service is booked for
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum ServiceType {
    #[display(fmt = "consultation")]
    Consultation,
    #[display(fmt = "follow_up")]
    FollowUp,
    #[display(fmt = "emergency")]
    Emergency,
}

impl FromStr for ServiceType {
    type Err = ServiceTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "consultation" => Ok(ServiceType::Consultation),
            "follow_up" => Ok(ServiceType::FollowUp),
            "emergency" => Ok(ServiceType::Emergency),
            _ => Err(ServiceTypeError::UnknownServiceType),
        }
    }
}

#[derive(Error, Display, Debug)]
pub enum ServiceTypeError {
    #[display(fmt = "Unknown service type")]
    UnknownServiceType,
}

/// Appointment length in minutes
#[derive(
    Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Display, Deref,
)]
pub struct ServiceDuration(u32);

impl ServiceDuration {
    pub fn new(minutes: u32) -> Result<Self, ServiceDurationError> {
        match minutes {
            0 => Err(ServiceDurationError::NotPositive),
            m if m % 15 != 0 => Err(ServiceDurationError::NotQuarterHour),
            m => Ok(ServiceDuration(m)),
        }
    }

    pub fn minutes(&self) -> u32 {
        self.0
    }

    pub fn to_duration(&self) -> Duration {
        Duration::minutes(self.0 as i64)
    }
}

#[derive(Error, Display, Debug)]
pub enum ServiceDurationError {
    #[display(fmt = "Duration must be positive")]
    NotPositive,
    #[display(fmt = "Duration must be a multiple of 15 minutes")]
    NotQuarterHour,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Currency {
    USD,
    JPY,
}

impl Currency {
    fn symbol(&self) -> &'static str {
        match self {
            Currency::USD => "$",
            Currency::JPY => "¥",
        }
    }

    fn exponent(&self) -> u32 {
        match self {
            Currency::USD => 2,
            Currency::JPY => 0,
        }
    }
}

/// Price held in the currency's minor unit
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    amount: u64,
    currency: Currency,
}

impl Price {
    pub fn new(amount: u64, currency: Currency) -> Self {
        Price { amount, currency }
    }

    pub fn amount(&self) -> u64 {
        self.amount
    }

    pub fn currency(&self) -> Currency {
        self.currency
    }

    /// Decimal value in the major unit, as it travels on the wire.
    pub fn to_decimal(&self) -> f64 {
        let scale = 10u64.pow(self.currency.exponent());
        self.amount as f64 / scale as f64
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scale = 10u64.pow(self.currency.exponent());
        write!(
            f,
            "{}{}",
            self.currency.symbol(),
            (self.amount / scale).to_formatted_string(&Locale::en)
        )?;
        match self.currency.exponent() {
            0 => Ok(()),
            e => write!(f, ".{:0width$}", self.amount % scale, width = e as usize),
        }
    }
}

/// Service entity
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    id: ServiceId,
    name: String,
    description: Option<String>,
    duration: ServiceDuration,
    price: Option<Price>,
    service_type: ServiceType,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Service {
    pub fn create(
        id: ServiceId,
        name: String,
        description: Option<String>,
        duration: ServiceDuration,
        price: Option<Price>,
        service_type: ServiceType,
    ) -> Result<Self, ServiceError> {
        Self::validate_created(&name, &description)?;
        let now = Utc::now();
        Ok(Service {
            id,
            name,
            description,
            duration,
            price,
            service_type,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn duration(&self) -> ServiceDuration {
        self.duration
    }

    pub fn price(&self) -> Option<&Price> {
        self.price.as_ref()
    }

    pub fn service_type(&self) -> ServiceType {
        self.service_type
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    fn validate_created(name: &str, description: &Option<String>) -> Result<(), ServiceError> {
        Self::validate_name(name)?;
        Self::validate_description(description)
    }

    fn validate_name(name: &str) -> Result<(), ServiceError> {
        match name.trim().is_empty() {
            true => Err(ServiceError::NameIsBlank),
            false => Ok(()),
        }
    }

    fn validate_description(description: &Option<String>) -> Result<(), ServiceError> {
        match description {
            Some(d) if d.trim().is_empty() => Err(ServiceError::DescriptionIsBlank),
            _ => Ok(()),
        }
    }
}

impl Entity for Service {
    type Id = ServiceId;

    const ENTITY_NAME: &'static str = "service";

    fn id(&self) -> Self::Id {
        self.id.clone()
    }
}

/// Service error
#[derive(Error, Display, Debug)]
pub enum ServiceError {
    /// Name is empty or whitespace
    #[display(fmt = "Name cannot be blank")]
    NameIsBlank,
    /// Description was given but holds no text
    #[display(fmt = "Description cannot be blank")]
    DescriptionIsBlank,
}
