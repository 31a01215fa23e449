use config::{Config, ConfigError};
use serde::Deserialize;

pub mod domain;
pub mod infrastructure;

#[derive(Clone, Debug, Deserialize)]
pub struct ScheduleFlowConfig {
    pub booking: Booking,
    pub locale: Locale,
    pub logger: Logger,
}

impl ScheduleFlowConfig {
    pub fn load() -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(config::File::with_name("scheduleflow.toml"))
            .add_source(config::Environment::with_prefix("SCHEDULEFLOW").separator("_"))
            .build()?
            .try_deserialize::<ScheduleFlowConfig>()
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct Booking {
    pub confirm_delay_ms: u64,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Locale {
    pub tag: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Logger {
    pub level: Level,
}

#[derive(Clone, Debug, Deserialize)]
pub enum Level {
    TRACE,
    DEBUG,
    INFO,
    WARN,
    ERROR,
}

impl From<&Level> for tracing::Level {
    fn from(value: &Level) -> Self {
        match value {
            Level::TRACE => tracing::Level::TRACE,
            Level::DEBUG => tracing::Level::DEBUG,
            Level::INFO => tracing::Level::INFO,
            Level::WARN => tracing::Level::WARN,
            Level::ERROR => tracing::Level::ERROR,
        }
    }
}
