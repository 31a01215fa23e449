mod appointment;
mod service;
mod slot;

pub use self::appointment::*;
pub use self::service::*;
pub use self::slot::*;
