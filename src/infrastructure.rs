mod date_field;
mod locale;
mod provider;

pub use self::date_field::*;
pub use self::locale::*;
pub use self::provider::*;
