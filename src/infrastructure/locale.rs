use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc, Weekday};
use once_cell::sync::Lazy;
use tracing::warn;

/// Built-in locale catalogue, keyed by BCP 47 tag.
pub static LOCALES: Lazy<LocaleTable> = Lazy::new(LocaleTable::built_in);

pub const FALLBACK_TAG: &str = "en-US";

/// Formatting rules for one locale. The formats are strftime strings, so
/// adding a locale is a data change, not a code change.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LocaleSpec {
    pub tag: &'static str,
    pub date_format: &'static str,
    pub time_format: &'static str,
    pub first_weekday: Weekday,
}

impl LocaleSpec {
    pub fn format_date(&self, date: NaiveDate) -> String {
        date.format(self.date_format).to_string()
    }

    pub fn format_time(&self, time: DateTime<Utc>) -> String {
        time.format(self.time_format).to_string()
    }
}

pub struct LocaleTable {
    locales: HashMap<&'static str, LocaleSpec>,
}

impl LocaleTable {
    fn built_in() -> Self {
        let locales = [
            LocaleSpec {
                tag: "en-US",
                date_format: "%m/%d/%Y",
                time_format: "%-I:%M %p",
                first_weekday: Weekday::Sun,
            },
            LocaleSpec {
                tag: "en-GB",
                date_format: "%d/%m/%Y",
                time_format: "%H:%M",
                first_weekday: Weekday::Mon,
            },
            LocaleSpec {
                tag: "pt-BR",
                date_format: "%d/%m/%Y",
                time_format: "%H:%M",
                first_weekday: Weekday::Sun,
            },
            LocaleSpec {
                tag: "ja-JP",
                date_format: "%Y/%m/%d",
                time_format: "%H:%M",
                first_weekday: Weekday::Sun,
            },
        ]
        .into_iter()
        .map(|spec| (spec.tag, spec))
        .collect();
        LocaleTable { locales }
    }

    /// Locale for `tag`, or the fallback when the tag is not in the table.
    pub fn get(&self, tag: &str) -> &LocaleSpec {
        match self.locales.get(tag) {
            Some(spec) => spec,
            None => {
                warn!("unknown locale {:?}, using {}", tag, FALLBACK_TAG);
                &self.locales[FALLBACK_TAG]
            }
        }
    }

    pub fn tags(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.locales.keys().copied()
    }
}
