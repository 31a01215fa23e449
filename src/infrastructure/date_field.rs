use chrono::{NaiveDate, Utc};
use tracing::debug;

/// Masked date input in DD/MM/YYYY order.
///
/// Keystrokes are reduced to their digits and displayed with slashes as the
/// groups fill up. A date is only read once all eight digits are present;
/// an impossible date keeps the previous one. Clearing the field falls back
/// to the date it started with.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DateField {
    raw: String,
    date: NaiveDate,
    initial: NaiveDate,
}

impl DateField {
    pub fn new(initial: NaiveDate) -> Self {
        DateField {
            raw: initial.format("%d/%m/%Y").to_string(),
            date: initial,
            initial,
        }
    }

    pub fn today() -> Self {
        Self::new(Utc::now().date_naive())
    }

    /// Digits of `value`, capped at eight, grouped as DD/MM/YYYY.
    pub fn mask(value: &str) -> String {
        let digits: String = value.chars().filter(char::is_ascii_digit).take(8).collect();
        match digits.len() {
            0..=2 => digits,
            3..=4 => format!("{}/{}", &digits[..2], &digits[2..]),
            _ => format!("{}/{}/{}", &digits[..2], &digits[2..4], &digits[4..]),
        }
    }

    /// Feed the field what the customer typed.
    pub fn input(&mut self, value: &str) {
        self.raw = Self::mask(value);
        let digits: String = self.raw.chars().filter(char::is_ascii_digit).collect();
        if digits.is_empty() {
            debug!("date input cleared, back to {}", self.initial);
            self.date = self.initial;
            return;
        }
        if digits.len() == 8 {
            match Self::parse(&digits) {
                Some(date) => self.date = date,
                None => debug!("{:?} is not a date, keeping {}", self.raw, self.date),
            }
        }
    }

    /// Move the field to a date picked elsewhere.
    pub fn set(&mut self, date: NaiveDate) {
        self.raw = date.format("%d/%m/%Y").to_string();
        self.date = date;
    }

    pub fn text(&self) -> &str {
        &self.raw
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    fn parse(digits: &str) -> Option<NaiveDate> {
        let day = digits[0..2].parse().ok()?;
        let month = digits[2..4].parse().ok()?;
        let year = digits[4..8].parse().ok()?;
        NaiveDate::from_ymd_opt(year, month, day)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nov_30() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 11, 30).unwrap()
    }

    #[tokio::test]
    async fn test_mask_grows_with_the_digits() {
        assert_eq!(DateField::mask(""), "");
        assert_eq!(DateField::mask("3"), "3");
        assert_eq!(DateField::mask("31"), "31");
        assert_eq!(DateField::mask("311"), "31/1");
        assert_eq!(DateField::mask("3112"), "31/12");
        assert_eq!(DateField::mask("31122"), "31/12/2");
        assert_eq!(DateField::mask("31122025"), "31/12/2025");
    }

    #[tokio::test]
    async fn test_mask_drops_junk_and_extra_digits() {
        assert_eq!(DateField::mask("31a/12-2025xyz"), "31/12/2025");
        assert_eq!(DateField::mask("311220259999"), "31/12/2025");
        assert_eq!(DateField::mask("abc"), "");
    }

    #[tokio::test]
    async fn test_partial_input_keeps_the_date() {
        let mut field = DateField::new(nov_30());
        field.input("0512");
        assert_eq!(field.text(), "05/12");
        assert_eq!(field.date(), nov_30());
    }

    #[tokio::test]
    async fn test_full_input_moves_the_date() {
        let mut field = DateField::new(nov_30());
        field.input("05122025");
        assert_eq!(field.text(), "05/12/2025");
        assert_eq!(field.date(), NaiveDate::from_ymd_opt(2025, 12, 5).unwrap());
    }

    #[tokio::test]
    async fn test_impossible_date_keeps_the_previous_one() {
        let mut field = DateField::new(nov_30());
        field.input("45132025");
        assert_eq!(field.text(), "45/13/2025");
        assert_eq!(field.date(), nov_30());
        field.input("00000000");
        assert_eq!(field.date(), nov_30());
    }

    #[tokio::test]
    async fn test_clearing_falls_back_to_the_initial_date() {
        let mut field = DateField::new(nov_30());
        field.input("05122025");
        assert_ne!(field.date(), nov_30());
        field.input("");
        assert_eq!(field.text(), "");
        assert_eq!(field.date(), nov_30());
    }

    #[tokio::test]
    async fn test_new_field_displays_its_date() {
        let field = DateField::new(nov_30());
        assert_eq!(field.text(), "30/11/2025");
    }
}
