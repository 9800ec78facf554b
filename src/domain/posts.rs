//! Post-adjacent calendar helpers shared by listings, archives, and views.

use time::{Date, format_description::FormatItem, macros::format_description};

use crate::domain::error::DomainError;

pub const HUMAN_DATE_FORMAT: &[FormatItem<'static>] =
    format_description!("[month repr:long] [day padding:none], [year]");
pub const MONTH_LABEL_FORMAT: &[FormatItem<'static>] =
    format_description!("[month repr:long] [year]");

/// A calendar month used to scope archive listings, e.g. `2025-07`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthKey {
    year: i32,
    month: u8,
}

impl MonthKey {
    pub fn new(year: i32, month: u8) -> Result<Self, DomainError> {
        if !(1..=12).contains(&month) {
            return Err(DomainError::validation(format!(
                "month `{month}` is outside 1..=12"
            )));
        }
        if !(1970..=9999).contains(&year) {
            return Err(DomainError::validation(format!(
                "year `{year}` is outside the supported archive range"
            )));
        }
        Ok(Self { year, month })
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u8 {
        self.month
    }

    /// Key in the `YYYY-MM` shape the archive aggregation query produces.
    pub fn as_query_key(&self) -> String {
        format!("{:04}-{:02}", self.year, self.month)
    }
}

/// One entry of the month-archive aggregate (sidebar and archive routes).
#[derive(Debug, Clone, PartialEq)]
pub struct MonthCount {
    pub key: String,
    pub label: String,
    pub count: u64,
}

pub fn format_human_date(date: Date) -> String {
    date.format(HUMAN_DATE_FORMAT).expect("valid calendar date")
}

pub fn month_label_for(date: Date) -> String {
    date.format(MONTH_LABEL_FORMAT).expect("valid calendar date")
}

#[cfg(test)]
mod tests {
    use time::{Date, Month};

    use super::*;

    #[test]
    fn month_key_formats_with_zero_padding() {
        let key = MonthKey::new(2025, 7).expect("valid month");
        assert_eq!(key.as_query_key(), "2025-07");
    }

    #[test]
    fn month_key_rejects_month_zero_and_thirteen() {
        assert!(MonthKey::new(2025, 0).is_err());
        assert!(MonthKey::new(2025, 13).is_err());
    }

    #[test]
    fn human_date_format_matches_listing_style() {
        let date = Date::from_calendar_date(2025, Month::July, 4).expect("valid date");
        assert_eq!(format_human_date(date), "July 4, 2025");
        assert_eq!(month_label_for(date), "July 2025");
    }
}
