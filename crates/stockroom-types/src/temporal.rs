use chrono::{DateTime, Days, NaiveDate, NaiveTime, TimeZone, Utc};

use crate::error::TypeError;

/// Wire format for calendar dates.
pub const ISO_DATE_FORMAT: &str = "%Y-%m-%d";

/// Parse a `YYYY-MM-DD` date.
pub fn parse_iso_date(raw: &str) -> Result<NaiveDate, TypeError> {
    NaiveDate::parse_from_str(raw.trim(), ISO_DATE_FORMAT)
        .map_err(|_| TypeError::InvalidDate(raw.to_string()))
}

/// Midnight UTC at the start of `date`. Dates are stored this way.
pub fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN))
}

/// One calendar day in UTC, inclusive at both ends.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DayWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DayWindow {
    pub fn for_date(date: NaiveDate) -> Self {
        let start = start_of_day(date);
        let end = date
            .checked_add_days(Days::new(1))
            .map(|next| start_of_day(next) - chrono::Duration::nanoseconds(1))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        Self { start, end }
    }

    /// Parse a `YYYY-MM-DD` date and return its window.
    pub fn parse(raw: &str) -> Result<Self, TypeError> {
        parse_iso_date(raw).map(Self::for_date)
    }

    pub fn contains(&self, at: &DateTime<Utc>) -> bool {
        *at >= self.start && *at <= self.end
    }
}
