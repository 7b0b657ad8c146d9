use std::fmt;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};

/// Wire format for instants, both inbound (`start`/`end`) and upstream (`at`).
pub const INSTANT_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// A calendar day in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Day(NaiveDate);

impl Day {
    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    pub fn from_ymd(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).map(Self)
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }

    /// Midnight UTC at the start of this day.
    pub fn midnight(&self) -> DateTime<Utc> {
        Utc.from_utc_datetime(&self.0.and_time(chrono::NaiveTime::MIN))
    }

    pub fn succ(&self) -> Option<Self> {
        self.0.succ_opt().map(Self)
    }
}

impl From<DateTime<Utc>> for Day {
    fn from(instant: DateTime<Utc>) -> Self {
        Self(instant.date_naive())
    }
}

/// Formats as midnight, e.g. `2018-08-01T00:00:00Z`.
impl fmt::Display for Day {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.midnight().format(INSTANT_FORMAT))
    }
}

/// Drops the time-of-day of an instant.
pub fn truncate_to_day(instant: DateTime<Utc>) -> DateTime<Utc> {
    Day::from(instant).midnight()
}

/// Inclusive day range. `start > end` is allowed and contains no days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: Day,
    pub end: Day,
}

impl DateRange {
    pub fn new(start: Day, end: Day) -> Self {
        Self { start, end }
    }

    pub fn is_empty(&self) -> bool {
        self.start > self.end
    }

    /// Every day from `start` to `end` inclusive, ascending.
    pub fn days(&self) -> impl Iterator<Item = Day> + use<> {
        let end = self.end;
        std::iter::successors(Some(self.start), Day::succ)
            .take_while(move |day| *day <= end)
    }

    pub fn len(&self) -> usize {
        if self.is_empty() {
            0
        } else {
            (self.end.0 - self.start.0).num_days() as usize + 1
        }
    }
}
