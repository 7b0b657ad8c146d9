use chrono::{NaiveDateTime, TimeZone, Utc};

use crate::{
    date::{DateRange, Day, INSTANT_FORMAT},
    error::FetchError,
};

pub const MISSING_DATES_MESSAGE: &str = "Please provide both start and end dates";
pub const MALFORMED_DATES_MESSAGE: &str =
    "Please provide dates with format ISO8601 DateTime (eg. 2018-08-12T12:00:00Z)";

/// Parse the raw `start`/`end` query values into a day range.
///
/// Empty values count as missing. Both values must be strict `YYYY-MM-DDTHH:MM:SSZ`
/// instants; they are truncated to their UTC day. A reversed range is returned as is.
pub fn parse_range(start: Option<&str>, end: Option<&str>) -> Result<DateRange, FetchError> {
    let (Some(start), Some(end)) = (non_empty(start), non_empty(end)) else {
        return Err(FetchError::bad_request(MISSING_DATES_MESSAGE));
    };

    match (parse_day(start), parse_day(end)) {
        (Some(start), Some(end)) => Ok(DateRange::new(start, end)),
        _ => Err(FetchError::bad_request(MALFORMED_DATES_MESSAGE)),
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

fn parse_day(raw: &str) -> Option<Day> {
    if !has_instant_shape(raw) {
        return None;
    }
    let naive = NaiveDateTime::parse_from_str(raw, INSTANT_FORMAT).ok()?;
    Some(Day::from(Utc.from_utc_datetime(&naive)))
}

/// Fixed-width `YYYY-MM-DDTHH:MM:SSZ`. chrono alone accepts unpadded fields, a signed
/// year and leap seconds.
fn has_instant_shape(raw: &str) -> bool {
    const SHAPE: &[u8; 20] = b"dddd-dd-ddTdd:dd:ddZ";

    raw.len() == SHAPE.len()
        && raw
            .bytes()
            .zip(SHAPE)
            .all(|(b, &expected)| match expected {
                b'd' => b.is_ascii_digit(),
                _ => b == expected,
            })
        && &raw[17..19] < "60"
}
