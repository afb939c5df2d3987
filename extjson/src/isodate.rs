//! ISO-8601-ish date parsing and formatting, as accepted by `ISODate(...)`.

use std::sync::OnceLock;

use regex::{Captures, Regex};
use time::{format_description::well_known::Rfc3339, Date, Duration, Month, OffsetDateTime};

use crate::StructuralError;

// Years outside this range either cannot be formatted or would not be read
// back as the same year.
const FORMATTABLE_YEARS: core::ops::RangeInclusive<i32> = 100..=9999;

fn pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"([0-9]{4})-?([0-9]{2})-?([0-9]{2})([T ]([0-9]{2})(:?([0-9]{2})(:?([0-9]{2}(\.[0-9]+)?))?)?(Z|([+\-])([0-9]{2}):?([0-9]{2})?)?)?",
        )
        .expect("ISO date pattern must compile")
    })
}

/// The current wall-clock time in epoch milliseconds.
pub fn now_millis() -> i64 {
    to_millis(OffsetDateTime::now_utc())
}

/// Parses the first date found in `input`, returning epoch milliseconds.
///
/// Missing components default to the start of their range, a zero year means
/// 1970 and two-digit years land in the 1900s. Month and day overflow roll
/// over into the following month and year.
pub fn parse(input: &str) -> Result<i64, StructuralError> {
    let invalid = || StructuralError::InvalidDate(input.to_string());
    let caps = pattern().captures(input).ok_or_else(invalid)?;

    let year = match int(&caps, 1) {
        0 => 1970,
        y @ 1..=99 => 1900 + y,
        y => y,
    };
    let month = int(&caps, 2).max(1) - 1;
    let day = int(&caps, 3);
    let (hour, minute) = (int(&caps, 5), int(&caps, 7));
    let (second, millis) = seconds(&caps);

    let first_of_month = Date::from_calendar_date(
        year + month / 12,
        Month::try_from((month % 12 + 1) as u8).map_err(|_| invalid())?,
        1,
    )
    .map_err(|_| invalid())?;

    let mut offset = Duration::ZERO;
    if let Some(sign) = caps.get(12) {
        let minutes =
            Duration::hours(int(&caps, 13).into()) + Duration::minutes(int(&caps, 14).into());
        offset = if sign.as_str() == "+" { -minutes } else { minutes };
    }

    let elapsed = Duration::days(i64::from(day) - 1)
        + Duration::hours(hour.into())
        + Duration::minutes(minute.into())
        + Duration::seconds(second.into())
        + Duration::milliseconds(millis)
        + offset;

    first_of_month
        .midnight()
        .assume_utc()
        .checked_add(elapsed)
        .map(to_millis)
        .ok_or_else(invalid)
}

/// Formats epoch milliseconds as an ISO-8601 UTC timestamp. Milliseconds are
/// included only when non-zero. Returns `None` when the year cannot be
/// written as four digits above 99.
pub fn format_utc(millis: i64) -> Option<String> {
    let dt = OffsetDateTime::from_unix_timestamp_nanos(i128::from(millis) * 1_000_000).ok()?;
    if !FORMATTABLE_YEARS.contains(&dt.year()) {
        return None;
    }
    dt.format(&Rfc3339).ok()
}

/// JavaScript dates span 100,000,000 days either side of the epoch.
pub const MAX_MILLIS: i64 = 8_640_000_000_000_000;

/// Whether `millis` lies within the range of JavaScript dates.
pub fn in_range(millis: i64) -> bool {
    millis.unsigned_abs() <= MAX_MILLIS as u64
}

/// Converts a JavaScript millisecond timestamp, if it denotes a valid date.
pub fn from_js_millis(n: f64) -> Option<i64> {
    if n.is_finite() && n.abs() <= MAX_MILLIS as f64 {
        Some(n.trunc() as i64)
    } else {
        None
    }
}

fn to_millis(dt: OffsetDateTime) -> i64 {
    (dt.unix_timestamp_nanos() / 1_000_000) as i64
}

fn int(caps: &Captures<'_>, group: usize) -> i32 {
    caps.get(group)
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0)
}

// Whole seconds plus the fraction rounded half-up to milliseconds.
fn seconds(caps: &Captures<'_>) -> (i32, i64) {
    let whole = caps
        .get(9)
        .and_then(|m| m.as_str().split('.').next())
        .and_then(|s| s.parse().ok())
        .unwrap_or(0);
    let millis = caps
        .get(10)
        .and_then(|m| format!("0{}", m.as_str()).parse::<f64>().ok())
        .map(|frac| (frac * 1000.0 + 0.5).floor() as i64)
        .unwrap_or(0);
    (whole, millis)
}
