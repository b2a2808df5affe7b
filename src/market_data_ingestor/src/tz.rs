//! Exchange calendar helpers.
//!
//! Vendors stamp daily bars with an instant (for Alpaca, local midnight expressed in
//! UTC). Everything downstream of a provider works with timezone-naive exchange
//! dates instead, so the conversion lives here in one place:
//! - [`exchange_date`]: the calendar date an instant falls on at the exchange.
//! - [`local_day_start_utc`]: the first instant of an exchange date, in UTC, used to
//!   build vendor query windows.
//! - [`to_rfc3339_secs`]: the wire format vendors expect.
//!
//! Examples
//! - 2023-01-03T05:00:00Z is 2023-01-03 00:00 in New York -> 2023-01-03
//! - 2023-01-04T02:00:00Z is 2023-01-03 21:00 in New York -> 2023-01-03

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;

/// Time zone of the US equity exchanges.
pub const EXCHANGE_TZ: Tz = chrono_tz::America::New_York;

/// The calendar date `ts` falls on in `tz`.
pub fn exchange_date(ts: DateTime<Utc>, tz: Tz) -> NaiveDate {
    ts.with_timezone(&tz).date_naive()
}

/// First instant of `date` in `tz`, converted to UTC.
///
/// Midnight can be skipped by a DST transition in some zones; in that case the first
/// valid local instant of the day is used, stepping forward a minute at a time
/// (capped at two hours) the same way a scheduler would.
pub fn local_day_start_utc(date: NaiveDate, tz: Tz) -> DateTime<Utc> {
    use chrono::offset::LocalResult::*;

    let mut naive = date.and_time(chrono::NaiveTime::MIN);
    for _ in 0..=120 {
        match tz.from_local_datetime(&naive) {
            Single(dt) => return dt.with_timezone(&Utc),
            Ambiguous(earliest, _) => return earliest.with_timezone(&Utc),
            None => naive += chrono::Duration::minutes(1),
        }
    }
    // No zone in the tz database has a gap longer than two hours.
    Utc.from_utc_datetime(&date.and_time(chrono::NaiveTime::MIN))
}

/// Format a UTC datetime as an RFC-3339 string with second precision.
pub fn to_rfc3339_secs(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
}
