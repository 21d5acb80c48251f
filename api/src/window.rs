//! Date-window handling at the HTTP boundary: default-window policy and the
//! mapping from calendar windows to UTC created-at query bounds.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;

use nosh_core::aggregate::DateWindow;

use crate::error::AppError;

/// Default window length when a client sends no explicit bounds.
pub const DEFAULT_WINDOW_DAYS: u32 = 7;

/// Today's calendar date in the service timezone.
pub fn today_in(tz: Tz) -> NaiveDate {
    Utc::now().with_timezone(&tz).date_naive()
}

/// Apply the default-window policy and validate ordering: absent bounds
/// default to the trailing seven days ending today; an inverted explicit
/// range is a client error, never silently treated as empty.
pub fn resolve_window(
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    today: NaiveDate,
) -> Result<DateWindow, AppError> {
    let end = end.unwrap_or(today);
    match start {
        Some(start) => DateWindow::new(start, end).map_err(|err| AppError::Validation {
            message: err.to_string(),
            field: Some("start".to_string()),
            received: Some(serde_json::json!({
                "start": start.to_string(),
                "end": end.to_string()
            })),
            docs_hint: Some("start must be on or before end".to_string()),
        }),
        None => Ok(DateWindow::trailing_days(end, DEFAULT_WINDOW_DAYS)),
    }
}

/// The UTC instants covering the window's first and last day in the service
/// timezone, for created-at range queries (inclusive on both ends).
pub fn bounds_utc(window: DateWindow, tz: Tz) -> (DateTime<Utc>, DateTime<Utc>) {
    let start_local = window
        .start()
        .and_hms_opt(0, 0, 0)
        .expect("midnight is always a valid time");
    let end_local = window
        .end()
        .and_hms_milli_opt(23, 59, 59, 999)
        .expect("end of day is always a valid time");

    let from = tz
        .from_local_datetime(&start_local)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&start_local));
    let to = tz
        .from_local_datetime(&end_local)
        .latest()
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&end_local));

    (from, to)
}
