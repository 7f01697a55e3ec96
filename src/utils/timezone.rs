use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc};
use chrono_tz::{America::Sao_Paulo, Tz};

use crate::error::TrackerError;

/// Default fleet timezone (operation days are business dates in Brazil)
pub const SAO_PAULO_TZ: Tz = Sao_Paulo;

/// Get current time in the São Paulo timezone
pub fn sao_paulo_now() -> DateTime<Tz> {
    Utc::now().with_timezone(&SAO_PAULO_TZ)
}

/// Get current time in an arbitrary zone
pub fn now_in(tz: Tz) -> DateTime<Tz> {
    Utc::now().with_timezone(&tz)
}

/// Parse an operation day in `DD/MM/YYYY` form.
pub fn parse_operation_day(raw: &str) -> Result<NaiveDate, TrackerError> {
    NaiveDate::parse_from_str(raw.trim(), "%d/%m/%Y").map_err(|_| {
        TrackerError::validation(
            "operationDate",
            format!("'{raw}' is not a valid DD/MM/YYYY date"),
        )
    })
}

/// Format an operation day back to its `DD/MM/YYYY` wire form.
pub fn format_operation_day(day: NaiveDate) -> String {
    day.format("%d/%m/%Y").to_string()
}

/// Start of the operation-day window: local midnight as a UTC instant.
///
/// Midnight can be skipped or doubled on a zone transition day; the earliest
/// valid instant at or after 00:00 is used.
pub fn day_start(tz: Tz, day: NaiveDate) -> DateTime<Utc> {
    local_instant(tz, day, 0, 0, 0)
}

/// End of the operation-day window (exclusive bound): local 23:59:59.
pub fn day_end(tz: Tz, day: NaiveDate) -> DateTime<Utc> {
    local_instant(tz, day, 23, 59, 59)
}

/// Day-window pair `[start, end)` for querying records of one operation day.
pub fn day_window(tz: Tz, day: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    (day_start(tz, day), day_end(tz, day))
}

/// Render an instant as a pt-BR date string (`DD/MM/YYYY`) in the given zone.
pub fn format_date_br(instant: DateTime<Utc>, tz: Tz) -> String {
    instant.with_timezone(&tz).format("%d/%m/%Y").to_string()
}

/// Render an instant as a pt-BR date-time string in the given zone.
pub fn format_datetime_br(instant: DateTime<Utc>, tz: Tz) -> String {
    instant
        .with_timezone(&tz)
        .format("%d/%m/%Y %H:%M:%S")
        .to_string()
}

fn local_instant(tz: Tz, day: NaiveDate, hour: u32, min: u32, sec: u32) -> DateTime<Utc> {
    match tz.with_ymd_and_hms(day.year(), day.month(), day.day(), hour, min, sec) {
        chrono::LocalResult::Single(dt) => dt.with_timezone(&Utc),
        chrono::LocalResult::Ambiguous(earliest, _) => earliest.with_timezone(&Utc),
        // Skipped by a forward transition; the next hour always exists.
        chrono::LocalResult::None => {
            match tz.with_ymd_and_hms(day.year(), day.month(), day.day(), hour + 1, min, sec) {
                chrono::LocalResult::Single(dt) => dt.with_timezone(&Utc),
                chrono::LocalResult::Ambiguous(earliest, _) => earliest.with_timezone(&Utc),
                chrono::LocalResult::None => {
                    Utc.from_utc_datetime(&day.and_hms_opt(hour, min, sec).unwrap_or_default())
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_operation_day() {
        let day = parse_operation_day("05/03/2024").unwrap();
        assert_eq!(day, NaiveDate::from_ymd_opt(2024, 3, 5).unwrap());
        assert_eq!(format_operation_day(day), "05/03/2024");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_operation_day("2024-03-05").is_err());
        assert!(parse_operation_day("32/01/2024").is_err());
        assert!(parse_operation_day("").is_err());
    }

    #[test]
    fn test_day_window_is_half_open() {
        let day = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        let (start, end) = day_window(SAO_PAULO_TZ, day);
        // São Paulo is UTC-3 year round since 2019
        assert_eq!(start.to_rfc3339(), "2024-03-05T03:00:00+00:00");
        assert_eq!(end.to_rfc3339(), "2024-03-06T02:59:59+00:00");
        assert!(start < end);
    }

    #[test]
    fn test_midnight_instant_round_trips_to_same_day() {
        let day = NaiveDate::from_ymd_opt(2024, 7, 1).unwrap();
        let start = day_start(SAO_PAULO_TZ, day);
        assert_eq!(start.with_timezone(&SAO_PAULO_TZ).date_naive(), day);
    }
}
