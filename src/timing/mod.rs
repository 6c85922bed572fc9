//! Timing utilities: frame-rate estimation and timestamp formats
//!
//! Three text formats are produced from a capture instant:
//! - the burned-in overlay, `YYYY-MM-DD HH:MM:SS`
//! - the recorded-frame field, a fractional day number with ten decimals
//!   followed by a newline
//! - the status-line prefix used in drain summaries

mod rate;

pub use rate::{RollingRateEstimator, RATE_WINDOW};

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone};

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Days elapsed since 1970-01-01T00:00:00, fractional
///
/// The instant is interpreted as a naive wall-clock value, so the number
/// matches the local time printed in the overlay.
pub fn day_number(instant: &NaiveDateTime) -> f64 {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or_default();
    let delta = *instant - epoch;
    match delta.num_microseconds() {
        Some(us) => us as f64 / (SECONDS_PER_DAY * 1e6),
        None => delta.num_milliseconds() as f64 / (SECONDS_PER_DAY * 1e3),
    }
}

/// Recorded-frame timestamp field: ten decimals, newline terminated
pub fn format_day_number<Tz: TimeZone>(timestamp: &DateTime<Tz>) -> String {
    format!("{:.10}\n", day_number(&timestamp.naive_local()))
}

/// Overlay text burned into every frame
pub fn format_overlay_timestamp<Tz: TimeZone>(timestamp: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    timestamp.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Prefix of status lines reported to the control layer
pub fn format_status_timestamp(timestamp: &DateTime<Local>) -> String {
    timestamp.format("%Y-%m-%d  %H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    #[test]
    fn test_day_number_epoch() {
        assert_eq!(format_day_number(&at(1970, 1, 1, 0, 0, 0)), "0.0000000000\n");
    }

    #[test]
    fn test_day_number_known_instants() {
        assert_eq!(format_day_number(&at(2020, 1, 1, 0, 0, 0)), "18262.0000000000\n");
        assert_eq!(format_day_number(&at(2020, 1, 1, 12, 0, 0)), "18262.5000000000\n");
        assert_eq!(format_day_number(&at(2020, 1, 1, 6, 0, 0)), "18262.2500000000\n");
    }

    #[test]
    fn test_day_number_sub_second() {
        let ts = at(2020, 1, 1, 0, 0, 0) + chrono::Duration::milliseconds(864);
        // 0.864s is exactly 1e-5 of a day
        assert_eq!(format_day_number(&ts), "18262.0000100000\n");
    }

    #[test]
    fn test_overlay_format() {
        assert_eq!(
            format_overlay_timestamp(&at(2023, 7, 4, 9, 5, 3)),
            "2023-07-04 09:05:03"
        );
    }

    #[test]
    fn test_status_format_has_double_space() {
        let ts = Local.with_ymd_and_hms(2023, 7, 4, 9, 5, 3).unwrap();
        assert_eq!(format_status_timestamp(&ts), "2023-07-04  09:05:03");
    }
}
