// SPDX-FileCopyrightText: 2026 Rafiq Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Local-time helpers.
//!
//! All stored timestamps are RFC 3339 strings in the configured user
//! timezone (a fixed hour offset, default UTC+3).

use chrono::{DateTime, Duration, FixedOffset, Utc};

/// Current time in the fixed user offset.
pub fn now_local(tz_offset_hours: i32) -> DateTime<FixedOffset> {
    let offset = FixedOffset::east_opt(tz_offset_hours * 3600)
        .unwrap_or_else(|| FixedOffset::east_opt(0).expect("zero offset is valid"));
    Utc::now().with_timezone(&offset)
}

/// RFC 3339 timestamp in the user timezone, the storage format for
/// `created_at` / `updated_at` and due-date comparisons.
pub fn now_iso(tz_offset_hours: i32) -> String {
    now_local(tz_offset_hours).to_rfc3339()
}

/// `YYYY-MM-DD` in the user timezone.
pub fn today(tz_offset_hours: i32) -> String {
    now_local(tz_offset_hours).format("%Y-%m-%d").to_string()
}

/// `YYYY-MM-DD` for tomorrow in the user timezone.
pub fn tomorrow(tz_offset_hours: i32) -> String {
    (now_local(tz_offset_hours) + Duration::days(1))
        .format("%Y-%m-%d")
        .to_string()
}

/// Converts a local wall-clock hour to UTC for cron scheduling.
pub fn local_hour_to_utc(local_hour: u32, tz_offset_hours: i32) -> u32 {
    (local_hour as i32 - tz_offset_hours).rem_euclid(24) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_hour_conversion_wraps() {
        // 07:00 Riyadh (UTC+3) is 04:00 UTC.
        assert_eq!(local_hour_to_utc(7, 3), 4);
        // 01:00 local at UTC+3 wraps to 22:00 UTC the previous day.
        assert_eq!(local_hour_to_utc(1, 3), 22);
        // Negative offsets wrap forward.
        assert_eq!(local_hour_to_utc(23, -2), 1);
    }

    #[test]
    fn now_iso_carries_offset() {
        let ts = now_iso(3);
        assert!(ts.contains("+03:00"), "got: {ts}");
    }

    #[test]
    fn today_is_date_shaped() {
        let d = today(0);
        assert_eq!(d.len(), 10);
        assert_eq!(d.as_bytes()[4], b'-');
    }
}
