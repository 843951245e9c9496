use std::sync::Once;

use chrono::{DateTime, Timelike, Utc};
use uuid::Uuid;

/// Current instant, truncated to whole seconds. The engine tracks time at
/// second resolution, and truncating here keeps in-memory timestamps equal
/// to their stored round-tripped form.
pub fn now() -> DateTime<Utc> {
    let now = Utc::now();
    now.with_nanosecond(0).unwrap_or(now)
}

/// Opaque unique id for new records.
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Whole seconds between two instants, clamped at zero.
pub fn duration_seconds(start: DateTime<Utc>, end: DateTime<Utc>) -> u64 {
    (end - start).num_seconds().max(0) as u64
}

/// Format seconds into an HH:MM:SS string. Hours are not wrapped, so
/// durations beyond 24h render as e.g. "25:00:00".
pub fn format_clock(seconds: u64) -> String {
    let h = seconds / 3600;
    let m = (seconds % 3600) / 60;
    let s = seconds % 60;
    format!("{h:02}:{m:02}:{s:02}")
}

/// Format seconds into an MM:SS string (e.g. "05:23").
pub fn format_clock_compact(seconds: u64) -> String {
    let m = seconds / 60;
    let s = seconds % 60;
    format!("{m:02}:{s:02}")
}

/// Format seconds into a short human-readable string (e.g. "1h 23m").
pub fn format_human(seconds: u64) -> String {
    if seconds < 60 {
        return format!("{seconds}s");
    }
    let h = seconds / 3600;
    let m = (seconds % 3600) / 60;
    if h > 0 {
        format!("{h}h {m}m")
    } else {
        format!("{m}m")
    }
}

static INIT_LOGGING: Once = Once::new();

/// Initialize logging (reads RUST_LOG env var). Safe to call more than once.
pub fn init_logging() {
    INIT_LOGGING.call_once(|| {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Info)
            .init();
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn clock_format_pads_and_overflows_hours() {
        assert_eq!(format_clock(0), "00:00:00");
        assert_eq!(format_clock(5), "00:00:05");
        assert_eq!(format_clock(3661), "01:01:01");
        assert_eq!(format_clock(90_000), "25:00:00");
    }

    #[test]
    fn compact_format_keeps_minutes_unwrapped() {
        assert_eq!(format_clock_compact(323), "05:23");
        assert_eq!(format_clock_compact(3_900), "65:00");
    }

    #[test]
    fn human_format_picks_unit_by_magnitude() {
        assert_eq!(format_human(45), "45s");
        assert_eq!(format_human(60), "1m");
        assert_eq!(format_human(3_599), "59m");
        assert_eq!(format_human(4_980), "1h 23m");
    }

    #[test]
    fn duration_is_clamped_at_zero() {
        let start = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2026, 3, 1, 12, 2, 30).unwrap();
        assert_eq!(duration_seconds(start, end), 150);
        assert_eq!(duration_seconds(end, start), 0);
    }

    #[test]
    fn ids_are_unique() {
        assert_ne!(new_id(), new_id());
    }

    #[test]
    fn now_is_whole_seconds() {
        assert_eq!(now().nanosecond(), 0);
    }
}
