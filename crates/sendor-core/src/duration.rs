//! Task progress duration formatting.
//!
//! `"[d days, ][h hours, ][m minutes, ]s seconds"` — each higher unit is
//! included only when non-zero.

use chrono::Duration;

pub fn format_duration(duration: Duration) -> String {
    let total_seconds = duration.num_seconds().max(0);

    let seconds = total_seconds % 60;
    let days = total_seconds / (3600 * 24);
    let hours = (total_seconds / 3600) % 24;
    let minutes = (total_seconds / 60) % 60;

    let mut result = format!("{} seconds", seconds);
    if minutes > 0 {
        result = format!("{} minutes, {}", minutes, result);
    }
    if hours > 0 {
        result = format!("{} hours, {}", hours, result);
    }
    if days > 0 {
        result = format!("{} days, {}", days, result);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seconds_only() {
        assert_eq!(format_duration(Duration::seconds(5)), "5 seconds");
    }

    #[test]
    fn minutes_and_seconds() {
        assert_eq!(
            format_duration(Duration::seconds(65)),
            "1 minutes, 5 seconds"
        );
    }

    #[test]
    fn hours_minutes_seconds() {
        assert_eq!(
            format_duration(Duration::seconds(3661)),
            "1 hours, 1 minutes, 1 seconds"
        );
    }

    #[test]
    fn days_hours_minutes_seconds() {
        let d = Duration::days(2) + Duration::hours(3) + Duration::minutes(4) + Duration::seconds(5);
        assert_eq!(format_duration(d), "2 days, 3 hours, 4 minutes, 5 seconds");
    }

    #[test]
    fn zero_is_zero_seconds() {
        assert_eq!(format_duration(Duration::seconds(0)), "0 seconds");
    }
}
