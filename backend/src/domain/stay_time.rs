//! Human-readable formatting of stay durations for receipts and tables.

/// Format a stay length in whole minutes, e.g. "45 minutes",
/// "1 hour", "2 hours and 30 minutes".
pub fn format_stay_time(minutes: i64) -> String {
    let minutes = minutes.max(0);
    if minutes < 60 {
        return format!("{} minutes", minutes);
    }

    let hours = minutes / 60;
    let remaining = minutes % 60;
    let hours_part = if hours == 1 {
        "1 hour".to_string()
    } else {
        format!("{} hours", hours)
    };

    if remaining == 0 {
        hours_part
    } else {
        format!("{} and {} minutes", hours_part, remaining)
    }
}
