use chrono::{DateTime, Local, Utc};

/// Label shown for a session that has no recorded duration yet
pub const IN_PROGRESS: &str = "in progress";

/// Listened duration of a single track, `m:ss`
pub fn format_track_duration(seconds: i64) -> String {
    let seconds = seconds.max(0);
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

/// Duration of a whole session, `1h 2m 3s` or `2m 3s`
pub fn format_session_duration(seconds: Option<i64>) -> String {
    match seconds {
        Some(total) if total > 0 => {
            let hours = total / 3600;
            let minutes = (total % 3600) / 60;
            let secs = total % 60;

            match hours {
                positive if positive > 0 => format!("{hours}h {minutes}m {secs}s"),
                _ => format!("{minutes}m {secs}s"),
            }
        }
        _ => IN_PROGRESS.to_string(),
    }
}

/// Local wall-clock rendering of a stored timestamp
pub fn format_local(ts: &DateTime<Utc>, fmt: &str) -> String {
    ts.with_timezone(&Local).format(fmt).to_string()
}
