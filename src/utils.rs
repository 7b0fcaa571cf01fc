use std::time::Duration;

use chrono::{DateTime, TimeZone};
use tracing::debug;

pub async fn shutdown_signal() {
    let signal = signal::wait_for_stop_signal().await;
    debug!("Received signal: {}", signal);
}

/// `YYYY-MM-DD HH:mm:ss` in local time, the format of every listing
pub fn date_time<Tz: TimeZone>(t: DateTime<Tz>) -> String {
    t.with_timezone(&chrono::Local)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}

/// Human readable duration, e.g. `1 Days 2 Hours 3 Mins 4 Secs`
pub fn duration_string(d: Duration) -> String {
    let secs = d.as_secs();
    let (days, hours, mins, secs) = (
        secs / 86_400,
        secs % 86_400 / 3600,
        secs % 3600 / 60,
        secs % 60,
    );
    match (days, hours, mins) {
        (0, 0, 0) => format!("{} Secs", secs),
        (0, 0, _) => format!("{} Mins {} Secs", mins, secs),
        (0, _, _) => format!("{} Hours {} Mins {} Secs", hours, mins, secs),
        _ => format!("{} Days {} Hours {} Mins {} Secs", days, hours, mins, secs),
    }
}
