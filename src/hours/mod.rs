use chrono::{DateTime, Datelike, Utc};
use chrono_tz::Tz;
use tracing::warn;

use crate::settings::BusinessHoursConfig;

/// Whether `now_utc` falls inside business hours at the given timezone's
/// local clock.
///
/// A disabled day is closed. An enabled day is open for
/// `start <= local <= end` inclusive, compared lexicographically on `HH:MM`
/// (schedules never cross midnight; `end < start` simply never matches).
/// Timezone resolution failure fails open — better to reply out of hours
/// than to silently drop replies.
pub fn is_open(now_utc: DateTime<Utc>, timezone: &str, schedule: &BusinessHoursConfig) -> bool {
    let Ok(tz) = timezone.parse::<Tz>() else {
        warn!("unknown timezone '{}', treating as business hours", timezone);
        return true;
    };
    let local = now_utc.with_timezone(&tz);
    let day = schedule.day(local.weekday());
    if !day.enabled {
        return false;
    }
    let clock = local.format("%H:%M").to_string();
    day.start.as_str() <= clock.as_str() && clock.as_str() <= day.end.as_str()
}
