// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Timeline positions for activities.

use crate::models::Activity;

const MINUTES_PER_DAY: u32 = 24 * 60;

/// Parse "HH:MM" into minutes since midnight.
///
/// Returns `None` on anything malformed; never panics.
pub fn to_minutes(time: &str) -> Option<u32> {
    let (hours, minutes) = time.trim().split_once(':')?;
    if hours.is_empty() || hours.len() > 2 || minutes.len() != 2 {
        return None;
    }
    let hours: u32 = hours.parse().ok()?;
    let minutes: u32 = minutes.parse().ok()?;
    (hours < 24 && minutes < 60).then_some(hours * 60 + minutes)
}

/// Sort key: date followed by time, unscheduled activities sorting as midnight.
///
/// Lexical comparison gives the canonical order because dates are zero-padded
/// ISO and times zero-padded 24-hour.
pub fn sort_key(activity: &Activity) -> String {
    format!("{}{}", activity.date, activity.time().unwrap_or("00:00"))
}

/// Sort activities into canonical order (stable for equal keys).
pub fn sort_activities(activities: &mut [Activity]) {
    activities.sort_by_cached_key(sort_key);
}

/// Human-readable time range, e.g. "10:00–11:30".
///
/// The end wraps modulo one day, so an activity crossing midnight shows an
/// end that looks earlier than its start. This is known and left as is.
pub fn render_range(activity: &Activity) -> String {
    let Some(time) = activity.time() else {
        return String::new();
    };
    let Some(duration) = activity.positive_duration() else {
        return time.to_string();
    };
    let Some(start) = to_minutes(time) else {
        return time.to_string();
    };
    let end = (u64::from(start) + u64::from(duration)) % u64::from(MINUTES_PER_DAY);
    format!("{}\u{2013}{}", format_clock(start), format_clock(end as u32))
}

/// Render minutes since midnight as zero-padded "HH:MM".
fn format_clock(minutes: u32) -> String {
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}
