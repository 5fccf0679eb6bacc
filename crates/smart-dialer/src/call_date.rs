//! Labels for the last-call column of a contact row
//!
//! Today shows the time only, yesterday says so, anything inside the
//! "this week" window shows the weekday, older calls show the full date.

use chrono::{DateTime, Local, TimeZone, Utc};
use std::fmt::Display;

use crate::ordering::saturating_days;

pub fn format_call_date<Tz>(date: &DateTime<Tz>, now: &DateTime<Tz>, this_week_days: i64) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let day = date.date_naive();
    let today = now.date_naive();

    if day == today {
        date.format("%H:%M").to_string()
    } else if today.pred_opt() == Some(day) {
        format!("{},\nYesterday", date.format("%H:%M"))
    } else if now.clone().signed_duration_since(date.clone()) < saturating_days(this_week_days) {
        date.format("%H:%M,\n%A").to_string()
    } else {
        date.format("%H:%M,\n%d %b %Y").to_string()
    }
}

/// Same as [`format_call_date`], in the device's local time zone.
pub fn format_call_date_local(date: DateTime<Utc>, this_week_days: i64) -> String {
    let local = date.with_timezone(&Local);
    format_call_date(&local, &Local::now(), this_week_days)
}
