use chrono::{Month, Weekday};
use serde::Serialize;

use super::{mode, Mode};
use crate::data::filter::day_name;
use crate::data::model::TripTable;

/// Most frequent times of travel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimeStats {
    /// Month name, e.g. "June".
    pub month: Option<Mode<String>>,
    /// Day name, e.g. "Wednesday".
    pub weekday: Option<Mode<String>>,
    /// Hour of day of the start time, 0-23.
    pub start_hour: Option<Mode<u32>>,
}

pub fn time_stats(table: &TripTable) -> TimeStats {
    let trips = table.records();

    let month = mode(trips.iter().map(|t| t.month())).map(|m| m.map(month_title));
    // Sunday-first numbering gives the calendar-order tie-break.
    let weekday = mode(trips.iter().map(|t| t.weekday().num_days_from_sunday()))
        .map(|m| m.map(|n| weekday_title(weekday_from_sunday(n))));
    let start_hour = mode(trips.iter().map(|t| t.start_hour()));

    TimeStats {
        month,
        weekday,
        start_hour,
    }
}

fn month_title(month: u32) -> String {
    u8::try_from(month)
        .ok()
        .and_then(|m| Month::try_from(m).ok())
        .map(|m| m.name().to_string())
        .unwrap_or_else(|| format!("Month {month}"))
}

fn weekday_from_sunday(n: u32) -> Weekday {
    // Weekday::Sun.succ() walks Mon, Tue, ...
    (0..n).fold(Weekday::Sun, |day, _| day.succ())
}

/// Capitalised day name, e.g. "Sunday".
pub fn weekday_title(day: Weekday) -> String {
    let name = day_name(day);
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}
