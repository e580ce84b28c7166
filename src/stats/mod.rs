//! Statistics over a filtered trip table.
//!
//! Each group is computed independently from the same read-only
//! [`TripTable`]; none of them fail, and every one of them has a defined
//! result for an empty table.
//!
//! ```text
//!   TripTable (filtered)
//!        │
//!        ├──► time      most common month / weekday / start hour
//!        ├──► station   most common start, end, (end, start) pair
//!        ├──► duration  total and mean trip duration
//!        ├──► user      user types, gender, birth years
//!        └──► raw       5-row pages of the table itself
//! ```
//!
//! "Most common" always resolves ties toward the smallest value in the
//! key's natural order, see [`mode`].

pub mod duration;
pub mod raw;
pub mod station;
pub mod time;
pub mod user;

use std::collections::BTreeMap;

use serde::Serialize;

use crate::data::filter::FilterSpec;
use crate::data::model::TripTable;

// ---------------------------------------------------------------------------
// Shared reductions
// ---------------------------------------------------------------------------

/// The most frequent value of a column and how often it occurred.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Mode<T> {
    pub value: T,
    pub count: usize,
}

impl<T> Mode<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Mode<U> {
        Mode {
            value: f(self.value),
            count: self.count,
        }
    }
}

fn tally<T: Ord>(values: impl IntoIterator<Item = T>) -> BTreeMap<T, usize> {
    let mut counts = BTreeMap::new();
    for value in values {
        *counts.entry(value).or_insert(0) += 1;
    }
    counts
}

/// Most frequent value, or `None` for no values.
///
/// Ties go to the smallest value: the tally is walked in ascending key order
/// and only a strictly larger count replaces the current best.
pub fn mode<T: Ord>(values: impl IntoIterator<Item = T>) -> Option<Mode<T>> {
    let mut best: Option<Mode<T>> = None;
    for (value, count) in tally(values) {
        if best.as_ref().map_or(true, |b| count > b.count) {
            best = Some(Mode { value, count });
        }
    }
    best
}

/// One row of a frequency table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValueCount {
    pub value: String,
    pub count: usize,
}

/// Frequency table ordered by count descending, then value ascending.
pub fn value_counts(values: impl IntoIterator<Item = String>) -> Vec<ValueCount> {
    let mut counts: Vec<ValueCount> = tally(values)
        .into_iter()
        .map(|(value, count)| ValueCount { value, count })
        .collect();
    // Stable sort keeps the ascending key order among equal counts.
    counts.sort_by(|a, b| b.count.cmp(&a.count));
    counts
}

/// A statistic that depends on an optional column.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "data", rename_all = "snake_case")]
pub enum Availability<T> {
    Available(T),
    /// The table's source has no such column.
    Unavailable,
}

// ---------------------------------------------------------------------------
// All groups together
// ---------------------------------------------------------------------------

/// Every statistics group for one filtered table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TripStats {
    pub filter: FilterSpec,
    pub trips: usize,
    pub time: time::TimeStats,
    pub stations: station::StationStats,
    pub duration: duration::DurationStats,
    pub users: user::UserStats,
}

impl TripStats {
    pub fn compute(table: &TripTable, filter: FilterSpec) -> Self {
        TripStats {
            filter,
            trips: table.len(),
            time: time::time_stats(table),
            stations: station::station_stats(table),
            duration: duration::duration_stats(table),
            users: user::user_stats(table),
        }
    }
}
