use std::fmt;
use std::str::FromStr;

use chrono::Weekday;
use serde::{Serialize, Serializer};
use thiserror::Error;

use super::model::{TripRecord, TripTable};

// ---------------------------------------------------------------------------
// Selectors: city, month, day
// ---------------------------------------------------------------------------

/// Rejected selector text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid {kind} '{input}', expected one of: {expected}")]
pub struct SelectorError {
    pub kind: &'static str,
    pub input: String,
    pub expected: String,
}

fn normalise(input: &str) -> String {
    input.trim().to_ascii_lowercase().replace(['_', '-'], " ")
}

fn reject(kind: &'static str, input: &str, names: &[&str]) -> SelectorError {
    SelectorError {
        kind,
        input: input.to_string(),
        expected: names.join(", "),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum City {
    Chicago,
    NewYorkCity,
    Washington,
}

impl City {
    pub const ALL: [City; 3] = [City::Chicago, City::NewYorkCity, City::Washington];

    pub fn name(self) -> &'static str {
        match self {
            City::Chicago => "chicago",
            City::NewYorkCity => "new york city",
            City::Washington => "washington",
        }
    }

    /// File stem of the city's source in the data directory.
    pub fn source_stem(self) -> &'static str {
        match self {
            City::Chicago => "chicago",
            City::NewYorkCity => "new_york_city",
            City::Washington => "washington",
        }
    }
}

impl fmt::Display for City {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for City {
    type Err = SelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = normalise(s);
        City::ALL
            .into_iter()
            .find(|c| c.name() == wanted)
            .ok_or_else(|| reject("city", s, &City::ALL.map(City::name)))
    }
}

/// Lower-case month names, January first. The sources only cover the first
/// half of the year.
pub const MONTH_NAMES: [&str; 6] = ["january", "february", "march", "april", "may", "june"];

/// Lower-case day names, Sunday first.
pub const DAY_NAMES: [&str; 7] = [
    "sunday",
    "monday",
    "tuesday",
    "wednesday",
    "thursday",
    "friday",
    "saturday",
];

const WEEKDAYS: [Weekday; 7] = [
    Weekday::Sun,
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
];

/// A month that trips can be filtered on, January (1) through June (6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct CalendarMonth(u32);

impl CalendarMonth {
    /// `None` outside 1..=6.
    pub fn new(number: u32) -> Option<Self> {
        (1..=MONTH_NAMES.len() as u32)
            .contains(&number)
            .then_some(CalendarMonth(number))
    }

    pub fn number(self) -> u32 {
        self.0
    }

    pub fn name(self) -> &'static str {
        MONTH_NAMES[self.0 as usize - 1]
    }
}

/// Month filter: one of January-June, or every month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MonthSelector {
    #[default]
    All,
    Month(CalendarMonth),
}

impl MonthSelector {
    /// Select a single month by number, `None` outside January-June.
    pub fn month(number: u32) -> Option<Self> {
        CalendarMonth::new(number).map(MonthSelector::Month)
    }

    pub fn matches(self, month: u32) -> bool {
        match self {
            MonthSelector::All => true,
            MonthSelector::Month(m) => m.number() == month,
        }
    }
}

impl fmt::Display for MonthSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MonthSelector::All => f.write_str("all"),
            MonthSelector::Month(m) => f.write_str(m.name()),
        }
    }
}

impl FromStr for MonthSelector {
    type Err = SelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = normalise(s);
        if wanted == "all" {
            return Ok(MonthSelector::All);
        }
        MONTH_NAMES
            .iter()
            .position(|name| *name == wanted)
            .map(|i| MonthSelector::Month(CalendarMonth(i as u32 + 1)))
            .ok_or_else(|| {
                let mut names = MONTH_NAMES.to_vec();
                names.push("all");
                reject("month", s, &names)
            })
    }
}

/// Day-of-week filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DaySelector {
    #[default]
    All,
    Day(Weekday),
}

impl DaySelector {
    pub fn matches(self, weekday: Weekday) -> bool {
        match self {
            DaySelector::All => true,
            DaySelector::Day(d) => d == weekday,
        }
    }
}

impl fmt::Display for DaySelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DaySelector::All => f.write_str("all"),
            DaySelector::Day(d) => f.write_str(day_name(*d)),
        }
    }
}

impl FromStr for DaySelector {
    type Err = SelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = normalise(s);
        if wanted == "all" {
            return Ok(DaySelector::All);
        }
        DAY_NAMES
            .iter()
            .position(|name| *name == wanted)
            .map(|i| DaySelector::Day(WEEKDAYS[i]))
            .ok_or_else(|| {
                let mut names = DAY_NAMES.to_vec();
                names.push("all");
                reject("day", s, &names)
            })
    }
}

// Selectors serialize as their lower-case names ("march", "all").
impl Serialize for MonthSelector {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl Serialize for DaySelector {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Lower-case English name of a weekday.
pub fn day_name(day: Weekday) -> &'static str {
    DAY_NAMES[day.num_days_from_sunday() as usize]
}

/// The full selection for one pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FilterSpec {
    pub city: City,
    pub month: MonthSelector,
    pub day: DaySelector,
}

impl FilterSpec {
    pub fn new(city: City, month: MonthSelector, day: DaySelector) -> Self {
        FilterSpec { city, month, day }
    }

    /// Whether a trip passes both the month and the day selector.
    pub fn matches(&self, record: &TripRecord) -> bool {
        self.month.matches(record.month()) && self.day.matches(record.weekday())
    }

    pub fn is_unfiltered(&self) -> bool {
        self.month == MonthSelector::All && self.day == DaySelector::All
    }
}

// ---------------------------------------------------------------------------
// Filtering
// ---------------------------------------------------------------------------

/// Return indices of trips that pass the month and day selectors.
pub fn filtered_indices(table: &TripTable, spec: &FilterSpec) -> Vec<usize> {
    table
        .records()
        .iter()
        .enumerate()
        .filter(|(_, record)| spec.matches(record))
        .map(|(i, _)| i)
        .collect()
}

/// Build a new table holding only the trips that pass `spec`. The input is
/// left untouched and the schema is carried over.
pub fn apply_filter(table: &TripTable, spec: &FilterSpec) -> TripTable {
    if spec.is_unfiltered() {
        return table.clone();
    }
    let records: Vec<TripRecord> = filtered_indices(table, spec)
        .into_iter()
        .map(|i| table.records()[i].clone())
        .collect();
    log::debug!(
        "Filter month={} day={} kept {} of {} trips",
        spec.month,
        spec.day,
        records.len(),
        table.len()
    );
    TripTable::new(records, table.columns().clone())
}
