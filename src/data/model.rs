use std::collections::BTreeSet;
use std::fmt;

use chrono::{Datelike, NaiveDateTime, Timelike, Weekday};
use serde::Serialize;

// ---------------------------------------------------------------------------
// CellValue – a single raw cell read from a source file
// ---------------------------------------------------------------------------

/// A dynamically-typed cell as it comes out of CSV, JSON or Parquet, before
/// it is interpreted as a trip field.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    String(String),
    Integer(i64),
    Float(f64),
    Timestamp(NaiveDateTime),
    Null,
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::String(s) => write!(f, "{s}"),
            CellValue::Integer(i) => write!(f, "{i}"),
            CellValue::Float(v) => write!(f, "{v}"),
            CellValue::Timestamp(t) => write!(f, "{}", t.format(TIMESTAMP_FORMAT)),
            CellValue::Null => write!(f, "<null>"),
        }
    }
}

impl CellValue {
    /// Interpret the cell as text. Empty strings count as missing.
    pub fn as_text(&self) -> Option<String> {
        match self {
            CellValue::Null => None,
            CellValue::String(s) if s.trim().is_empty() => None,
            CellValue::String(s) => Some(s.trim().to_string()),
            other => Some(other.to_string()),
        }
    }

    /// Try to interpret the cell as an `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Float(v) => Some(*v),
            CellValue::Integer(i) => Some(*i as f64),
            CellValue::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Birth years are stored as floats by some exports (`1992.0`).
    pub fn as_year(&self) -> Option<i32> {
        match self {
            CellValue::Integer(i) => i32::try_from(*i).ok(),
            other => other
                .as_f64()
                .filter(|v| v.is_finite() && v.fract() == 0.0)
                .map(|v| v as i32),
        }
    }

    /// Try to interpret the cell as a naive timestamp.
    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        match self {
            CellValue::Timestamp(t) => Some(*t),
            CellValue::String(s) => parse_timestamp(s),
            _ => None,
        }
    }
}

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Parse `YYYY-MM-DD HH:MM:SS`, with optional fractional seconds and an
/// optional `T` separator.
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
}

// ---------------------------------------------------------------------------
// Column – the known fields of a trip source
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Column {
    StartTime,
    EndTime,
    TripDuration,
    StartStation,
    EndStation,
    UserType,
    Gender,
    BirthYear,
}

impl Column {
    pub const ALL: [Column; 8] = [
        Column::StartTime,
        Column::EndTime,
        Column::TripDuration,
        Column::StartStation,
        Column::EndStation,
        Column::UserType,
        Column::Gender,
        Column::BirthYear,
    ];

    /// Columns without which a row cannot become a [`TripRecord`].
    pub const REQUIRED: [Column; 3] = [Column::StartTime, Column::StartStation, Column::EndStation];

    /// Header name as written in the source files.
    pub fn header(self) -> &'static str {
        match self {
            Column::StartTime => "Start Time",
            Column::EndTime => "End Time",
            Column::TripDuration => "Trip Duration",
            Column::StartStation => "Start Station",
            Column::EndStation => "End Station",
            Column::UserType => "User Type",
            Column::Gender => "Gender",
            Column::BirthYear => "Birth Year",
        }
    }

    pub fn from_header(header: &str) -> Option<Column> {
        let header = header.trim();
        Column::ALL.into_iter().find(|c| c.header() == header)
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.header())
    }
}

// ---------------------------------------------------------------------------
// TripRecord – one row of the table
// ---------------------------------------------------------------------------

/// A single bikeshare trip.
///
/// `month` and `weekday` are derived from `start_time` when the record is
/// built and cannot be set independently, so they always agree with it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TripRecord {
    /// Value of the source's leading index column, if it had one.
    pub id: Option<String>,
    start_time: NaiveDateTime,
    pub end_time: Option<NaiveDateTime>,
    /// Trip duration in seconds.
    pub duration: Option<f64>,
    pub start_station: String,
    pub end_station: String,
    pub user_type: Option<String>,
    pub gender: Option<String>,
    pub birth_year: Option<i32>,
    month: u32,
    weekday: Weekday,
}

impl TripRecord {
    pub fn new(
        start_time: NaiveDateTime,
        start_station: impl Into<String>,
        end_station: impl Into<String>,
    ) -> Self {
        TripRecord {
            id: None,
            start_time,
            end_time: None,
            duration: None,
            start_station: start_station.into(),
            end_station: end_station.into(),
            user_type: None,
            gender: None,
            birth_year: None,
            month: start_time.month(),
            weekday: start_time.weekday(),
        }
    }

    pub fn start_time(&self) -> NaiveDateTime {
        self.start_time
    }

    /// Calendar month of the start time, 1-12.
    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn weekday(&self) -> Weekday {
        self.weekday
    }

    pub fn start_hour(&self) -> u32 {
        self.start_time.hour()
    }
}

// ---------------------------------------------------------------------------
// TripTable – the complete loaded (or filtered) table
// ---------------------------------------------------------------------------

/// An ordered set of trips sharing one schema.
#[derive(Debug, Clone, PartialEq)]
pub struct TripTable {
    records: Vec<TripRecord>,
    /// Known columns present in the source.
    columns: BTreeSet<Column>,
}

impl TripTable {
    pub fn new(records: Vec<TripRecord>, columns: BTreeSet<Column>) -> Self {
        TripTable { records, columns }
    }

    pub fn records(&self) -> &[TripRecord] {
        &self.records
    }

    pub fn columns(&self) -> &BTreeSet<Column> {
        &self.columns
    }

    /// Schema capability check: whether the source carried `column` at all.
    pub fn has_column(&self, column: Column) -> bool {
        self.columns.contains(&column)
    }

    /// Number of trips.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
