use std::io::Write;
use std::time::Instant;

use anyhow::{Context, Result};

use crate::data::filter::FilterSpec;
use crate::data::model::{Column, TripRecord, TripTable, TIMESTAMP_FORMAT};
use crate::stats::duration::{duration_stats, DurationStats};
use crate::stats::station::{station_stats, StationStats};
use crate::stats::time::{time_stats, weekday_title, TimeStats};
use crate::stats::user::{user_stats, UserStats};
use crate::stats::{Availability, Mode, TripStats, ValueCount};

const RULE: &str = "----------------------------------------";
const NO_DATA: &str = "no data";

// ---------------------------------------------------------------------------
// Text report
// ---------------------------------------------------------------------------

/// Compute one statistics group, print it, and print how long it took.
fn timed_section<W: Write, T>(
    out: &mut W,
    heading: &str,
    compute: impl FnOnce() -> T,
    render: impl FnOnce(&mut W, &T) -> std::io::Result<()>,
) -> std::io::Result<()> {
    writeln!(out, "\n{heading}\n")?;
    let started = Instant::now();
    let result = compute();
    render(out, &result)?;
    let elapsed = started.elapsed();
    log::debug!("{heading} took {elapsed:?}");
    writeln!(out, "\nThis took {:.6} seconds.", elapsed.as_secs_f64())?;
    writeln!(out, "{RULE}")
}

/// Print every statistics group for a filtered table.
pub fn render_report<W: Write>(out: &mut W, table: &TripTable, spec: &FilterSpec) -> Result<()> {
    writeln!(
        out,
        "\n{} trips in {} (month: {}, day: {})",
        table.len(),
        spec.city,
        spec.month,
        spec.day
    )?;

    timed_section(
        out,
        "Calculating The Most Frequent Times of Travel...",
        || time_stats(table),
        write_time_stats,
    )
    .context("writing time statistics")?;
    timed_section(
        out,
        "Calculating The Most Popular Stations and Trip...",
        || station_stats(table),
        write_station_stats,
    )
    .context("writing station statistics")?;
    timed_section(
        out,
        "Calculating Trip Duration...",
        || duration_stats(table),
        write_duration_stats,
    )
    .context("writing duration statistics")?;
    timed_section(
        out,
        "Calculating User Stats...",
        || user_stats(table),
        |out, stats| write_user_stats(out, stats, spec),
    )
    .context("writing user statistics")?;
    Ok(())
}

fn mode_text<T: std::fmt::Display>(mode: &Option<Mode<T>>) -> String {
    match mode {
        Some(m) => format!("{} (count: {})", m.value, m.count),
        None => NO_DATA.to_string(),
    }
}

pub fn write_time_stats<W: Write>(out: &mut W, stats: &TimeStats) -> std::io::Result<()> {
    writeln!(out, "Most common month: {}", mode_text(&stats.month))?;
    writeln!(out, "Most common day of the week: {}", mode_text(&stats.weekday))?;
    writeln!(out, "Most common start hour: {}", mode_text(&stats.start_hour))
}

pub fn write_station_stats<W: Write>(out: &mut W, stats: &StationStats) -> std::io::Result<()> {
    writeln!(out, "Most commonly used start station: {}", mode_text(&stats.start_station))?;
    writeln!(out, "Most commonly used end station: {}", mode_text(&stats.end_station))?;
    let combination = match &stats.combination {
        Some(m) => format!(
            "from {} to {} (count: {})",
            m.value.start_station, m.value.end_station, m.count
        ),
        None => NO_DATA.to_string(),
    };
    writeln!(out, "Most frequent combination of start and end stations: {combination}")
}

pub fn write_duration_stats<W: Write>(out: &mut W, stats: &DurationStats) -> std::io::Result<()> {
    writeln!(out, "Total travel time: {} seconds", stats.total)?;
    match stats.mean {
        Some(mean) => writeln!(out, "Average travel time: {mean:.2} seconds"),
        None => writeln!(out, "Average travel time: {NO_DATA}"),
    }
}

fn write_counts<W: Write>(out: &mut W, counts: &[ValueCount]) -> std::io::Result<()> {
    if counts.is_empty() {
        return writeln!(out, "  {NO_DATA}");
    }
    let width = counts.iter().map(|c| c.value.len()).max().unwrap_or(0);
    for c in counts {
        writeln!(out, "  {:<width$}  {}", c.value, c.count)?;
    }
    Ok(())
}

pub fn write_user_stats<W: Write>(
    out: &mut W,
    stats: &UserStats,
    spec: &FilterSpec,
) -> std::io::Result<()> {
    writeln!(out, "Counts of user types:")?;
    write_counts(out, &stats.user_types)?;

    match &stats.gender {
        Availability::Available(counts) => {
            writeln!(out, "\nCounts of gender:")?;
            write_counts(out, counts)?;
        }
        Availability::Unavailable => writeln!(out, "\nNo gender data available for {}", spec.city)?,
    }

    match &stats.birth_year {
        Availability::Available(years) => {
            let year = |y: Option<i32>| y.map_or_else(|| NO_DATA.to_string(), |y| y.to_string());
            writeln!(out, "\nEarliest year of birth: {}", year(years.earliest))?;
            writeln!(out, "Most recent year of birth: {}", year(years.most_recent))?;
            writeln!(out, "Most common year of birth: {}", mode_text(&years.most_common))
        }
        Availability::Unavailable => {
            writeln!(out, "\nNo year of birth data available for {}", spec.city)
        }
    }
}

// ---------------------------------------------------------------------------
// Raw rows
// ---------------------------------------------------------------------------

/// Print a page of raw trips. `first_row` is the position of the page's
/// first trip in the filtered table.
pub fn write_rows<W: Write>(
    out: &mut W,
    table: &TripTable,
    rows: &[TripRecord],
    first_row: usize,
) -> std::io::Result<()> {
    let time = |t: chrono::NaiveDateTime| t.format(TIMESTAMP_FORMAT).to_string();
    let text = |v: &Option<String>| v.clone().unwrap_or_default();

    for (offset, trip) in rows.iter().enumerate() {
        let mut fields: Vec<(&str, String)> = vec![
            ("Row", (first_row + offset).to_string()),
            ("Id", text(&trip.id)),
            (Column::StartTime.header(), time(trip.start_time())),
        ];
        if table.has_column(Column::EndTime) {
            fields.push((Column::EndTime.header(), trip.end_time.map(time).unwrap_or_default()));
        }
        if table.has_column(Column::TripDuration) {
            let duration = trip.duration.map(|d| d.to_string()).unwrap_or_default();
            fields.push((Column::TripDuration.header(), duration));
        }
        fields.push((Column::StartStation.header(), trip.start_station.clone()));
        fields.push((Column::EndStation.header(), trip.end_station.clone()));
        if table.has_column(Column::UserType) {
            fields.push((Column::UserType.header(), text(&trip.user_type)));
        }
        if table.has_column(Column::Gender) {
            fields.push((Column::Gender.header(), text(&trip.gender)));
        }
        if table.has_column(Column::BirthYear) {
            let year = trip.birth_year.map(|y| y.to_string()).unwrap_or_default();
            fields.push((Column::BirthYear.header(), year));
        }
        fields.push(("Month", trip.month().to_string()));
        fields.push(("Day of Week", weekday_title(trip.weekday())));

        for (name, value) in fields {
            writeln!(out, "{name:>14}: {value}")?;
        }
        writeln!(out)?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// JSON report
// ---------------------------------------------------------------------------

pub fn write_json<W: Write>(out: &mut W, stats: &TripStats) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, stats).context("serializing statistics")?;
    writeln!(out)?;
    Ok(())
}
