use serde::Serialize;

use crate::data::model::TripTable;

/// Total and mean trip duration, in seconds.
///
/// Durations are summed as recorded: a negative value lowers the total, it
/// is not rejected. Trips without a duration are left out of both figures.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DurationStats {
    /// Trips that carried a duration.
    pub trips: usize,
    pub total: f64,
    /// `None` when no trip carried a duration.
    pub mean: Option<f64>,
}

pub fn duration_stats(table: &TripTable) -> DurationStats {
    let (trips, total) = table
        .records()
        .iter()
        .filter_map(|t| t.duration)
        .fold((0usize, 0.0f64), |(n, sum), d| (n + 1, sum + d));

    DurationStats {
        trips,
        total,
        mean: (trips > 0).then(|| total / trips as f64),
    }
}
