use serde::Serialize;

use super::{mode, Mode};
use crate::data::model::TripTable;

/// A trip's (end station, start station) key. Field order is the comparison
/// order, so ties between pairs break on the end station first.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct StationPair {
    pub end_station: String,
    pub start_station: String,
}

/// Most popular stations and trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StationStats {
    pub start_station: Option<Mode<String>>,
    pub end_station: Option<Mode<String>>,
    pub combination: Option<Mode<StationPair>>,
}

pub fn station_stats(table: &TripTable) -> StationStats {
    let trips = table.records();
    StationStats {
        start_station: mode(trips.iter().map(|t| t.start_station.as_str()))
            .map(|m| m.map(str::to_string)),
        end_station: mode(trips.iter().map(|t| t.end_station.as_str()))
            .map(|m| m.map(str::to_string)),
        combination: mode(trips.iter().map(|t| (t.end_station.as_str(), t.start_station.as_str())))
            .map(|m| {
                m.map(|(end, start)| StationPair {
                    end_station: end.to_string(),
                    start_station: start.to_string(),
                })
            }),
    }
}
