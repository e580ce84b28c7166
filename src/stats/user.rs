use serde::Serialize;

use super::{mode, value_counts, Availability, Mode, ValueCount};
use crate::data::model::{Column, TripTable};

/// Birth year extremes and mode. All `None` when the column exists but
/// every cell is empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BirthYearStats {
    pub earliest: Option<i32>,
    pub most_recent: Option<i32>,
    pub most_common: Option<Mode<i32>>,
}

/// Who rode.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserStats {
    pub user_types: Vec<ValueCount>,
    pub gender: Availability<Vec<ValueCount>>,
    pub birth_year: Availability<BirthYearStats>,
}

pub fn user_stats(table: &TripTable) -> UserStats {
    let trips = table.records();

    let user_types = value_counts(trips.iter().filter_map(|t| t.user_type.clone()));

    let gender = if table.has_column(Column::Gender) {
        Availability::Available(value_counts(trips.iter().filter_map(|t| t.gender.clone())))
    } else {
        Availability::Unavailable
    };

    let birth_year = if table.has_column(Column::BirthYear) {
        let years = || trips.iter().filter_map(|t| t.birth_year);
        Availability::Available(BirthYearStats {
            earliest: years().min(),
            most_recent: years().max(),
            most_common: mode(years()),
        })
    } else {
        Availability::Unavailable
    };

    UserStats {
        user_types,
        gender,
        birth_year,
    }
}
