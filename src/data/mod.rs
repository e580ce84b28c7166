/// Data layer: trip types, loading, and filtering.
///
/// Architecture:
/// ```text
///  chicago / new_york_city / washington  (.csv / .parquet / .json)
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → TripTable, derive month + weekday
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │ TripTable │  Vec<TripRecord>, set of columns present
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  month / day selectors → new TripTable
///   └──────────┘
/// ```

pub mod error;
pub mod filter;
pub mod loader;
pub mod model;
