/// Data layer: core types, loading, cleaning, and date-range queries.
///
/// Architecture:
/// ```text
///  .csv / .json / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → RawTable
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  clean    │  timestamps, numeric coercion, drop incomplete rows
///   └──────────┘
///        │
///        ▼
///   ┌────────────────┐
///   │ StationDataset  │  Vec<Observation>, sorted by timestamp
///   └────────────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  date range → FilteredView (+ aggregate: monthly mean, correlation)
///   └──────────┘
/// ```

pub mod aggregate;
pub mod clean;
pub mod filter;
pub mod loader;
pub mod model;
