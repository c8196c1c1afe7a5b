/// Data layer: KPI records, loading, and filtering.
///
/// Architecture:
/// ```text
///  .parquet / .json / .csv
///        │
///        ▼
///   ┌──────────┐
///   │  loader  │  parse file → KpiDataset
///   └──────────┘
///        │
///        ▼
///   ┌────────────┐
///   │ KpiDataset │  Vec<KpiRecord>, picker values per dimension
///   └────────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter  │  FilterState + extractors → surviving records
///   └──────────┘
/// ```

pub mod filter;
pub mod loader;
pub mod model;
