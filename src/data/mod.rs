/// Data layer: core types, loading, filtering, and aggregation.
///
/// Architecture:
/// ```text
///  .json / .jsonl / .csv / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse + coerce rows → Dataset (cached once)
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │ Dataset   │  Vec<Record>, date bounds, value universes
///   └──────────┘
///        │  FilterState
///        ▼
///   ┌──────────┐
///   │  filter   │  AND of date range + set predicates → FilteredView
///   └──────────┘
///        │
///        ▼
///   ┌───────────┐
///   │ aggregate  │  KPIs + groupings → MetricsSnapshot
///   └───────────┘
/// ```

pub mod aggregate;
pub mod filter;
pub mod loader;
pub mod model;
