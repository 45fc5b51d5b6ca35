/// Data layer: core types, loading, filtering and aggregation.
///
/// Architecture:
/// ```text
///  CRIM API (JSON) / .json / .csv / .parquet snapshot
///        │
///        ▼
///   ┌──────────┐   ┌───────┐
///   │  loader   │──│ cache │  flatten records → Table, memoised per source
///   └──────────┘   └───────┘
///        │
///        ▼
///   ┌──────────┐
///   │  schema   │  validate, fold case, split into (selection, full)
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  cascade of stages over both views, row-aligned
///   └──────────┘
///        │
///        ▼
///   ┌───────────┐
///   │ aggregate │  counts per field, subtype counts (catalog) → charts
///   └───────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  export   │  final full table → CSV
///   └──────────┘
/// ```

pub mod aggregate;
pub mod cache;
pub mod catalog;
pub mod error;
pub mod export;
pub mod filter;
pub mod loader;
pub mod model;
pub mod schema;
