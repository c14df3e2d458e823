/// Data layer: core types, loading, unification, inference, filtering,
/// aggregation, and export.
///
/// Architecture:
/// ```text
///  .xlsx / .csv / .json
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  decode sheets → Workbook (+ skipped-sheet diagnostics)
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  unify    │  "all" sheet | canonical period sheets | fallback concat
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  infer    │  classify columns numeric / categorical / year, coerce
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  set / range predicates → filtered Table
///   └──────────┘
///        │
///        ▼
///   ┌───────────┐
///   │ aggregate  │  group-reduce / pivot (mean, median, sum, count)
///   └───────────┘
///        │
///        ▼
///   summary / export
/// ```
///
/// Every stage is a pure function of its input plus caller parameters; no
/// stage mutates a table in place.

pub mod aggregate;
pub mod error;
pub mod export;
pub mod filter;
pub mod infer;
pub mod loader;
pub mod model;
pub mod pipeline;
pub mod summary;
pub mod unify;
