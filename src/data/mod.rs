/// Data layer: core types, loading, and chart series extraction.
///
/// Architecture:
/// ```text
///  .csv / .xlsx
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → ParsedTable → LoadedData (+ datetime inference)
///   └──────────┘
///        │
///        ▼
///   ┌────────────┐
///   │ LoadedData │  headers, Vec<Record>, datetime_key
///   └────────────┘
///        │
///        ├──────────────► features::build_features  (training / forecasting)
///        ▼
///   ┌──────────┐
///   │  series   │  numeric columns → chart points
///   └──────────┘
/// ```

pub mod loader;
pub mod model;
pub mod series;
