//! Circuit catalogs, telemetry recordings and frame export.

mod catalog;
mod export;
mod telemetry;

pub use catalog::{builtin_catalog, export_ndjson, import_json, import_ndjson, load_catalog, Catalog, CatalogError};
pub use export::{FrameExporter, RunManifest};
pub use telemetry::{export_telemetry_csv, import_telemetry_csv, read_telemetry_csv};
