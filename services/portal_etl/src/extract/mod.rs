//! Vendor extract cleaning: load → clean → dedupe within a reporting period.
//!
//! 1. `load_raw` reads a spreadsheet or delimited-text extract into a `RawTable`
//! 2. `ExtractCleaner::clean` projects, renames and coerces it into canonical records
//! 3. `dedupe_within_period` keeps the last row per deduplication key

pub mod schema;
pub mod load;
pub mod clean;
pub mod dedupe;

pub use schema::*;
pub use load::*;
pub use clean::*;
pub use dedupe::*;
