//! Output artifacts: clean/enriched CSV files and the parquet master dataset

pub mod csv_out;
pub mod master;

pub use csv_out::*;
pub use master::*;
