use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::EtlResult;
use crate::extract::CanonicalTable;
use crate::period::ReportMonth;
use crate::table::RawTable;

/// Write any table as CSV, header first, missing values as empty fields.
pub fn write_table_csv<P: AsRef<Path>>(path: P, table: &RawTable) -> EtlResult<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(&table.columns)?;
    for row in &table.rows {
        writer.write_record(row.iter().map(|cell| cell.to_string()))?;
    }
    writer.flush()?;

    info!("Wrote {} rows to {:?}", table.len(), path);
    Ok(())
}

/// Canonical columns in canonical order.
pub fn write_clean_csv<P: AsRef<Path>>(path: P, table: &CanonicalTable) -> EtlResult<()> {
    write_table_csv(path, &table.to_raw_table())
}

/// `<input stem>_CLEAN_<YYYY-MM>.csv`, next to the input.
pub fn default_clean_path(input: &Path, period: ReportMonth) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "extract".to_string());
    input.with_file_name(format!("{}_CLEAN_{}.csv", stem, period))
}

/// `<stem>_ENRICHED.csv`, next to the clean output.
pub fn enriched_path(clean_csv: &Path) -> PathBuf {
    let stem = clean_csv
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "extract".to_string());
    clean_csv.with_file_name(format!("{}_ENRICHED.csv", stem))
}
