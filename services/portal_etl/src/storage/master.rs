//! Parquet master dataset, one file holding every cleaned period

use std::fs::File;
use std::path::{Path, PathBuf};

use polars::prelude::*;
use tracing::info;

use crate::error::EtlResult;
use crate::extract::{CanonicalRecord, CanonicalTable};
use crate::period::ReportMonth;

pub struct MasterDataset {
    path: PathBuf,
}

impl MasterDataset {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Every stored record; an absent file is an empty dataset.
    pub fn load(&self) -> EtlResult<CanonicalTable> {
        if !self.path.exists() {
            return Ok(CanonicalTable::default());
        }
        let file = File::open(&self.path)?;
        let df = ParquetReader::new(file).finish()?;
        dataframe_to_records(&df)
    }

    /// Append `table` for `period`, first dropping every stored row of that
    /// period when `replace` is set, even if `table` is empty. Returns the
    /// new total row count.
    pub fn upsert(&self, table: &CanonicalTable, period: ReportMonth, replace: bool) -> EtlResult<usize> {
        let mut records = self.load()?.records;
        let before = records.len();

        if replace {
            records.retain(|r| r.report_month != period);
        }
        let replaced = before - records.len();
        records.extend(table.records.iter().cloned());

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        let mut df = records_to_dataframe(&records)?;
        let file = File::create(&tmp)?;
        ParquetWriter::new(file).finish(&mut df)?;
        std::fs::rename(&tmp, &self.path)?;

        info!(
            "Master {:?}: replaced {} rows, appended {}, total {}",
            self.path,
            replaced,
            table.len(),
            records.len()
        );
        Ok(records.len())
    }
}

fn records_to_dataframe(records: &[CanonicalRecord]) -> EtlResult<DataFrame> {
    let logo: Vec<Option<&str>> = records.iter().map(|r| r.logo.as_deref()).collect();
    let sku: Vec<Option<&str>> = records.iter().map(|r| r.sku.as_deref()).collect();
    let description: Vec<Option<&str>> = records.iter().map(|r| r.description.as_deref()).collect();
    let name: Vec<Option<&str>> = records.iter().map(|r| r.name.as_deref()).collect();
    let style: Vec<Option<&str>> = records.iter().map(|r| r.style.as_deref()).collect();
    let cost: Vec<Option<f64>> = records.iter().map(|r| r.cost).collect();
    let retail: Vec<Option<f64>> = records.iter().map(|r| r.retail).collect();
    let merch_category: Vec<Option<&str>> = records.iter().map(|r| r.merch_category.as_deref()).collect();
    let ownership: Vec<Option<&str>> = records.iter().map(|r| r.ownership.as_deref()).collect();
    let total_monthly_sales: Vec<i64> = records.iter().map(|r| r.total_monthly_sales).collect();
    let total_on_hand_units: Vec<i64> = records.iter().map(|r| r.total_on_hand_units).collect();
    let ly_total_on_hand_units: Vec<i64> = records.iter().map(|r| r.ly_total_on_hand_units).collect();
    let store_total_units: Vec<i64> = records.iter().map(|r| r.store_total_units).collect();
    let margin_abs: Vec<Option<f64>> = records.iter().map(|r| r.margin_abs).collect();
    let margin_pct: Vec<Option<f64>> = records.iter().map(|r| r.margin_pct).collect();
    let sell_through: Vec<Option<f64>> = records.iter().map(|r| r.sell_through).collect();
    // YYYY-MM text
    let report_month: Vec<String> = records.iter().map(|r| r.report_month.to_string()).collect();

    let df = DataFrame::new(vec![
        Series::new("logo", logo),
        Series::new("sku", sku),
        Series::new("description", description),
        Series::new("name", name),
        Series::new("style", style),
        Series::new("cost", cost),
        Series::new("retail", retail),
        Series::new("merch_category", merch_category),
        Series::new("ownership", ownership),
        Series::new("total_monthly_sales", total_monthly_sales),
        Series::new("total_on_hand_units", total_on_hand_units),
        Series::new("ly_total_on_hand_units", ly_total_on_hand_units),
        Series::new("store_total_units", store_total_units),
        Series::new("margin_abs", margin_abs),
        Series::new("margin_pct", margin_pct),
        Series::new("sell_through", sell_through),
        Series::new("report_month", report_month),
    ])?;
    Ok(df)
}

fn dataframe_to_records(df: &DataFrame) -> EtlResult<CanonicalTable> {
    let logo = df.column("logo")?.str()?;
    let sku = df.column("sku")?.str()?;
    let description = df.column("description")?.str()?;
    let name = df.column("name")?.str()?;
    let style = df.column("style")?.str()?;
    let cost = df.column("cost")?.f64()?;
    let retail = df.column("retail")?.f64()?;
    let merch_category = df.column("merch_category")?.str()?;
    let ownership = df.column("ownership")?.str()?;
    let total_monthly_sales = df.column("total_monthly_sales")?.i64()?;
    let total_on_hand_units = df.column("total_on_hand_units")?.i64()?;
    let ly_total_on_hand_units = df.column("ly_total_on_hand_units")?.i64()?;
    let store_total_units = df.column("store_total_units")?.i64()?;
    let margin_abs = df.column("margin_abs")?.f64()?;
    let margin_pct = df.column("margin_pct")?.f64()?;
    let sell_through = df.column("sell_through")?.f64()?;
    let report_month = df.column("report_month")?.str()?;

    let owned = |v: Option<&str>| v.map(str::to_string);
    let mut records = Vec::with_capacity(df.height());
    for i in 0..df.height() {
        records.push(CanonicalRecord {
            logo: owned(logo.get(i)),
            sku: owned(sku.get(i)),
            description: owned(description.get(i)),
            name: owned(name.get(i)),
            style: owned(style.get(i)),
            cost: cost.get(i),
            retail: retail.get(i),
            merch_category: owned(merch_category.get(i)),
            ownership: owned(ownership.get(i)),
            total_monthly_sales: total_monthly_sales.get(i).unwrap_or(0),
            total_on_hand_units: total_on_hand_units.get(i).unwrap_or(0),
            ly_total_on_hand_units: ly_total_on_hand_units.get(i).unwrap_or(0),
            store_total_units: store_total_units.get(i).unwrap_or(0),
            margin_abs: margin_abs.get(i),
            margin_pct: margin_pct.get(i),
            sell_through: sell_through.get(i),
            report_month: report_month.get(i).unwrap_or_default().parse()?,
        });
    }
    Ok(CanonicalTable::new(records))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::schema::fixtures::record;
    use tempfile::TempDir;

    fn month(m: u32) -> ReportMonth {
        ReportMonth::new(2025, m).unwrap()
    }

    fn in_month(sku: &str, m: u32) -> CanonicalRecord {
        let mut r = record(Some(sku), "AB100", 3);
        r.report_month = month(m);
        r
    }

    #[test]
    fn test_upsert_replace_swaps_period() {
        let dir = TempDir::new().unwrap();
        let master = MasterDataset::new(dir.path().join("nested").join("master.parquet"));

        let july = CanonicalTable::new(vec![in_month("1", 7), in_month("2", 7)]);
        assert_eq!(master.upsert(&july, month(7), true).unwrap(), 2);

        let august = CanonicalTable::new(vec![in_month("3", 8)]);
        assert_eq!(master.upsert(&august, month(8), true).unwrap(), 3);

        let july_again = CanonicalTable::new(vec![in_month("9", 7)]);
        assert_eq!(master.upsert(&july_again, month(7), true).unwrap(), 2);

        let stored = master.load().unwrap();
        let mut skus: Vec<_> = stored.iter().map(|r| r.sku.clone().unwrap()).collect();
        skus.sort();
        assert_eq!(skus, vec!["3", "9"]);
        assert!(!dir.path().join("nested").join("master.parquet.tmp").exists());
    }

    #[test]
    fn test_empty_rerun_clears_period() {
        let dir = TempDir::new().unwrap();
        let master = MasterDataset::new(dir.path().join("master.parquet"));
        let july = CanonicalTable::new(vec![in_month("1", 7)]);
        let august = CanonicalTable::new(vec![in_month("2", 8)]);
        master.upsert(&july, month(7), true).unwrap();
        master.upsert(&august, month(8), true).unwrap();

        assert_eq!(master.upsert(&CanonicalTable::default(), month(7), true).unwrap(), 1);
        let stored = master.load().unwrap();
        assert_eq!(stored.iter().filter(|r| r.report_month == month(7)).count(), 0);
        assert_eq!(stored.records[0].sku.as_deref(), Some("2"));
    }

    #[test]
    fn test_upsert_without_replace_appends() {
        let dir = TempDir::new().unwrap();
        let master = MasterDataset::new(dir.path().join("master.parquet"));
        let july = CanonicalTable::new(vec![in_month("1", 7)]);

        master.upsert(&july, month(7), false).unwrap();
        assert_eq!(master.upsert(&july, month(7), false).unwrap(), 2);
    }

    #[test]
    fn test_round_trip_keeps_missing_values() {
        let dir = TempDir::new().unwrap();
        let master = MasterDataset::new(dir.path().join("master.parquet"));
        let mut rec = record(None, "AB100", 0);
        rec.cost = None;
        rec.margin_abs = None;
        rec.margin_pct = None;
        rec.sell_through = None;

        master.upsert(&CanonicalTable::new(vec![rec.clone()]), month(7), true).unwrap();
        assert_eq!(master.load().unwrap().records, vec![rec]);
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let master = MasterDataset::new(dir.path().join("absent.parquet"));
        assert!(master.load().unwrap().is_empty());
    }
}
