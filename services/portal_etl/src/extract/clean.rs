//! Projection, renaming, type coercion and derived metrics

use serde::Deserialize;
use tracing::info;

use crate::error::{EtlError, EtlResult};
use crate::extract::dedupe::{dedupe_within_period, DedupPolicy};
use crate::extract::schema::{CanonicalRecord, CanonicalTable, RENAME_MAP};
use crate::period::ReportMonth;
use crate::table::{cell_at, Cell, RawTable};

const MISSING_TOKENS: [&str; 4] = ["", "na", "n/a", "nan"];
const MONEY_NOISE: [char; 5] = ['$', '€', '£', '¥', ','];

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CleanerConfig {
    #[serde(default)]
    pub dedup_policy: DedupPolicy,
}

pub struct ExtractCleaner {
    config: CleanerConfig,
}

impl ExtractCleaner {
    pub fn new(config: CleanerConfig) -> Self {
        Self { config }
    }

    /// Clean a raw extract into canonical records for `period`.
    ///
    /// Fails fast with `SchemaMismatch` if any required column is absent.
    /// Never drops rows: one canonical record per raw row.
    pub fn clean(&self, raw: &RawTable, period: ReportMonth) -> EtlResult<CanonicalTable> {
        let headers: Vec<&str> = raw.columns.iter().map(|c| c.trim()).collect();

        let mut positions = [0usize; RENAME_MAP.len()];
        let mut missing = Vec::new();
        for (slot, (source, _)) in positions.iter_mut().zip(RENAME_MAP.iter()) {
            match headers.iter().position(|h| h == source) {
                Some(idx) => *slot = idx,
                None => missing.push(source.to_string()),
            }
        }
        if !missing.is_empty() {
            return Err(EtlError::SchemaMismatch { missing });
        }

        let records: Vec<CanonicalRecord> = raw
            .rows
            .iter()
            .map(|row| {
                let field = |i: usize| cell_at(row, positions[i]);
                clean_row(
                    [
                        field(0),
                        field(1),
                        field(2),
                        field(3),
                        field(4),
                        field(5),
                        field(6),
                        field(7),
                        field(8),
                        field(9),
                        field(10),
                        field(11),
                        field(12),
                    ],
                    period,
                )
            })
            .collect();

        let missing_money = records
            .iter()
            .filter(|r| r.cost.is_none() || r.retail.is_none())
            .count();
        info!(
            "Cleaned {} rows for {} ({} with missing cost/retail)",
            records.len(),
            period,
            missing_money
        );

        Ok(CanonicalTable::new(records))
    }

    pub fn dedupe_within_period(&self, table: &CanonicalTable) -> CanonicalTable {
        dedupe_within_period(table, self.config.dedup_policy)
    }
}

/// `cells` follow `RENAME_MAP` order.
fn clean_row(cells: [&Cell; 13], period: ReportMonth) -> CanonicalRecord {
    let [logo, sku, description, name, style, cost, retail, merch_category, ownership, sales, on_hand, ly_on_hand, store_units] =
        cells;

    let cost = normalize_money(cost);
    let retail = normalize_money(retail);
    let total_monthly_sales = parse_units(sales);
    let total_on_hand_units = parse_units(on_hand);

    let margin_abs = match (retail, cost) {
        (Some(r), Some(c)) => Some(r - c),
        _ => None,
    };
    let margin_pct = match (retail, cost) {
        (Some(r), Some(c)) if r != 0.0 => Some((r - c) / r),
        _ => None,
    };
    let sell_through = if total_on_hand_units != 0 {
        Some(total_monthly_sales as f64 / total_on_hand_units as f64)
    } else {
        None
    };

    CanonicalRecord {
        logo: clean_text(logo),
        sku: clean_text(sku).and_then(strip_float_artifact),
        description: clean_text(description),
        name: clean_text(name),
        style: clean_text(style),
        cost,
        retail,
        merch_category: clean_text(merch_category),
        ownership: clean_text(ownership),
        total_monthly_sales,
        total_on_hand_units,
        ly_total_on_hand_units: parse_units(ly_on_hand),
        store_total_units: parse_units(store_units),
        margin_abs,
        margin_pct,
        sell_through,
        report_month: period,
    }
}

/// Strip currency symbols and thousands separators; placeholders and
/// unparseable text become `None`, never zero.
pub fn normalize_money(cell: &Cell) -> Option<f64> {
    match cell {
        Cell::Blank => None,
        Cell::Number(n) => n.is_finite().then_some(*n),
        Cell::Text(s) => {
            let stripped: String = s.chars().filter(|c| !MONEY_NOISE.contains(c)).collect();
            let trimmed = stripped.trim();
            if MISSING_TOKENS.contains(&trimmed.to_ascii_lowercase().as_str()) {
                return None;
            }
            trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
        }
    }
}

/// Unit counts: missing or unparseable → 0, fractions truncate.
fn parse_units(cell: &Cell) -> i64 {
    match cell {
        Cell::Blank => 0,
        Cell::Number(n) if n.is_finite() => n.trunc() as i64,
        Cell::Number(_) => 0,
        Cell::Text(s) => {
            let stripped: String = s.chars().filter(|c| *c != ',').collect();
            let trimmed = stripped.trim();
            trimmed
                .parse::<i64>()
                .ok()
                .or_else(|| {
                    trimmed
                        .parse::<f64>()
                        .ok()
                        .filter(|v| v.is_finite())
                        .map(|v| v.trunc() as i64)
                })
                .unwrap_or(0)
        }
    }
}

fn clean_text(cell: &Cell) -> Option<String> {
    let text = cell.to_string();
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Identifiers that went through a spreadsheet float come back as "123.0".
fn strip_float_artifact(sku: String) -> Option<String> {
    let cleaned = match sku.strip_suffix(".0") {
        Some(head) => head.to_string(),
        None => sku,
    };
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}
