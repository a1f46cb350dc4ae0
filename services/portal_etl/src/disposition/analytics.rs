//! Disposition filter helpers and worklist KPIs.
//!
//! Filter population and filter application both go through `normalize`,
//! so a label offered to the user always matches the rows it came from.

use std::collections::HashMap;

use serde::Serialize;

use crate::disposition::normalize::{normalize, Disposition};
use crate::error::{EtlError, EtlResult};
use crate::extract::normalize_money;
use crate::table::{cell_at, Cell, RawTable};

fn label_of(cell: &Cell) -> Disposition {
    let text = cell.to_string();
    normalize(Some(&text))
}

fn field_index(table: &RawTable, field: &str) -> EtlResult<usize> {
    table
        .column_index(field)
        .ok_or_else(|| EtlError::missing_column("disposition", field))
}

/// Distinct normalized labels, sorted by display text.
pub fn distinct_dispositions(table: &RawTable, field: &str) -> EtlResult<Vec<Disposition>> {
    let idx = field_index(table, field)?;
    let mut labels: Vec<Disposition> = Vec::new();
    for cell in table.column_cells(idx) {
        let label = label_of(cell);
        if !labels.contains(&label) {
            labels.push(label);
        }
    }
    labels.sort_by(|a, b| a.as_str().cmp(b.as_str()));
    Ok(labels)
}

/// Rows whose normalized label is in `selected`. An empty selection keeps every row.
pub fn filter_by_dispositions(
    table: &RawTable,
    field: &str,
    selected: &[Disposition],
) -> EtlResult<RawTable> {
    let idx = field_index(table, field)?;
    let mut out = RawTable::new(table.columns.clone());
    for row in &table.rows {
        if selected.is_empty() || selected.contains(&label_of(cell_at(row, idx))) {
            out.rows.push(row.clone());
        }
    }
    Ok(out)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Bucket {
    pub count: usize,
    pub amount: f64,
}

impl Bucket {
    fn add(&mut self, amount: f64) {
        self.count += 1;
        self.amount += amount;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DispositionCount {
    pub label: Disposition,
    pub count: usize,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DispositionSummary {
    pub total_lines: usize,
    pub unspecified: usize,
    pub completion_pct: f64,
    pub rtv: Bucket,
    pub hold: Bucket,
    pub perpetual: Bucket,
    pub breakdown: Vec<DispositionCount>,
}

impl DispositionSummary {
    /// KPIs over `table`. Amounts come from `amount_field` when the column
    /// exists; unparseable or missing amounts count as zero in sums.
    pub fn from_table(table: &RawTable, field: &str, amount_field: Option<&str>) -> EtlResult<Self> {
        let idx = field_index(table, field)?;
        let amount_idx = amount_field.and_then(|f| table.column_index(f));

        let mut rtv = Bucket::default();
        let mut hold = Bucket::default();
        let mut perpetual = Bucket::default();
        let mut unspecified = 0usize;
        let mut by_label: HashMap<Disposition, Bucket> = HashMap::new();

        for row in &table.rows {
            let label = label_of(cell_at(row, idx));
            let amount = amount_idx
                .and_then(|i| normalize_money(cell_at(row, i)))
                .unwrap_or(0.0);

            match label {
                Disposition::Unspecified => unspecified += 1,
                Disposition::HoldOnMemoOrMonitor => hold.add(amount),
                Disposition::PerpetualMemo => perpetual.add(amount),
                ref l if l.is_rtv() => rtv.add(amount),
                _ => {}
            }
            by_label.entry(label).or_default().add(amount);
        }

        let total_lines = table.len();
        let completion_pct = if total_lines == 0 {
            0.0
        } else {
            let assigned = (total_lines - unspecified) as f64;
            (1000.0 * assigned / total_lines as f64).round() / 10.0
        };

        let mut breakdown: Vec<DispositionCount> = by_label
            .into_iter()
            .map(|(label, bucket)| DispositionCount {
                label,
                count: bucket.count,
                amount: bucket.amount,
            })
            .collect();
        breakdown.sort_by(|a, b| {
            b.count
                .cmp(&a.count)
                .then_with(|| a.label.as_str().cmp(b.label.as_str()))
        });

        Ok(Self {
            total_lines,
            unspecified,
            completion_pct,
            rtv,
            hold,
            perpetual,
            breakdown,
        })
    }
}
