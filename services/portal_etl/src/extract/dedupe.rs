//! Last-write-wins deduplication within a reporting period

use std::collections::HashSet;

use serde::Deserialize;
use tracing::info;

use crate::extract::schema::{CanonicalRecord, CanonicalTable};
use crate::period::ReportMonth;

/// How the natural key is chosen when some rows lack a SKU.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DedupPolicy {
    /// SKU key only if every row in the table has a SKU; otherwise the
    /// composite key for the whole table.
    #[default]
    WholeTable,
    /// SKU key where the row has one, composite key where it does not.
    PerRow,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DedupKey {
    Sku {
        period: ReportMonth,
        sku: String,
    },
    Composite {
        period: ReportMonth,
        style: Option<String>,
        name: Option<String>,
        logo: Option<String>,
    },
}

impl DedupKey {
    pub fn for_record(record: &CanonicalRecord, use_sku: bool) -> Self {
        match (&record.sku, use_sku) {
            (Some(sku), true) if !sku.trim().is_empty() => DedupKey::Sku {
                period: record.report_month,
                sku: sku.clone(),
            },
            _ => DedupKey::Composite {
                period: record.report_month,
                style: record.style.clone(),
                name: record.name.clone(),
                logo: record.logo.clone(),
            },
        }
    }
}

/// Keep the last row (in input order) per deduplication key.
pub fn dedupe_within_period(table: &CanonicalTable, policy: DedupPolicy) -> CanonicalTable {
    let use_sku = match policy {
        DedupPolicy::WholeTable => !table.is_empty() && table.iter().all(|r| r.has_sku()),
        DedupPolicy::PerRow => true,
    };

    let mut seen: HashSet<DedupKey> = HashSet::with_capacity(table.len());
    let mut kept: Vec<CanonicalRecord> = table
        .records
        .iter()
        .rev()
        .filter(|r| seen.insert(DedupKey::for_record(r, use_sku)))
        .cloned()
        .collect();
    kept.reverse();

    let dropped = table.len() - kept.len();
    if dropped > 0 {
        info!(
            "Dropped {} duplicate rows ({} key)",
            dropped,
            if use_sku { "sku" } else { "composite" }
        );
    }

    CanonicalTable::new(kept)
}
