//! Canonical schema for cleaned sales/inventory extracts

use crate::period::ReportMonth;
use crate::table::{Cell, RawTable};

/// Source header → canonical name. The keys are also the required-column set.
pub const RENAME_MAP: [(&str, &str); 13] = [
    ("LOGO", "logo"),
    ("SKU", "sku"),
    ("DESCRIPTION", "description"),
    ("NAME", "name"),
    ("STYLE", "style"),
    ("COST", "cost"),
    ("RETAIL", "retail"),
    ("MERCH CATEGORY", "merch_category"),
    ("OWNERSHIP", "ownership"),
    ("TY UNITS", "total_monthly_sales"),
    ("TTL OH U", "total_on_hand_units"),
    ("LY TTL OH U", "ly_total_on_hand_units"),
    ("Store TTL Units", "store_total_units"),
];

pub const CANONICAL_COLUMNS: [&str; 17] = [
    "logo",
    "sku",
    "description",
    "name",
    "style",
    "cost",
    "retail",
    "merch_category",
    "ownership",
    "total_monthly_sales",
    "total_on_hand_units",
    "ly_total_on_hand_units",
    "store_total_units",
    "margin_abs",
    "margin_pct",
    "sell_through",
    "report_month",
];

/// One cleaned extract row. Money and ratios keep missing-value semantics
/// (`None`); unit counts default to zero.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalRecord {
    pub logo: Option<String>,
    pub sku: Option<String>,
    pub description: Option<String>,
    pub name: Option<String>,
    pub style: Option<String>,
    pub cost: Option<f64>,
    pub retail: Option<f64>,
    pub merch_category: Option<String>,
    pub ownership: Option<String>,
    pub total_monthly_sales: i64,
    pub total_on_hand_units: i64,
    pub ly_total_on_hand_units: i64,
    pub store_total_units: i64,
    pub margin_abs: Option<f64>,
    pub margin_pct: Option<f64>,
    pub sell_through: Option<f64>,
    pub report_month: ReportMonth,
}

impl CanonicalRecord {
    /// Values in `CANONICAL_COLUMNS` order.
    pub fn cells(&self) -> Vec<Cell> {
        let text = |v: &Option<String>| Cell::from(v.as_deref());
        vec![
            text(&self.logo),
            text(&self.sku),
            text(&self.description),
            text(&self.name),
            text(&self.style),
            Cell::from(self.cost),
            Cell::from(self.retail),
            text(&self.merch_category),
            text(&self.ownership),
            Cell::Number(self.total_monthly_sales as f64),
            Cell::Number(self.total_on_hand_units as f64),
            Cell::Number(self.ly_total_on_hand_units as f64),
            Cell::Number(self.store_total_units as f64),
            Cell::from(self.margin_abs),
            Cell::from(self.margin_pct),
            Cell::from(self.sell_through),
            Cell::Text(self.report_month.to_string()),
        ]
    }

    pub fn has_sku(&self) -> bool {
        self.sku.as_deref().is_some_and(|s| !s.trim().is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CanonicalTable {
    pub records: Vec<CanonicalRecord>,
}

impl CanonicalTable {
    pub fn new(records: Vec<CanonicalRecord>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CanonicalRecord> {
        self.records.iter()
    }

    /// Untyped copy, so cleaned extracts can flow through the style merge.
    pub fn to_raw_table(&self) -> RawTable {
        let mut table = RawTable::new(CANONICAL_COLUMNS.iter().map(|c| c.to_string()).collect());
        for record in &self.records {
            table.push_row(record.cells());
        }
        table
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn record(sku: Option<&str>, style: &str, units: i64) -> CanonicalRecord {
        CanonicalRecord {
            logo: Some("Kay".to_string()),
            sku: sku.map(str::to_string),
            description: None,
            name: Some("Solitaire Ring".to_string()),
            style: Some(style.to_string()),
            cost: Some(10.0),
            retail: Some(25.0),
            merch_category: None,
            ownership: None,
            total_monthly_sales: units,
            total_on_hand_units: 2,
            ly_total_on_hand_units: 0,
            store_total_units: 0,
            margin_abs: Some(15.0),
            margin_pct: Some(0.6),
            sell_through: Some(units as f64 / 2.0),
            report_month: ReportMonth { year: 2025, month: 7 },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::record;
    use super::*;

    #[test]
    fn test_rename_map_is_one_to_one() {
        let mut targets: Vec<&str> = RENAME_MAP.iter().map(|(_, to)| *to).collect();
        targets.sort();
        targets.dedup();
        assert_eq!(targets.len(), RENAME_MAP.len());
    }

    #[test]
    fn test_to_raw_table_uses_canonical_order() {
        let table = CanonicalTable::new(vec![record(Some("123"), "ST1", 5)]);
        let raw = table.to_raw_table();
        assert_eq!(raw.columns.len(), CANONICAL_COLUMNS.len());
        assert_eq!(raw.rows[0][1], Cell::from("123"));
        assert_eq!(raw.rows[0][2], Cell::Blank);
        assert_eq!(raw.rows[0][9], Cell::Number(5.0));
        assert_eq!(raw.rows[0][16], Cell::from("2025-07"));
    }
}
