//! Left-join a style mapping table onto fact rows, filling blanks only

use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde::Deserialize;
use tracing::{info, warn};

use crate::error::{EtlError, EtlResult};
use crate::extract::load_raw;
use crate::merge::diagnostics::{top_counts, MergeDiagnostics};
use crate::table::{cell_at, Cell, RawTable};

pub const DEFAULT_FILL_FIELDS: [&str; 8] = [
    "AE",
    "Buyer",
    "Department",
    "RA_Issued",
    "image_url",
    "Disposition",
    "Comments",
    "Date_RA_Issued",
];

const PREVIEW_ROWS: usize = 50;

#[derive(Debug, Clone, Deserialize)]
pub struct MergeSpec {
    #[serde(default = "default_key")]
    pub primary_key: String,
    #[serde(default = "default_key")]
    pub mapping_key: String,
    #[serde(default = "default_fill_fields")]
    pub fill_fields: Vec<String>,
    #[serde(default)]
    pub probe_field: Option<String>,
    #[serde(default = "default_top_n")]
    pub top_n: usize,
}

fn default_key() -> String {
    "Style".to_string()
}

fn default_fill_fields() -> Vec<String> {
    DEFAULT_FILL_FIELDS.iter().map(|f| f.to_string()).collect()
}

fn default_top_n() -> usize {
    50
}

impl Default for MergeSpec {
    fn default() -> Self {
        Self {
            primary_key: default_key(),
            mapping_key: default_key(),
            fill_fields: default_fill_fields(),
            probe_field: None,
            top_n: default_top_n(),
        }
    }
}

impl MergeSpec {
    /// Representative enrichment field: explicit probe, else `AE` when it is
    /// a fill field, else the first fill field.
    pub fn probe(&self) -> Option<&str> {
        if let Some(probe) = self.probe_field.as_deref() {
            return Some(probe);
        }
        if self.fill_fields.iter().any(|f| f == "AE") {
            return Some("AE");
        }
        self.fill_fields.first().map(String::as_str)
    }
}

/// Join keys compare trimmed and uppercased.
pub fn normalize_key(cell: &Cell) -> String {
    cell.to_string().trim().to_uppercase()
}

fn render_row(row: &[Cell]) -> String {
    row.iter().map(|c| c.to_string()).collect::<Vec<_>>().join(",")
}

/// Load the mapping from `mapping_path` and merge it into `primary`.
pub fn apply_style_merge<P: AsRef<Path>>(
    primary: &RawTable,
    mapping_path: P,
    spec: &MergeSpec,
) -> EtlResult<(RawTable, MergeDiagnostics)> {
    let mapping = load_raw(mapping_path)?;
    merge_tables(primary, &mapping, spec)
}

/// Left join `mapping` onto `primary` on the normalized key.
///
/// The mapping must hold at most one row per key, otherwise nothing is
/// produced and `AmbiguousMappingKey` is returned. Populated primary values
/// are never overwritten; row count always equals the primary's.
pub fn merge_tables(
    primary: &RawTable,
    mapping: &RawTable,
    spec: &MergeSpec,
) -> EtlResult<(RawTable, MergeDiagnostics)> {
    let pk = primary
        .column_index(&spec.primary_key)
        .ok_or_else(|| EtlError::missing_column("primary", &spec.primary_key))?;
    let mk = mapping
        .column_index(&spec.mapping_key)
        .ok_or_else(|| EtlError::missing_column("mapping", &spec.mapping_key))?;

    let mut groups: HashMap<String, Vec<usize>> = HashMap::new();
    let mut mapping_blank_keys = 0usize;
    for (i, row) in mapping.rows.iter().enumerate() {
        let key = normalize_key(cell_at(row, mk));
        if key.is_empty() {
            mapping_blank_keys += 1;
            continue;
        }
        groups.entry(key).or_default().push(i);
    }

    let mut duplicates: Vec<&String> = groups
        .iter()
        .filter(|(_, rows)| rows.len() > 1)
        .map(|(key, _)| key)
        .collect();
    if !duplicates.is_empty() {
        duplicates.sort();
        let mut preview = vec![mapping.columns.join(",")];
        'keys: for key in &duplicates {
            for &i in &groups[*key] {
                if preview.len() > PREVIEW_ROWS {
                    break 'keys;
                }
                preview.push(render_row(&mapping.rows[i]));
            }
        }
        return Err(EtlError::AmbiguousMappingKey {
            key_field: spec.mapping_key.clone(),
            keys: duplicates.into_iter().cloned().collect(),
            preview,
        });
    }

    let index: HashMap<String, usize> = groups
        .into_iter()
        .map(|(key, rows)| (key, rows[0]))
        .collect();

    let mut out = primary.clone();
    out.pad_rows();
    let mut fills: Vec<(usize, Option<usize>)> = Vec::with_capacity(spec.fill_fields.len());
    for field in &spec.fill_fields {
        let target = match out.column_index(field) {
            Some(idx) => idx,
            None => out.add_column(field),
        };
        fills.push((target, mapping.column_index(field)));
    }

    let primary_keys: Vec<String> = primary.column_cells(pk).map(normalize_key).collect();
    for (row, key) in out.rows.iter_mut().zip(&primary_keys) {
        let Some(&m) = index.get(key) else {
            continue;
        };
        for &(target, source) in &fills {
            if let Some(source) = source {
                if row[target].is_blank() {
                    row[target] = cell_at(&mapping.rows[m], source).clone();
                }
            }
        }
    }

    let primary_key_set: HashSet<&str> = primary_keys
        .iter()
        .filter(|k| !k.is_empty())
        .map(String::as_str)
        .collect();

    let probe_field = spec.probe().map(str::to_string);
    let probe_idx = probe_field.as_deref().and_then(|p| out.column_index(p));
    let unenriched: Vec<&str> = match probe_idx {
        Some(p) => out
            .rows
            .iter()
            .zip(&primary_keys)
            .filter(|(row, key)| !key.is_empty() && row[p].is_blank())
            .map(|(_, key)| key.as_str())
            .collect(),
        None => Vec::new(),
    };

    let diagnostics = MergeDiagnostics {
        mapping_rows: mapping.len(),
        primary_rows: primary.len(),
        primary_distinct_keys: primary_key_set.len(),
        mapping_distinct_keys: index.len(),
        mapping_blank_keys,
        probe_field,
        unenriched_rows: unenriched.len(),
        unenriched_keys_top: top_counts(unenriched.iter().copied(), spec.top_n),
        unused_mapping_keys_top: top_counts(
            index
                .keys()
                .map(String::as_str)
                .filter(|k| !primary_key_set.contains(k)),
            spec.top_n,
        ),
    };

    info!(
        "Merged {} mapping rows into {} primary rows on '{}' ({} distinct primary keys, {} mapping keys)",
        diagnostics.mapping_rows,
        diagnostics.primary_rows,
        spec.primary_key,
        diagnostics.primary_distinct_keys,
        diagnostics.mapping_distinct_keys
    );
    if diagnostics.unenriched_rows > 0 {
        warn!(
            "{} primary rows ({:.1}%) have no {} after merge",
            diagnostics.unenriched_rows,
            diagnostics.unenriched_pct(),
            diagnostics.probe_field.as_deref().unwrap_or("enrichment")
        );
    }

    Ok((out, diagnostics))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::schema::fixtures::record;
    use crate::extract::CanonicalTable;
    use tempfile::TempDir;

    fn table(columns: &[&str], rows: &[&[&str]]) -> RawTable {
        let mut t = RawTable::new(columns.iter().map(|c| c.to_string()).collect());
        for row in rows {
            t.push_row(row.iter().map(|v| Cell::from(*v)).collect());
        }
        t
    }

    fn spec(fill: &[&str]) -> MergeSpec {
        MergeSpec {
            fill_fields: fill.iter().map(|f| f.to_string()).collect(),
            ..MergeSpec::default()
        }
    }

    #[test]
    fn test_fills_blanks_never_overwrites() {
        let primary = table(
            &["Style", "AE", "Buyer"],
            &[&["AB100", "Jane", ""], &["AB200", "", ""]],
        );
        let mapping = table(
            &["Style", "AE", "Buyer"],
            &[&["AB100", "Raj", "Mia"], &["AB200", "Raj", ""]],
        );

        let (out, diag) = merge_tables(&primary, &mapping, &spec(&["AE", "Buyer"])).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out.rows[0][1], Cell::from("Jane"));
        assert_eq!(out.rows[0][2], Cell::from("Mia"));
        assert_eq!(out.rows[1][1], Cell::from("Raj"));
        assert_eq!(out.rows[1][2], Cell::Blank);
        assert_eq!(diag.unenriched_rows, 0);
    }

    #[test]
    fn test_keys_are_case_and_space_insensitive() {
        let primary = table(&["Style"], &[&[" ab100 "]]);
        let mapping = table(&["Style", "AE"], &[&["AB100", "Raj"]]);

        let (out, _) = merge_tables(&primary, &mapping, &spec(&["AE"])).unwrap();
        assert_eq!(out.columns, vec!["Style", "AE"]);
        assert_eq!(out.rows[0][0], Cell::from(" ab100 "));
        assert_eq!(out.rows[0][1], Cell::from("Raj"));
    }

    #[test]
    fn test_duplicate_mapping_keys_are_fatal() {
        let primary = table(&["Style"], &[&["AB100"]]);
        let mapping = table(
            &["Style", "AE"],
            &[&["AB100", "Raj"], &["CD1", "Mia"], &["ab100 ", "Jane"]],
        );

        match merge_tables(&primary, &mapping, &spec(&["AE"])) {
            Err(EtlError::AmbiguousMappingKey { key_field, keys, preview }) => {
                assert_eq!(key_field, "Style");
                assert_eq!(keys, vec!["AB100".to_string()]);
                assert_eq!(preview, vec!["Style,AE", "AB100,Raj", "ab100 ,Jane"]);
            }
            other => panic!("expected AmbiguousMappingKey, got {:?}", other),
        }
    }

    #[test]
    fn test_preview_is_capped() {
        let rows: Vec<Vec<String>> = (0..80)
            .map(|i| vec![format!("K{}", i % 2), format!("AE{}", i)])
            .collect();
        let mut mapping = RawTable::new(vec!["Style".into(), "AE".into()]);
        for row in &rows {
            mapping.push_row(row.iter().map(|v| Cell::from(v.as_str())).collect());
        }
        let primary = table(&["Style"], &[&["K0"]]);

        match merge_tables(&primary, &mapping, &spec(&["AE"])) {
            Err(EtlError::AmbiguousMappingKey { keys, preview, .. }) => {
                assert_eq!(keys.len(), 2);
                assert_eq!(preview.len(), PREVIEW_ROWS + 1);
            }
            other => panic!("expected AmbiguousMappingKey, got {:?}", other),
        }
    }

    #[test]
    fn test_unmatched_style_keeps_values_and_is_reported() {
        let primary = table(
            &["Style", "AE", "Comments"],
            &[&["AB100", "", ""], &["ZZ9", "", "keep me"], &["AB100", "", ""]],
        );
        let mapping = table(
            &["Style", "AE", "Comments"],
            &[&["AB100", "Raj", "ok"], &["UNUSED1", "Mia", ""]],
        );

        let (out, diag) = merge_tables(&primary, &mapping, &spec(&["AE", "Comments"])).unwrap();
        assert_eq!(out.len(), 3);
        assert_eq!(out.rows[1][1], Cell::Blank);
        assert_eq!(out.rows[1][2], Cell::from("keep me"));

        assert_eq!(diag.primary_rows, 3);
        assert_eq!(diag.mapping_rows, 2);
        assert_eq!(diag.primary_distinct_keys, 2);
        assert_eq!(diag.mapping_distinct_keys, 2);
        assert_eq!(diag.probe_field.as_deref(), Some("AE"));
        assert_eq!(diag.unenriched_rows, 1);
        assert_eq!(diag.unenriched_keys_top[0].key, "ZZ9");
        assert_eq!(diag.unused_mapping_keys_top.len(), 1);
        assert_eq!(diag.unused_mapping_keys_top[0].key, "UNUSED1");
    }

    #[test]
    fn test_absent_fill_field_is_materialized() {
        let primary = table(&["Style", "Qty"], &[&["AB100", "3"], &["NOPE", "1"]]);
        let mapping = table(&["Style", "image_url"], &[&["AB100", "https://img/ab100.jpg"]]);

        let (out, diag) = merge_tables(&primary, &mapping, &spec(&["image_url", "Buyer"])).unwrap();
        assert_eq!(out.columns, vec!["Style", "Qty", "image_url", "Buyer"]);
        assert_eq!(out.rows[0][2], Cell::from("https://img/ab100.jpg"));
        assert_eq!(out.rows[0][3], Cell::Blank);
        assert_eq!(out.rows[1][2], Cell::Blank);
        assert_eq!(diag.probe_field.as_deref(), Some("image_url"));
        assert_eq!(diag.unenriched_rows, 1);
    }

    #[test]
    fn test_blank_mapping_keys_are_ignored() {
        let primary = table(&["Style", "AE"], &[&["", ""]]);
        let mapping = table(&["Style", "AE"], &[&["", "Raj"], &["  ", "Mia"]]);

        let (out, diag) = merge_tables(&primary, &mapping, &spec(&["AE"])).unwrap();
        assert_eq!(out.rows[0][1], Cell::Blank);
        assert_eq!(diag.mapping_blank_keys, 2);
        assert_eq!(diag.mapping_distinct_keys, 0);
        assert_eq!(diag.unenriched_rows, 0);
    }

    #[test]
    fn test_short_rows_on_either_side() {
        let mut primary = table(&["Style", "Qty", "AE"], &[]);
        primary.rows.push(vec![Cell::from("AB100")]);
        let mut mapping = table(&["Style", "Buyer", "AE"], &[]);
        mapping.rows.push(vec![Cell::from("AB100"), Cell::from("Mia")]);
        mapping.rows.push(vec![]);

        let (out, diag) = merge_tables(&primary, &mapping, &spec(&["AE", "Buyer"])).unwrap();
        assert_eq!(out.columns, vec!["Style", "Qty", "AE", "Buyer"]);
        assert_eq!(out.rows[0], vec![Cell::from("AB100"), Cell::Blank, Cell::Blank, Cell::from("Mia")]);
        assert_eq!(diag.mapping_blank_keys, 1);
        assert_eq!(diag.unenriched_rows, 1);
    }

    #[test]
    fn test_missing_key_column() {
        let primary = table(&["Item"], &[&["AB100"]]);
        let mapping = table(&["Style"], &[&["AB100"]]);
        let err = merge_tables(&primary, &mapping, &spec(&["AE"])).unwrap_err();
        assert!(matches!(err, EtlError::MissingColumn { ref table, .. } if table == "primary"));
    }

    #[test]
    fn test_aliased_key_on_canonical_table() {
        let primary = CanonicalTable::new(vec![record(Some("1"), "ab100", 1)]).to_raw_table();
        let mapping = table(&["Style", "AE"], &[&["AB100", "Raj"]]);
        let spec = MergeSpec {
            primary_key: "style".to_string(),
            ..spec(&["AE"])
        };

        let (out, _) = merge_tables(&primary, &mapping, &spec).unwrap();
        let ae = out.column_index("AE").unwrap();
        assert_eq!(out.rows[0][ae], Cell::from("Raj"));
    }

    #[test]
    fn test_apply_style_merge_from_csv() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("style_map.csv");
        std::fs::write(&path, "Style,AE,Disposition\nAB100,Raj,rtv melt\n").unwrap();
        let primary = table(&["Style", "Disposition"], &[&["ab100", ""]]);

        let (out, _) = apply_style_merge(&primary, &path, &spec(&["AE", "Disposition"])).unwrap();
        assert_eq!(out.rows[0][1], Cell::from("rtv melt"));
        assert_eq!(out.rows[0][2], Cell::from("Raj"));
    }
}
