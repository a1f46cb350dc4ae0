//! Operator-facing report of how well a mapping table covered the facts

use std::collections::HashMap;

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyCount {
    pub key: String,
    pub rows: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergeDiagnostics {
    pub mapping_rows: usize,
    pub primary_rows: usize,
    pub primary_distinct_keys: usize,
    pub mapping_distinct_keys: usize,
    pub mapping_blank_keys: usize,
    /// Field checked to decide whether a row was enriched.
    pub probe_field: Option<String>,
    pub unenriched_rows: usize,
    pub unenriched_keys_top: Vec<KeyCount>,
    pub unused_mapping_keys_top: Vec<KeyCount>,
}

impl MergeDiagnostics {
    /// Share of primary rows still missing the probe field after the merge.
    pub fn unenriched_pct(&self) -> f64 {
        if self.primary_rows == 0 {
            0.0
        } else {
            100.0 * self.unenriched_rows as f64 / self.primary_rows as f64
        }
    }
}

/// Count occurrences, most frequent first, ties by key, truncated to `n`.
pub(crate) fn top_counts<'a>(keys: impl Iterator<Item = &'a str>, n: usize) -> Vec<KeyCount> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for key in keys {
        *counts.entry(key).or_insert(0) += 1;
    }

    let mut out: Vec<KeyCount> = counts
        .into_iter()
        .map(|(key, rows)| KeyCount {
            key: key.to_string(),
            rows,
        })
        .collect();
    out.sort_by(|a, b| b.rows.cmp(&a.rows).then_with(|| a.key.cmp(&b.key)));
    out.truncate(n);
    out
}
