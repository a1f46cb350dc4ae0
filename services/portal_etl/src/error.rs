//! Structural error taxonomy for the extract, merge and storage layers.
//!
//! Soft data problems (unparseable money, zero denominators, unmatched merge
//! keys) never surface here; they are recorded as missing values instead.

use thiserror::Error;

pub type EtlResult<T> = std::result::Result<T, EtlError>;

#[derive(Debug, Error)]
pub enum EtlError {
    #[error("unsupported format for {source_name}: {reason}")]
    UnsupportedFormat { source_name: String, reason: String },

    #[error("missing expected columns: [{}]", .missing.join(", "))]
    SchemaMismatch { missing: Vec<String> },

    #[error(
        "mapping has duplicate '{key_field}' values [{}]; must be 1 row per key\n\n{}",
        .keys.join(", "),
        .preview.join("\n")
    )]
    AmbiguousMappingKey {
        key_field: String,
        keys: Vec<String>,
        preview: Vec<String>,
    },

    #[error("{table} table is missing column '{column}'")]
    MissingColumn { table: String, column: String },

    #[error("invalid report period '{0}', expected YYYY-MM")]
    InvalidPeriod(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("parquet error: {0}")]
    Parquet(#[from] polars::prelude::PolarsError),
}

impl EtlError {
    pub fn unsupported(source_name: impl Into<String>, reason: impl Into<String>) -> Self {
        EtlError::UnsupportedFormat {
            source_name: source_name.into(),
            reason: reason.into(),
        }
    }

    pub fn missing_column(table: &str, column: &str) -> Self {
        EtlError::MissingColumn {
            table: table.to_string(),
            column: column.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_mismatch_names_columns() {
        let err = EtlError::SchemaMismatch {
            missing: vec!["COST".to_string(), "TTL OH U".to_string()],
        };
        assert_eq!(err.to_string(), "missing expected columns: [COST, TTL OH U]");
    }

    #[test]
    fn test_ambiguous_key_includes_preview() {
        let err = EtlError::AmbiguousMappingKey {
            key_field: "Style".to_string(),
            keys: vec!["AB100".to_string()],
            preview: vec!["Style,AE".to_string(), "AB100,Jane".to_string(), "ab100,Raj".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("duplicate 'Style' values [AB100]"));
        assert!(msg.contains("AB100,Jane"));
        assert!(msg.contains("ab100,Raj"));
    }
}
